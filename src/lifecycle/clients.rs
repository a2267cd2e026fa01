//! Open application instances and which worker build controls them

use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Default)]
struct ClientTable {
    /// Client id -> namespace of the controlling build
    controllers: BTreeMap<String, Option<String>>,
    /// Namespace of the build that last claimed clients
    active: Option<String>,
}

/// Registry of open application instances
///
/// A client that connects is controlled by the active build at that moment.
/// Without a claim, clients opened before an upgrade stay on the old build
/// until they reload; activation claims them all at once.
#[derive(Debug, Default)]
pub struct Clients {
    table: RwLock<ClientTable>,
}

impl Clients {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an open instance
    pub async fn connect(&self, id: &str) {
        let mut table = self.table.write().await;
        let controller = table.active.clone();
        debug!("Client {} connected (controller: {:?})", id, controller);
        table.controllers.insert(id.to_string(), controller);
    }

    /// Remove a closed instance; returns whether it was known
    pub async fn disconnect(&self, id: &str) -> bool {
        self.table.write().await.controllers.remove(id).is_some()
    }

    /// Namespace of the build controlling `id`, if any
    pub async fn controller(&self, id: &str) -> Option<String> {
        self.table
            .read()
            .await
            .controllers
            .get(id)
            .cloned()
            .flatten()
    }

    /// Take control of every open instance; returns how many changed controller
    pub async fn claim(&self, namespace: &str) -> usize {
        let mut table = self.table.write().await;
        table.active = Some(namespace.to_string());

        let mut changed = 0;
        for controller in table.controllers.values_mut() {
            if controller.as_deref() != Some(namespace) {
                *controller = Some(namespace.to_string());
                changed += 1;
            }
        }

        info!("Claimed {} client(s) for {}", changed, namespace);
        changed
    }

    /// Clients not controlled by the most recently claimed build
    pub async fn uncontrolled(&self) -> Vec<String> {
        let table = self.table.read().await;
        table
            .controllers
            .iter()
            .filter(|(_, controller)| *controller != &table.active)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Number of open instances
    pub async fn len(&self) -> usize {
        self.table.read().await.controllers.len()
    }

    /// Whether no instances are open
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_before_any_build_is_uncontrolled() {
        let clients = Clients::new();
        clients.connect("tab-1").await;
        assert_eq!(clients.controller("tab-1").await, None);
        assert!(clients.uncontrolled().await.is_empty());
    }

    #[tokio::test]
    async fn claim_takes_over_open_tabs() {
        let clients = Clients::new();
        clients.connect("tab-1").await;
        clients.connect("tab-2").await;

        assert_eq!(clients.claim("v1").await, 2);
        assert_eq!(clients.controller("tab-1").await.as_deref(), Some("v1"));

        clients.connect("tab-3").await;
        assert_eq!(clients.controller("tab-3").await.as_deref(), Some("v1"));

        assert_eq!(clients.claim("v2").await, 3);
        assert!(clients.uncontrolled().await.is_empty());
        assert_eq!(clients.claim("v2").await, 0);
    }

    #[tokio::test]
    async fn disconnect_forgets_client() {
        let clients = Clients::new();
        clients.connect("tab-1").await;
        assert!(clients.disconnect("tab-1").await);
        assert!(!clients.disconnect("tab-1").await);
        assert!(clients.is_empty().await);
    }
}
