//! Request and response model plus the network fetch primitive

pub mod network;
pub mod request;
pub mod response;

pub use network::{
    create_network, HttpNetwork, Network, OfflineNetwork, ScriptedNetwork, TimeoutNetwork,
};
pub use request::{cache_key, Request};
pub use response::{Response, ResponseKind};
