//! Deferred-completion tokens
//!
//! Every lifecycle event hands the host a [`Completion`]. The event is not
//! finished until its token settles, which lets background work (a detached
//! cache write, namespace cleanup) outlive the call that started it.

use crate::error::{ShellkeepError, ShellkeepResult};
use futures_util::future::join_all;
use std::future::Future;
use tokio::task::JoinHandle;

/// Handle to asynchronous work the host must await before an event is done
#[derive(Debug)]
pub struct Completion {
    task: Option<JoinHandle<ShellkeepResult<()>>>,
}

impl Completion {
    /// A token that is already settled successfully
    pub fn ready() -> Self {
        Self { task: None }
    }

    /// Run `future` in the background and settle with its result
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = ShellkeepResult<()>> + Send + 'static,
    {
        Self {
            task: Some(tokio::spawn(future)),
        }
    }

    /// A token that settles with `err`
    pub fn failed(err: ShellkeepError) -> Self {
        Self::spawn(async move { Err(err) })
    }

    /// Settle once every token in `tokens` has settled
    ///
    /// All tokens run to completion even if one fails; the first error in
    /// argument order is reported.
    pub fn all(tokens: impl IntoIterator<Item = Completion>) -> Self {
        let tokens: Vec<Completion> = tokens.into_iter().collect();
        Self::spawn(async move {
            let results = join_all(tokens.into_iter().map(Completion::wait)).await;
            results.into_iter().collect::<ShellkeepResult<Vec<()>>>()?;
            Ok(())
        })
    }

    /// Whether the token has settled
    pub fn is_settled(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the token to settle
    pub async fn wait(self) -> ShellkeepResult<()> {
        match self.task {
            None => Ok(()),
            Some(task) => task
                .await
                .map_err(|e| ShellkeepError::Internal(format!("background task failed: {e}")))?,
        }
    }
}

impl Default for Completion {
    fn default() -> Self {
        Self::ready()
    }
}
