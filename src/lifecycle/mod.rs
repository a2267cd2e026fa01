//! Worker lifecycle, registration, and client control

pub mod clients;
pub mod completion;
pub mod registration;
pub mod worker;

pub use clients::Clients;
pub use completion::Completion;
pub use registration::Registration;
pub use worker::{ServiceWorker, WorkerState};
