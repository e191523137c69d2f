// Application layer - the account transition service and its error model.
// The service never owns world state; every operation is handed the store.

pub mod error;
mod locks;
pub mod service;

pub use error::*;
pub use locks::*;
pub use service::*;
