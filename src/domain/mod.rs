mod account;
mod balance;
mod invocation;

pub use account::*;
pub use balance::*;
pub use invocation::*;
