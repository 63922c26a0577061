mod sdk;
pub use sdk::*;
mod config;
pub use config::*;
mod error;
pub use error::*;
pub mod handle;
mod frame;
pub use frame::*;
mod session;
pub use session::*;
mod present;
pub use present::*;
mod app;
pub use app::*;

#[cfg(test)]
mod mock;
