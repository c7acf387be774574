//! Types shared by the PayMatch engine and server crates.
mod cents;

pub mod helpers;
pub mod op;
mod secret;

pub use cents::{Cents, CentsConversionError, ONE_CENT};
pub use secret::Secret;
