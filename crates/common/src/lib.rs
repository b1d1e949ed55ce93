//! Common types for the OAuth session broker

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
