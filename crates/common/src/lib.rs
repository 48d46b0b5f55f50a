//! Shared types for the fridge client workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
