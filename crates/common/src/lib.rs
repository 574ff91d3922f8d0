//! Common types shared by the Lock authentication crates

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
