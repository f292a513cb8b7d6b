//! Shared types for atrium

mod error;

pub use error::{AtriumError, Result};
