//! HTTP server for atrium

pub mod http;

pub use http::{run, AppState};
