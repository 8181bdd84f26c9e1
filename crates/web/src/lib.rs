//! Bookreader static server
//!
//! Serves the application's HTML, JavaScript and media from a local
//! directory so a browser can load it during development and E2E runs.

pub mod server;

pub use server::{router, StaticServer, DEFAULT_PORT};
