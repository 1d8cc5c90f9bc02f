//! Bookstore application library
//!
//! Wires the service modules into the kernel registry and the HTTP server.

pub mod app;
pub mod modules;

pub use app::App;
