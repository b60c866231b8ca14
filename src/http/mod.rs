//! HTTP surface — the gateway's single `POST /message` endpoint plus
//! graceful-shutdown signal handling.

pub mod routes;
pub mod shutdown;

pub use routes::{app, serve};
pub use shutdown::shutdown_signal;
