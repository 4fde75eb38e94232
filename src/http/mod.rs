//! HTTP surface of a node: `/ping`, `/mp` and `/status`.

pub mod routes;
pub mod server;

pub use routes::router;
pub use server::HttpServer;
