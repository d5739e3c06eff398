//! HTTP surface: router, health endpoint, WebSocket route

pub mod routes;

pub use routes::build_router;
