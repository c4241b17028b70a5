//! HTTP surface: `startTimer` / `stopTimer` for UIs that talk over loopback

pub mod routes;

pub use routes::{create_router, create_router_with_name, AppState};
