pub mod error;
pub mod handlers;
pub mod pending;
pub mod server;
pub mod settings;

pub use server::{build_router, serve, AppState};
