pub mod config;
pub mod handlers;
pub mod logging;
pub mod models;
pub mod router;
pub mod services;
pub mod utils;

pub use router::build_router;
