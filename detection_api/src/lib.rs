mod labels;
mod ort_service;
mod routes;

pub mod app;
pub mod codec;
pub mod config;
pub mod detection;
pub mod model_service;
pub mod render;
pub mod server;
pub mod state;
pub mod telemetry;

pub use app::start_app;
