pub mod config;
pub mod engine;
pub mod extract;
pub mod fetcher;
pub mod models;
pub mod monitor;
pub mod notify;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use engine::Engine;
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
