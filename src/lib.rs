pub mod core;
pub mod llm;
pub mod main_module;
pub mod tickets;

pub use crate::core::config::AppConfig;
pub use crate::core::shared::state::AppState;
