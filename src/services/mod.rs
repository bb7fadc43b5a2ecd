pub mod analyzer;
pub mod config;
pub mod database;
pub mod error;
pub mod multi_model;
pub mod normalize;
pub mod registry;
pub mod retry;
pub mod venice; // Venice AI chat-completions transport

pub use analyzer::Analyzer;
pub use config::VeniceConfig;
pub use database::Database;
pub use error::{AnalyzeError, ApiError};
pub use multi_model::MultiModelService;
pub use venice::VeniceClient;
