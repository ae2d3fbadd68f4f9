pub mod config;
pub mod context;
pub mod progress;
pub mod runner;

pub use config::PipelineConfig;
pub use context::PipelineContext;
pub use progress::Stage;
pub use runner::Pipeline;
