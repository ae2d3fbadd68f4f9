pub mod broadcast;
pub mod config;
pub mod db;
pub mod error;
pub mod extraction;
pub mod job;
pub mod language;
pub mod link;
pub mod llm;
pub mod metadata;
pub mod notify;
pub mod pipeline;
pub mod recipe;
pub mod sanitize;
pub mod secrets;
pub mod telemetry;
pub mod transcript;
pub mod usage;
pub mod worker;

pub use broadcast::{JobProgressBroadcaster, JobProgressEvent};
pub use config::{load_config, Config};
pub use db::{Database, DatabaseError};
pub use error::{ConfigError, ExtractionError, ReelchefError, Result, SubmitError};
pub use extraction::{RecipeDraft, RecipeExtractor};
pub use job::{ExtractionJob, JobError, JobQuery, JobStatus};
pub use language::{Language, TargetLanguage};
pub use link::{classify, normalize, Classification, LinkResolver, Platform};
pub use pipeline::{Pipeline, PipelineConfig};
pub use recipe::Recipe;
pub use secrets::{resolve_secret, resolve_secret_optional, SecretError, SecretSource};
pub use worker::{Collaborators, ExtractionRequest, ExtractionService, ServiceOptions};
