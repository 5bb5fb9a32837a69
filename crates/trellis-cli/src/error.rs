use trellis_core::engine::EngineError;
use trellis_core::policy::{PolicyError, ValidationError};
use trellis_core::resource::ResourceError;
use trellis_core::subject::SubjectError;

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("invalid resource: {0}")]
    Resource(#[from] ResourceError),

    #[error("invalid subject: {0}")]
    Subject(#[from] SubjectError),

    #[error("policy exceeds limits: {}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
