use navq_core::{ConfigError, MetaError, QueryError};
use navq_warehouse::WarehouseError;
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("warehouse error: {0}")]
    Warehouse(#[from] WarehouseError),

    #[error(transparent)]
    Meta(#[from] MetaError),

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Query(QueryError::Validation(_)) | Self::Config(_) => 2,
            Self::Query(QueryError::RepositoryUnavailable(_)) | Self::Warehouse(_) => 3,
            Self::Serialization(_) => 4,
            Self::Query(QueryError::Internal(_))
            | Self::Meta(_)
            | Self::Command(_)
            | Self::Io(_) => 10,
        }
    }
}
