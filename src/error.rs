//! Error taxonomy shared by repositories, connectors, the matcher, the
//! transform library, and the workflow engine.
//!
//! Every fallible operation in this crate returns [`Result<T>`], never
//! panics on recoverable input. Repositories classify `sea_orm::DbErr`
//! into the variants below before propagating; connectors classify HTTP
//! responses the same way via [`classify_http_status`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// Entity lookup miss. Callers decide whether this is fatal.
    #[error("not found: {0}")]
    NotFound(String),

    /// Unique constraint violation on an upsert-style write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Invalid domain input: empty artists, out-of-range confidence,
    /// a string-keyed metrics map, etc.
    #[error("validation error: {0}")]
    Validation(String),

    /// A node's required context input is missing (no `tracklist`, an
    /// unknown `exclusion_source` task id, ...).
    #[error("dependency error in task {task_id}: {message}")]
    Dependency { task_id: String, message: String },

    /// Network/rate-limit/5xx from an external service. Retryable.
    #[error("transient external error: {0}")]
    TransientExternal(String),

    /// 4xx (other than 429) from an external service. Not retried.
    #[error("permanent external error: {0}")]
    PermanentExternal(String),

    /// Database error outside the taxonomy above; fatal to the unit of work.
    #[error("transaction error: {0}")]
    Transaction(#[from] sea_orm::DbErr),

    /// An unrecovered node failure that aborted a workflow run.
    #[error("workflow task {task_id} failed: {message}")]
    Workflow {
        task_id: String,
        message: String,
        #[source]
        cause: Option<Box<AppError>>,
    },

    #[error("http request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn dependency(task_id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Dependency {
            task_id: task_id.into(),
            message: msg.into(),
        }
    }

    /// True if a batch processor or engine-level retry should attempt this
    /// operation again.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::TransientExternal(_))
    }

    /// Classify a `sea_orm::DbErr` as a conflict when it looks like a
    /// unique-constraint violation, otherwise as a generic transaction error.
    pub fn from_db_err(err: sea_orm::DbErr) -> Self {
        let msg = err.to_string();
        if msg.to_lowercase().contains("unique") || msg.to_lowercase().contains("duplicate") {
            Self::Conflict(msg)
        } else {
            Self::Transaction(err)
        }
    }
}

/// Classify an HTTP response status the way every connector should:
/// 5xx and 429 are transient (worth retrying), other 4xx are permanent.
pub fn classify_http_status(status: reqwest::StatusCode, context: &str) -> AppError {
    if status.as_u16() == 429 || status.is_server_error() {
        AppError::TransientExternal(format!("{context}: {status}"))
    } else {
        AppError::PermanentExternal(format!("{context}: {status}"))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
