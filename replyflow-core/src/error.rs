use thiserror::Error;

/// Terminal failure of one pipeline run.
///
/// Every stage failure short-circuits the remainder of the run; the variant
/// records which stage gave up. Recorder failures are deliberately absent
/// here: a missing interaction record is logged as a warning and the run
/// still reports success (the reply was already posted).
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{platform} account is not connected")]
    Disconnected { platform: String },

    #[error("missing required configuration: {field}")]
    ConfigMissing { field: String },

    #[error("a run is already in progress for account {account_id}")]
    RunInProgress { account_id: String },

    #[error("token refresh failed: {0}")]
    Auth(#[from] AuthError),

    #[error("content fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("reply generation failed: {0}")]
    Llm(#[from] LlmError),

    #[error("reply publish failed: {0}")]
    Publish(#[from] PublishError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl PipelineError {
    /// Name of the stage that failed, for run logs.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Disconnected { .. } | PipelineError::Auth(_) => "token",
            PipelineError::ConfigMissing { .. } => "config",
            PipelineError::RunInProgress { .. } => "lease",
            PipelineError::Fetch(_) => "fetch",
            PipelineError::Llm(_) => "generate",
            PipelineError::Publish(_) => "publish",
            PipelineError::Storage(_) => "storage",
        }
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("no refresh token on file")]
    MissingRefreshToken,

    #[error("token endpoint rejected the grant with status {status}: {body}")]
    GrantRejected { status: u16, body: String },

    #[error("malformed token response: {details}")]
    MalformedResponse { details: String },

    #[error("network error during token refresh: {0}")]
    Network(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("platform API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("malformed platform response: {details}")]
    MalformedResponse { details: String },

    #[error("network error during fetch: {0}")]
    Network(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("completion API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("completion API returned no content")]
    EmptyResponse,

    #[error("malformed completion response: {details}")]
    MalformedResponse { details: String },

    #[error("network error during generation: {0}")]
    Network(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("platform write API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("malformed publish response: {details}")]
    MalformedResponse { details: String },

    #[error("network error during publish: {0}")]
    Network(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("stored value could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("corrupt row: {details}")]
    Corrupt { details: String },
}
