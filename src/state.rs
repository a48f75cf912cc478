use database::Database;
use llm_interface::LlmClient;

pub struct AppState {
    pub db: Database,
    pub llm: LlmClient,
    /// Shared secret the external scheduler presents on run triggers.
    pub internal_secret: String,
}
