use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub(crate) struct RunRequest {
    pub prompt: String,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RunResponse {
    pub result: Option<RunResult>,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ApiError>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RunResult {
    pub response: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiError {
    pub code: Option<i64>,
    pub message: String,
}
