use axum::{Json, http::StatusCode, response::IntoResponse, response::Response};
use serde::{Deserialize, Serialize};
use services::block_reward::{BlockRewardResult, BlockStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRewardResponse {
    pub status: BlockStatus,
    /// Consensus reward in Gwei
    pub reward: String,
}

impl From<BlockRewardResult> for BlockRewardResponse {
    fn from(result: BlockRewardResult) -> Self {
        Self { status: result.status, reward: result.reward }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncDutiesResponse {
    pub validators: Vec<String>,
}

/// Error body for every non-2xx answer of the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub code: u16,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>, details: Option<String>) -> Self {
        Self { message: message.into(), details, code: status.as_u16() }
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}
