use serde::{Deserialize, Serialize};

use crate::model::common::session::QuestionSpec;

/// Body of `POST /sessions/current/start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRequest {
    pub question: QuestionSpec,
}

/// Body of `PATCH /sessions/current`.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdate {
    pub results_visible: bool,
}

/// Body of `POST /sessions/current/reset`. Reset is destructive, so the
/// caller must explicitly confirm it.
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize)]
pub struct ResetRequest {
    #[serde(default)]
    pub confirm: bool,
}
