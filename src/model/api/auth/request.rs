use serde::{Deserialize, Serialize};

use crate::model::{api::otp::Code, common::national_id::NationalId};

/// A voter asking for a one-time code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterChallengeRequest {
    pub national_id: NationalId,
}

/// A voter answering their challenge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoterVerifyRequest {
    pub code: Code,
}
