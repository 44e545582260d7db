//! Bodies of the AI-backed endpoints: translation, fraud analysis and mock
//! national ID verification.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::model::db::vote::Vote;

/// Languages the UI is offered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Kin,
    Fr,
}

impl Language {
    /// The language's name, as used in prompts.
    pub fn name(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Kin => "Kinyarwanda",
            Self::Fr => "French",
        }
    }
}

impl Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub text: String,
    pub language: Language,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    pub translated_text: String,
}

/// Voting data to analyse, as JSON text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FraudAnalysisRequest {
    pub voting_data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FraudAnalysis {
    pub anomalies: Vec<String>,
    pub summary: String,
}

/// One recorded vote in the shape handed to fraud analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FraudRecord {
    pub voter_id: String,
    pub candidate: String,
    pub group: String,
    pub timestamp: String,
}

impl From<&Vote> for FraudRecord {
    fn from(vote: &Vote) -> Self {
        Self {
            voter_id: vote.national_id.to_string(),
            candidate: vote.candidate_name.clone(),
            group: vote.group_id.to_string(),
            timestamp: vote.timestamp.to_chrono().to_rfc3339(),
        }
    }
}

/// A citizen asking to be checked against the national register.
/// The ID is not validated here; a malformed ID is simply not found.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NidaRequest {
    pub national_id: String,
    /// Date of birth, `YYYY-MM-DD`.
    pub dob: String,
    #[serde(default)]
    pub district: Option<String>,
}

/// Why a national ID did or did not verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NidaReason {
    Valid,
    NotFound,
    IdDobMismatch,
    DistrictNotAllowed,
    ServiceError,
}

/// Outcome of a national ID verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NidaVerification {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<NidaReason>,
}

impl NidaVerification {
    /// The verification service could not produce an answer.
    pub fn service_error() -> Self {
        Self {
            is_valid: false,
            full_name: None,
            reason: Some(NidaReason::ServiceError),
        }
    }
}

#[cfg(test)]
mod tests {
    use rocket::serde::json::{json, serde_json};

    use super::*;

    #[test]
    fn wire_names() {
        let request: TranslationRequest =
            serde_json::from_value(json!({"text": "Murakoze", "language": "kin"})).unwrap();
        assert_eq!(request.language, Language::Kin);
        assert!(serde_json::from_value::<TranslationRequest>(json!({
            "text": "Merci",
            "language": "de",
        }))
        .is_err());

        assert_eq!(
            serde_json::to_value(NidaVerification::service_error()).unwrap(),
            json!({"isValid": false, "reason": "SERVICE_ERROR"})
        );
        assert_eq!(
            serde_json::to_value(NidaReason::IdDobMismatch).unwrap(),
            json!("ID_DOB_MISMATCH")
        );
    }
}
