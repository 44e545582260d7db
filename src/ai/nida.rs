//! Mock verification against the national identity register (NIDA).
//!
//! The model acts as a verification agent and is offered a single tool,
//! [`TOOL_NAME`]. The register lookup itself runs locally and is a pure
//! function of the request; the model only decides to call it.

use chrono::{Datelike, NaiveDate};
use rocket::serde::json::{json, Value};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::ai::{NidaReason, NidaRequest, NidaVerification},
    common::national_id::NationalId,
};

use super::{AiClient, AiError, Content, FunctionDeclaration, GenerateRequest};

pub const TOOL_NAME: &str = "checkNidaDatabase";

const SYSTEM_INSTRUCTION: &str = "You are a citizen identity verification agent for the \
    National Identification Agency (NIDA) of Rwanda. Use the provided tool to check whether a \
    national ID and date of birth are registered. If verification fails, give the reason. \
    Answer with a JSON object with the fields isValid, fullName and reason.";

/// Districts a voter may register from.
pub const DISTRICTS: [&str; 30] = [
    // Kigali
    "Gasabo", "Kicukiro", "Nyarugenge",
    // Eastern
    "Bugesera", "Gatsibo", "Kayonza", "Kirehe", "Ngoma", "Nyagatare", "Rwamagana",
    // Northern
    "Burera", "Gakenke", "Gicumbi", "Musanze", "Rulindo",
    // Southern
    "Gisagara", "Huye", "Kamonyi", "Muhanga", "Nyamagabe", "Nyanza", "Nyaruguru", "Ruhango",
    // Western
    "Karongi", "Ngororero", "Nyabihu", "Nyamasheke", "Rubavu", "Rusizi", "Rutsiro",
];

/// Names handed out to registered citizens, picked by the ID's last digit.
const NAMES: [&str; 5] = [
    "Mugisha Jean Claude",
    "Uwamahoro Marie",
    "Ntaganda Paul",
    "Mukeshimana Alice",
    "Hakizimana Emmanuel",
];

/// A row of the mock register, as returned by the tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterEntry {
    pub is_registered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    pub reason: NidaReason,
}

impl RegisterEntry {
    fn rejected(reason: NidaReason) -> Self {
        Self {
            is_registered: false,
            full_name: None,
            reason,
        }
    }
}

impl From<RegisterEntry> for NidaVerification {
    fn from(entry: RegisterEntry) -> Self {
        Self {
            is_valid: entry.is_registered,
            full_name: entry.full_name,
            reason: Some(entry.reason),
        }
    }
}

/// Look a citizen up in the mock register.
///
/// Any well-formed 16-digit ID is registered, provided its embedded birth
/// year matches `dob` and the district (if given) is a known one.
pub fn check_register(national_id: &str, dob: &str, district: Option<&str>) -> RegisterEntry {
    let national_id: NationalId = match national_id.trim().parse() {
        Ok(national_id) => national_id,
        Err(_) => return RegisterEntry::rejected(NidaReason::NotFound),
    };

    if birth_year(dob) != Some(national_id.birth_year()) {
        return RegisterEntry::rejected(NidaReason::IdDobMismatch);
    }

    if let Some(district) = district.map(str::trim).filter(|d| !d.is_empty()) {
        if !DISTRICTS.iter().any(|known| known.eq_ignore_ascii_case(district)) {
            return RegisterEntry::rejected(NidaReason::DistrictNotAllowed);
        }
    }

    let name = NAMES[national_id.last_digit() as usize % NAMES.len()];
    RegisterEntry {
        is_registered: true,
        full_name: Some(name.to_string()),
        reason: NidaReason::Valid,
    }
}

/// Year of a `YYYY-MM-DD` date, ignoring any time that follows.
fn birth_year(dob: &str) -> Option<i32> {
    let date = dob.trim().get(..10)?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .map(|date| date.year())
}

fn tool() -> FunctionDeclaration {
    FunctionDeclaration {
        name: TOOL_NAME,
        description: "Checks if a Rwandan National ID and Date of Birth (as a YYYY-MM-DD string) \
            match in the NIDA database, optionally also checking the district of residence.",
        parameters: json!({
            "type": "OBJECT",
            "properties": {
                "nationalId": { "type": "STRING" },
                "dob": { "type": "STRING" },
                "district": { "type": "STRING" },
            },
            "required": ["nationalId", "dob"],
        }),
    }
}

fn verification_request(request: &NidaRequest) -> GenerateRequest {
    let mut prompt = format!(
        "Verify the citizen with national ID {} and date of birth {}",
        request.national_id, request.dob
    );
    if let Some(district) = &request.district {
        prompt.push_str(&format!(", living in {district} district"));
    }
    prompt.push('.');

    GenerateRequest::prompt(prompt)
        .with_system(SYSTEM_INSTRUCTION)
        .with_function(tool())
}

/// Turn the model's reply into a verification.
///
/// If the model called the register tool, the register decides, using the
/// values from the request rather than whatever the model passed. Otherwise
/// the model's own JSON answer is used, if it gave one.
fn resolve(content: &Content, request: &NidaRequest) -> NidaVerification {
    if let Some(call) = content.function_call(TOOL_NAME) {
        if call.args.get("nationalId") != Some(&Value::from(request.national_id.as_str())) {
            debug!("Model called {TOOL_NAME} with different arguments: {}", call.args);
        }
        return check_register(
            &request.national_id,
            &request.dob,
            request.district.as_deref(),
        )
        .into();
    }

    match content.parse_json::<NidaVerification>() {
        Ok(verification) => verification,
        Err(e) => {
            warn!("Model neither called {TOOL_NAME} nor answered usefully: {e}");
            NidaVerification::service_error()
        }
    }
}

/// Verify a citizen's national ID.
pub async fn verify(client: &AiClient, request: &NidaRequest) -> Result<NidaVerification, AiError> {
    let content = client.generate(&verification_request(request)).await?;
    Ok(resolve(&content, request))
}

#[cfg(test)]
mod tests {
    use rocket::serde::json::serde_json;

    use super::*;

    const ID_1990: &str = "1199080012345673";

    #[test]
    fn malformed_ids_not_found() {
        for id in ["", "123", "11990800123456730", "119908001234567a"] {
            assert_eq!(
                check_register(id, "1990-01-01", None).reason,
                NidaReason::NotFound
            );
        }
    }

    #[test]
    fn birth_year_must_match() {
        let entry = check_register(ID_1990, "1991-01-01", None);
        assert_eq!(entry, RegisterEntry::rejected(NidaReason::IdDobMismatch));
        assert_eq!(
            check_register(ID_1990, "not a date", None).reason,
            NidaReason::IdDobMismatch
        );
    }

    #[test]
    fn registered_citizen() {
        let entry = check_register(ID_1990, "1990-06-15", None);
        assert!(entry.is_registered);
        assert_eq!(entry.reason, NidaReason::Valid);
        // Last digit 3.
        assert_eq!(entry.full_name.as_deref(), Some("Mukeshimana Alice"));

        // Last digit 0.
        let entry = check_register("1198570098765430", "1985-12-31", None);
        assert_eq!(entry.full_name.as_deref(), Some("Mugisha Jean Claude"));
    }

    #[test]
    fn districts() {
        assert_eq!(DISTRICTS.len(), 30);
        assert!(check_register(ID_1990, "1990-06-15", Some("gasabo")).is_registered);
        assert!(check_register(ID_1990, "1990-06-15", Some("")).is_registered);
        assert_eq!(
            check_register(ID_1990, "1990-06-15", Some("Atlantis")).reason,
            NidaReason::DistrictNotAllowed
        );
    }

    fn request() -> NidaRequest {
        NidaRequest {
            national_id: ID_1990.to_string(),
            dob: "1990-06-15".to_string(),
            district: Some("Huye".to_string()),
        }
    }

    #[test]
    fn request_offers_tool() {
        let body = serde_json::to_value(verification_request(&request())).unwrap();
        assert_eq!(
            body["tools"][0]["functionDeclarations"][0]["name"],
            TOOL_NAME
        );
        let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.contains(ID_1990));
        assert!(prompt.contains("Huye"));
    }

    #[test]
    fn tool_call_decides() {
        let content: Content = serde_json::from_value(json!({
            "parts": [{
                "functionCall": {
                    "name": TOOL_NAME,
                    "args": {"nationalId": ID_1990, "dob": "1990-06-15"},
                },
            }],
        }))
        .unwrap();
        let verification = resolve(&content, &request());
        assert!(verification.is_valid);
        assert_eq!(verification.full_name.as_deref(), Some("Mukeshimana Alice"));
        assert_eq!(verification.reason, Some(NidaReason::Valid));
    }

    #[test]
    fn model_answer_fallback() {
        let content: Content = serde_json::from_value(json!({
            "parts": [{"text": "{\"isValid\": false, \"reason\": \"NOT_FOUND\"}"}],
        }))
        .unwrap();
        assert_eq!(
            resolve(&content, &request()).reason,
            Some(NidaReason::NotFound)
        );

        let chatter: Content = serde_json::from_value(json!({
            "parts": [{"text": "I cannot help with that."}],
        }))
        .unwrap();
        assert_eq!(
            resolve(&chatter, &request()),
            NidaVerification::service_error()
        );
    }
}
