use rocket::serde::json::{json, serde_json, Value};

use crate::model::api::ai::{FraudAnalysis, FraudRecord};

use super::{AiClient, AiError};

fn prompt(voting_data: &str) -> String {
    format!(
        "You are an expert in election fraud detection. Analyze the following voting data \
         for any anomalies or suspicious patterns, such as repeated voter IDs, bursts of \
         votes in a short time, or implausible distributions. Provide a summary of your \
         findings and a list of any specific anomalies detected.\n\n\
         Voting Data:\n{voting_data}"
    )
}

fn schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "anomalies": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "Each detected anomaly, one per entry.",
            },
            "summary": {
                "type": "STRING",
                "description": "A summary of the fraud analysis.",
            },
        },
        "required": ["anomalies", "summary"],
    })
}

/// Analyse voting data, given as JSON text, for signs of fraud.
pub async fn analyze(client: &AiClient, voting_data: &str) -> Result<FraudAnalysis, AiError> {
    client.generate_json(prompt(voting_data), schema()).await
}

/// Render recorded votes as the JSON text handed to [`analyze`].
pub fn voting_data(records: &[FraudRecord]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(records)
}
