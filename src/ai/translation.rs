use rocket::serde::json::{json, Value};

use crate::model::api::ai::{Language, Translation};

use super::{AiClient, AiError};

fn prompt(text: &str, language: Language) -> String {
    format!("Translate the following text to {language}:\n\n{text}")
}

fn schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "translatedText": {
                "type": "STRING",
                "description": "The translated text.",
            },
        },
        "required": ["translatedText"],
    })
}

/// Translate `text` into `language`.
pub async fn translate(
    client: &AiClient,
    text: &str,
    language: Language,
) -> Result<Translation, AiError> {
    client.generate_json(prompt(text, language), schema()).await
}
