//! Client for a Gemini-style generative-language HTTP API
//! (`POST {endpoint}/models/{model}:generateContent`).

use std::time::Duration;

use rocket::serde::json::{serde_json, Value};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::AiError;

/// How long a single generation may take before we give up.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Header carrying the API key. Kept out of the URL so it never shows up in
/// error messages.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// HTTP client for one model of the generative-language API.
pub struct AiClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl AiClient {
    pub fn new(endpoint: String, model: String, api_key: String) -> Result<Self, AiError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model,
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    /// Send a generation request and return the first candidate's content.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<Content, AiError> {
        if self.api_key.is_empty() {
            return Err(AiError::NotConfigured);
        }
        debug!("Sending generation request to model {}", self.model);

        // Errors are stripped of their URL before they can reach a log line.
        let response = self
            .http
            .post(self.url())
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(AiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let reply: GenerateResponse = response
            .json()
            .await
            .map_err(reqwest::Error::without_url)?;
        reply.into_content()
    }

    /// Ask for a JSON answer constrained to `schema`, and deserialize it.
    pub async fn generate_json<T>(&self, prompt: String, schema: Value) -> Result<T, AiError>
    where
        T: DeserializeOwned,
    {
        let request = GenerateRequest::json(prompt, schema);
        let content = self.generate(&request).await?;
        content.parse_json()
    }
}

/// Body of a `generateContent` call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateRequest {
    /// A single user prompt.
    pub fn prompt(prompt: String) -> Self {
        Self {
            system_instruction: None,
            contents: vec![Content::user(prompt)],
            tools: Vec::new(),
            generation_config: None,
        }
    }

    /// A single user prompt whose answer must be JSON matching `schema`.
    pub fn json(prompt: String, schema: Value) -> Self {
        Self {
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: schema,
            }),
            ..Self::prompt(prompt)
        }
    }

    pub fn with_system(mut self, instruction: &str) -> Self {
        self.system_instruction = Some(Content {
            role: None,
            parts: vec![Part::text(instruction.to_string())],
        });
        self
    }

    pub fn with_function(mut self, function: FunctionDeclaration) -> Self {
        match self.tools.first_mut() {
            Some(tool) => tool.function_declarations.push(function),
            None => self.tools.push(Tool {
                function_declarations: vec![function],
            }),
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(text: String) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![Part::text(text)],
        }
    }

    /// All text parts, concatenated.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect()
    }

    /// The first call of the named function, if the model made one.
    pub fn function_call(&self, name: &str) -> Option<&FunctionCall> {
        self.parts
            .iter()
            .filter_map(|part| part.function_call.as_ref())
            .find(|call| call.name == name)
    }

    /// Deserialize the text of this content as JSON. Models sometimes wrap
    /// JSON in a Markdown code fence even when asked not to.
    pub fn parse_json<T>(&self) -> Result<T, AiError>
    where
        T: DeserializeOwned,
    {
        let text = self.text();
        let json = strip_code_fence(&text);
        if json.is_empty() {
            return Err(AiError::NoAnswer);
        }
        Ok(serde_json::from_str(json)?)
    }
}

fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    match text.strip_prefix("```") {
        Some(fenced) => {
            // Drop an optional language tag on the opening line.
            let body = fenced.split_once('\n').map_or("", |(_, body)| body);
            body.trim_end().trim_end_matches("```").trim()
        }
        None => text,
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
}

impl Part {
    pub fn text(text: String) -> Self {
        Self {
            text: Some(text),
            function_call: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDeclaration {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    pub response_schema: Value,
}

/// Reply to a `generateContent` call. Only the parts we use are modelled.
#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: Option<Content>,
}

impl GenerateResponse {
    fn into_content(self) -> Result<Content, AiError> {
        self.candidates
            .into_iter()
            .find_map(|candidate| candidate.content)
            .ok_or(AiError::NoAnswer)
    }
}

#[cfg(test)]
mod tests {
    use rocket::serde::json::json;

    use super::*;

    #[test]
    fn request_body() {
        let request = GenerateRequest::json("Say hi".to_string(), json!({"type": "OBJECT"}))
            .with_system("Be brief.");
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            json!({
                "systemInstruction": {"parts": [{"text": "Be brief."}]},
                "contents": [{"role": "user", "parts": [{"text": "Say hi"}]}],
                "generationConfig": {
                    "responseMimeType": "application/json",
                    "responseSchema": {"type": "OBJECT"},
                },
            })
        );
    }

    #[test]
    fn functions_share_one_tool() {
        let declaration = || FunctionDeclaration {
            name: "lookup",
            description: "Look something up.",
            parameters: json!({"type": "OBJECT"}),
        };
        let request = GenerateRequest::prompt("?".to_string())
            .with_function(declaration())
            .with_function(declaration());
        assert_eq!(request.tools.len(), 1);
        assert_eq!(request.tools[0].function_declarations.len(), 2);
    }

    #[test]
    fn reply_parsing() {
        let reply: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "```json\n{\"translatedText\": "},
                        {"text": "\"Bonjour\"}\n```"},
                        {"functionCall": {"name": "lookup", "args": {"q": 1}}},
                    ],
                },
                "finishReason": "STOP",
            }],
            "usageMetadata": {"totalTokenCount": 12},
        }))
        .unwrap();
        let content = reply.into_content().unwrap();

        let value: Value = content.parse_json().unwrap();
        assert_eq!(value, json!({"translatedText": "Bonjour"}));
        assert_eq!(content.function_call("lookup").unwrap().args, json!({"q": 1}));
        assert!(content.function_call("other").is_none());
    }

    #[test]
    fn empty_reply() {
        let reply: GenerateResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(reply.into_content(), Err(AiError::NoAnswer)));

        let blank = Content::user("   ".to_string());
        assert!(matches!(blank.parse_json::<Value>(), Err(AiError::NoAnswer)));
    }

    #[test]
    fn code_fences() {
        assert_eq!(strip_code_fence("{}"), "{}");
        assert_eq!(strip_code_fence("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("```\n[1]\n```\n"), "[1]");
    }

    #[rocket::async_test]
    async fn unconfigured_client_refuses() {
        let client = AiClient::new(
            "http://localhost:1/".to_string(),
            "test-model".to_string(),
            String::new(),
        )
        .unwrap();
        assert_eq!(client.url(), "http://localhost:1/models/test-model:generateContent");
        let result = client.generate(&GenerateRequest::prompt("hi".to_string())).await;
        assert!(matches!(result, Err(AiError::NotConfigured)));
    }

    #[rocket::async_test]
    async fn api_key_stays_out_of_errors() {
        let client = AiClient::new(
            "http://127.0.0.1:1".to_string(),
            "test-model".to_string(),
            "SECRETKEY123".to_string(),
        )
        .unwrap();
        let err = client
            .generate(&GenerateRequest::prompt("hi".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::Request(_)));
        assert!(!err.to_string().contains("SECRETKEY123"));
        assert!(!crate::error::Error::from(err)
            .to_string()
            .contains("SECRETKEY123"));
    }
}
