//! Generative-AI backed features: translation, fraud analysis and mock
//! national ID verification, all through one [`AiClient`].

use rocket::{
    fairing::{Fairing, Info, Kind},
    serde::json::serde_json,
    Build, Rocket,
};
use serde::Deserialize;
use thiserror::Error;

use crate::config::extract_config;

mod client;
pub mod fraud;
pub mod nida;
pub mod translation;

pub use client::{AiClient, Content, FunctionDeclaration, GenerateRequest};

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI service is not configured (missing `ai_api_key`)")]
    NotConfigured,
    #[error("AI request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("AI service error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("AI service returned no answer")]
    NoAnswer,
    #[error("AI service returned a malformed answer: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Connection settings for the generative-language API.
#[derive(Deserialize)]
struct AiConfig {
    ai_endpoint: String,
    ai_model: String,
    #[serde(default)]
    ai_api_key: String,
}

/// A fairing that builds the [`AiClient`] from config and puts it in managed
/// state. A missing API key is allowed; the AI endpoints then fail with 502.
pub struct AiFairing;

#[rocket::async_trait]
impl Fairing for AiFairing {
    fn info(&self) -> Info {
        Info {
            name: "AI client",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match extract_config::<AiConfig>(rocket.figment(), "AI") {
            Some(config) => config,
            None => return Err(rocket),
        };

        if config.ai_api_key.is_empty() {
            warn!("No `ai_api_key` configured; AI features are unavailable");
        }

        match AiClient::new(config.ai_endpoint, config.ai_model, config.ai_api_key) {
            Ok(client) => {
                info!("Using AI model {}", client.model());
                Ok(rocket.manage(client))
            }
            Err(e) => {
                error!("Failed to build AI client: {e}");
                Err(rocket)
            }
        }
    }
}
