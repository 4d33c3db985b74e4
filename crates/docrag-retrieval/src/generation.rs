//! Answer generation through an Ollama server (`POST /api/generate`).

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use docrag_core::config::GenerationSettings;
use docrag_core::{Error, Generator, Result};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    base_url: String,
    model: String,
    system_prompt: String,
    agent: ureq::Agent,
}

impl OllamaGenerator {
    pub fn new(base_url: &str, model: &str, system_prompt: &str, timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            system_prompt: system_prompt.to_string(),
            agent,
        }
    }

    pub fn from_settings(settings: &GenerationSettings) -> Self {
        Self::new(
            &settings.ollama_url,
            &settings.model,
            &settings.system_prompt,
            Duration::from_secs(settings.timeout_secs),
        )
    }

    fn request(&self, prompt: &str) -> anyhow::Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let request_json = serde_json::to_string(&GenerateRequest {
            model: &self.model,
            prompt,
            system: &self.system_prompt,
            stream: false,
        })?;
        debug!("POST {} (model {}, {} prompt chars)", url, self.model, prompt.len());
        let response_text = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .with_context(|| format!("Generation request to {} failed", url))?;
        let response: GenerateResponse =
            serde_json::from_str(&response_text).context("Failed to parse generation response")?;
        Ok(response.response)
    }
}

impl Generator for OllamaGenerator {
    fn generate(&self, prompt: &str) -> Result<String> {
        self.request(prompt).map_err(|e| Error::Generation(format!("{e:#}")))
    }
}
