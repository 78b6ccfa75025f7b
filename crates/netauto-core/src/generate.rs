//! Command generation collaborator.
//!
//! The pipeline only depends on the [`CommandGenerator`] trait; any backend
//! that turns an intent into an ordered [`CommandSet`] satisfies it. The
//! shipped backend talks to a local Ollama server.

use crate::domain::{AutomationError, CommandSet, DeviceDescriptor, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Turns a natural-language intent into device configuration commands.
#[async_trait]
pub trait CommandGenerator: Send + Sync {
    async fn generate(&self, intent: &str, device: &DeviceDescriptor) -> Result<CommandSet>;
}

/// Ollama backend configuration.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Server base URL, e.g. `http://localhost:11434`.
    pub base_url: String,

    /// Model name, e.g. `llama3.2:1b`.
    pub model: String,

    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2:1b".to_string(),
            temperature: 0.2,
            max_tokens: 512,
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Command generator backed by a local Ollama model.
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    client: reqwest::Client,
    config: OllamaConfig,
}

impl OllamaGenerator {
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| {
                AutomationError::GenerationUnavailable(format!("building HTTP client: {e}"))
            })?;
        Ok(Self { client, config })
    }

    /// Probe the server; true if it answers the model listing endpoint.
    pub async fn health(&self) -> bool {
        let url = format!("{}/api/tags", self.config.base_url);
        matches!(self.client.get(&url).send().await, Ok(r) if r.status().is_success())
    }

    fn prompt_for(&self, intent: &str, device: &DeviceDescriptor) -> String {
        format!(
            "You are a network engineer configuring a {} router.\n\
             Translate the following change request into IOS configuration \
             commands.\n\
             Output ONLY the configuration lines, one per line, with no \
             explanation and no code fences.\n\n\
             Change request: {}\n",
            device.device_class, intent
        )
    }
}

#[async_trait]
impl CommandGenerator for OllamaGenerator {
    async fn generate(&self, intent: &str, device: &DeviceDescriptor) -> Result<CommandSet> {
        let url = format!("{}/api/generate", self.config.base_url);
        let request = GenerateRequest {
            model: &self.config.model,
            prompt: self.prompt_for(intent, device),
            stream: false,
            options: GenerateOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AutomationError::GenerationUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AutomationError::GenerationUnavailable(format!(
                "Ollama API error: {}",
                response.status()
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AutomationError::GenerationUnavailable(e.to_string()))?;

        debug!(model = %self.config.model, "generation response received");
        let commands = CommandSet::parse(&body.response);
        if commands.is_empty() {
            return Err(AutomationError::Generation(
                "backend returned no usable commands".to_string(),
            ));
        }
        Ok(commands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DeviceClass;

    #[test]
    fn test_new_builds_client() {
        assert!(OllamaGenerator::new(OllamaConfig::default()).is_ok());
    }

    #[test]
    fn test_prompt_mentions_device_class_and_intent() {
        let generator = OllamaGenerator::new(OllamaConfig::default()).expect("client");
        let device =
            DeviceDescriptor::new("Dummy-RT1", "10.255.255.3:23", DeviceClass::Cisco3725, true);
        let prompt = generator.prompt_for("add a description to fastethernet0/0", &device);

        assert!(prompt.contains("Cisco 3725"));
        assert!(prompt.contains("add a description to fastethernet0/0"));
    }

    #[test]
    fn test_request_wire_format() {
        let request = GenerateRequest {
            model: "llama3.2:1b",
            prompt: "p".to_string(),
            stream: false,
            options: GenerateOptions {
                temperature: 0.2,
                num_predict: 512,
            },
        };
        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(json["model"], "llama3.2:1b");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 512);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        let config = OllamaConfig {
            // Nothing listens on the discard port; connect fails fast.
            base_url: "http://127.0.0.1:9".to_string(),
            ..OllamaConfig::default()
        };
        let generator = OllamaGenerator::new(config).expect("client");
        let device =
            DeviceDescriptor::new("Dummy-RT1", "10.255.255.3:23", DeviceClass::Cisco3725, true);

        let err = generator.generate("anything", &device).await.unwrap_err();
        assert!(matches!(err, AutomationError::GenerationUnavailable(_)));
    }
}
