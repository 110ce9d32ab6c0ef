use reqwest::Client;
use serde_json::{Value, json};
use tokio::time::Duration;

use super::{GenerateOptions, LlmClient, LlmError, Message};

pub struct GeminiClient {
    http: Client,
    api_key: String,
    model: String,
    base: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, base: Option<String>) -> Self {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(300))
            .build()
            .expect("client");
        Self {
            http,
            api_key,
            model,
            base: base.unwrap_or_else(|| "https://generativelanguage.googleapis.com".into()),
        }
    }

    fn extract_completion(root: &Value) -> Option<String> {
        let parts = root
            .get("candidates")?
            .get(0)?
            .get("content")?
            .get("parts")?
            .as_array()?;
        let text: String = parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect();
        if text.trim().is_empty() { None } else { Some(text) }
    }
}

#[async_trait::async_trait]
impl LlmClient for GeminiClient {
    async fn generate(
        &self,
        history: &[Message],
        prompt: &str,
        system_instruction: &str,
        options: &GenerateOptions,
    ) -> Result<String, LlmError> {
        let mut contents: Vec<Value> = history
            .iter()
            .map(|message| {
                // Gemini calls the assistant role "model"
                let role = if message.role == "assistant" {
                    "model"
                } else {
                    "user"
                };
                json!({ "role": role, "parts": [{ "text": message.content }] })
            })
            .collect();
        contents.push(json!({ "role": "user", "parts": [{ "text": prompt }] }));

        let mut body = json!({
            "contents": contents,
            "systemInstruction": { "parts": [{ "text": system_instruction }] },
        });
        if let Some(max_tokens) = options.max_output_tokens {
            body["generationConfig"] = json!({ "maxOutputTokens": max_tokens });
        }

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base, self.model, self.api_key
        );
        let resp = self.http.post(&url).json(&body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let value: Value = resp.json().await?;
        Self::extract_completion(&value).ok_or(LlmError::EmptyCompletion)
    }
}
