use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use tokio::time::Duration;

use super::{GenerateOptions, LlmClient, LlmError, Message};

pub struct OpenAiClient {
    http: Client,
    api_key: String,
    model: String,
    base: String,
}

impl OpenAiClient {
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
            base: base.unwrap_or_else(|| "https://api.openai.com".into()),
        }
    }

    fn extract_completion(root: &Value) -> Option<String> {
        let text = root
            .get("choices")?
            .get(0)?
            .get("message")?
            .get("content")?
            .as_str()?;
        if text.trim().is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    async fn generate(
        &self,
        history: &[Message],
        prompt: &str,
        system_instruction: &str,
        options: &GenerateOptions,
    ) -> Result<String, LlmError> {
        let mut messages = vec![json!({ "role": "system", "content": system_instruction })];
        for message in history {
            messages.push(json!({ "role": message.role, "content": message.content }));
        }
        messages.push(json!({ "role": "user", "content": prompt }));

        let mut body = json!({
            "model": self.model,
            "messages": messages,
        });
        if let Some(max_tokens) = options.max_output_tokens {
            body["max_completion_tokens"] = json!(max_tokens);
        }

        let mut delay = Duration::from_millis(300);
        for attempt in 0..5 {
            let resp = self
                .http
                .post(format!("{}/v1/chat/completions", self.base))
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await?;

            if resp.status().is_success() {
                let value: Value = resp.json().await?;
                return Self::extract_completion(&value).ok_or(LlmError::EmptyCompletion);
            }

            if matches!(resp.status(), StatusCode::TOO_MANY_REQUESTS)
                || resp.status().is_server_error()
            {
                if attempt < 4 {
                    tokio::time::sleep(delay).await;
                    delay = Duration::from_millis((delay.as_millis() as f64 * 1.8) as u64)
                        + Duration::from_millis(fastrand::u64(0..250));
                    continue;
                }
            }

            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, message });
        }
        Err(LlmError::RetriesExhausted)
    }
}
