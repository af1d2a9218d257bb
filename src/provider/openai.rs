//! OpenAI 互換 Chat Completions API クライアント
//!
//! # 責務
//!
//! - `POST {api_url}` に `messages: [{role: "user", content: prompt}]` を送信
//! - [`TextOracle`] トレイトを実装し、最初の choice の本文を返す
//!
//! API キーは設定で指定した環境変数（既定 `OPENAI_API_KEY`）から読みます。
//!
//! # 使用例
//!
//! ```rust,no_run
//! use api_workflow_agent::provider::openai::OpenAiOracle;
//! use api_workflow_agent::provider::TextOracle;
//!
//! #[tokio::main]
//! async fn main() {
//!     let oracle = OpenAiOracle::from_env(
//!         "https://api.openai.com/v1/chat/completions",
//!         "gpt-4",
//!         "OPENAI_API_KEY",
//!     ).unwrap();
//!     println!("{}", oracle.generate("Hello!").await.unwrap());
//! }
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::traits::TextOracle;
use crate::error::ProviderError;

/// OpenAI 互換 API のオラクル
pub struct OpenAiOracle {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiOracle {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// 環境変数 `key_env` から API キーを読んで生成する
    ///
    /// # エラー
    ///
    /// - [`ProviderError::MissingApiKey`] - 環境変数が未設定
    pub fn from_env(api_url: &str, model: &str, key_env: &str) -> Result<Self, ProviderError> {
        let api_key = std::env::var(key_env)
            .map_err(|_| ProviderError::MissingApiKey(key_env.to_string()))?;
        Ok(Self::new(api_url, api_key, model))
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextOracle for OpenAiOracle {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiStatus {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatResponse = response.json().await?;
        first_content(completion)
    }
}

fn first_content(completion: ChatResponse) -> Result<String, ProviderError> {
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| ProviderError::InvalidResponse("empty completion".to_string()))
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}
