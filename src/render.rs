//! 実行結果を利用者向けの文章にする
//!
//! 失敗はオラクルを使わずにそのままエラー文にします。成功時はオラクルに要約させ、
//! オラクルが使えなければ API レスポンスを整形した JSON を返します。

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::engine::WorkflowResult;
use crate::provider::TextOracle;

pub struct ResponseRenderer {
    oracle: Arc<dyn TextOracle>,
}

impl ResponseRenderer {
    pub fn new(oracle: Arc<dyn TextOracle>) -> Self {
        Self { oracle }
    }

    pub async fn render(&self, result: &WorkflowResult) -> String {
        if !result.success {
            return format!("Error: {}", result.message());
        }

        let prompt = summary_prompt(&result.workflow_name, &result.api_response);
        match self.oracle.generate(&prompt).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => pretty(&result.api_response),
            Err(e) => {
                warn!(error = %e, "summary generation failed, falling back to raw JSON");
                pretty(&result.api_response)
            }
        }
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn summary_prompt(workflow_name: &str, response: &Value) -> String {
    format!(
        "Convert this API response into a clear, structured message.\n\n\
         Workflow: {workflow_name}\n\
         Response: {response}\n\n\
         Format the response with:\n\
         - Clear sections using headers\n\
         - Key information in bullet points\n\
         - Important values highlighted\n\
         - Keep it concise and organized"
    )
}
