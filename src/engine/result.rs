//! ワークフロー実行結果とエラーの型定義
//!
//! # 主要な型
//!
//! - [`WorkflowResult`][]: 状態機械の終端結果（成功可否、収集したパラメータ、API レスポンス、エラー）
//! - [`ExecutionError`][]: 実行中に発生するエラーの種別
//!
//! 状態機械はこれらのエラーを呼び出し元に伝播させません。すべて
//! [`WorkflowResult::error`] の文字列に畳み込まれます。
//!
//! # 使用例
//!
//! ```rust,no_run
//! use api_workflow_agent::engine::WorkflowResult;
//!
//! fn handle_result(result: WorkflowResult) {
//!     if result.success {
//!         println!("{}", result.to_json().unwrap());
//!     } else {
//!         println!("Error: {}", result.message());
//!     }
//! }
//! ```

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::engine::context::ResolvedParams;
use crate::error::ProviderError;

/// ワークフロー実行結果
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResult {
    /// ワークフロー名（`api_name`）
    pub workflow_name: String,

    /// `error` が空なら `true`
    pub success: bool,

    /// 収集したパラメータ
    pub collected_params: ResolvedParams,

    /// API レスポンス（API を呼ばなかった場合は空のオブジェクト）
    pub api_response: Value,

    /// エラーメッセージ（成功時は空文字列）
    pub error: String,

    /// パラメータ収集パスの回数
    pub iterations: u32,
}

impl WorkflowResult {
    /// 結果をJSON形式でシリアライズ
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// 利用者向けの失敗メッセージ
    ///
    /// API レスポンスに `message` があればそれを、なければ `error` を返します。
    pub fn message(&self) -> &str {
        self.api_response
            .get("message")
            .and_then(Value::as_str)
            .filter(|_| !self.success)
            .unwrap_or(self.error.as_str())
    }
}

/// 実行エラー
///
/// # エラー種別
///
/// - [`ExecutionError::ExtractionFailure`] - 自由文からも直接入力からも値が得られなかった
/// - [`ExecutionError::DependencyUnmet`] - 依存パラメータの前提が揃わなかった
/// - [`ExecutionError::OptionFetchFailure`] - 依存 API から選択肢が得られなかった
/// - [`ExecutionError::TransportFailure`] - 本体 API の呼び出しが失敗した
/// - [`ExecutionError::IterationExhausted`] - 反復上限までに必須パラメータが揃わなかった
/// - [`ExecutionError::Provider`] - パラメータ収集中のオラクル呼び出しが失敗した
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("no value for '{param}' could be extracted or collected")]
    ExtractionFailure { param: String },

    #[error("'{param}' is waiting on unresolved parameters: {}", .pending.join(", "))]
    DependencyUnmet { param: String, pending: Vec<String> },

    #[error("no options available for '{param}'")]
    OptionFetchFailure { param: String },

    #[error("{0}")]
    TransportFailure(String),

    #[error("could not collect required parameters: {}", missing_names(.causes))]
    IterationExhausted { causes: Vec<ExecutionError> },

    #[error("parameter collection failed: {0}")]
    Provider(#[from] ProviderError),
}

impl ExecutionError {
    /// 対象パラメータ名（パラメータ単位のエラーのみ）
    pub fn param(&self) -> Option<&str> {
        match self {
            ExecutionError::ExtractionFailure { param }
            | ExecutionError::DependencyUnmet { param, .. }
            | ExecutionError::OptionFetchFailure { param } => Some(param),
            _ => None,
        }
    }
}

fn missing_names(causes: &[ExecutionError]) -> String {
    causes
        .iter()
        .filter_map(ExecutionError::param)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(success: bool, api_response: Value, error: &str) -> WorkflowResult {
        WorkflowResult {
            workflow_name: "create_identifier".to_string(),
            success,
            collected_params: ResolvedParams::new(),
            api_response,
            error: error.to_string(),
            iterations: 1,
        }
    }

    #[test]
    fn test_message_prefers_api_message_on_failure() {
        let failed = result(
            false,
            json!({ "success": false, "error": "HTTP 404", "message": "Failed to execute POST /identifier/create" }),
            "HTTP 404",
        );
        assert_eq!(failed.message(), "Failed to execute POST /identifier/create");

        let no_message = result(false, json!({}), "could not collect required parameters: plan");
        assert_eq!(no_message.message(), "could not collect required parameters: plan");
    }

    #[test]
    fn test_to_json() {
        let ok = result(true, json!({ "data": { "enrollment_id": "ENR1" } }), "");
        let json = ok.to_json().expect("JSON変換に失敗");
        assert!(json.contains("create_identifier"));
        assert!(json.contains("ENR1"));
        assert!(json.contains("\"success\": true"));
    }

    #[test]
    fn test_iteration_exhausted_names_parameters() {
        let err = ExecutionError::IterationExhausted {
            causes: vec![
                ExecutionError::DependencyUnmet {
                    param: "plan".to_string(),
                    pending: vec!["policy".to_string()],
                },
                ExecutionError::ExtractionFailure {
                    param: "email".to_string(),
                },
            ],
        };
        assert_eq!(err.to_string(), "could not collect required parameters: plan, email");
    }

    #[test]
    fn test_dependency_unmet_message() {
        let err = ExecutionError::DependencyUnmet {
            param: "plan".to_string(),
            pending: vec!["policy".to_string(), "state".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "'plan' is waiting on unresolved parameters: policy, state"
        );
    }

    #[test]
    fn test_provider_error_converts() {
        let err = ExecutionError::from(ProviderError::InvalidResponse("empty".to_string()));
        assert!(matches!(err, ExecutionError::Provider(_)));
        assert!(err.param().is_none());
    }
}
