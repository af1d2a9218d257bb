//! パラメータ解決とワークフロー実行のエンジン
//!
//! # 責務
//!
//! - ワークフロー定義のパラメータを、自由文・依存 API・ユーザー入力から解決
//! - 解決済みパラメータで本体 API を1回呼び出す
//! - 収集 → 実行 → エラー処理を上限付きリトライの状態機械として進める
//!
//! # モジュール構成
//!
//! - [`context`][]: 解決済みパラメータ集合と1回の実行状態
//! - [`resolver`][]: ラウンドロビンの不動点によるパラメータ解決
//! - [`api_executor`][]: 本体 API の呼び出しと失敗の正規化
//! - [`executor`][]: 状態機械
//! - [`result`][]: 終端結果とエラー種別
//!
//! # 使用例
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use api_workflow_agent::config::WorkflowSpec;
//! use api_workflow_agent::engine::{ApiExecutor, ParameterResolver, WorkflowExecutor};
//! use api_workflow_agent::fetcher::OptionFetcher;
//! use api_workflow_agent::prompt::ConsolePrompter;
//! use api_workflow_agent::provider::anthropic::ClaudeCliOracle;
//! use api_workflow_agent::transport::HttpApiClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let spec = WorkflowSpec::from_file("workflows/get_plans.json")?;
//!     let http = Arc::new(HttpApiClient::new("http://localhost:8000/api/v1", Duration::from_secs(30))?);
//!
//!     let resolver = ParameterResolver::new(
//!         Arc::new(ClaudeCliOracle::new()),
//!         OptionFetcher::new(http.clone()),
//!         Arc::new(ConsolePrompter::new()),
//!     );
//!     let executor = WorkflowExecutor::new(resolver, ApiExecutor::new(http));
//!
//!     let result = executor.execute(&spec, "show plans for Gujarat").await;
//!     println!("{}", result.to_json()?);
//!     Ok(())
//! }
//! ```

pub mod api_executor;
pub mod context;
pub mod executor;
pub mod resolver;
pub mod result;

// 公開APIの再エクスポート
pub use api_executor::ApiExecutor;
pub use context::{ExecutionState, ResolvedParams};
pub use executor::{WorkflowExecutor, WorkflowState};
pub use resolver::{ParameterResolver, ResolutionSource, ResolveOutcome};
pub use result::{ExecutionError, WorkflowResult};
