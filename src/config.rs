//! 設定の読み込み
//!
//! # モジュール構成
//!
//! - [`workflow`][]: ワークフロー定義（JSON）のドメインモデル
//! - [`parameter`][]: パラメータ定義（入力パラメータ / 依存パラメータ）
//! - [`catalog`][]: ワークフロー定義ディレクトリの一括読み込み
//! - [`settings`][]: アプリケーション設定（TOML）
//! - `dto`: JSON デシリアライズ専用の内部型

mod dto;
pub mod catalog;
pub mod parameter;
pub mod settings;
pub mod workflow;

pub use catalog::WorkflowCatalog;
pub use parameter::{DependentParameter, HttpMethod, InputParameter, ParamLocation, ParameterSpec};
pub use settings::{AppSettings, DEFAULT_MAX_ITERATIONS, LlmProvider, LlmSettings};
pub use workflow::WorkflowSpec;
