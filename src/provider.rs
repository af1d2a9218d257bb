//! テキストオラクル（LLM）抽象化レイヤー
//!
//! # 責務
//!
//! - プロンプトを受け取りテキストを返すオラクルを統一的に扱うインターフェースを提供
//! - 設定に応じた適切なオラクルを生成するファクトリー機能
//!
//! # モジュール構成
//!
//! - `traits` - 共通インターフェース（[`TextOracle`]トレイト）
//! - `openai` - OpenAI 互換 Chat Completions API（HTTP）
//! - `anthropic` - Claude Code CLI

pub mod anthropic;
pub mod openai;
pub mod traits;

pub use traits::TextOracle;

use std::sync::Arc;

use crate::config::{LlmProvider, LlmSettings};
use crate::error::ProviderError;

/// OpenAI 利用時の既定モデル
const DEFAULT_OPENAI_MODEL: &str = "gpt-4";

/// 設定からオラクルを生成するファクトリー関数
///
/// # エラー
///
/// - [`ProviderError::MissingApiKey`] - OpenAI 利用時に API キーの環境変数が未設定
pub fn create_oracle(settings: &LlmSettings) -> Result<Arc<dyn TextOracle>, ProviderError> {
    match settings.provider {
        LlmProvider::OpenAI => Ok(Arc::new(openai::OpenAiOracle::from_env(
            &settings.api_url,
            settings.model.as_deref().unwrap_or(DEFAULT_OPENAI_MODEL),
            &settings.api_key_env,
        )?)),
        LlmProvider::Anthropic => {
            let oracle = anthropic::ClaudeCliOracle::new();
            Ok(Arc::new(match &settings.model {
                Some(model) => oracle.with_model(model),
                None => oracle,
            }))
        }
    }
}
