//! アプリケーション設定（TOML）
//!
//! # 責務
//!
//! 下流 API のベース URL、LLM プロバイダー、反復上限などの実行時設定を
//! TOML ファイルから読み込みます。すべての項目に既定値があり、
//! ファイルがなくても [`AppSettings::default`] で動作します。
//!
//! ```toml
//! workflows_dir = "workflows"
//!
//! [api]
//! base_url = "http://localhost:8000/api/v1"
//! timeout_secs = 30
//!
//! [llm]
//! provider = "openai"
//! model = "gpt-4o"
//!
//! [engine]
//! max_iterations = 10
//! max_rounds = 10
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 反復上限の既定値（状態機械・解決エンジン共通）
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub workflows_dir: PathBuf,
    pub api: ApiSettings,
    pub llm: LlmSettings,
    pub engine: EngineSettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            workflows_dir: PathBuf::from("workflows"),
            api: ApiSettings::default(),
            llm: LlmSettings::default(),
            engine: EngineSettings::default(),
        }
    }
}

impl AppSettings {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let settings: AppSettings = toml::from_str(toml)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::Validation("api.base_url が空です".to_string()));
        }
        if self.engine.max_iterations == 0 || self.engine.max_rounds == 0 {
            return Err(ConfigError::Validation(
                "engine.max_iterations と engine.max_rounds は 1 以上にしてください".to_string(),
            ));
        }
        Ok(())
    }
}

/// 下流 API の接続設定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api/v1".to_string(),
            timeout_secs: 30,
        }
    }
}

/// テキストオラクル（LLM）の設定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: LlmProvider,
    /// モデル名（未指定ならプロバイダーの既定）
    pub model: Option<String>,
    /// OpenAI 互換 API のエンドポイント
    pub api_url: String,
    /// API キーを読む環境変数名
    pub api_key_env: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAI,
            model: None,
            api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

/// LLM プロバイダー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// OpenAI 互換 Chat Completions API（HTTP）
    OpenAI,
    /// Anthropic (Claude Code CLI)
    Anthropic,
}

/// 解決エンジン・状態機械の設定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// 状態機械のパラメータ収集リトライ上限
    pub max_iterations: u32,
    /// 1回の解決呼び出し内のラウンド上限
    pub max_rounds: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_rounds: DEFAULT_MAX_ITERATIONS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let settings = AppSettings::from_toml("").unwrap();

        assert_eq!(settings.workflows_dir, PathBuf::from("workflows"));
        assert_eq!(settings.api.timeout_secs, 30);
        assert_eq!(settings.llm.provider, LlmProvider::OpenAI);
        assert_eq!(settings.engine.max_iterations, 10);
        assert_eq!(settings.engine.max_rounds, 10);
    }

    #[test]
    fn test_partial_override() {
        let settings = AppSettings::from_toml(
            "[api]\n\
             base_url = \"http://api.internal:9000\"\n\n\
             [llm]\n\
             provider = \"anthropic\"\n\n\
             [engine]\n\
             max_iterations = 3\n",
        )
        .unwrap();

        assert_eq!(settings.api.base_url, "http://api.internal:9000");
        assert_eq!(settings.api.timeout_secs, 30);
        assert_eq!(settings.llm.provider, LlmProvider::Anthropic);
        assert_eq!(settings.engine.max_iterations, 3);
        assert_eq!(settings.engine.max_rounds, 10);
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let result = AppSettings::from_toml("[engine]\nmax_iterations = 0\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_invalid_toml() {
        let result = AppSettings::from_toml("[api\nbase_url = 1");
        assert!(matches!(result, Err(ConfigError::TomlDeserialize(_))));
    }
}
