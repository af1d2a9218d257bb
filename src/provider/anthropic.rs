//! Anthropic Claude Code CLI オラクル
//!
//! # 責務
//!
//! - Claude Code CLI (`claude` コマンド) を非対話モードで呼び出す
//! - [`TextOracle`] トレイトを実装し、JSON 出力の `result` を返す
//!
//! # CLIツール
//!
//! - **コマンド**: `claude -p "<prompt>" --output-format json [--model <model>]`
//! - **インストール**: `npm install -g @anthropic-ai/claude-code`
//! - **認証方法**:
//!   1. 環境変数 `ANTHROPIC_API_KEY` を設定
//!   2. `claude` を起動して `/login` コマンドを実行
//!
//! # CLI出力形式
//!
//! ```json
//! { "type": "result", "is_error": false, "result": "..." }
//! ```

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use super::traits::TextOracle;
use crate::error::ProviderError;

/// デフォルトのCLIコマンド名
const DEFAULT_COMMAND: &str = "claude";

/// NPMパッケージ名（エラーメッセージ用）
const NPM_PACKAGE: &str = "@anthropic-ai/claude-code";

/// Claude Code CLI を使うオラクル
pub struct ClaudeCliOracle {
    command: String,
    model: Option<String>,
}

impl ClaudeCliOracle {
    pub fn new() -> Self {
        Self {
            command: DEFAULT_COMMAND.to_string(),
            model: None,
        }
    }

    /// カスタムコマンド名を指定して生成（テストやカスタムインストール時）
    pub fn with_command(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            model: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    async fn execute_cli(&self, prompt: &str) -> Result<ClaudeCliResponse, ProviderError> {
        let mut command = Command::new(&self.command);
        command.arg("-p").arg(prompt).arg("--output-format").arg("json");
        if let Some(model) = &self.model {
            command.arg("--model").arg(model);
        }

        let output = command.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProviderError::CliNotFound(self.command.clone(), NPM_PACKAGE.to_string())
            } else {
                ProviderError::Io(e)
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProviderError::CliExecution(format!(
                "exit code {}: {}",
                output.status.code().unwrap_or(-1),
                stderr
            )));
        }

        let stdout = String::from_utf8(output.stdout)?;
        parse_cli_output(&stdout)
    }
}

impl Default for ClaudeCliOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextOracle for ClaudeCliOracle {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let response = self.execute_cli(prompt).await?;
        if response.is_error {
            return Err(ProviderError::CliExecution(response.result));
        }
        Ok(response.result)
    }
}

fn parse_cli_output(stdout: &str) -> Result<ClaudeCliResponse, ProviderError> {
    serde_json::from_str(stdout).map_err(|e| {
        ProviderError::InvalidResponse(format!(
            "Failed to parse CLI JSON output: {e}. Output was: {stdout}"
        ))
    })
}

/// Claude CLI のJSON出力形式
#[derive(Debug, Deserialize)]
struct ClaudeCliResponse {
    #[serde(default)]
    is_error: bool,
    result: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let oracle = ClaudeCliOracle::new();
        assert_eq!(oracle.command, DEFAULT_COMMAND);
        assert!(oracle.model.is_none());
    }

    #[test]
    fn test_with_command_and_model() {
        let oracle = ClaudeCliOracle::with_command("claude-dev").with_model("sonnet");
        assert_eq!(oracle.command, "claude-dev");
        assert_eq!(oracle.model.as_deref(), Some("sonnet"));
    }

    #[test]
    fn test_parse_cli_output() {
        let json = r#"{ "type": "result", "subtype": "success", "is_error": false, "result": "NOT_FOUND" }"#;
        let response = parse_cli_output(json).unwrap();
        assert!(!response.is_error);
        assert_eq!(response.result, "NOT_FOUND");
    }

    #[test]
    fn test_parse_invalid_output() {
        assert!(matches!(
            parse_cli_output("not json"),
            Err(ProviderError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_cli() {
        let oracle = ClaudeCliOracle::with_command("nonexistent-command-xyz123");
        match oracle.generate("hello").await {
            Err(ProviderError::CliNotFound(cmd, pkg)) => {
                assert_eq!(cmd, "nonexistent-command-xyz123");
                assert_eq!(pkg, NPM_PACKAGE);
            }
            other => panic!("Expected CliNotFound error, got {:?}", other),
        }
    }
}
