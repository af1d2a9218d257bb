//! エラー型の定義
//!
//! このモジュールは、API Workflow Agent 全体で使用されるエラー型を定義します。
//! ワークフロー実行中のエラー（[`ExecutionError`](crate::engine::ExecutionError)）は
//! `engine::result` 側で定義しています。

use thiserror::Error;

/// 設定関連のエラー
#[derive(Debug, Error)]
pub enum ConfigError {
    /// ファイルの読み込みに失敗
    #[error("設定ファイルの読み込みに失敗しました: {0}")]
    FileRead(#[from] std::io::Error),

    /// JSON のデシリアライズに失敗（ワークフロー定義）
    #[error("JSON のデシリアライズに失敗しました: {0}")]
    JsonDeserialize(#[from] serde_json::Error),

    /// TOML のデシリアライズに失敗（アプリケーション設定）
    #[error("TOML のデシリアライズに失敗しました: {0}")]
    TomlDeserialize(#[from] toml::de::Error),

    /// バリデーションエラー
    #[error("設定のバリデーションに失敗しました: {0}")]
    Validation(String),
}

/// テキストオラクル（LLM）関連のエラー
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP 通信に失敗
    #[error("LLM API との通信に失敗しました: {0}")]
    Http(#[from] reqwest::Error),

    /// API が 2xx 以外を返した
    #[error("LLM API がエラーを返しました (status {status}): {body}")]
    ApiStatus { status: u16, body: String },

    /// API キーが未設定
    #[error("環境変数 {0} が設定されていません")]
    MissingApiKey(String),

    /// CLI ツールが見つからない
    #[error("CLI ツール '{0}' が見つかりません。`npm install -g {1}` でインストールしてください")]
    CliNotFound(String, String),

    /// CLI 実行エラー
    #[error("CLI の実行に失敗しました: {0}")]
    CliExecution(String),

    /// 不正なレスポンス
    #[error("不正なレスポンスです: {0}")]
    InvalidResponse(String),

    /// I/O エラー
    #[error("I/O エラー: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 変換エラー
    #[error("UTF-8 変換に失敗しました: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// 下流 API 呼び出し（HTTP トランスポート）のエラー
#[derive(Debug, Error)]
pub enum TransportError {
    /// リクエストの送信に失敗（接続エラー、タイムアウト等）
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// 2xx 以外のステータス
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// レスポンスボディが JSON ではない
    #[error("invalid JSON response: {0}")]
    InvalidJson(String),
}

/// エージェント起動時のエラー
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
