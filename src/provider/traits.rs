//! テキストオラクル（LLM）の共通インターフェース定義
//!
//! # 責務
//!
//! - プロンプトを受け取りテキストを返す [`TextOracle`] トレイトを定義
//!
//! 返ってくるテキストに構造の保証はありません。呼び出し側（パラメータ抽出、
//! ワークフロー選択、レスポンス整形）が必要な解釈を行います。
//!
//! # 使用例
//!
//! ```rust,no_run
//! use api_workflow_agent::provider::TextOracle;
//!
//! async fn example(oracle: &dyn TextOracle) {
//!     let text = oracle.generate("Say hello.").await.unwrap();
//!     println!("{text}");
//! }
//! ```

use async_trait::async_trait;

use crate::error::ProviderError;

/// テキストオラクルの共通インターフェース
///
/// # 実装要件
///
/// - `Send + Sync`: エージェント全体で `Arc<dyn TextOracle>` として共有される
/// - 非同期実行対応（`async_trait`を使用）
#[async_trait]
pub trait TextOracle: Send + Sync {
    /// プロンプトを実行し、生成されたテキストを返す
    ///
    /// # エラー
    ///
    /// - [`ProviderError::Http`] / [`ProviderError::ApiStatus`] - API 通信の失敗
    /// - [`ProviderError::CliNotFound`] / [`ProviderError::CliExecution`] - CLI の失敗
    /// - [`ProviderError::InvalidResponse`] - 不正なレスポンス
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}
