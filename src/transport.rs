//! 下流 REST API への HTTP トランスポート
//!
//! # 責務
//!
//! - [`HttpExecutor`] トレイト: エンジンが利用する HTTP 呼び出しの抽象
//! - [`HttpApiClient`]: reqwest による実装（ベース URL の付与、タイムアウト）
//!
//! 2xx 以外のステータスとネットワークエラーは [`TransportError`] として返します。
//! タイムアウトはトランスポート側の責務で、エンジンは待つだけです。

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::config::HttpMethod;
use crate::error::TransportError;

/// クエリパラメータ（順序を保持）
pub type QueryPairs = [(String, String)];

/// HTTP 呼び出しの共通インターフェース
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    /// リクエストを送信し、JSON レスポンスを返す
    ///
    /// `path` が `http://` / `https://` で始まらない場合、実装側でベース URL を前置します。
    async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        query: Option<&QueryPairs>,
        body: Option<&Value>,
    ) -> Result<Value, TransportError>;

    async fn get(&self, path: &str, query: Option<&QueryPairs>) -> Result<Value, TransportError> {
        self.request(HttpMethod::Get, path, query, None).await
    }
}

/// reqwest ベースの HTTP クライアント
pub struct HttpApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpApiClient {
    /// # 引数
    ///
    /// - `base_url`: 相対パスに前置する URL（例: `http://localhost:8000/api/v1`）
    /// - `timeout`: 1リクエストあたりのタイムアウト
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }
}

#[async_trait]
impl HttpExecutor for HttpApiClient {
    async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        query: Option<&QueryPairs>,
        body: Option<&Value>,
    ) -> Result<Value, TransportError> {
        let url = self.url_for(path);
        debug!(%method, %url, ?query, "sending request");

        let mut request = self.client.request(method.to_reqwest(), &url);
        if let Some(query) = query {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            TransportError::InvalidJson(format!("{e}. Body was: {text}"))
        })
    }
}
