//! 本体 API の呼び出し
//!
//! 解決済みパラメータをワークフロー定義の `location` に従って振り分け、
//! エンドポイントを1回だけ呼び出します。
//!
//! | メソッド | 送信内容 |
//! |---|---|
//! | GET | クエリ（空なら省略） |
//! | POST / PUT / PATCH | ボディ（ボディ向けが空なら全パラメータ） |
//! | DELETE | なし |
//!
//! 通信エラーは例外として返さず、`{"success": false, "error", "message"}` の形に正規化します。

use std::sync::Arc;

use serde_json::{Map, Value, json};
use tracing::{info, warn};

use crate::config::{HttpMethod, ParamLocation, WorkflowSpec};
use crate::engine::context::ResolvedParams;
use crate::extract::stringify;
use crate::fetcher::substitute_placeholders;
use crate::transport::HttpExecutor;

/// 本体 API の実行者
#[derive(Clone)]
pub struct ApiExecutor {
    http: Arc<dyn HttpExecutor>,
}

impl ApiExecutor {
    pub fn new(http: Arc<dyn HttpExecutor>) -> Self {
        Self { http }
    }

    /// ワークフローの API を呼び出す
    ///
    /// 失敗時も `Err` にはせず、正規化した失敗レスポンスを返します。
    /// 成否の判定は [`is_failure`] で行ってください。
    pub async fn execute(&self, spec: &WorkflowSpec, params: &ResolvedParams) -> Value {
        let endpoint = substitute_placeholders(spec.endpoint(), params);
        let method = spec.method();

        let mut query = Vec::new();
        let mut body = Map::new();
        for (name, value) in params.iter() {
            let location = spec
                .parameter(name)
                .map(|p| p.location())
                .unwrap_or_default();
            match location {
                ParamLocation::Query => query.push((name.clone(), stringify(value))),
                ParamLocation::Body => {
                    body.insert(name.clone(), value.clone());
                }
                ParamLocation::Path => {}
            }
        }

        info!(%method, %endpoint, "executing API call");

        let result = match method {
            HttpMethod::Get => {
                let query = (!query.is_empty()).then_some(query.as_slice());
                self.http.request(method, &endpoint, query, None).await
            }
            HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch => {
                let payload = if body.is_empty() {
                    serde_json::to_value(params.as_map()).unwrap_or_default()
                } else {
                    Value::Object(body)
                };
                self.http.request(method, &endpoint, None, Some(&payload)).await
            }
            HttpMethod::Delete => self.http.request(method, &endpoint, None, None).await,
        };

        match result {
            Ok(response) => response,
            Err(e) => {
                warn!(%method, %endpoint, error = %e, "API call failed");
                json!({
                    "success": false,
                    "error": e.to_string(),
                    "message": format!("Failed to execute {method} {endpoint}"),
                })
            }
        }
    }
}

/// レスポンスが失敗を示している場合、そのエラー文字列を返す
///
/// `success` が `false` のときだけ失敗とみなします（`success` がないレスポンスは成功）。
pub fn is_failure(response: &Value) -> Option<String> {
    match response.get("success") {
        Some(Value::Bool(false)) => Some(
            response
                .get("error")
                .and_then(Value::as_str)
                .filter(|e| !e.is_empty())
                .unwrap_or("API call failed")
                .to_string(),
        ),
        _ => None,
    }
}
