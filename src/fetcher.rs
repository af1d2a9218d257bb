//! 依存パラメータの選択肢取得
//!
//! # 処理フロー
//!
//! 1. `api_call` テンプレートの `{name}` を解決済みの値で置換（クエリ文字列内も含む）
//! 2. 最初の `?` でエンドポイントとクエリ文字列に分割し、`&` 区切りの `key=value` を解析
//! 3. GET で呼び出し
//! 4. `response_field`（と `display_field`）のパスで選択肢を組み立てる
//!
//! 通信・解析の失敗はすべて空の選択肢として扱います。それが致命的かどうかは
//! 解決エンジン側（必須 / 任意）で判断します。
//!
//! 未解決のプレースホルダはそのまま残ります。`depends_on` が揃ってから呼ぶのは呼び出し側の責務です。

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::DependentParameter;
use crate::engine::ResolvedParams;
use crate::error::TransportError;
use crate::extract::{extract, is_empty, stringify, Choice};
use crate::transport::HttpExecutor;

/// 依存パラメータの選択肢を取得する
#[derive(Clone)]
pub struct OptionFetcher {
    http: Arc<dyn HttpExecutor>,
}

impl OptionFetcher {
    pub fn new(http: Arc<dyn HttpExecutor>) -> Self {
        Self { http }
    }

    /// 選択肢を取得する。失敗時は空のリスト
    pub async fn fetch_options(
        &self,
        param: &DependentParameter,
        resolved: &ResolvedParams,
    ) -> Vec<Choice> {
        match self.try_fetch(param, resolved).await {
            Ok(options) => options,
            Err(e) => {
                warn!(param = param.name(), error = %e, "failed to fetch options");
                Vec::new()
            }
        }
    }

    async fn try_fetch(
        &self,
        param: &DependentParameter,
        resolved: &ResolvedParams,
    ) -> Result<Vec<Choice>, TransportError> {
        let call = substitute_placeholders(&param.api_call, resolved);
        let (endpoint, query) = split_query(&call);
        debug!(param = param.name(), %endpoint, ?query, "fetching dependent options");

        let response = self.http.get(&endpoint, query.as_deref()).await?;
        Ok(options_from_response(&response, &param.response_field, param.display_path()))
    }
}

/// `{name}` を解決済みの値（文字列化）で置換する
pub fn substitute_placeholders(template: &str, resolved: &ResolvedParams) -> String {
    resolved
        .iter()
        .fold(template.to_string(), |acc, (name, value)| {
            acc.replace(&format!("{{{name}}}"), &stringify(value))
        })
}

/// 最初の `?` で分割し、クエリ文字列を `key=value` の組に解析する
///
/// `=` を含まない断片は無視します。URL デコードは行いません。
pub fn split_query(call: &str) -> (String, Option<Vec<(String, String)>>) {
    let Some((endpoint, query)) = call.split_once('?') else {
        return (call.to_string(), None);
    };

    let pairs = query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    (endpoint.to_string(), Some(pairs))
}

/// レスポンスから選択肢を組み立てる
///
/// 値が null の要素は選択肢にしません。表示名との対応付けは除外前に行います。
///
/// 値の配列とラベルの配列が同じ長さなら組にし、そうでなければ値を文字列化してラベルにします。
pub fn options_from_response(response: &Value, value_path: &str, display_path: &str) -> Vec<Choice> {
    match extract(response, value_path) {
        Some(Value::Array(values)) => {
            let labels = if display_path != value_path {
                extract(response, display_path)
            } else {
                None
            };

            match labels {
                Some(Value::Array(labels)) if labels.len() == values.len() => labels
                    .iter()
                    .zip(values)
                    .filter(|(_, value)| !value.is_null())
                    .map(|(label, value)| Choice::new(stringify(label), value))
                    .collect(),
                _ => values
                    .into_iter()
                    .filter(|value| !value.is_null())
                    .map(Choice::from_value)
                    .collect(),
            }
        }
        Some(single) if !is_empty(&single) => vec![Choice::from_value(single)],
        _ => Vec::new(),
    }
}
