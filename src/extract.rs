//! パス式による JSON 値の抽出
//!
//! # パス文法
//!
//! - `a.b` — オブジェクトのキーを順にたどる
//! - `a[].b` — キー `a` の配列を取り出し、各要素（オブジェクト）からフィールド `b` を射影
//! - `a[]` — キー `a` の配列そのもの
//! - `[]` — ルート自体が配列の場合にその配列を使う
//!
//! キーの欠落や型の不一致はすべて `None`（null）になり、パニックもエラーも起こしません。
//! 射影時、オブジェクトでない要素は読み飛ばし、残った要素の順序は保たれます。
//! オブジェクトだがフィールドを持たない要素は `null` として残ります。
//!
//! ```rust
//! use api_workflow_agent::extract::extract;
//! use serde_json::json;
//!
//! let data = json!({ "items": [{ "n": "a" }, { "n": "b" }] });
//! assert_eq!(extract(&data, "items[].n"), Some(json!(["a", "b"])));
//! ```

use serde::Serialize;
use serde_json::Value;

/// ユーザーに提示する選択肢
///
/// `label` は表示用、`value` がパラメータに束縛される値です。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Choice {
    pub label: String,
    pub value: Value,
}

impl Choice {
    pub fn new(label: impl Into<String>, value: Value) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }

    /// 値を文字列化したものをラベルにする
    pub fn from_value(value: Value) -> Self {
        Self {
            label: stringify(&value),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Key(String),
    Project { key: String, field: Option<String> },
}

fn parse_path(path: &str) -> Vec<Segment> {
    let mut segments: Vec<Segment> = Vec::new();

    for part in path.split('.') {
        if part.contains("[]") {
            segments.push(Segment::Project {
                key: part.replace("[]", ""),
                field: None,
            });
            continue;
        }
        // `a[].b` の `b` は直前の射影のフィールドになる
        if let Some(Segment::Project { field, .. }) = segments.last_mut() {
            if field.is_none() {
                *field = Some(part.to_string());
                continue;
            }
        }
        segments.push(Segment::Key(part.to_string()));
    }

    segments
}

/// パス式で値を抽出する
///
/// 空のパスはデータ全体を返します。結果が JSON の `null` の場合も `None` です。
pub fn extract(data: &Value, path: &str) -> Option<Value> {
    if path.is_empty() {
        return non_null(data.clone());
    }

    let mut current = data.clone();
    for segment in parse_path(path) {
        current = match segment {
            Segment::Key(key) => current.as_object()?.get(&key)?.clone(),
            Segment::Project { key, field } => {
                let list = if key.is_empty() {
                    current.as_array()?.clone()
                } else {
                    current.as_object()?.get(&key)?.as_array()?.clone()
                };
                match field {
                    Some(field) => Value::Array(
                        list.iter()
                            .filter_map(Value::as_object)
                            .map(|item| item.get(&field).cloned().unwrap_or(Value::Null))
                            .collect(),
                    ),
                    None => Value::Array(list),
                }
            }
        };
    }

    non_null(current)
}

/// パス式で抽出した結果を選択肢のリストに変換する
///
/// - オブジェクトの配列: `display_field` / `value_field` があればそのキー、
///   なければオブジェクト全体（ラベルは文字列化）
/// - スカラーの配列: ラベルは文字列化した値
/// - 単一の値: 1要素のリスト
/// - null / 空: 空のリスト
pub fn extract_options(
    data: &Value,
    path: &str,
    display_field: Option<&str>,
    value_field: Option<&str>,
) -> Vec<Choice> {
    let Some(extracted) = extract(data, path) else {
        return Vec::new();
    };
    if is_empty(&extracted) {
        return Vec::new();
    }

    match extracted {
        Value::Array(items) if items.iter().all(Value::is_object) => items
            .into_iter()
            .map(|item| {
                let label = display_field
                    .and_then(|key| item.get(key))
                    .map(stringify)
                    .unwrap_or_else(|| stringify(&item));
                let value = value_field
                    .and_then(|key| item.get(key))
                    .cloned()
                    .unwrap_or(item);
                Choice { label, value }
            })
            .collect(),
        Value::Array(items) => items.into_iter().map(Choice::from_value).collect(),
        single => vec![Choice::from_value(single)],
    }
}

/// 値を表示・埋め込み用の文字列にする（文字列は引用符なし）
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// null、空文字列、空配列、空オブジェクト
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn non_null(value: Value) -> Option<Value> {
    if value.is_null() { None } else { Some(value) }
}
