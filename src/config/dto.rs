//! JSON デシリアライズ用の DTO (Data Transfer Object)
//!
//! # 責務
//!
//! このモジュールは、ワークフロー定義 JSON からのデータ読み込み専用の構造体を提供します。
//! DTO はバリデーション前の「生データ」を表現し、ドメインモデルとは分離されています。
//!
//! ## 変換フロー
//!
//! ```text
//! JSON ファイル
//!   ↓ (デシリアライズ)
//! WorkflowSpecDto
//!   ↓ (TryFrom でバリデーション)
//! WorkflowSpec (ドメインモデル)
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// ワークフロー定義 DTO
///
/// 必須キー（`api_name`, `method`, `endpoint`）もここでは `Option` で受け、
/// 欠落は変換時のバリデーションで検出します。
#[derive(Debug, Serialize, Deserialize)]
pub(super) struct WorkflowSpecDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) api_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) description: Option<String>,
    #[serde(default)]
    pub(super) parameters: BTreeMap<String, ParameterSpecDto>,
}

/// パラメータ定義 DTO
///
/// 入力パラメータと依存パラメータの両方をこの1つの形で受けます。
#[derive(Debug, Serialize, Deserialize)]
pub(super) struct ParameterSpecDto {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub(super) param_type: Option<String>,
    #[serde(default)]
    pub(super) required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) api_call: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) depends_on: Option<DependsOnDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) response_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) display_field: Option<String>,
}

/// `depends_on` は文字列1つ、または文字列の配列
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub(super) enum DependsOnDto {
    One(String),
    Many(Vec<String>),
}
