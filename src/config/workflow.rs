//! ワークフロー定義の読み込みと管理を行うモジュール
//!
//! # 責務
//!
//! 1つの REST API 呼び出しを「ワークフロー」として JSON で宣言し、
//! それを Rust の型 [`WorkflowSpec`] として扱うための機能を提供します。
//!
//! ## 主な機能
//!
//! - **JSON パース**: ワークフロー定義ファイルを [`WorkflowSpec`] に変換
//! - **バリデーション**: `api_name`, `endpoint`, `method` の存在を保証
//! - **パラメータ参照**: 名前 → [`ParameterSpec`] の対応を保持し、
//!   パラメータ解決エンジンに渡す
//!
//! ## 使用例
//!
//! ```json
//! {
//!   "api_name": "create_identifier",
//!   "method": "POST",
//!   "endpoint": "/identifier/create",
//!   "description": "Create an enrollment identifier",
//!   "parameters": {
//!     "state": {
//!       "type": "string",
//!       "required": true,
//!       "api_call": "/states",
//!       "response_field": "data[].state_name"
//!     },
//!     "applicant_email": { "type": "string", "required": true }
//!   }
//! }
//! ```
//!
//! ## 関連モジュール
//!
//! - [`crate::config::parameter`]: 各パラメータの定義
//! - [`crate::engine::executor`]: ワークフローの実行エンジン

use std::collections::BTreeMap;
use std::path::Path;

use super::dto::{ParameterSpecDto, WorkflowSpecDto};
use super::parameter::{HttpMethod, ParameterSpec};
use crate::engine::ResolvedParams;
use crate::error::ConfigError;

/// ワークフロー定義（ドメインモデル）
///
/// 読み込み後は変更されません。パラメータの並び順には意味がないため
/// [`BTreeMap`] で名前順に保持します。
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowSpec {
    api_name: String,
    method: HttpMethod,
    endpoint: String,
    description: Option<String>,
    parameters: BTreeMap<String, ParameterSpec>,
}

impl WorkflowSpec {
    /// JSON ファイルからワークフロー定義を読み込む
    ///
    /// # 処理フロー
    ///
    /// 1. ファイル読み込み
    /// 2. JSON デシリアライズ → [`WorkflowSpecDto`]
    /// 3. バリデーション & 変換 → [`WorkflowSpec`]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// JSON 文字列からワークフロー定義を読み込む
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let dto: WorkflowSpecDto = serde_json::from_str(json)?;
        Self::try_from(dto)
    }

    /// ワークフロー定義を JSON 文字列に変換
    pub fn to_json(&self) -> Result<String, ConfigError> {
        let dto = WorkflowSpecDto::from(self.clone());
        Ok(serde_json::to_string_pretty(&dto)?)
    }

    pub fn api_name(&self) -> &str {
        &self.api_name
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn parameters(&self) -> &BTreeMap<String, ParameterSpec> {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.get(name)
    }

    /// 必須パラメータのうち、まだ解決されていないものの名前
    pub fn missing_required(&self, resolved: &ResolvedParams) -> Vec<String> {
        self.parameters
            .values()
            .filter(|param| param.is_required() && !resolved.is_bound(param.name()))
            .map(|param| param.name().to_string())
            .collect()
    }
}

/// DTO からドメインモデルへの変換（読み込み方向）
///
/// # 処理フロー
///
/// 1. 必須フィールドのバリデーション
/// 2. パラメータの変換（`ParameterSpecDto` → `ParameterSpec`）
/// 3. `WorkflowSpec` の構築
impl TryFrom<WorkflowSpecDto> for WorkflowSpec {
    type Error = ConfigError;

    fn try_from(dto: WorkflowSpecDto) -> Result<Self, Self::Error> {
        let api_name = required_field(dto.api_name, "api_name")?;
        let endpoint = required_field(dto.endpoint, "endpoint")?;
        let method: HttpMethod = required_field(dto.method, "method")?.parse()?;

        let parameters = dto
            .parameters
            .into_iter()
            .map(|(name, param)| {
                ParameterSpec::try_from((name.clone(), param)).map(|spec| (name, spec))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(Self {
            api_name,
            method,
            endpoint,
            description: dto.description,
            parameters,
        })
    }
}

/// ドメインモデルから DTO への変換（書き込み方向）
impl From<WorkflowSpec> for WorkflowSpecDto {
    fn from(spec: WorkflowSpec) -> Self {
        WorkflowSpecDto {
            api_name: Some(spec.api_name),
            method: Some(spec.method.as_str().to_string()),
            endpoint: Some(spec.endpoint),
            description: spec.description,
            parameters: spec
                .parameters
                .into_iter()
                .map(|(name, param)| (name, ParameterSpecDto::from(param)))
                .collect(),
        }
    }
}

fn required_field(value: Option<String>, field: &str) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::Validation(format!(
            "必須フィールド '{field}' がありません"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const IDENTIFIER_SPEC: &str = r#"{
        "api_name": "create_identifier",
        "method": "post",
        "endpoint": "/identifier/create",
        "description": "Create an enrollment identifier",
        "parameters": {
            "state": {
                "type": "string",
                "required": true,
                "api_call": "/states",
                "response_field": "data[].state_name"
            },
            "policy": {
                "type": "string",
                "required": true,
                "api_call": "/policies?state={state}",
                "depends_on": ["state"],
                "response_field": "classPlanList[].policy_name"
            },
            "applicant_email": { "type": "string", "required": true },
            "configuration_name": { "type": "string", "default": "default_config" }
        }
    }"#;

    #[test]
    fn test_from_json() {
        let spec = WorkflowSpec::from_json(IDENTIFIER_SPEC).unwrap();

        assert_eq!(spec.api_name(), "create_identifier");
        assert_eq!(spec.method(), HttpMethod::Post);
        assert_eq!(spec.endpoint(), "/identifier/create");
        assert_eq!(spec.description(), Some("Create an enrollment identifier"));
        assert_eq!(spec.parameters().len(), 4);
        assert!(matches!(
            spec.parameter("policy"),
            Some(ParameterSpec::Dependent(_))
        ));
        assert!(matches!(
            spec.parameter("applicant_email"),
            Some(ParameterSpec::Input(_))
        ));
    }

    #[test]
    fn test_missing_required_field() {
        let result = WorkflowSpec::from_json(r#"{ "api_name": "x", "method": "GET" }"#);
        match result {
            Err(ConfigError::Validation(msg)) => assert!(msg.contains("endpoint")),
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_required_params() {
        let spec = WorkflowSpec::from_json(IDENTIFIER_SPEC).unwrap();
        let mut resolved = ResolvedParams::new();
        resolved.insert_new("state", json!("Gujarat"));

        let missing = spec.missing_required(&resolved);
        assert_eq!(missing, vec!["applicant_email", "policy"]);
    }

    #[test]
    fn test_null_value_is_still_missing() {
        let spec = WorkflowSpec::from_json(IDENTIFIER_SPEC).unwrap();
        let mut resolved = ResolvedParams::new();
        resolved.insert_new("state", json!("Gujarat"));
        resolved.insert_new("policy", serde_json::Value::Null);

        let missing = spec.missing_required(&resolved);
        assert_eq!(missing, vec!["applicant_email", "policy"]);
    }

    #[test]
    fn test_json_roundtrip() {
        let original = WorkflowSpec::from_json(IDENTIFIER_SPEC).unwrap();
        let json = original.to_json().unwrap();
        let restored = WorkflowSpec::from_json(&json).unwrap();

        assert_eq!(restored, original);
    }
}
