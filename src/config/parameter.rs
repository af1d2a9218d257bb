//! パラメータ定義
//!
//! # 責務
//!
//! ワークフロー定義の `parameters` に記述された各パラメータを、
//! 読み込み時点で [`ParameterSpec`] の2つのバリアントに振り分けます。
//!
//! - [`ParameterSpec::Input`]: 自由文からの抽出、またはユーザーへの直接入力で解決
//! - [`ParameterSpec::Dependent`]: 他パラメータの解決後に API から選択肢を取得して解決
//!
//! `api_call` キーの有無による判定は [`TryFrom<(String, ParameterSpecDto)>`] の
//! 中だけで行い、利用側はバリアントに対して `match` します。

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::dto::{DependsOnDto, ParameterSpecDto};
use crate::error::ConfigError;

/// `response_field` 省略時の既定値
pub const DEFAULT_RESPONSE_FIELD: &str = "data";

/// パラメータ定義（ドメインモデル）
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterSpec {
    /// 自由文抽出・直接入力で解決するパラメータ
    Input(InputParameter),
    /// 依存 API の選択肢から解決するパラメータ
    Dependent(DependentParameter),
}

impl ParameterSpec {
    pub fn name(&self) -> &str {
        &self.common().name
    }

    pub fn is_required(&self) -> bool {
        self.common().required
    }

    pub fn location(&self) -> ParamLocation {
        self.common().location
    }

    pub fn param_type(&self) -> &str {
        &self.common().param_type
    }

    /// 両バリアントに共通のフィールド
    pub fn common(&self) -> &InputParameter {
        match self {
            ParameterSpec::Input(input) => input,
            ParameterSpec::Dependent(dependent) => &dependent.input,
        }
    }
}

/// 入力パラメータ
#[derive(Debug, Clone, PartialEq)]
pub struct InputParameter {
    /// パラメータ名（`parameters` のキー）
    pub name: String,
    /// 型名（`string`, `integer`, `number`, `boolean` 等）
    pub param_type: String,
    pub required: bool,
    /// 既定値。設定されている場合は抽出を行わずにこの値を使う
    pub default: Option<Value>,
    pub location: ParamLocation,
    pub description: Option<String>,
}

/// 依存パラメータ
///
/// `depends_on` のすべてが解決済みになってから、`api_call` テンプレートに
/// 解決済みの値を埋め込んで選択肢を取得します。
#[derive(Debug, Clone, PartialEq)]
pub struct DependentParameter {
    pub input: InputParameter,
    /// 選択肢取得用の API テンプレート（例: `/plans?state={state}&policy={policy}`）
    pub api_call: String,
    pub depends_on: BTreeSet<String>,
    /// 値として使うフィールドのパス（例: `data[].plan_id`）
    pub response_field: String,
    /// 表示ラベルとして使うフィールドのパス
    pub display_field: Option<String>,
}

impl DependentParameter {
    pub fn name(&self) -> &str {
        &self.input.name
    }

    /// ラベル用のパス（未指定なら `response_field` と同じ）
    pub fn display_path(&self) -> &str {
        self.display_field.as_deref().unwrap_or(&self.response_field)
    }
}

/// パラメータの送信位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Query,
    #[default]
    Body,
    Path,
}

impl FromStr for ParamLocation {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "query" => Ok(ParamLocation::Query),
            "body" => Ok(ParamLocation::Body),
            "path" => Ok(ParamLocation::Path),
            other => Err(ConfigError::Validation(format!(
                "未知の location です: {other}"
            ))),
        }
    }
}

impl ParamLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamLocation::Query => "query",
            ParamLocation::Body => "body",
            ParamLocation::Path => "path",
        }
    }
}

/// HTTP メソッド
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// reqwest のメソッド型に変換
    pub fn to_reqwest(&self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            other => Err(ConfigError::Validation(format!(
                "サポートされていない HTTP メソッドです: {other}"
            ))),
        }
    }
}

/// DTO からドメインモデルへの変換（読み込み方向）
///
/// `api_call` が存在すれば [`ParameterSpec::Dependent`]、なければ
/// [`ParameterSpec::Input`] になります。
impl TryFrom<(String, ParameterSpecDto)> for ParameterSpec {
    type Error = ConfigError;

    fn try_from((name, dto): (String, ParameterSpecDto)) -> Result<Self, Self::Error> {
        if name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "パラメータ名が空です".to_string(),
            ));
        }

        let location = match dto.location.as_deref() {
            Some(raw) => raw.parse()?,
            None => ParamLocation::default(),
        };

        let input = InputParameter {
            name: name.clone(),
            param_type: dto.param_type.unwrap_or_else(|| "string".to_string()),
            required: dto.required,
            default: dto.default,
            location,
            description: dto.description,
        };

        let Some(api_call) = dto.api_call.filter(|call| !call.trim().is_empty()) else {
            return Ok(ParameterSpec::Input(input));
        };

        let depends_on: BTreeSet<String> = match dto.depends_on {
            None => BTreeSet::new(),
            Some(DependsOnDto::One(dep)) => BTreeSet::from([dep]),
            Some(DependsOnDto::Many(deps)) => deps.into_iter().collect(),
        };
        if depends_on.iter().any(|dep| dep.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "パラメータ '{name}' の depends_on に空の名前が含まれています"
            )));
        }

        Ok(ParameterSpec::Dependent(DependentParameter {
            input,
            api_call,
            depends_on,
            response_field: dto
                .response_field
                .unwrap_or_else(|| DEFAULT_RESPONSE_FIELD.to_string()),
            display_field: dto.display_field,
        }))
    }
}

/// ドメインモデルから DTO への変換（書き込み方向）
impl From<ParameterSpec> for ParameterSpecDto {
    fn from(spec: ParameterSpec) -> Self {
        let (input, dependent) = match spec {
            ParameterSpec::Input(input) => (input, None),
            ParameterSpec::Dependent(dep) => {
                let DependentParameter {
                    input,
                    api_call,
                    depends_on,
                    response_field,
                    display_field,
                } = dep;
                (input, Some((api_call, depends_on, response_field, display_field)))
            }
        };

        let mut dto = ParameterSpecDto {
            param_type: Some(input.param_type),
            required: input.required,
            default: input.default,
            location: Some(input.location.as_str().to_string()),
            description: input.description,
            api_call: None,
            depends_on: None,
            response_field: None,
            display_field: None,
        };

        if let Some((api_call, depends_on, response_field, display_field)) = dependent {
            dto.api_call = Some(api_call);
            dto.depends_on = Some(DependsOnDto::Many(depends_on.into_iter().collect()));
            dto.response_field = Some(response_field);
            dto.display_field = display_field;
        }

        dto
    }
}
