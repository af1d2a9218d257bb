//! 実行状態の管理
//!
//! # 責務
//!
//! - 解決済みパラメータ集合 [`ResolvedParams`] の保持（追加のみ、削除・上書きなし）
//! - 状態機械が1回の実行中に引き回す [`ExecutionState`] の保持
//!
//! # 使用例
//!
//! ```rust
//! use api_workflow_agent::engine::ResolvedParams;
//! use serde_json::json;
//!
//! let mut resolved = ResolvedParams::new();
//! assert!(resolved.insert_new("state", json!("Gujarat")));
//!
//! // 一度入った値は変わらない
//! assert!(!resolved.insert_new("state", json!("Goa")));
//! assert_eq!(resolved.get("state"), Some(&json!("Gujarat")));
//! ```

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::config::WorkflowSpec;
use crate::engine::result::WorkflowResult;
use crate::engine::WorkflowState;

/// 解決済みパラメータ集合
///
/// 名前 → 値の対応で、キーは一意です。エントリは追加のみで、
/// 一度入った値が変更・削除されることはありません。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResolvedParams(BTreeMap<String, Value>);

impl ResolvedParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// 未登録の場合のみ追加する
    ///
    /// # 戻り値
    ///
    /// 追加した場合 `true`、すでに存在した場合 `false`（既存の値は変わらない）
    pub fn insert_new(&mut self, name: impl Into<String>, value: Value) -> bool {
        let name = name.into();
        if self.0.contains_key(&name) {
            return false;
        }
        self.0.insert(name, value);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// null 以外の値で登録済みか
    ///
    /// null で登録されたパラメータは、必須判定や依存の充足判定では未収集として扱います。
    pub fn is_bound(&self, name: &str) -> bool {
        self.0.get(name).is_some_and(|value| !value.is_null())
    }

    /// `names` がすべて null 以外の値で登録済みか
    pub fn contains_all<'a>(&self, mut names: impl Iterator<Item = &'a String>) -> bool {
        names.all(|name| self.is_bound(name))
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &BTreeMap<String, Value> {
        &self.0
    }
}

/// 1回のワークフロー実行の状態
///
/// 状態機械の各状態の間で引き回され、実行が終わると [`WorkflowResult`] に変換されて破棄されます。
/// 実行ごとに独立しており、他の実行と共有されることはありません。
#[derive(Debug)]
pub struct ExecutionState<'a> {
    spec: &'a WorkflowSpec,
    user_input: &'a str,
    pub(crate) state: WorkflowState,
    pub(crate) collected: ResolvedParams,
    pub(crate) api_response: Value,
    error: String,
    iteration: u32,
    max_iterations: u32,
}

impl<'a> ExecutionState<'a> {
    pub fn new(spec: &'a WorkflowSpec, user_input: &'a str, max_iterations: u32) -> Self {
        Self {
            spec,
            user_input,
            state: WorkflowState::CollectingParameters,
            collected: ResolvedParams::new(),
            api_response: Value::Object(Default::default()),
            error: String::new(),
            iteration: 0,
            max_iterations,
        }
    }

    pub fn spec(&self) -> &'a WorkflowSpec {
        self.spec
    }

    pub fn user_input(&self) -> &'a str {
        self.user_input
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn collected(&self) -> &ResolvedParams {
        &self.collected
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    /// 収集パスの回数を1増やす
    pub fn advance_iteration(&mut self) -> u32 {
        self.iteration += 1;
        self.iteration
    }

    pub fn cap_reached(&self) -> bool {
        self.iteration >= self.max_iterations
    }

    pub fn has_error(&self) -> bool {
        !self.error.is_empty()
    }

    pub fn error(&self) -> &str {
        &self.error
    }

    pub fn record_error(&mut self, error: impl Into<String>) {
        self.error = error.into();
    }

    /// 終端結果に変換する
    pub fn into_result(self) -> WorkflowResult {
        WorkflowResult {
            workflow_name: self.spec.api_name().to_string(),
            success: self.error.is_empty(),
            collected_params: self.collected,
            api_response: self.api_response,
            error: self.error,
            iterations: self.iteration,
        }
    }
}
