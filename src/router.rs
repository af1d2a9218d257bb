//! 自由文からワークフローを選ぶルーター
//!
//! 1. 意図分析: 操作・対象・言及されたパラメータをオラクルに要約させる
//! 2. 選択: カタログの `name: description` 一覧から1つ選ばせる（該当なしは `UNKNOWN`）
//! 3. 照合: オラクルの回答をカタログ名と突き合わせて信頼度を付ける
//!
//! 信頼度が [`MIN_CONFIDENCE`] 未満なら選択なしとします。

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::WorkflowCatalog;
use crate::error::ProviderError;
use crate::provider::TextOracle;

/// 採用する最低信頼度
pub const MIN_CONFIDENCE: f64 = 0.7;

const EXACT_MATCH: f64 = 1.0;
const PARTIAL_MATCH: f64 = 0.8;

/// ルーティング結果
#[derive(Debug, Clone, PartialEq)]
pub struct RouteDecision {
    pub workflow: String,
    pub confidence: f64,
    /// 意図分析の出力
    pub reasoning: String,
}

pub struct WorkflowRouter {
    oracle: Arc<dyn TextOracle>,
}

impl WorkflowRouter {
    pub fn new(oracle: Arc<dyn TextOracle>) -> Self {
        Self { oracle }
    }

    /// ユーザーの依頼に合うワークフローを選ぶ
    ///
    /// # 戻り値
    ///
    /// 信頼度が足りない場合やカタログが空の場合は `Ok(None)`
    pub async fn route(
        &self,
        user_input: &str,
        catalog: &WorkflowCatalog,
    ) -> Result<Option<RouteDecision>, ProviderError> {
        if catalog.is_empty() {
            return Ok(None);
        }

        let reasoning = self.oracle.generate(&intent_prompt(user_input)).await?;
        debug!(%reasoning, "intent analysis");

        let answer = self
            .oracle
            .generate(&selection_prompt(user_input, &reasoning, catalog))
            .await?;

        let decision = match_workflow(answer.trim(), catalog.names())
            .filter(|(_, confidence)| *confidence >= MIN_CONFIDENCE)
            .map(|(workflow, confidence)| RouteDecision {
                workflow,
                confidence,
                reasoning,
            });

        match &decision {
            Some(d) => info!(workflow = %d.workflow, confidence = d.confidence, "workflow matched"),
            None => info!(answer = answer.trim(), "no workflow matched"),
        }
        Ok(decision)
    }
}

/// オラクルの回答をワークフロー名と照合する
///
/// 大文字小文字を区別せず、完全一致なら 1.0 で即決、部分一致（どちら向きでも）なら 0.8 です。
/// 部分一致が複数ある場合は最後のものを採ります。
pub fn match_workflow<'a>(
    answer: &str,
    names: impl Iterator<Item = &'a str>,
) -> Option<(String, f64)> {
    let answer = answer.to_lowercase();
    if answer.is_empty() {
        return None;
    }

    let mut best = None;
    for name in names {
        let lower = name.to_lowercase();
        if lower == answer {
            return Some((name.to_string(), EXACT_MATCH));
        }
        if lower.contains(&answer) || answer.contains(&lower) {
            best = Some((name.to_string(), PARTIAL_MATCH));
        }
    }
    best
}

fn intent_prompt(user_input: &str) -> String {
    format!(
        "Analyze this user request and extract the intent:\n\n\
         User: \"{user_input}\"\n\n\
         Identify:\n\
         1. Primary action (create, view, get, update, delete)\n\
         2. Target entity\n\
         3. Key parameters mentioned\n\n\
         Return in format:\n\
         Action: <action>\n\
         Entity: <entity>\n\
         Parameters: <list>"
    )
}

fn selection_prompt(user_input: &str, reasoning: &str, catalog: &WorkflowCatalog) -> String {
    let workflows = catalog
        .iter()
        .map(|spec| {
            format!(
                "- {}: {}",
                spec.api_name(),
                spec.description().unwrap_or(spec.api_name())
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Based on the user's request, select the most appropriate workflow.\n\n\
         User request: \"{user_input}\"\n\n\
         Intent analysis: {reasoning}\n\n\
         Available workflows:\n{workflows}\n\n\
         Return ONLY the exact workflow name that best matches. If no match, return \"UNKNOWN\"."
    )
}
