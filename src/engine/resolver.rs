//! パラメータ解決エンジン
//!
//! # 責務
//!
//! ワークフロー定義のパラメータグラフを、上限付きのラウンドロビンで不動点まで解決します。
//!
//! 1ラウンドでは未解決のパラメータを順に見て、
//!
//! - 依存パラメータ: `depends_on` がすべて解決済みなら選択肢を取得し、1つなら自動選択、
//!   複数ならユーザーに選んでもらう。選択肢がなく任意パラメータなら「判断済み」として未設定のまま進む
//! - 入力パラメータ: 既定値 → 自由文からの抽出 → （必須なら）直接入力の順で値を得る
//!
//! 1ラウンドで何も進まなければ（停滞）終了します。完全に解決したのか、
//! 恒久的に詰まったのかはここでは区別せず、呼び出し側の状態機械が判断します。
//!
//! すでに解決済みのパラメータには触れないため、状態機械のリトライで何度呼んでも安全です。

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::config::{DependentParameter, InputParameter, ParameterSpec, WorkflowSpec};
use crate::engine::context::ResolvedParams;
use crate::engine::result::ExecutionError;
use crate::extract::Choice;
use crate::fetcher::OptionFetcher;
use crate::observe::{NoopObserver, Observer};
use crate::prompt::{InputReply, InputRequest, UserPrompter};
use crate::provider::TextOracle;

/// 1回の解決呼び出しのラウンド上限の既定値
pub const DEFAULT_MAX_ROUNDS: usize = 10;

/// オラクルが値を見つけられなかったことを示す応答
pub const NOT_FOUND: &str = "NOT_FOUND";

/// パラメータ値の出どころ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    Default,
    Extracted,
    UserInput,
    AutoSelected,
    UserSelected,
    /// 選択中の中断で先頭を採用した
    FirstOption,
}

/// 1回の解決呼び出しの結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOutcome {
    /// 実行したラウンド数
    pub rounds: usize,
    /// この呼び出しで新たに解決したパラメータ数
    pub newly_resolved: usize,
}

/// パラメータ解決エンジン
pub struct ParameterResolver {
    oracle: Arc<dyn TextOracle>,
    fetcher: OptionFetcher,
    prompter: Arc<dyn UserPrompter>,
    observer: Arc<dyn Observer>,
    max_rounds: usize,
}

impl ParameterResolver {
    pub fn new(
        oracle: Arc<dyn TextOracle>,
        fetcher: OptionFetcher,
        prompter: Arc<dyn UserPrompter>,
    ) -> Self {
        Self {
            oracle,
            fetcher,
            prompter,
            observer: Arc::new(NoopObserver),
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    /// 未解決のパラメータを解決する
    ///
    /// `resolved` には仕様に存在するパラメータだけが追加され、既存のエントリは変更されません。
    /// オラクルの呼び出しに失敗した場合はそこで中断し、それまでに解決した値は `resolved` に残ります。
    ///
    /// # エラー
    ///
    /// - [`ExecutionError::Provider`] - 自由文抽出のオラクル呼び出しが失敗した
    pub async fn resolve(
        &self,
        spec: &WorkflowSpec,
        user_text: &str,
        resolved: &mut ResolvedParams,
    ) -> Result<ResolveOutcome, ExecutionError> {
        let before = resolved.len();
        let mut rounds = 0;

        while rounds < self.max_rounds {
            rounds += 1;
            self.observer.round_started(spec.api_name(), rounds);
            let mut progressed = false;

            for param in spec.parameters().values() {
                if resolved.contains(param.name()) {
                    continue;
                }

                match param {
                    ParameterSpec::Dependent(dep) => {
                        if !resolved.contains_all(dep.depends_on.iter()) {
                            debug!(param = dep.name(), "dependencies not yet resolved, skipping");
                            continue;
                        }

                        let options = self.fetcher.fetch_options(dep, resolved).await;
                        self.observer.options_fetched(dep.name(), options.len());

                        match self.choose_option(dep, &options).await {
                            Some((value, source)) => {
                                self.bind(resolved, dep.name(), value, source);
                                progressed = true;
                            }
                            // 任意パラメータは選択肢がなければ未設定のままでよい
                            None if !dep.input.required => progressed = true,
                            None => {}
                        }
                    }
                    ParameterSpec::Input(input) => {
                        if let Some((value, source)) = self.resolve_input(input, user_text).await? {
                            self.bind(resolved, &input.name, value, source);
                            progressed = true;
                        }
                    }
                }
            }

            if !progressed {
                debug!(workflow = spec.api_name(), rounds, "resolution stalled");
                break;
            }
        }

        Ok(ResolveOutcome {
            rounds,
            newly_resolved: resolved.len() - before,
        })
    }

    fn bind(&self, resolved: &mut ResolvedParams, name: &str, value: Value, source: ResolutionSource) {
        if resolved.insert_new(name, value) {
            self.observer.parameter_resolved(name, source);
        }
    }

    /// 選択肢から値を1つ選ぶ
    ///
    /// 1つだけなら問い合わせずに採用します。複数ならユーザーに番号で選んでもらい、
    /// 不正な番号は再入力、中断された場合は先頭の選択肢を採用します。
    /// 選択肢が空なら `None` です。
    pub async fn choose_option(
        &self,
        param: &DependentParameter,
        options: &[Choice],
    ) -> Option<(Value, ResolutionSource)> {
        let first = options.first()?;
        if options.len() == 1 {
            info!(param = param.name(), label = %first.label, "only one option, auto-selected");
            return Some((first.value.clone(), ResolutionSource::AutoSelected));
        }

        let mut notice = None;
        loop {
            let request = InputRequest::Choice {
                param: param.name().to_string(),
                options: options.to_vec(),
                notice: notice.take(),
            };
            self.observer.input_requested(&request);

            match self.prompter.ask(&request).await {
                InputReply::Cancelled => {
                    info!(param = param.name(), "selection cancelled, using first option");
                    return Some((first.value.clone(), ResolutionSource::FirstOption));
                }
                InputReply::Text(text) => match text.trim().parse::<usize>() {
                    Ok(n) if (1..=options.len()).contains(&n) => {
                        return Some((options[n - 1].value.clone(), ResolutionSource::UserSelected));
                    }
                    Ok(_) => {
                        notice = Some(format!(
                            "Please enter a number between 1 and {}",
                            options.len()
                        ));
                    }
                    Err(_) => notice = Some("Please enter a valid number".to_string()),
                },
            }
        }
    }

    /// 入力パラメータの値を得る
    ///
    /// 既定値があれば抽出せずにそれを使います。なければオラクルで自由文から抽出し、
    /// 見つからず必須ならユーザーに直接尋ねます。空の回答や中断は「今回は未解決」です。
    ///
    /// 抽出値・入力値は `type` に関係なく、前後の空白を除いた文字列のまま保持します。
    pub async fn resolve_input(
        &self,
        param: &InputParameter,
        user_text: &str,
    ) -> Result<Option<(Value, ResolutionSource)>, ExecutionError> {
        if let Some(default) = &param.default {
            return Ok(Some((default.clone(), ResolutionSource::Default)));
        }

        let prompt = extraction_prompt(param, user_text);
        let raw = self.oracle.generate(&prompt).await?;
        let extracted = clean_oracle_value(&raw);

        if !extracted.is_empty() && extracted != NOT_FOUND {
            return Ok(Some((
                Value::String(extracted.to_string()),
                ResolutionSource::Extracted,
            )));
        }
        if !param.required {
            return Ok(None);
        }

        let request = InputRequest::Value {
            param: param.name.clone(),
            param_type: param.param_type.clone(),
        };
        self.observer.input_requested(&request);

        match self.prompter.ask(&request).await {
            InputReply::Text(text) if !text.trim().is_empty() => Ok(Some((
                Value::String(text.trim().to_string()),
                ResolutionSource::UserInput,
            ))),
            InputReply::Text(_) => Ok(None),
            InputReply::Cancelled => {
                debug!(param = %param.name, "value prompt cancelled, leaving unresolved");
                Ok(None)
            }
        }
    }

    /// 上限到達時に残った必須パラメータの原因を分類する
    pub fn diagnose(spec: &WorkflowSpec, resolved: &ResolvedParams) -> Vec<ExecutionError> {
        spec.parameters()
            .values()
            .filter(|param| param.is_required() && !resolved.is_bound(param.name()))
            .map(|param| match param {
                ParameterSpec::Input(input) => ExecutionError::ExtractionFailure {
                    param: input.name.clone(),
                },
                ParameterSpec::Dependent(dep) => {
                    let pending: Vec<String> = dep
                        .depends_on
                        .iter()
                        .filter(|name| !resolved.is_bound(name))
                        .cloned()
                        .collect();
                    if pending.is_empty() {
                        ExecutionError::OptionFetchFailure {
                            param: dep.name().to_string(),
                        }
                    } else {
                        ExecutionError::DependencyUnmet {
                            param: dep.name().to_string(),
                            pending,
                        }
                    }
                }
            })
            .collect()
    }
}

fn extraction_prompt(param: &InputParameter, user_text: &str) -> String {
    format!(
        "Extract the value for parameter \"{name}\" (type: {ty}) from this user request:\n\
         \"{user_text}\"\n\n\
         If the value is not explicitly mentioned, return \"{NOT_FOUND}\".\n\
         Return ONLY the extracted value, nothing else.",
        name = param.name,
        ty = param.param_type,
    )
}

/// 前後の空白と引用符を取り除く
fn clean_oracle_value(raw: &str) -> &str {
    raw.trim().trim_matches('"').trim_matches('\'')
}
