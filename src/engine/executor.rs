//! ワークフロー実行の状態機械
//!
//! # 責務
//!
//! パラメータ収集 → API 実行 → エラー処理を明示的な状態遷移として進めます。
//!
//! ```text
//! CollectingParameters ──(不足なし)──▶ ExecutingApi ──(成功)──▶ Done
//!   │  ▲                                   │
//!   └──┘ retry（上限未満）                  └──(失敗)──▶ HandlingError ──▶ Done
//!   │
//!   └──(解決エラー / 上限到達)──────────────────────────▶ HandlingError
//! ```
//!
//! 途中で起きたエラーはすべて発生箇所で捕まえ、[`ExecutionState`] のエラー文字列に変換します。
//! [`WorkflowExecutor::execute`] は `Result` を返さず、常に [`WorkflowResult`] を返します。
//!
//! # 使用例
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use api_workflow_agent::config::WorkflowSpec;
//! use api_workflow_agent::engine::{ApiExecutor, ParameterResolver, WorkflowExecutor};
//!
//! # async fn example(resolver: ParameterResolver, api: ApiExecutor) -> Result<(), Box<dyn std::error::Error>> {
//! let spec = WorkflowSpec::from_file("workflows/list_states.json")?;
//! let executor = WorkflowExecutor::new(resolver, api);
//!
//! let result = executor.execute(&spec, "show me all states").await;
//! println!("{}", result.to_json()?);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::{DEFAULT_MAX_ITERATIONS, WorkflowSpec};
use crate::engine::api_executor::{ApiExecutor, is_failure};
use crate::engine::context::ExecutionState;
use crate::engine::resolver::ParameterResolver;
use crate::engine::result::{ExecutionError, WorkflowResult};
use crate::observe::{NoopObserver, Observer};

/// 状態機械の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    CollectingParameters,
    ExecutingApi,
    HandlingError,
    Done,
}

/// ワークフロー実行エンジン
///
/// 解決エンジンと API 実行者を保持し、ワークフロー定義ごとに状態機械を回します。
/// 実行ごとに独立した [`ExecutionState`] を作るため、1つのエグゼキューターを
/// 複数のワークフローで使い回せます。
pub struct WorkflowExecutor {
    resolver: ParameterResolver,
    api: ApiExecutor,
    observer: Arc<dyn Observer>,
    max_iterations: u32,
}

impl WorkflowExecutor {
    pub fn new(resolver: ParameterResolver, api: ApiExecutor) -> Self {
        Self {
            resolver,
            api,
            observer: Arc::new(NoopObserver),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    /// パラメータ収集パスの上限（0 は 1 として扱う）
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// ワークフローを実行する
    pub async fn execute(&self, spec: &WorkflowSpec, user_input: &str) -> WorkflowResult {
        let mut state = ExecutionState::new(spec, user_input, self.max_iterations);

        loop {
            self.observer
                .state_entered(spec.api_name(), state.state, state.iteration());

            state.state = match state.state {
                WorkflowState::CollectingParameters => self.collect_parameters(&mut state).await,
                WorkflowState::ExecutingApi => self.execute_api(&mut state).await,
                WorkflowState::HandlingError => {
                    error!(workflow = spec.api_name(), error = state.error(), "workflow failed");
                    WorkflowState::Done
                }
                WorkflowState::Done => break,
            };
        }

        state.into_result()
    }

    /// 1回の収集パスを行い、次の状態を決める
    async fn collect_parameters(&self, state: &mut ExecutionState<'_>) -> WorkflowState {
        let iteration = state.advance_iteration();
        let spec = state.spec();

        if let Err(e) = self
            .resolver
            .resolve(spec, state.user_input(), &mut state.collected)
            .await
        {
            state.record_error(e.to_string());
            return WorkflowState::HandlingError;
        }

        let missing = spec.missing_required(state.collected());
        if missing.is_empty() {
            return WorkflowState::ExecutingApi;
        }

        if !state.cap_reached() {
            info!(workflow = spec.api_name(), iteration, ?missing, "retrying parameter collection");
            return WorkflowState::CollectingParameters;
        }

        let causes = ParameterResolver::diagnose(spec, state.collected());
        for cause in &causes {
            warn!(workflow = spec.api_name(), "{cause}");
        }
        state.record_error(ExecutionError::IterationExhausted { causes }.to_string());
        WorkflowState::HandlingError
    }

    async fn execute_api(&self, state: &mut ExecutionState<'_>) -> WorkflowState {
        let spec = state.spec();
        let response = self.api.execute(spec, state.collected()).await;
        let failure = is_failure(&response);
        state.api_response = response;

        self.observer
            .api_finished(spec.method(), spec.endpoint(), failure.is_none());

        match failure {
            Some(message) => {
                state.record_error(ExecutionError::TransportFailure(message).to_string());
                WorkflowState::HandlingError
            }
            None => WorkflowState::Done,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpMethod;
    use crate::engine::ResolutionSource;
    use crate::error::{ProviderError, TransportError};
    use crate::fetcher::OptionFetcher;
    use crate::prompt::{InputReply, InputRequest, ScriptedPrompter};
    use crate::provider::TextOracle;
    use crate::transport::{HttpExecutor, QueryPairs};
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Mutex;

    /// プロンプトに含まれるパラメータ名ごとに決められた値を返すモックオラクル
    struct MockOracle {
        answers: Vec<(String, String)>,
    }

    impl MockOracle {
        fn new(answers: &[(&str, &str)]) -> Self {
            Self {
                answers: answers
                    .iter()
                    .map(|(k, v)| (format!("\"{k}\""), v.to_string()))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl TextOracle for MockOracle {
        async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
            Ok(self
                .answers
                .iter()
                .find(|(key, _)| prompt.contains(key.as_str()))
                .map(|(_, v)| v.clone())
                .unwrap_or_else(|| "NOT_FOUND".to_string()))
        }
    }

    struct FailingOracle;

    #[async_trait]
    impl TextOracle for FailingOracle {
        async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
            Err(ProviderError::InvalidResponse("oracle unavailable".to_string()))
        }
    }

    /// パスごとのレスポンスを返し、呼び出しを記録するモック
    struct MockHttp {
        routes: Vec<(String, Result<Value, u16>)>,
        calls: Mutex<Vec<(HttpMethod, String)>>,
    }

    impl MockHttp {
        fn new(routes: Vec<(&str, Result<Value, u16>)>) -> Self {
            Self {
                routes: routes.into_iter().map(|(p, r)| (p.to_string(), r)).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(HttpMethod, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpExecutor for MockHttp {
        async fn request(
            &self,
            method: HttpMethod,
            path: &str,
            _query: Option<&QueryPairs>,
            _body: Option<&Value>,
        ) -> Result<Value, TransportError> {
            self.calls.lock().unwrap().push((method, path.to_string()));
            match self.routes.iter().find(|(p, _)| p == path) {
                Some((_, Ok(value))) => Ok(value.clone()),
                Some((_, Err(status))) => Err(TransportError::Status {
                    status: *status,
                    body: "server error".to_string(),
                }),
                None => Err(TransportError::Status {
                    status: 404,
                    body: "not found".to_string(),
                }),
            }
        }
    }

    /// 状態遷移と解決結果を記録するオブザーバー
    #[derive(Default)]
    struct RecordingObserver {
        states: Mutex<Vec<(WorkflowState, u32)>>,
        resolved: Mutex<Vec<(String, ResolutionSource)>>,
    }

    impl Observer for RecordingObserver {
        fn state_entered(&self, _workflow: &str, state: WorkflowState, iteration: u32) {
            self.states.lock().unwrap().push((state, iteration));
        }

        fn parameter_resolved(&self, name: &str, source: ResolutionSource) {
            self.resolved.lock().unwrap().push((name.to_string(), source));
        }
    }

    fn executor(
        oracle: Arc<dyn TextOracle>,
        http: Arc<MockHttp>,
        prompter: Arc<ScriptedPrompter>,
    ) -> WorkflowExecutor {
        let resolver = ParameterResolver::new(oracle, OptionFetcher::new(http.clone()), prompter);
        WorkflowExecutor::new(resolver, ApiExecutor::new(http))
    }

    fn spec(json: Value) -> WorkflowSpec {
        WorkflowSpec::from_json(&json.to_string()).unwrap()
    }

    fn plans_spec() -> WorkflowSpec {
        spec(json!({
            "api_name": "get_plans",
            "method": "GET",
            "endpoint": "/plans",
            "parameters": {
                "state": {
                    "required": true,
                    "location": "query",
                    "api_call": "/states",
                    "response_field": "data[].state_name"
                },
                "policy": {
                    "required": true,
                    "location": "query",
                    "api_call": "/policies?state={state}",
                    "depends_on": "state",
                    "response_field": "classPlanList[].policy_name"
                }
            }
        }))
    }

    #[tokio::test]
    async fn test_successful_workflow() {
        let http = Arc::new(MockHttp::new(vec![
            ("/states", Ok(json!({ "data": [{ "state_name": "Gujarat" }] }))),
            ("/policies", Ok(json!({ "classPlanList": [{ "policy_name": "Gold" }] }))),
            ("/plans", Ok(json!({ "success": true, "data": ["P1"] }))),
        ]));
        let prompter = Arc::new(ScriptedPrompter::default());
        let observer = Arc::new(RecordingObserver::default());
        let executor = executor(Arc::new(MockOracle::new(&[])), http.clone(), prompter.clone())
            .with_observer(observer.clone());

        let result = executor.execute(&plans_spec(), "show plans").await;

        assert!(result.success);
        assert_eq!(result.error, "");
        assert_eq!(result.workflow_name, "get_plans");
        assert_eq!(result.iterations, 1);
        assert_eq!(result.collected_params.get("state"), Some(&json!("Gujarat")));
        assert_eq!(result.collected_params.get("policy"), Some(&json!("Gold")));
        assert_eq!(result.api_response["data"], json!(["P1"]));
        assert!(prompter.asked().is_empty());

        assert_eq!(
            http.calls().last(),
            Some(&(HttpMethod::Get, "/plans".to_string()))
        );
        let states: Vec<WorkflowState> =
            observer.states.lock().unwrap().iter().map(|(s, _)| *s).collect();
        assert_eq!(
            states,
            vec![
                WorkflowState::CollectingParameters,
                WorkflowState::ExecutingApi,
                WorkflowState::Done
            ]
        );
        assert!(
            observer
                .resolved
                .lock()
                .unwrap()
                .iter()
                .all(|(_, source)| *source == ResolutionSource::AutoSelected)
        );
    }

    #[tokio::test]
    async fn test_extracted_input_and_auto_selected_option() {
        let spec = spec(json!({
            "api_name": "register",
            "method": "POST",
            "endpoint": "/register",
            "parameters": {
                "email": { "required": true },
                "state": { "required": true, "api_call": "/states", "response_field": "data[].id" }
            }
        }));
        let http = Arc::new(MockHttp::new(vec![
            ("/states", Ok(json!({ "data": [{ "id": "GJ" }] }))),
            ("/register", Ok(json!({ "success": true }))),
        ]));
        let prompter = Arc::new(ScriptedPrompter::default());
        let executor = executor(
            Arc::new(MockOracle::new(&[("email", "a@example.com")])),
            http,
            prompter.clone(),
        );

        let result = executor.execute(&spec, "register a@example.com").await;

        assert!(result.success);
        assert_eq!(result.error, "");
        assert_eq!(result.collected_params.get("email"), Some(&json!("a@example.com")));
        assert_eq!(result.collected_params.get("state"), Some(&json!("GJ")));
        assert!(prompter.asked().is_empty());
    }

    #[tokio::test]
    async fn test_self_dependency_fails_at_cap() {
        let spec = spec(json!({
            "api_name": "circular",
            "method": "POST",
            "endpoint": "/circular",
            "parameters": {
                "token": {
                    "required": true,
                    "api_call": "/tokens?prev={token}",
                    "depends_on": "token"
                }
            }
        }));
        let http = Arc::new(MockHttp::new(vec![]));
        let executor = executor(
            Arc::new(MockOracle::new(&[])),
            http.clone(),
            Arc::new(ScriptedPrompter::default()),
        )
        .with_max_iterations(3);

        let result = executor.execute(&spec, "do it").await;

        assert!(!result.success);
        assert!(result.error.contains("token"));
        assert_eq!(result.error, "could not collect required parameters: token");
        assert_eq!(result.iterations, 3);
        assert!(result.collected_params.is_empty());
        assert_eq!(result.api_response, json!({}));
        assert!(http.calls().is_empty());
    }

    #[tokio::test]
    async fn test_options_without_values_never_reach_the_api() {
        let spec = spec(json!({
            "api_name": "get_item",
            "method": "GET",
            "endpoint": "/item",
            "parameters": {
                "id": {
                    "required": true,
                    "location": "query",
                    "api_call": "/items",
                    "response_field": "data[].id"
                }
            }
        }));
        let http = Arc::new(MockHttp::new(vec![(
            "/items",
            Ok(json!({ "data": [{ "name": "no id here" }] })),
        )]));
        let executor = executor(
            Arc::new(MockOracle::new(&[])),
            http.clone(),
            Arc::new(ScriptedPrompter::default()),
        )
        .with_max_iterations(2);

        let result = executor.execute(&spec, "show the item").await;

        assert!(!result.success);
        assert_eq!(result.error, "could not collect required parameters: id");
        assert_eq!(result.iterations, 2);
        assert!(result.collected_params.get("id").is_none());
        assert!(http.calls().iter().all(|(_, path)| path != "/item"));
    }

    #[tokio::test]
    async fn test_retry_picks_up_prompted_value() {
        let spec = spec(json!({
            "api_name": "register",
            "method": "POST",
            "endpoint": "/register",
            "parameters": {
                "email": { "required": true }
            }
        }));
        let http = Arc::new(MockHttp::new(vec![("/register", Ok(json!({ "success": true })))]));
        // 1回目のパスは中断で停滞し、2回目のパスで入力される
        let prompter = Arc::new(ScriptedPrompter::with_replies([
            InputReply::Cancelled,
            InputReply::Text("asha@example.com".to_string()),
        ]));
        let observer = Arc::new(RecordingObserver::default());
        let executor = executor(Arc::new(MockOracle::new(&[])), http, prompter.clone())
            .with_observer(observer.clone());

        let result = executor.execute(&spec, "register me").await;

        assert!(result.success, "{}", result.error);
        assert_eq!(result.iterations, 2);
        assert_eq!(result.collected_params.get("email"), Some(&json!("asha@example.com")));
        assert_eq!(prompter.asked().len(), 2);
        assert!(matches!(&prompter.asked()[0], InputRequest::Value { param, .. } if param == "email"));
        assert_eq!(
            *observer.states.lock().unwrap(),
            vec![
                (WorkflowState::CollectingParameters, 0),
                (WorkflowState::CollectingParameters, 1),
                (WorkflowState::ExecutingApi, 2),
                (WorkflowState::Done, 2),
            ]
        );
    }

    #[tokio::test]
    async fn test_api_failure_is_recorded() {
        let spec = spec(json!({
            "api_name": "list_states",
            "method": "GET",
            "endpoint": "/states"
        }));
        let http = Arc::new(MockHttp::new(vec![("/states", Err(503))]));
        let executor = executor(
            Arc::new(MockOracle::new(&[])),
            http,
            Arc::new(ScriptedPrompter::default()),
        );

        let result = executor.execute(&spec, "list states").await;

        assert!(!result.success);
        assert_eq!(result.error, "HTTP 503: server error");
        assert_eq!(result.message(), "Failed to execute GET /states");
    }

    #[tokio::test]
    async fn test_api_success_false_is_failure() {
        let spec = spec(json!({
            "api_name": "list_states",
            "method": "GET",
            "endpoint": "/states"
        }));
        let http = Arc::new(MockHttp::new(vec![("/states", Ok(json!({ "success": false })))]));
        let executor = executor(
            Arc::new(MockOracle::new(&[])),
            http,
            Arc::new(ScriptedPrompter::default()),
        );

        let result = executor.execute(&spec, "list states").await;

        assert!(!result.success);
        assert_eq!(result.error, "API call failed");
    }

    #[tokio::test]
    async fn test_oracle_failure_goes_to_error_handling() {
        let spec = spec(json!({
            "api_name": "register",
            "method": "POST",
            "endpoint": "/register",
            "parameters": {
                "region": { "required": true, "default": "west" },
                "email": { "required": true }
            }
        }));
        let http = Arc::new(MockHttp::new(vec![]));
        let observer = Arc::new(RecordingObserver::default());
        let executor = executor(
            Arc::new(FailingOracle),
            http.clone(),
            Arc::new(ScriptedPrompter::default()),
        )
        .with_observer(observer.clone());

        let result = executor.execute(&spec, "register").await;

        assert!(!result.success);
        assert!(result.error.starts_with("parameter collection failed:"));
        assert_eq!(result.iterations, 1);
        assert!(http.calls().is_empty());
        // 名前順で先の email の抽出で失敗するため、region には到達していない
        assert!(result.collected_params.is_empty());

        let states: Vec<WorkflowState> =
            observer.states.lock().unwrap().iter().map(|(s, _)| *s).collect();
        assert_eq!(
            states,
            vec![
                WorkflowState::CollectingParameters,
                WorkflowState::HandlingError,
                WorkflowState::Done
            ]
        );
    }
}
