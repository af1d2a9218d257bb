//! エージェント（ルーティング → 実行 → 応答生成）
//!
//! 1つの依頼文を受け取り、ワークフローを選び、状態機械で実行し、
//! 結果を利用者向けの文章にして返します。

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::{AppSettings, WorkflowCatalog};
use crate::engine::{ApiExecutor, ParameterResolver, WorkflowExecutor};
use crate::error::AgentError;
use crate::fetcher::OptionFetcher;
use crate::observe::{Observer, TracingObserver};
use crate::prompt::UserPrompter;
use crate::provider::{TextOracle, create_oracle};
use crate::render::ResponseRenderer;
use crate::router::WorkflowRouter;
use crate::transport::{HttpApiClient, HttpExecutor};

/// ワークフローが選べなかったときの応答
pub const NO_MATCH_MESSAGE: &str =
    "I couldn't find a matching workflow for your request. Please try rephrasing.";

pub struct Agent {
    catalog: WorkflowCatalog,
    router: WorkflowRouter,
    executor: WorkflowExecutor,
    renderer: ResponseRenderer,
}

impl Agent {
    /// 協調オブジェクトを指定して組み立てる
    pub fn new(
        catalog: WorkflowCatalog,
        oracle: Arc<dyn TextOracle>,
        http: Arc<dyn HttpExecutor>,
        prompter: Arc<dyn UserPrompter>,
        settings: &AppSettings,
    ) -> Self {
        let observer: Arc<dyn Observer> = Arc::new(TracingObserver);

        let resolver = ParameterResolver::new(
            oracle.clone(),
            OptionFetcher::new(http.clone()),
            prompter,
        )
        .with_observer(observer.clone())
        .with_max_rounds(settings.engine.max_rounds as usize);

        let executor = WorkflowExecutor::new(resolver, ApiExecutor::new(http))
            .with_observer(observer)
            .with_max_iterations(settings.engine.max_iterations);

        Self {
            catalog,
            router: WorkflowRouter::new(oracle.clone()),
            executor,
            renderer: ResponseRenderer::new(oracle),
        }
    }

    /// 設定ファイルの内容から組み立てる
    ///
    /// # エラー
    ///
    /// - [`AgentError::Config`] - ワークフロー定義ディレクトリが読めない
    /// - [`AgentError::Provider`] - オラクルを生成できない（API キー未設定など）
    /// - [`AgentError::Transport`] - HTTP クライアントを生成できない
    pub fn from_settings(
        settings: &AppSettings,
        prompter: Arc<dyn UserPrompter>,
    ) -> Result<Self, AgentError> {
        settings.validate()?;
        let catalog = WorkflowCatalog::load_dir(&settings.workflows_dir)?;
        info!(count = catalog.len(), dir = %settings.workflows_dir.display(), "loaded workflow catalog");

        let oracle = create_oracle(&settings.llm)?;
        let http = Arc::new(HttpApiClient::new(
            settings.api.base_url.clone(),
            Duration::from_secs(settings.api.timeout_secs),
        )?);

        Ok(Self::new(catalog, oracle, http, prompter, settings))
    }

    pub fn catalog(&self) -> &WorkflowCatalog {
        &self.catalog
    }

    /// 依頼文を処理して応答文を返す
    pub async fn process_request(&self, user_input: &str) -> String {
        let decision = match self.router.route(user_input, &self.catalog).await {
            Ok(Some(decision)) => decision,
            Ok(None) => return NO_MATCH_MESSAGE.to_string(),
            Err(e) => return format!("Error: {e}"),
        };

        let Some(spec) = self.catalog.get(&decision.workflow) else {
            return NO_MATCH_MESSAGE.to_string();
        };
        info!(
            workflow = spec.api_name(),
            method = %spec.method(),
            endpoint = spec.endpoint(),
            confidence = decision.confidence,
            "selected workflow"
        );

        let result = self.executor.execute(spec, user_input).await;
        self.renderer.render(&result).await
    }
}
