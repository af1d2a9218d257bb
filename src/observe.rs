//! 実行の観測（オブザーバー）
//!
//! 解決エンジンと状態機械は、グローバルなフラグではなく明示的に渡された
//! [`Observer`] に進捗を通知します。既定は何もしない [`NoopObserver`] で、
//! [`TracingObserver`] は各通知を `tracing` のイベントとして出力します。

use tracing::{debug, info, warn};

use crate::config::HttpMethod;
use crate::engine::{ResolutionSource, WorkflowState};
use crate::prompt::InputRequest;

/// 実行イベントの通知先
///
/// すべてのメソッドは既定で何もしません。必要なものだけ実装してください。
pub trait Observer: Send + Sync {
    /// 解決ラウンドの開始（1 始まり）
    fn round_started(&self, _workflow: &str, _round: usize) {}

    fn parameter_resolved(&self, _name: &str, _source: ResolutionSource) {}

    fn options_fetched(&self, _name: &str, _count: usize) {}

    fn input_requested(&self, _request: &InputRequest) {}

    /// 状態機械が `state` に入った
    fn state_entered(&self, _workflow: &str, _state: WorkflowState, _iteration: u32) {}

    fn api_finished(&self, _method: HttpMethod, _endpoint: &str, _success: bool) {}
}

/// 何もしないオブザーバー
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl Observer for NoopObserver {}

/// `tracing` に出力するオブザーバー
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn round_started(&self, workflow: &str, round: usize) {
        debug!(workflow, round, "resolution round started");
    }

    fn parameter_resolved(&self, name: &str, source: ResolutionSource) {
        info!(param = name, ?source, "parameter resolved");
    }

    fn options_fetched(&self, name: &str, count: usize) {
        debug!(param = name, count, "dependent options fetched");
    }

    fn input_requested(&self, request: &InputRequest) {
        debug!(param = request.param(), "waiting for user input");
    }

    fn state_entered(&self, workflow: &str, state: WorkflowState, iteration: u32) {
        info!(workflow, ?state, iteration, "state transition");
    }

    fn api_finished(&self, method: HttpMethod, endpoint: &str, success: bool) {
        if success {
            info!(%method, endpoint, "API call succeeded");
        } else {
            warn!(%method, endpoint, "API call failed");
        }
    }
}
