//! API Workflow Agent
//!
//! 自由文の依頼を REST API 呼び出しに変換するエージェントです。
//! ワークフロー定義（JSON）が宣言するパラメータを、依頼文からの抽出・
//! 依存 API の選択肢・ユーザーへの問い合わせで埋めてから API を呼び出します。
//!
//! # モジュール構成
//!
//! - [`config`][]: ワークフロー定義とアプリケーション設定
//! - [`extract`][]: JSON パス式による値と選択肢の抽出
//! - [`fetcher`][]: 依存パラメータの選択肢取得
//! - [`engine`][]: パラメータ解決エンジンと実行状態機械
//! - [`router`][]: 依頼文からのワークフロー選択
//! - [`render`][]: 実行結果の文章化
//! - [`agent`][]: 上記をまとめたファサード
//! - [`provider`][] / [`transport`][] / [`prompt`][]: オラクル・HTTP・ユーザー入力の協調オブジェクト
//! - [`observe`][]: 実行イベントの通知

pub mod agent;
pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod observe;
pub mod prompt;
pub mod provider;
pub mod render;
pub mod router;
pub mod transport;
