//! ユーザーへの問い合わせ（human-in-the-loop）
//!
//! # 責務
//!
//! 解決エンジンは標準入力を直接読みません。人の判断が必要になると
//! [`InputRequest`] を組み立てて [`UserPrompter`] に渡し、[`InputReply`] を待ちます。
//! どう答えを得るかはフロントエンド側の実装が決めます。
//!
//! - [`ConsolePrompter`]: 端末での対話（Ctrl-C / EOF は [`InputReply::Cancelled`]）
//! - [`ScriptedPrompter`]: あらかじめ用意した回答を順に返す（バッチ実行・テスト用）
//! - [`NonInteractive`]: 常に [`InputReply::Cancelled`]

use std::collections::VecDeque;
use std::future::Future;
use std::io::Write;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};

use crate::extract::Choice;

/// エンジンからの入力要求
#[derive(Debug, Clone, PartialEq)]
pub enum InputRequest {
    /// パラメータ値をそのまま入力してもらう
    Value { param: String, param_type: String },
    /// 選択肢から1つ選んでもらう（回答は 1 始まりの番号）
    Choice {
        param: String,
        options: Vec<Choice>,
        /// 直前の回答が不正だった場合の案内
        notice: Option<String>,
    },
}

impl InputRequest {
    pub fn param(&self) -> &str {
        match self {
            InputRequest::Value { param, .. } | InputRequest::Choice { param, .. } => param,
        }
    }
}

/// 入力要求への回答
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputReply {
    Text(String),
    /// 中断（Ctrl-C、入力終了など）
    Cancelled,
}

#[async_trait]
pub trait UserPrompter: Send + Sync {
    async fn ask(&self, request: &InputRequest) -> InputReply;
}

/// 端末で対話するプロンプター
pub struct ConsolePrompter {
    stdin: tokio::sync::Mutex<BufReader<Stdin>>,
}

impl ConsolePrompter {
    pub fn new() -> Self {
        Self {
            stdin: tokio::sync::Mutex::new(BufReader::new(tokio::io::stdin())),
        }
    }

    /// 1行読む。Ctrl-C・EOF・読み込みエラーは `None`
    ///
    /// Ctrl-C の時点で入力途中だった文字は捨てられ、次の呼び出しは新しい行から読みます。
    pub async fn read_line(&self, prompt: &str) -> Option<String> {
        print!("{prompt}");
        let _ = std::io::stdout().flush();

        let mut stdin = self.stdin.lock().await;
        let line = read_line_until(&mut *stdin, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;
        if line.is_none() {
            println!();
        }
        line
    }
}

/// `cancel` が完了するまでに1行読めれば、前後の空白を除いて返す
///
/// `read_line` は select で中断されると読み取り済みのバイトが失われ、バッファの中身も
/// 保証されないため、自前のバッファに `read_until` で読みます。中断時はそのバッファごと捨てます。
async fn read_line_until<R, F>(reader: &mut R, cancel: F) -> Option<String>
where
    R: AsyncBufRead + Unpin,
    F: Future<Output = ()>,
{
    let mut buf = Vec::new();
    tokio::select! {
        read = reader.read_until(b'\n', &mut buf) => match read {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(String::from_utf8_lossy(&buf).trim().to_string()),
        },
        _ = cancel => None,
    }
}

impl Default for ConsolePrompter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserPrompter for ConsolePrompter {
    async fn ask(&self, request: &InputRequest) -> InputReply {
        let line = match request {
            InputRequest::Value { param, param_type } => {
                println!("\n❓ Please provide {param} (type: {param_type}):");
                self.read_line(&format!("{param}: ")).await
            }
            InputRequest::Choice {
                param,
                options,
                notice,
            } => {
                match notice {
                    Some(notice) => println!("   ⚠️  {notice}"),
                    None => {
                        println!("\n📋 Please select {param}:");
                        for (i, option) in options.iter().enumerate() {
                            println!("  {}. {}", i + 1, option.label);
                        }
                    }
                }
                self.read_line(&format!("Enter choice (1-{}): ", options.len()))
                    .await
            }
        };

        line.map(InputReply::Text).unwrap_or(InputReply::Cancelled)
    }
}

/// 用意した回答を順に返すプロンプター
///
/// 回答が尽きると [`InputReply::Cancelled`] を返します。
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    replies: Mutex<VecDeque<InputReply>>,
    asked: Mutex<Vec<InputRequest>>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_replies(answers.into_iter().map(|a| InputReply::Text(a.into())))
    }

    pub fn with_replies(replies: impl IntoIterator<Item = InputReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// これまでに受け取った入力要求
    pub fn asked(&self) -> Vec<InputRequest> {
        self.asked.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl UserPrompter for ScriptedPrompter {
    async fn ask(&self, request: &InputRequest) -> InputReply {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(request.clone());
        }
        self.replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.pop_front())
            .unwrap_or(InputReply::Cancelled)
    }
}

/// 人に問い合わせないプロンプター
#[derive(Debug, Default, Clone, Copy)]
pub struct NonInteractive;

#[async_trait]
impl UserPrompter for NonInteractive {
    async fn ask(&self, _request: &InputRequest) -> InputReply {
        InputReply::Cancelled
    }
}
