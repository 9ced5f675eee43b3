//! シナリオ実行エンジン
//!
//! # 責務
//!
//! - 宣言的に定義されたステップ列（[`Scenario`]）を順序立てて実行
//! - ステップ間で共有する実行コンテキストの管理
//! - ユーザー入出力チャネルの抽象化
//! - 固定間隔・回数上限付きのリトライ
//!
//! # モジュール構成
//!
//! - [`step`][]: シナリオとステップ（Output / Input / Action）の定義
//! - [`context`][]: ステップ間で共有する実行コンテキスト
//! - [`io`][]: ユーザー入出力チャネル
//! - [`runner`][]: シナリオランナー本体
//! - [`result`][]: 実行結果型と実行エラー
//! - [`retry`][]: リトライ
//!
//! # 使用例
//!
//! ```rust
//! use melted_scenario::engine::{ActionOutcome, Scenario, ScenarioRunner, ScriptedIo};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // 1. シナリオを組み立てる
//!     let scenario = Scenario::builder("example")
//!         .header("introduction", "Welcome!")
//!         .action_fn("writeX", |ctx| {
//!             ctx.insert("x", 5);
//!             Ok(ActionOutcome::Continue)
//!         })
//!         .output_fn("showX", |ctx| Ok(Some(format!("Value is {}", ctx.get_as::<i64>("x")?))))
//!         .build();
//!
//!     // 2. ランナーを生成して実行
//!     let mut runner = ScenarioRunner::new(ScriptedIo::default());
//!     let report = runner.run(&scenario).await?;
//!
//!     // 3. 結果を確認
//!     assert!(report.is_completed());
//!     assert_eq!(runner.io().output_texts(), vec!["Welcome!", "Value is 5"]);
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod io;
pub mod result;
pub mod retry;
pub mod runner;
pub mod step;

// 公開APIの再エクスポート
pub use context::ExecutionContext;
pub use io::{ScenarioIo, ScriptedIo, TerminalIo};
pub use result::{RunReport, RunState, ScenarioError, StepRecord, StepStatus, Termination};
pub use retry::{RetryPolicy, retry};
pub use runner::ScenarioRunner;
pub use step::{
    AbortReason, ActionHandler, ActionOutcome, InputKind, InputOptions, Message, OutputOptions, Scenario,
    ScenarioBuilder, Step, StepKind,
};
