//! シナリオランナー
//!
//! # 責務
//!
//! このモジュールは、シナリオを1ステップずつ順に実行する [`ScenarioRunner`] を提供します。
//!
//! # 実行フロー
//!
//! 1. 空の [`ExecutionContext`] を生成
//! 2. 各ステップを種類ごとの規約で実行
//!    - Output: メッセージを評価し、`None` でなければ表示
//!    - Input: プロンプトを評価し、`None` でなければ入力を求め、変換してステップ名で書き込む
//!    - Action: ハンドラーを実行し、中断要求を確認
//! 3. 最後のステップの後に `Completed`、中断時は `Terminated(Aborted)` の結果を返す
//!
//! ステップの失敗は捕捉せず、[`ScenarioError::StepFailed`] としてそのまま返します。
//! 自動リトライ、ロールバック、作成済みリソースの後始末は行いません。
//!
//! # 使用例
//!
//! ```rust
//! use melted_scenario::engine::io::ScriptedIo;
//! use melted_scenario::engine::runner::ScenarioRunner;
//! use melted_scenario::engine::step::{ActionOutcome, Scenario};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let scenario = Scenario::builder("example")
//!     .confirm("confirmDeployment", "Continue?")
//!     .action_fn("handleConfirmDeployment", |ctx| {
//!         Ok(if ctx.get_bool("confirmDeployment") == Some(false) {
//!             ActionOutcome::declined("confirmDeployment")
//!         } else {
//!             ActionOutcome::Continue
//!         })
//!     })
//!     .build();
//!
//! let mut runner = ScenarioRunner::new(ScriptedIo::new(["y"]));
//! let report = runner.run(&scenario).await?;
//! assert!(report.is_completed());
//! # Ok(())
//! # }
//! ```

use crate::engine::context::ExecutionContext;
use crate::engine::io::ScenarioIo;
use crate::engine::result::{RunReport, RunState, ScenarioError, StepRecord, StepStatus, Termination};
use crate::engine::step::{AbortReason, ActionOutcome, InputKind, Scenario, Step};
use crate::error::StepError;
use serde_json::Value;
use std::time::Instant;
use tracing::{Instrument, error, info, info_span, warn};

/// 1ステップの実行結果（ランナー内部用）
enum StepOutcome {
    Continue(StepStatus),
    Abort(AbortReason),
}

/// シナリオランナー
///
/// 入出力チャネルを所有し、シナリオを逐次実行します。
/// 同じランナーで複数回実行できますが、実行ごとにコンテキストは新しく作られます。
pub struct ScenarioRunner<I: ScenarioIo> {
    io: I,
    state: RunState,
}

impl<I: ScenarioIo> ScenarioRunner<I> {
    /// 入出力チャネルを指定して生成
    pub fn new(io: I) -> Self {
        Self {
            io,
            state: RunState::NotStarted,
        }
    }

    /// 現在（または直前の実行の最終）状態
    ///
    /// 失敗で終了した場合も `Terminated(Failed)` として参照できます。
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// 入出力チャネルへの参照
    pub fn io(&self) -> &I {
        &self.io
    }

    /// 入出力チャネルを取り出す
    pub fn into_io(self) -> I {
        self.io
    }

    /// シナリオを実行
    ///
    /// # 戻り値
    ///
    /// - `Ok(RunReport)`: 完了、または Action による中断
    /// - `Err(ScenarioError::StepFailed)`: いずれかのステップが失敗
    pub async fn run(&mut self, scenario: &Scenario) -> Result<RunReport, ScenarioError> {
        let started = Instant::now();
        let mut context = ExecutionContext::new();
        let mut records = Vec::with_capacity(scenario.steps().len());

        for name in scenario.duplicate_names() {
            warn!(step = name, "ステップ名が重複しています。コンテキストの値は上書きされます");
        }
        info!(scenario = scenario.name(), steps = scenario.steps().len(), "シナリオを開始します");

        for (index, step) in scenario.steps().iter().enumerate() {
            self.state = RunState::Running(index);

            let span = info_span!("step", index, name = step.name(), kind = %step.kind());
            let step_started = Instant::now();
            let outcome = self.execute_step(step, &mut context).instrument(span).await;
            let duration = step_started.elapsed();

            let record = |status| StepRecord {
                name: step.name().to_string(),
                index,
                kind: step.kind(),
                status,
                duration,
            };

            match outcome {
                Ok(StepOutcome::Continue(status)) => records.push(record(status)),
                Ok(StepOutcome::Abort(cause)) => {
                    records.push(record(StepStatus::Aborted));
                    info!(scenario = scenario.name(), step = step.name(), %cause, "シナリオを中断しました");
                    self.state = RunState::Terminated(Termination::Aborted { cause });
                    return Ok(self.report(scenario, records, context, started));
                }
                Err(source) => {
                    error!(scenario = scenario.name(), step = step.name(), index, error = %source, "ステップが失敗しました");
                    self.state = RunState::Terminated(Termination::Failed {
                        step: step.name().to_string(),
                        index,
                        message: source.to_string(),
                    });
                    return Err(ScenarioError::StepFailed {
                        step: step.name().to_string(),
                        index,
                        source,
                    });
                }
            }
        }

        self.state = RunState::Completed;
        info!(scenario = scenario.name(), elapsed_ms = started.elapsed().as_millis() as u64, "シナリオが完了しました");
        Ok(self.report(scenario, records, context, started))
    }

    fn report(
        &self,
        scenario: &Scenario,
        steps: Vec<StepRecord>,
        context: ExecutionContext,
        started: Instant,
    ) -> RunReport {
        RunReport {
            scenario_name: scenario.name().to_string(),
            state: self.state.clone(),
            steps,
            context,
            total_duration: started.elapsed(),
        }
    }

    async fn execute_step(&mut self, step: &Step, ctx: &mut ExecutionContext) -> Result<StepOutcome, StepError> {
        match step {
            Step::Output { message, options, .. } => match message.evaluate(ctx)? {
                Some(text) => {
                    self.io.write_output(&text, options.header).await?;
                    Ok(StepOutcome::Continue(StepStatus::Completed))
                }
                None => Ok(StepOutcome::Continue(StepStatus::Suppressed)),
            },
            Step::Input { name, prompt, options } => match prompt.evaluate(ctx)? {
                Some(text) => {
                    let value = self.solicit(name, &text, options.kind).await?;
                    ctx.insert(name.clone(), value);
                    Ok(StepOutcome::Continue(StepStatus::Completed))
                }
                None => Ok(StepOutcome::Continue(StepStatus::Suppressed)),
            },
            Step::Action { handler, .. } => match handler.run(ctx).await? {
                ActionOutcome::Continue => Ok(StepOutcome::Continue(StepStatus::Completed)),
                ActionOutcome::Abort(reason) => Ok(StepOutcome::Abort(reason)),
            },
        }
    }

    /// 変換できる回答が得られるまで入力を求める
    async fn solicit(&mut self, name: &str, prompt: &str, kind: InputKind) -> Result<Value, StepError> {
        loop {
            let Some(raw) = self.io.read_line(prompt, kind).await? else {
                return Err(StepError::InputClosed { step: name.to_string() });
            };
            match coerce_input(kind, &raw) {
                Some(value) => return Ok(value),
                None => {
                    self.io
                        .write_output(&invalid_answer_notice(kind, &raw), false)
                        .await?;
                }
            }
        }
    }
}

/// 入力文字列を種類に応じた値に変換する
///
/// 変換できない場合は `None` を返します。
pub fn coerce_input(kind: InputKind, raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    match kind {
        InputKind::Confirm => match trimmed.to_ascii_lowercase().as_str() {
            "y" | "yes" | "true" | "1" => Some(Value::Bool(true)),
            "" | "n" | "no" | "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        InputKind::Text => Some(Value::String(trimmed.to_string())),
        InputKind::Number => {
            if let Ok(int) = trimmed.parse::<i64>() {
                return Some(Value::from(int));
            }
            trimmed
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
        }
    }
}

fn invalid_answer_notice(kind: InputKind, raw: &str) -> String {
    match kind {
        InputKind::Confirm => format!("無効な回答です: '{raw}'（y または n で答えてください）"),
        InputKind::Number => format!("無効な回答です: '{raw}'（数値を入力してください）"),
        InputKind::Text => format!("無効な回答です: '{raw}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::io::ScriptedIo;
    use crate::engine::step::{InputOptions, Message};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 呼び出し回数を数えるだけのハンドラー
    struct CountingAction(Arc<AtomicUsize>);

    #[async_trait]
    impl crate::engine::step::ActionHandler for CountingAction {
        async fn run(&self, _ctx: &mut ExecutionContext) -> Result<ActionOutcome, StepError> {
            tokio::task::yield_now().await;
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(ActionOutcome::Continue)
        }
    }

    #[test]
    fn test_coerce_confirm() {
        for yes in ["y", "Y", "yes", " YES ", "true", "1"] {
            assert_eq!(coerce_input(InputKind::Confirm, yes), Some(json!(true)), "{yes}");
        }
        for no in ["", "n", "No", "false", "0"] {
            assert_eq!(coerce_input(InputKind::Confirm, no), Some(json!(false)), "{no}");
        }
        assert_eq!(coerce_input(InputKind::Confirm, "maybe"), None);
    }

    #[test]
    fn test_coerce_text_and_number() {
        assert_eq!(coerce_input(InputKind::Text, "  hello "), Some(json!("hello")));
        assert_eq!(coerce_input(InputKind::Number, "42"), Some(json!(42)));
        assert_eq!(coerce_input(InputKind::Number, "2.5"), Some(json!(2.5)));
        assert_eq!(coerce_input(InputKind::Number, "NaN"), None);
        assert_eq!(coerce_input(InputKind::Number, "abc"), None);
    }

    #[tokio::test]
    async fn test_new_runner_not_started() {
        let runner = ScenarioRunner::new(ScriptedIo::default());
        assert_eq!(runner.state(), &RunState::NotStarted);
    }

    #[tokio::test]
    async fn test_empty_scenario_completes() {
        let mut runner = ScenarioRunner::new(ScriptedIo::default());
        let report = runner.run(&Scenario::new("empty", Vec::new())).await.unwrap();

        assert!(report.is_completed());
        assert!(report.steps.is_empty());
        assert_eq!(runner.state(), &RunState::Completed);
    }

    #[tokio::test]
    async fn test_header_option_is_passed_through() {
        let scenario = Scenario::builder("headers")
            .header("introduction", "Welcome")
            .output("plain", "Body")
            .build();
        let mut runner = ScenarioRunner::new(ScriptedIo::default());

        runner.run(&scenario).await.unwrap();

        let outputs = runner.io().outputs();
        assert!(outputs[0].header);
        assert!(!outputs[1].header);
    }

    #[tokio::test]
    async fn test_suppressed_output_renders_nothing() {
        let scenario = Scenario::builder("suppressed")
            .output_fn("hidden", |_| Ok(None))
            .output("shown", "visible")
            .build();
        let mut runner = ScenarioRunner::new(ScriptedIo::default());

        let report = runner.run(&scenario).await.unwrap();

        assert_eq!(runner.io().output_texts(), vec!["visible"]);
        assert_eq!(report.steps[0].status, StepStatus::Suppressed);
        assert_eq!(report.steps[1].status, StepStatus::Completed);
    }

    #[tokio::test]
    async fn test_empty_output_renders_nothing() {
        let scenario = Scenario::builder("empty-output")
            .output("constEmpty", "")
            .output_fn("fnEmpty", |_| Ok(Some(String::new())))
            .build();
        let mut runner = ScenarioRunner::new(ScriptedIo::default());

        let report = runner.run(&scenario).await.unwrap();

        assert!(runner.io().outputs().is_empty());
        assert_eq!(report.steps[0].status, StepStatus::Suppressed);
        assert_eq!(report.steps[1].status, StepStatus::Suppressed);
    }

    #[tokio::test]
    async fn test_empty_prompt_skips_input() {
        let scenario = Scenario::builder("empty-prompt")
            .input("owner", "", InputOptions::default())
            .build();
        let mut runner = ScenarioRunner::new(ScriptedIo::new(["alice"]));

        let report = runner.run(&scenario).await.unwrap();

        assert!(runner.io().prompts().is_empty());
        assert!(!report.context.contains_key("owner"));
    }

    #[tokio::test]
    async fn test_skipped_input_neither_reads_nor_writes() {
        let scenario = Scenario::builder("skip")
            .input("shouldAddInboundRule", Message::computed(|_| Ok(None)), InputOptions::confirm())
            .build();
        let mut runner = ScenarioRunner::new(ScriptedIo::new(["y"]));

        let report = runner.run(&scenario).await.unwrap();

        assert!(runner.io().prompts().is_empty());
        assert_eq!(runner.io().remaining_answers(), 1);
        assert!(!report.context.contains_key("shouldAddInboundRule"));
        assert_eq!(report.steps[0].status, StepStatus::Suppressed);
    }

    #[tokio::test]
    async fn test_input_written_under_step_name() {
        let scenario = Scenario::builder("inputs")
            .confirm("confirmDeployment", "Continue?")
            .input("instanceCount", "How many?", InputOptions { kind: InputKind::Number })
            .input("owner", "Who?", InputOptions::default())
            .build();
        let mut runner = ScenarioRunner::new(ScriptedIo::new(["yes", "3", " alice "]));

        let report = runner.run(&scenario).await.unwrap();

        assert_eq!(report.context.get_bool("confirmDeployment"), Some(true));
        assert_eq!(report.context.get_as::<i64>("instanceCount").unwrap(), 3);
        assert_eq!(report.context.require_str("owner").unwrap(), "alice");
    }

    #[tokio::test]
    async fn test_invalid_confirm_is_reprompted() {
        let scenario = Scenario::builder("reprompt").confirm("confirmContinue", "Continue?").build();
        let mut runner = ScenarioRunner::new(ScriptedIo::new(["maybe", "n"]));

        let report = runner.run(&scenario).await.unwrap();

        assert_eq!(report.context.get_bool("confirmContinue"), Some(false));
        assert_eq!(runner.io().prompts().len(), 2);
        assert_eq!(runner.io().outputs().len(), 1);
    }

    #[tokio::test]
    async fn test_closed_input_fails_step() {
        let scenario = Scenario::builder("closed")
            .output("before", "hello")
            .confirm("confirmDeployment", "Continue?")
            .build();
        let mut runner = ScenarioRunner::new(ScriptedIo::default());

        let err = runner.run(&scenario).await.unwrap_err();

        assert!(matches!(
            err,
            ScenarioError::StepFailed { ref step, index: 1, source: StepError::InputClosed { .. } }
                if step == "confirmDeployment"
        ));
        assert!(matches!(
            runner.state(),
            RunState::Terminated(Termination::Failed { index: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_failing_output_function_terminates_run() {
        let counter = Arc::new(AtomicUsize::new(0));
        let scenario = Scenario::builder("missing")
            .output_fn("gotVpc", |ctx| Ok(Some(ctx.require_str("defaultVpc")?.to_string())))
            .action("after", CountingAction(counter.clone()))
            .build();
        let mut runner = ScenarioRunner::new(ScriptedIo::default());

        let err = runner.run(&scenario).await.unwrap_err();

        assert!(matches!(err, ScenarioError::StepFailed { index: 0, source: StepError::Context(_), .. }));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_actions_run_sequentially_in_order() {
        let counter = Arc::new(AtomicUsize::new(0));
        let scenario = Scenario::builder("ordered")
            .action("first", CountingAction(counter.clone()))
            .action_fn("check", {
                let counter = counter.clone();
                move |ctx| {
                    ctx.insert("seen", counter.load(Ordering::SeqCst) as u64);
                    Ok(ActionOutcome::Continue)
                }
            })
            .action("second", CountingAction(counter.clone()))
            .build();
        let mut runner = ScenarioRunner::new(ScriptedIo::default());

        let report = runner.run(&scenario).await.unwrap();

        assert_eq!(report.context.get_as::<u64>("seen").unwrap(), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(report.executed_step_names(), vec!["first", "check", "second"]);
    }

    #[tokio::test]
    async fn test_runner_can_be_reused_with_fresh_context() {
        let scenario = Scenario::builder("reuse")
            .action_fn("assertEmpty", |ctx| {
                if ctx.contains_key("x") {
                    return Err(StepError::Failed("前回の値が残っています".to_string()));
                }
                ctx.insert("x", 1);
                Ok(ActionOutcome::Continue)
            })
            .build();
        let mut runner = ScenarioRunner::new(ScriptedIo::default());

        assert!(runner.run(&scenario).await.unwrap().is_completed());
        assert!(runner.run(&scenario).await.unwrap().is_completed());
    }
}
