//! シナリオとステップの定義
//!
//! # 責務
//!
//! - シナリオを構成する [`Step`]（Output / Input / Action）の定義
//! - 「定数または関数」で表されるメッセージ・プロンプト（[`Message`]）
//! - Action ステップのハンドラー（[`ActionHandler`]）と、その結果（[`ActionOutcome`]）
//! - 名前付きのステップ列 [`Scenario`] と、そのビルダー [`ScenarioBuilder`]
//!
//! # 使用例
//!
//! ```rust
//! use melted_scenario::engine::step::{ActionOutcome, Scenario};
//!
//! let scenario = Scenario::builder("example")
//!     .expects("x", "最初のアクションが書き込む値")
//!     .action_fn("writeX", |ctx| {
//!         ctx.insert("x", 5);
//!         Ok(ActionOutcome::Continue)
//!     })
//!     .output_fn("showX", |ctx| Ok(Some(format!("Value is {}", ctx.get_as::<i64>("x")?))))
//!     .build();
//!
//! assert_eq!(scenario.steps().len(), 2);
//! ```

use async_trait::async_trait;
use crate::engine::context::ExecutionContext;
use crate::error::StepError;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// コンテキストからメッセージを計算する関数
///
/// `Ok(None)` と空文字列は「何も表示しない／入力を求めない」ことを意味します。
pub type MessageFn = dyn Fn(&ExecutionContext) -> Result<Option<String>, StepError> + Send + Sync;

/// 定数、またはコンテキストの関数として表されるメッセージ
#[derive(Clone)]
pub enum Message {
    /// 定数のテキスト
    Text(String),
    /// 実行時にコンテキストから計算するテキスト
    Computed(Arc<MessageFn>),
}

/// Input ステップのプロンプト（表現は [`Message`] と同じ）
pub type Prompt = Message;

impl Message {
    /// 関数からメッセージを生成
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&ExecutionContext) -> Result<Option<String>, StepError> + Send + Sync + 'static,
    {
        Self::Computed(Arc::new(f))
    }

    /// メッセージを評価する
    ///
    /// 空文字列は定数・関数のどちらでも `None` として扱います。
    pub fn evaluate(&self, ctx: &ExecutionContext) -> Result<Option<String>, StepError> {
        let text = match self {
            Self::Text(text) => Some(text.clone()),
            Self::Computed(f) => f(ctx)?,
        };
        Ok(text.filter(|t| !t.is_empty()))
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Output ステップのオプション
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputOptions {
    /// 見出しとして装飾して表示する
    pub header: bool,
}

/// Input ステップが受け付ける値の種類
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    /// はい／いいえ（真偽値に変換）
    Confirm,
    /// 自由入力の文字列
    #[default]
    Text,
    /// 数値
    Number,
}

/// Input ステップのオプション
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputOptions {
    /// 入力値の種類
    pub kind: InputKind,
}

impl InputOptions {
    /// 確認（はい／いいえ）入力
    pub fn confirm() -> Self {
        Self {
            kind: InputKind::Confirm,
        }
    }
}

/// シナリオの中断理由
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AbortReason {
    /// 確認ゲートでユーザーが続行を拒否した
    UserDeclined {
        /// 拒否された確認ステップの名前
        gate: String,
    },
    /// ハンドラーが任意の理由で中断を要求した
    Requested {
        /// 中断理由
        message: String,
    },
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserDeclined { gate } => write!(f, "ユーザーが '{gate}' で続行を拒否しました"),
            Self::Requested { message } => write!(f, "中断が要求されました: {message}"),
        }
    }
}

/// Action ステップの実行結果
///
/// 戻り値そのものはランナーに無視されます。ハンドラーはコンテキストへの書き込みで
/// 結果を伝え、中断したい場合にだけ [`ActionOutcome::Abort`] を返します。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// 次のステップへ進む
    Continue,
    /// シナリオを秩序立てて終了する（エラーではない）
    Abort(AbortReason),
}

impl ActionOutcome {
    /// 確認ゲートでの拒否による中断
    pub fn declined(gate: impl Into<String>) -> Self {
        Self::Abort(AbortReason::UserDeclined { gate: gate.into() })
    }

    /// 任意の理由による中断
    pub fn abort(message: impl Into<String>) -> Self {
        Self::Abort(AbortReason::Requested {
            message: message.into(),
        })
    }
}

/// Action ステップのハンドラー
///
/// 外部コラボレーター（クラウド操作やネットワーク疎通確認）を呼び出し、
/// 結果をコンテキストに書き込みます。再試行したい呼び出しは
/// ハンドラー自身が [`retry`](crate::engine::retry::retry) で包みます。
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// ハンドラーを実行する
    ///
    /// # 戻り値
    ///
    /// - `Ok(ActionOutcome::Continue)`: 次のステップへ
    /// - `Ok(ActionOutcome::Abort(_))`: シナリオを中断
    /// - `Err(StepError)`: シナリオを失敗として終了（ランナーは捕捉しない）
    async fn run(&self, ctx: &mut ExecutionContext) -> Result<ActionOutcome, StepError>;
}

/// 同期クロージャーを [`ActionHandler`] として扱うアダプター
struct FnAction<F>(F);

#[async_trait]
impl<F> ActionHandler for FnAction<F>
where
    F: Fn(&mut ExecutionContext) -> Result<ActionOutcome, StepError> + Send + Sync,
{
    async fn run(&self, ctx: &mut ExecutionContext) -> Result<ActionOutcome, StepError> {
        (self.0)(ctx)
    }
}

/// ステップの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StepKind {
    /// 表示
    Output,
    /// 入力
    Input,
    /// 処理
    Action,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Output => "output",
            Self::Input => "input",
            Self::Action => "action",
        };
        f.write_str(label)
    }
}

/// シナリオを構成する1つのステップ
#[derive(Clone)]
pub enum Step {
    /// メッセージを表示する。コンテキストは変更しない
    Output {
        /// ステップ名
        name: String,
        /// 表示するメッセージ
        message: Message,
        /// 表示オプション
        options: OutputOptions,
    },
    /// ユーザー入力を求め、変換した値をステップ名のキーでコンテキストに書き込む
    Input {
        /// ステップ名（コンテキストのキーを兼ねる）
        name: String,
        /// プロンプト
        prompt: Prompt,
        /// 入力オプション
        options: InputOptions,
    },
    /// ハンドラーを実行する
    Action {
        /// ステップ名
        name: String,
        /// ハンドラー
        handler: Arc<dyn ActionHandler>,
    },
}

impl Step {
    /// Output ステップ
    pub fn output(name: impl Into<String>, message: impl Into<Message>) -> Self {
        Self::Output {
            name: name.into(),
            message: message.into(),
            options: OutputOptions::default(),
        }
    }

    /// 見出し付きの Output ステップ
    pub fn header(name: impl Into<String>, message: impl Into<Message>) -> Self {
        Self::Output {
            name: name.into(),
            message: message.into(),
            options: OutputOptions { header: true },
        }
    }

    /// Input ステップ
    pub fn input(name: impl Into<String>, prompt: impl Into<Prompt>, options: InputOptions) -> Self {
        Self::Input {
            name: name.into(),
            prompt: prompt.into(),
            options,
        }
    }

    /// 確認（はい／いいえ）の Input ステップ
    pub fn confirm(name: impl Into<String>, prompt: impl Into<Prompt>) -> Self {
        Self::input(name, prompt, InputOptions::confirm())
    }

    /// Action ステップ
    pub fn action(name: impl Into<String>, handler: impl ActionHandler + 'static) -> Self {
        Self::Action {
            name: name.into(),
            handler: Arc::new(handler),
        }
    }

    /// 同期クロージャーによる Action ステップ
    pub fn action_fn<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut ExecutionContext) -> Result<ActionOutcome, StepError> + Send + Sync + 'static,
    {
        Self::action(name, FnAction(f))
    }

    /// ステップ名
    pub fn name(&self) -> &str {
        match self {
            Self::Output { name, .. } | Self::Input { name, .. } | Self::Action { name, .. } => name,
        }
    }

    /// ステップの種類
    pub fn kind(&self) -> StepKind {
        match self {
            Self::Output { .. } => StepKind::Output,
            Self::Input { .. } => StepKind::Input,
            Self::Action { .. } => StepKind::Action,
        }
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Output { name, message, options } => f
                .debug_struct("Output")
                .field("name", name)
                .field("message", message)
                .field("options", options)
                .finish(),
            Self::Input { name, prompt, options } => f
                .debug_struct("Input")
                .field("name", name)
                .field("prompt", prompt)
                .field("options", options)
                .finish(),
            Self::Action { name, .. } => f.debug_struct("Action").field("name", name).finish_non_exhaustive(),
        }
    }
}

/// シナリオが読み書きするコンテキストキーの説明
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpectedKey {
    /// キー
    pub key: String,
    /// 値の意味と、書き込むステップ
    pub description: String,
}

/// 名前付きの、順序付きステップ列
#[derive(Debug, Clone)]
pub struct Scenario {
    name: String,
    steps: Vec<Step>,
    expected_keys: Vec<ExpectedKey>,
}

impl Scenario {
    /// ステップ列からシナリオを生成
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            steps,
            expected_keys: Vec::new(),
        }
    }

    /// ビルダーを生成
    pub fn builder(name: impl Into<String>) -> ScenarioBuilder {
        ScenarioBuilder {
            scenario: Self::new(name, Vec::new()),
        }
    }

    /// シナリオ名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// ステップ列
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// 宣言されたコンテキストキー
    pub fn expected_keys(&self) -> &[ExpectedKey] {
        &self.expected_keys
    }

    /// 重複しているステップ名（出現順、重複ごとに1回）
    ///
    /// ステップ名はコンテキストのキーを兼ねるため、重複は値の上書きにつながります。
    pub fn duplicate_names(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        let mut duplicates = Vec::new();
        for step in &self.steps {
            if !seen.insert(step.name()) && !duplicates.contains(&step.name()) {
                duplicates.push(step.name());
            }
        }
        duplicates
    }
}

/// [`Scenario`] のビルダー
///
/// ステップの追加に加えて、シナリオが使うコンテキストキーを
/// [`ScenarioBuilder::expects`] で事前に宣言できます（文書化とテストのため）。
#[derive(Debug)]
pub struct ScenarioBuilder {
    scenario: Scenario,
}

impl ScenarioBuilder {
    /// 任意のステップを追加
    pub fn step(mut self, step: Step) -> Self {
        self.scenario.steps.push(step);
        self
    }

    /// 複数のステップを追加
    pub fn steps(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.scenario.steps.extend(steps);
        self
    }

    /// Output ステップを追加
    pub fn output(self, name: impl Into<String>, message: impl Into<Message>) -> Self {
        self.step(Step::output(name, message))
    }

    /// コンテキストから計算する Output ステップを追加
    pub fn output_fn<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&ExecutionContext) -> Result<Option<String>, StepError> + Send + Sync + 'static,
    {
        self.step(Step::output(name, Message::computed(f)))
    }

    /// 見出し付きの Output ステップを追加
    pub fn header(self, name: impl Into<String>, message: impl Into<Message>) -> Self {
        self.step(Step::header(name, message))
    }

    /// Input ステップを追加
    pub fn input(self, name: impl Into<String>, prompt: impl Into<Prompt>, options: InputOptions) -> Self {
        self.step(Step::input(name, prompt, options))
    }

    /// 確認の Input ステップを追加
    pub fn confirm(self, name: impl Into<String>, prompt: impl Into<Prompt>) -> Self {
        self.step(Step::confirm(name, prompt))
    }

    /// Action ステップを追加
    pub fn action(self, name: impl Into<String>, handler: impl ActionHandler + 'static) -> Self {
        self.step(Step::action(name, handler))
    }

    /// 同期クロージャーの Action ステップを追加
    pub fn action_fn<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut ExecutionContext) -> Result<ActionOutcome, StepError> + Send + Sync + 'static,
    {
        self.step(Step::action_fn(name, f))
    }

    /// シナリオが使うコンテキストキーを宣言
    pub fn expects(mut self, key: impl Into<String>, description: impl Into<String>) -> Self {
        self.scenario.expected_keys.push(ExpectedKey {
            key: key.into(),
            description: description.into(),
        });
        self
    }

    /// シナリオを確定する
    pub fn build(self) -> Scenario {
        self.scenario
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_message_always_some() {
        let ctx = ExecutionContext::new();
        let message = Message::from("hello");
        assert_eq!(message.evaluate(&ctx).unwrap(), Some("hello".to_string()));
    }

    #[test]
    fn test_empty_message_is_none() {
        let ctx = ExecutionContext::new();
        assert_eq!(Message::from("").evaluate(&ctx).unwrap(), None);
        assert_eq!(Message::computed(|_| Ok(Some(String::new()))).evaluate(&ctx).unwrap(), None);
    }

    #[test]
    fn test_computed_message_reads_context() {
        let mut ctx = ExecutionContext::new();
        let message = Message::computed(|ctx| {
            Ok(ctx
                .get_bool("shouldAddInboundRule")
                .filter(|added| *added)
                .map(|_| "added".to_string()))
        });

        assert_eq!(message.evaluate(&ctx).unwrap(), None);
        ctx.insert("shouldAddInboundRule", true);
        assert_eq!(message.evaluate(&ctx).unwrap(), Some("added".to_string()));
    }

    #[test]
    fn test_computed_message_propagates_missing_key() {
        let ctx = ExecutionContext::new();
        let message = Message::computed(|ctx| Ok(Some(ctx.require_str("loadBalancerDns")?.to_string())));
        assert!(matches!(message.evaluate(&ctx), Err(StepError::Context(_))));
    }

    #[test]
    fn test_step_constructors() {
        let header = Step::header("introduction", "Welcome");
        let confirm = Step::confirm("confirmDeployment", "Continue?");
        let action = Step::action_fn("noop", |_| Ok(ActionOutcome::Continue));

        assert_eq!(header.kind(), StepKind::Output);
        assert!(matches!(header, Step::Output { options: OutputOptions { header: true }, .. }));
        assert_eq!(confirm.name(), "confirmDeployment");
        assert!(matches!(
            confirm,
            Step::Input { options: InputOptions { kind: InputKind::Confirm }, .. }
        ));
        assert_eq!(action.kind(), StepKind::Action);
        assert_eq!(format!("{:?}", action), "Action { name: \"noop\", .. }");
    }

    #[tokio::test]
    async fn test_fn_action_runs_closure() {
        let step = Step::action_fn("writeX", |ctx| {
            ctx.insert("x", 5);
            Ok(ActionOutcome::Continue)
        });
        let mut ctx = ExecutionContext::new();

        let Step::Action { handler, .. } = step else {
            panic!("Expected action step");
        };
        let outcome = handler.run(&mut ctx).await.unwrap();

        assert_eq!(outcome, ActionOutcome::Continue);
        assert_eq!(ctx.get_as::<i64>("x").unwrap(), 5);
    }

    #[test]
    fn test_builder_collects_steps_and_keys() {
        let scenario = Scenario::builder("deploy")
            .header("introduction", "Welcome")
            .confirm("confirmDeployment", "Continue?")
            .action_fn("handleConfirmDeployment", |_| Ok(ActionOutcome::Continue))
            .expects("confirmDeployment", "確認の回答")
            .build();

        assert_eq!(scenario.name(), "deploy");
        assert_eq!(scenario.steps().len(), 3);
        assert_eq!(scenario.expected_keys()[0].key, "confirmDeployment");
        assert!(scenario.duplicate_names().is_empty());
    }

    #[test]
    fn test_duplicate_names_reported_once() {
        let scenario = Scenario::builder("dup")
            .output("a", "1")
            .output("a", "2")
            .output("a", "3")
            .output("b", "4")
            .build();

        assert_eq!(scenario.duplicate_names(), vec!["a"]);
    }

    #[test]
    fn test_abort_reason_display() {
        let reason = AbortReason::UserDeclined {
            gate: "confirmDeployment".to_string(),
        };
        assert_eq!(reason.to_string(), "ユーザーが 'confirmDeployment' で続行を拒否しました");
        assert_eq!(
            ActionOutcome::declined("confirmDeployment"),
            ActionOutcome::Abort(reason)
        );
    }
}
