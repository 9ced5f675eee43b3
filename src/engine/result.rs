//! シナリオ実行結果の型定義
//!
//! # 責務
//!
//! - 実行状態 [`RunState`] と終了理由 [`Termination`] の型定義
//! - ステップごとの実行記録 [`StepRecord`] の型定義
//! - シナリオ全体の実行結果 [`RunReport`] の型定義
//! - 実行エラー [`ScenarioError`] の型定義
//!
//! # 使用例
//!
//! ```rust,no_run
//! use melted_scenario::engine::result::RunReport;
//!
//! fn handle_report(report: RunReport) {
//!     if report.is_completed() {
//!         println!("シナリオ完了: {}", report.scenario_name);
//!     } else {
//!         println!("シナリオ中断: {:?}", report.state);
//!     }
//!
//!     if let Ok(json) = report.to_json() {
//!         println!("JSON: {}", json);
//!     }
//! }
//! ```

use crate::engine::context::ExecutionContext;
use crate::engine::step::{AbortReason, StepKind};
use crate::error::StepError;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// シナリオの実行状態
///
/// `NotStarted → Running(0) → … → Running(last) → Completed` と遷移し、
/// 中断または失敗時は `Terminated` で止まります。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum RunState {
    /// 未実行
    NotStarted,
    /// 指定インデックスのステップを実行中
    Running(usize),
    /// すべてのステップが完了
    Completed,
    /// 途中で終了
    Terminated(Termination),
}

impl RunState {
    /// 終了状態（完了・中断・失敗）かどうか
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Terminated(_))
    }
}

/// シナリオの終了理由
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Termination {
    /// Action ステップによる秩序立った中断（エラーではない）
    Aborted {
        /// 中断理由
        cause: AbortReason,
    },
    /// ステップの失敗
    Failed {
        /// 失敗したステップ名
        step: String,
        /// 失敗したステップのインデックス
        index: usize,
        /// エラーメッセージ
        message: String,
    },
}

/// ステップの実行ステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StepStatus {
    /// 通常どおり完了
    Completed,
    /// メッセージ／プロンプトが偽を返したため、表示・入力を省略
    Suppressed,
    /// このステップがシナリオを中断した
    Aborted,
}

/// ステップの実行記録
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    /// ステップ名
    pub name: String,

    /// ステップインデックス（0始まり）
    pub index: usize,

    /// ステップの種類
    pub kind: StepKind,

    /// 実行ステータス
    pub status: StepStatus,

    /// 実行時間（入力待ちを含む）
    pub duration: Duration,
}

/// シナリオ実行結果
///
/// 完了または中断で終わった実行の結果です。失敗した実行は
/// [`ScenarioError::StepFailed`] として返されます。
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// シナリオ名
    pub scenario_name: String,

    /// 最終状態（`Completed` または `Terminated(Aborted)`）
    pub state: RunState,

    /// 実行したステップの記録（実行順）
    pub steps: Vec<StepRecord>,

    /// 実行終了時のコンテキスト
    pub context: ExecutionContext,

    /// 総実行時間
    pub total_duration: Duration,
}

impl RunReport {
    /// 結果をJSON形式でシリアライズ
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// すべてのステップが完了したかどうか
    pub fn is_completed(&self) -> bool {
        matches!(self.state, RunState::Completed)
    }

    /// 中断された場合、その理由
    pub fn abort_reason(&self) -> Option<&AbortReason> {
        match &self.state {
            RunState::Terminated(Termination::Aborted { cause }) => Some(cause),
            _ => None,
        }
    }

    /// 実行されたステップ名（実行順）
    pub fn executed_step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }
}

/// 実行エラー
///
/// ランナーが返すエラーはステップの失敗のみです。中断はエラーではなく
/// [`RunReport`] の `Terminated(Aborted)` として返されます。
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// ステップの失敗
    #[error("ステップ '{step}'（{index}番目）が失敗しました: {source}")]
    StepFailed {
        /// 失敗したステップ名
        step: String,
        /// 失敗したステップのインデックス
        index: usize,
        /// 原因
        #[source]
        source: StepError,
    },
}
