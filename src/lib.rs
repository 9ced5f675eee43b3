//! Melted Scenario
//!
//! 対話的なシナリオ（表示・入力・処理のステップ列）を順に実行するエンジンと、
//! それを使った Web サービスのデプロイシナリオを提供します。
//!
//! # モジュール構成
//!
//! - [`engine`] - シナリオ実行エンジン（ステップ、コンテキスト、ランナー、リトライ）
//! - [`collaborator`] - Action ステップが呼び出す外部操作の抽象化
//! - [`scenario`] - 組み込みのデプロイシナリオ
//! - [`config`] - TOML 設定ファイル
//! - [`logging`] - `tracing` の初期化
//! - [`error`] - エラー型

pub mod collaborator;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod scenario;
