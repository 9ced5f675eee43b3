//! 設定ファイルの読み込み
//!
//! # 責務
//!
//! - TOML 設定ファイル → DTO → バリデーション済みドメインモデルの変換
//! - デプロイで作成するリソース名の導出
//!
//! # モジュール構成
//!
//! - `dto` - TOML デシリアライズ用の生データ（モジュール内部専用）
//! - `names` - リソース名（[`ResourceNames`]）
//! - `settings` - 設定のドメインモデル（[`ScenarioConfig`]）
//!
//! # 使用例
//!
//! ```rust,no_run
//! use melted_scenario::config::ScenarioConfig;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ScenarioConfig::from_file("scenario.toml")?;
//!     println!("table: {}", config.names.table_name);
//!     Ok(())
//! }
//! ```

mod dto;
pub mod names;
pub mod settings;

// 公開APIの再エクスポート
pub use names::{DEFAULT_PREFIX, ResourceNames};
pub use settings::{LogFormat, LoggingConfig, ProbeSettings, ResourcePaths, RetrySettings, ScenarioConfig};
