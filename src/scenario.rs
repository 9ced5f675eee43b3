//! 組み込みシナリオ
//!
//! # モジュール構成
//!
//! - `deploy` - 耐障害性のある Web サービスのデプロイシナリオ
//! - `messages` - 表示メッセージのテンプレート
//! - `resources` - デプロイで使う文書・データ
//!
//! # 使用例
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use melted_scenario::collaborator::SimulatedCloud;
//! use melted_scenario::config::ScenarioConfig;
//! use melted_scenario::engine::{ScenarioRunner, TerminalIo};
//! use melted_scenario::scenario::{DeployEnv, DeployResources, deploy_scenario};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ScenarioConfig::default();
//!     let resources = DeployResources::load(&config.paths).await?;
//!     let cloud = Arc::new(SimulatedCloud::new());
//!     let env = Arc::new(DeployEnv::new(&config, cloud.clone(), cloud, resources));
//!
//!     let mut runner = ScenarioRunner::new(TerminalIo::new());
//!     let report = runner.run(&deploy_scenario(env)).await?;
//!     println!("{}", report.to_json()?);
//!     Ok(())
//! }
//! ```

pub mod deploy;
pub mod messages;
pub mod resources;

// 公開APIの再エクスポート
pub use deploy::{DeployAction, DeployEnv, DeployTask, deploy_scenario};
pub use resources::DeployResources;
