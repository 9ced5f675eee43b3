//! 外部コラボレーター抽象化レイヤー
//!
//! # 責務
//!
//! - シナリオの Action ステップが呼び出す外部操作を、トレイトとして統一的に提供
//! - メモリ上のシミュレーター実装と、HTTP による疎通確認実装を提供
//!
//! # アーキテクチャ
//!
//! オーケストレーションのコア（[`crate::engine`]）はコラボレーターを知りません。
//! Action ハンドラーが `Arc<dyn DeployOperations>` / `Arc<dyn EndpointProbe>` を保持し、
//! 実装の差し替え（シミュレーター、実クラウド、テスト用の偽物）は組み立て時に行います。
//!
//! # モジュール構成
//!
//! - `traits` - 共通インターフェース（[`DeployOperations`]、[`EndpointProbe`]）と入出力型
//! - `simulated` - メモリ上のシミュレーター（[`SimulatedCloud`]）
//! - `http` - `reqwest` による疎通確認（[`HttpProbe`]）
//!
//! # 使用例
//!
//! ```rust
//! use std::sync::Arc;
//! use melted_scenario::collaborator::{DeployOperations, EndpointProbe, SimulatedCloud};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cloud = Arc::new(SimulatedCloud::new());
//!     let operations: Arc<dyn DeployOperations> = cloud.clone();
//!     let probe: Arc<dyn EndpointProbe> = cloud;
//!
//!     let vpc = operations.describe_default_vpc().await?;
//!     let ip = probe.public_ip().await?;
//!     println!("{vpc} / {ip}");
//!     Ok(())
//! }
//! ```

pub mod http;
pub mod simulated;
pub mod traits;

// 公開APIの再エクスポート
pub use http::HttpProbe;
pub use simulated::SimulatedCloud;
pub use traits::{DeployOperations, EndpointProbe, ProbeResponse};
