//! ロギングの初期化
//!
//! # 責務
//!
//! - 設定（[`LoggingConfig`]）に従ってグローバルな `tracing` サブスクライバーを構築
//! - 標準エラー出力への整形出力または JSON 出力
//! - ディレクトリが指定された場合は日次ローテーションのログファイルにも出力
//!
//! 標準出力はシナリオの表示に使うため、ログは常に標準エラー出力へ書き出します。
//!
//! # 使用例
//!
//! ```rust,no_run
//! use melted_scenario::config::LoggingConfig;
//! use melted_scenario::logging;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // ガードはプロセス終了まで保持する（ドロップするとファイル出力が止まる）
//!     let _guard = logging::init(&LoggingConfig::default())?;
//!     tracing::info!("started");
//!     Ok(())
//! }
//! ```

use crate::config::{LogFormat, LoggingConfig};
use crate::error::LoggingError;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// ログファイル名の接頭辞（実際のファイル名には日付が付く）
const LOG_FILE_PREFIX: &str = "melted-scenario.log";

/// グローバルなサブスクライバーを初期化する
///
/// # 戻り値
///
/// - `Ok(Some(guard))`: ファイル出力を有効にした場合。`guard` をドロップするまで書き込みが続く
/// - `Ok(None)`: 標準エラー出力のみの場合
///
/// # エラー
///
/// - [`LoggingError::Filter`] - `level` を解析できない場合
/// - [`LoggingError::AlreadyInitialized`] - 既に初期化されている場合
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>, LoggingError> {
    let filter = build_filter(&config.level)?;

    let stderr_layer = match config.format {
        LogFormat::Pretty => fmt::layer().with_writer(std::io::stderr).boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(std::io::stderr).boxed(),
    };

    let (file_layer, guard) = match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = match config.format {
                LogFormat::Pretty => fmt::layer().with_ansi(false).with_writer(writer).boxed(),
                LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
            };
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

/// `RUST_LOG` を優先し、未設定または不正なら `level` からフィルターを作る
fn build_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    let from_env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    resolve_filter(from_env.as_deref(), level)
}

fn resolve_filter(from_env: Option<&str>, level: &str) -> Result<EnvFilter, LoggingError> {
    if let Some(directives) = from_env.filter(|d| !d.trim().is_empty()) {
        if let Ok(filter) = EnvFilter::try_new(directives) {
            return Ok(filter);
        }
    }

    EnvFilter::try_new(level).map_err(|source| LoggingError::Filter {
        directive: level.to_string(),
        source,
    })
}
