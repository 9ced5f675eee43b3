//! シナリオ設定の読み込みと管理を行うモジュール
//!
//! # 責務
//!
//! - TOML 形式の設定ファイルを読み込み、バリデーション済みの [`ScenarioConfig`] に変換
//! - 省略された項目を既定値で補完
//! - 実効設定を TOML として書き出し
//!
//! ## 使用例
//!
//! ```toml
//! [scenario]
//! prefix = "doc-example-resilience"
//! key_pair_dir = "."
//!
//! [retry.auto_scaling_group]
//! interval_in_ms = 1000
//! max_retries = 30
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

use crate::collaborator::http::DEFAULT_CHECK_IP_URL;
use crate::engine::retry::RetryPolicy;
use crate::error::ConfigError;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use super::dto::{
    LoggingSectionDto, ProbeSectionDto, RetryPolicyDto, RetrySectionDto, ScenarioConfigDto, ScenarioSectionDto,
};
use super::names::{DEFAULT_PREFIX, ResourceNames};

/// 既定のインスタンスタイプ
pub const DEFAULT_INSTANCE_TYPE: &str = "t3.micro";

/// シナリオ設定（ドメインモデル）
///
/// バリデーション済みの状態を保証します。
///
/// ## DTO との違い
///
/// - `ScenarioConfigDto`: TOML デシリアライズ専用、すべて省略可能な生データ
/// - [`ScenarioConfig`]: 既定値で補完・バリデーション済み
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioConfig {
    /// リソース名のプレフィックス
    pub prefix: String,
    /// 起動テンプレートのインスタンスタイプ
    pub instance_type: String,
    /// リソース名
    pub names: ResourceNames,
    /// 入出力ファイルの場所
    pub paths: ResourcePaths,
    /// リトライ設定
    pub retry: RetrySettings,
    /// 疎通確認の設定
    pub probe: ProbeSettings,
    /// ロギング設定
    pub logging: LoggingConfig,
}

/// 入出力ファイルの場所
///
/// `None` の項目は組み込みの既定リソースを使います。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourcePaths {
    /// 秘密鍵（`<キーペア名>.pem`）を書き出すディレクトリ
    pub key_pair_dir: PathBuf,
    /// テーブルに投入する項目（JSON 配列）
    pub recommendations: Option<PathBuf>,
    /// インスタンスポリシー文書
    pub instance_policy: Option<PathBuf>,
    /// ロールの信頼ポリシー文書
    pub assume_role_policy: Option<PathBuf>,
    /// インスタンスの起動スクリプト
    pub startup_script: Option<PathBuf>,
}

impl Default for ResourcePaths {
    fn default() -> Self {
        Self {
            key_pair_dir: PathBuf::from("."),
            recommendations: None,
            instance_policy: None,
            assume_role_policy: None,
            startup_script: None,
        }
    }
}

/// 個々の操作に適用するリトライポリシー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetrySettings {
    /// オートスケーリンググループ作成
    pub auto_scaling_group: RetryPolicy,
    /// エンドポイントの疎通確認
    pub endpoint: RetryPolicy,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            auto_scaling_group: RetryPolicy::from_millis(1000, 30),
            endpoint: RetryPolicy::from_millis(2000, 30),
        }
    }
}

/// 疎通確認の設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeSettings {
    /// 自身のIPアドレスを返すサービスのURL
    pub check_ip_url: String,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            check_ip_url: DEFAULT_CHECK_IP_URL.to_string(),
        }
    }
}

/// ログの出力形式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// 人間向けの整形出力
    #[default]
    Pretty,
    /// 1行1イベントの JSON
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "未知のログ形式です: '{other}'（pretty または json）"
            ))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => f.write_str("pretty"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// ロギング設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoggingConfig {
    /// `EnvFilter` の指定（`RUST_LOG` が設定されていればそちらを優先）
    pub level: String,
    /// 出力形式
    pub format: LogFormat,
    /// 日次ローテーションのログファイルを書き出すディレクトリ
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            directory: None,
        }
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            instance_type: DEFAULT_INSTANCE_TYPE.to_string(),
            names: ResourceNames::default(),
            paths: ResourcePaths::default(),
            retry: RetrySettings::default(),
            probe: ProbeSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ScenarioConfig {
    /// TOML ファイルから設定を読み込む
    ///
    /// # 処理フロー
    ///
    /// 1. ファイル読み込み
    /// 2. TOML デシリアライズ → `ScenarioConfigDto`
    /// 3. バリデーション & 変換 → [`ScenarioConfig`]
    ///
    /// # 戻り値
    ///
    /// * `Ok(ScenarioConfig)` - 読み込みに成功した場合
    /// * `Err(ConfigError)` - ファイルの読み込み、パース、バリデーションのいずれかに失敗した場合
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// TOML 文字列から設定を読み込む
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let dto: ScenarioConfigDto = toml::from_str(toml)?;
        Self::try_from(dto)
    }

    /// 設定を TOML 文字列に変換
    ///
    /// 名前はプレフィックスから導出されるものと異なる場合だけ `[names]` に出力します。
    pub fn to_string(&self) -> Result<String, ConfigError> {
        let dto = ScenarioConfigDto::from(self.clone());
        Ok(toml::to_string(&dto)?)
    }

    /// 設定を TOML ファイルに保存
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = self.to_string()?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// ドメインモデルとしての整合性を検査
    fn validate(&self) -> Result<(), ConfigError> {
        if self.prefix.is_empty() {
            return Err(ConfigError::Validation("prefix が空です".to_string()));
        }
        if let Some(c) = self
            .prefix
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-'))
        {
            return Err(ConfigError::Validation(format!(
                "prefix '{}' に使用できない文字 '{c}' が含まれています（英数字と '-' のみ）",
                self.prefix
            )));
        }
        if let Some(field) = self.names.first_empty() {
            return Err(ConfigError::Validation(format!("names.{field} が空です")));
        }
        if self.instance_type.trim().is_empty() {
            return Err(ConfigError::Validation("instance_type が空です".to_string()));
        }
        if self.probe.check_ip_url.trim().is_empty() {
            return Err(ConfigError::Validation("probe.check_ip_url が空です".to_string()));
        }
        Ok(())
    }
}

fn retry_policy(dto: Option<RetryPolicyDto>, default: RetryPolicy) -> RetryPolicy {
    match dto {
        Some(dto) => RetryPolicy::from_millis(
            dto.interval_in_ms
                .unwrap_or_else(|| default.interval.as_millis() as u64),
            dto.max_retries.unwrap_or(default.max_retries),
        ),
        None => default,
    }
}

/// DTO からドメインモデルへの変換（読み込み方向）
///
/// 省略された項目を既定値で補い、バリデーションを実施します。
/// 不正なデータの場合は [`ConfigError::Validation`] を返します。
impl TryFrom<ScenarioConfigDto> for ScenarioConfig {
    type Error = ConfigError;

    fn try_from(dto: ScenarioConfigDto) -> Result<Self, Self::Error> {
        let defaults = Self::default();
        let scenario = dto.scenario;
        let prefix = scenario.prefix.unwrap_or(defaults.prefix);

        let format = match dto.logging.format.as_deref() {
            Some(format) => format.parse()?,
            None => defaults.logging.format,
        };

        let config = Self {
            names: ResourceNames::with_overrides(&prefix, dto.names),
            prefix,
            instance_type: scenario.instance_type.unwrap_or(defaults.instance_type),
            paths: ResourcePaths {
                key_pair_dir: scenario.key_pair_dir.unwrap_or(defaults.paths.key_pair_dir),
                recommendations: scenario.recommendations_path,
                instance_policy: scenario.instance_policy_path,
                assume_role_policy: scenario.assume_role_policy_path,
                startup_script: scenario.startup_script_path,
            },
            retry: RetrySettings {
                auto_scaling_group: retry_policy(dto.retry.auto_scaling_group, defaults.retry.auto_scaling_group),
                endpoint: retry_policy(dto.retry.endpoint, defaults.retry.endpoint),
            },
            probe: ProbeSettings {
                check_ip_url: dto.probe.check_ip_url.unwrap_or(defaults.probe.check_ip_url),
            },
            logging: LoggingConfig {
                level: dto.logging.level.unwrap_or(defaults.logging.level),
                format,
                directory: dto.logging.directory,
            },
        };

        config.validate()?;
        Ok(config)
    }
}

/// ドメインモデルから DTO への変換（書き込み方向）
///
/// バリデーション済みのドメインモデルから DTO を生成するため、
/// この変換は失敗しません（`From` トレイトを使用）。
impl From<ScenarioConfig> for ScenarioConfigDto {
    fn from(config: ScenarioConfig) -> Self {
        let policy = |p: RetryPolicy| RetryPolicyDto {
            interval_in_ms: Some(p.interval.as_millis() as u64),
            max_retries: Some(p.max_retries),
        };

        Self {
            names: config.names.overrides(&config.prefix),
            scenario: ScenarioSectionDto {
                prefix: Some(config.prefix),
                instance_type: Some(config.instance_type),
                key_pair_dir: Some(config.paths.key_pair_dir),
                recommendations_path: config.paths.recommendations,
                instance_policy_path: config.paths.instance_policy,
                assume_role_policy_path: config.paths.assume_role_policy,
                startup_script_path: config.paths.startup_script,
            },
            retry: RetrySectionDto {
                auto_scaling_group: Some(policy(config.retry.auto_scaling_group)),
                endpoint: Some(policy(config.retry.endpoint)),
            },
            probe: ProbeSectionDto {
                check_ip_url: Some(config.probe.check_ip_url),
            },
            logging: LoggingSectionDto {
                level: Some(config.logging.level),
                format: Some(config.logging.format.to_string()),
                directory: config.logging.directory,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_empty_toml_is_default() {
        let config = ScenarioConfig::from_toml("").unwrap();
        assert_eq!(config, ScenarioConfig::default());
        assert_eq!(config.retry.auto_scaling_group.max_retries, 30);
        assert_eq!(config.retry.endpoint.interval, Duration::from_millis(2000));
    }

    #[test]
    fn test_full_toml() {
        let toml = r#"
[scenario]
prefix = "demo"
instance_type = "t3.small"
key_pair_dir = "keys"
recommendations_path = "resources/recommendations.json"

[names]
table_name = "shared-table"

[retry.auto_scaling_group]
interval_in_ms = 10
max_retries = 2

[retry.endpoint]
max_retries = 5

[probe]
check_ip_url = "http://127.0.0.1:9/ip"

[logging]
level = "debug"
format = "json"
directory = "logs"
"#;
        let config = ScenarioConfig::from_toml(toml).unwrap();

        assert_eq!(config.prefix, "demo");
        assert_eq!(config.instance_type, "t3.small");
        assert_eq!(config.names.table_name, "shared-table");
        assert_eq!(config.names.key_pair_name, "demo-key-pair");
        assert_eq!(config.paths.key_pair_dir, PathBuf::from("keys"));
        assert_eq!(
            config.paths.recommendations,
            Some(PathBuf::from("resources/recommendations.json"))
        );
        assert_eq!(config.retry.auto_scaling_group, RetryPolicy::from_millis(10, 2));
        assert_eq!(config.retry.endpoint, RetryPolicy::from_millis(2000, 5));
        assert_eq!(config.probe.check_ip_url, "http://127.0.0.1:9/ip");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.directory, Some(PathBuf::from("logs")));
    }

    #[test]
    fn test_empty_prefix_rejected() {
        let err = ScenarioConfig::from_toml("[scenario]\nprefix = \"\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref msg) if msg.contains("prefix")));
    }

    #[test]
    fn test_prefix_with_invalid_character_rejected() {
        let err = ScenarioConfig::from_toml("[scenario]\nprefix = \"demo_1\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref msg) if msg.contains('_')));
    }

    #[test]
    fn test_unknown_log_format_rejected() {
        let err = ScenarioConfig::from_toml("[logging]\nformat = \"xml\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref msg) if msg.contains("xml")));
    }

    #[test]
    fn test_empty_name_override_rejected() {
        let err = ScenarioConfig::from_toml("[names]\nload_balancer_name = \"\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref msg) if msg.contains("load_balancer_name")));
    }

    #[test]
    fn test_invalid_toml() {
        let err = ScenarioConfig::from_toml("[scenario\n").unwrap_err();
        assert!(matches!(err, ConfigError::TomlDeserialize(_)));
    }

    #[test]
    fn test_to_string_keeps_only_real_overrides() {
        let mut config = ScenarioConfig::default();
        config.names.table_name = "shared-table".to_string();

        let toml = config.to_string().unwrap();
        assert!(toml.contains("table_name = \"shared-table\""));
        assert!(!toml.contains("key_pair_name"));

        let reloaded = ScenarioConfig::from_toml(&toml).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_to_file_and_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.toml");
        let config = ScenarioConfig {
            prefix: "saved".to_string(),
            names: ResourceNames::from_prefix("saved"),
            ..ScenarioConfig::default()
        };

        config.to_file(&path).unwrap();
        assert_eq!(ScenarioConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file() {
        let err = ScenarioConfig::from_file("/nonexistent/scenario.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileRead(_)));
    }
}
