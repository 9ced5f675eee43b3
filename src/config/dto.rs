//! TOML デシリアライズ用の DTO (Data Transfer Object)
//!
//! # 責務
//!
//! このモジュールは、設定ファイルの読み書き専用の構造体を提供します。
//! DTO はバリデーション前の「生データ」を表現し、すべてのフィールドが省略可能です。
//! 省略されたフィールドは、ドメインモデルへの変換時に既定値で補われます。
//!
//! ## 変換フロー
//!
//! ```text
//! TOML ファイル
//!   ↓ (デシリアライズ)
//! ScenarioConfigDto
//!   ↓ (TryFrom でバリデーション・既定値の補完)
//! ScenarioConfig (ドメインモデル)
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 設定ファイル全体の DTO
///
/// **注**: この構造体は config モジュール内部の実装詳細です。
/// 外部からは [`ScenarioConfig`](super::settings::ScenarioConfig) を使用してください。
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct ScenarioConfigDto {
    /// `[scenario]` セクション
    #[serde(default)]
    pub(super) scenario: ScenarioSectionDto,
    /// `[names]` セクション（個別の名前の上書き）
    #[serde(default, skip_serializing_if = "NamesDto::is_empty")]
    pub(super) names: NamesDto,
    /// `[retry]` セクション
    #[serde(default)]
    pub(super) retry: RetrySectionDto,
    /// `[probe]` セクション
    #[serde(default)]
    pub(super) probe: ProbeSectionDto,
    /// `[logging]` セクション
    #[serde(default)]
    pub(super) logging: LoggingSectionDto,
}

/// `[scenario]` セクション DTO
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct ScenarioSectionDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) instance_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) key_pair_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) recommendations_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) instance_policy_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) assume_role_policy_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) startup_script_path: Option<PathBuf>,
}

/// `[names]` セクション DTO
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct NamesDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) table_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) key_pair_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) instance_policy_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) instance_role_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) instance_profile_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) launch_template_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) auto_scaling_group_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) target_group_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) load_balancer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) ssm_table_name_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) ssm_failure_response_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) ssm_health_check_key: Option<String>,
}

impl NamesDto {
    /// 上書きが1つもないかどうか
    pub(super) fn is_empty(&self) -> bool {
        [
            &self.table_name,
            &self.key_pair_name,
            &self.instance_policy_name,
            &self.instance_role_name,
            &self.instance_profile_name,
            &self.launch_template_name,
            &self.auto_scaling_group_name,
            &self.target_group_name,
            &self.load_balancer_name,
            &self.ssm_table_name_key,
            &self.ssm_failure_response_key,
            &self.ssm_health_check_key,
        ]
        .iter()
        .all(|name| name.is_none())
    }
}

/// `[retry]` セクション DTO
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RetrySectionDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) auto_scaling_group: Option<RetryPolicyDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) endpoint: Option<RetryPolicyDto>,
}

/// `[retry.*]` テーブル DTO
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RetryPolicyDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) interval_in_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) max_retries: Option<u32>,
}

/// `[probe]` セクション DTO
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct ProbeSectionDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) check_ip_url: Option<String>,
}

/// `[logging]` セクション DTO
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct LoggingSectionDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) directory: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let dto: ScenarioConfigDto = toml::from_str("").unwrap();
        assert!(dto.scenario.prefix.is_none());
        assert!(dto.names.is_empty());
        assert!(dto.retry.endpoint.is_none());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = toml::from_str::<ScenarioConfigDto>("[names]\ntable = \"x\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_partial_retry_table() {
        let dto: ScenarioConfigDto = toml::from_str("[retry.endpoint]\nmax_retries = 3\n").unwrap();
        let endpoint = dto.retry.endpoint.unwrap();
        assert_eq!(endpoint.max_retries, Some(3));
        assert_eq!(endpoint.interval_in_ms, None);
    }
}
