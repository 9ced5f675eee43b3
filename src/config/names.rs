//! デプロイで作成するリソースの名前
//!
//! すべての名前は1つのプレフィックスから導出され、`[names]` セクションで個別に上書きできます。
//!
//! ```rust
//! use melted_scenario::config::ResourceNames;
//!
//! let names = ResourceNames::from_prefix("demo");
//! assert_eq!(names.table_name, "demo-table");
//! assert_eq!(names.ssm_table_name_key, "/demo/table");
//! ```

use serde::Serialize;
use super::dto::NamesDto;

/// 既定のプレフィックス
pub const DEFAULT_PREFIX: &str = "doc-example-resilience";

/// リソース名の一覧
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceNames {
    pub table_name: String,
    pub key_pair_name: String,
    pub instance_policy_name: String,
    pub instance_role_name: String,
    pub instance_profile_name: String,
    pub launch_template_name: String,
    pub auto_scaling_group_name: String,
    pub target_group_name: String,
    pub load_balancer_name: String,
    /// テーブル名を格納するパラメーターのキー
    pub ssm_table_name_key: String,
    /// 障害応答モードを格納するパラメーターのキー
    pub ssm_failure_response_key: String,
    /// ヘルスチェックモードを格納するパラメーターのキー
    pub ssm_health_check_key: String,
}

impl ResourceNames {
    /// プレフィックスからすべての名前を導出
    pub fn from_prefix(prefix: &str) -> Self {
        Self {
            table_name: format!("{prefix}-table"),
            key_pair_name: format!("{prefix}-key-pair"),
            instance_policy_name: format!("{prefix}-pol"),
            instance_role_name: format!("{prefix}-role"),
            instance_profile_name: format!("{prefix}-prof"),
            launch_template_name: format!("{prefix}-template"),
            auto_scaling_group_name: format!("{prefix}-group"),
            target_group_name: format!("{prefix}-tg"),
            load_balancer_name: format!("{prefix}-lb"),
            ssm_table_name_key: format!("/{prefix}/table"),
            ssm_failure_response_key: format!("/{prefix}/failure-response"),
            ssm_health_check_key: format!("/{prefix}/health-check"),
        }
    }

    /// 上書きを適用した名前を返す
    pub(super) fn with_overrides(prefix: &str, overrides: NamesDto) -> Self {
        let base = Self::from_prefix(prefix);
        Self {
            table_name: overrides.table_name.unwrap_or(base.table_name),
            key_pair_name: overrides.key_pair_name.unwrap_or(base.key_pair_name),
            instance_policy_name: overrides.instance_policy_name.unwrap_or(base.instance_policy_name),
            instance_role_name: overrides.instance_role_name.unwrap_or(base.instance_role_name),
            instance_profile_name: overrides.instance_profile_name.unwrap_or(base.instance_profile_name),
            launch_template_name: overrides.launch_template_name.unwrap_or(base.launch_template_name),
            auto_scaling_group_name: overrides.auto_scaling_group_name.unwrap_or(base.auto_scaling_group_name),
            target_group_name: overrides.target_group_name.unwrap_or(base.target_group_name),
            load_balancer_name: overrides.load_balancer_name.unwrap_or(base.load_balancer_name),
            ssm_table_name_key: overrides.ssm_table_name_key.unwrap_or(base.ssm_table_name_key),
            ssm_failure_response_key: overrides
                .ssm_failure_response_key
                .unwrap_or(base.ssm_failure_response_key),
            ssm_health_check_key: overrides.ssm_health_check_key.unwrap_or(base.ssm_health_check_key),
        }
    }

    /// プレフィックスから導出される名前と異なるものだけを DTO にする
    pub(super) fn overrides(&self, prefix: &str) -> NamesDto {
        let base = Self::from_prefix(prefix);
        let differs = |value: &String, default: String| (*value != default).then(|| value.clone());
        NamesDto {
            table_name: differs(&self.table_name, base.table_name),
            key_pair_name: differs(&self.key_pair_name, base.key_pair_name),
            instance_policy_name: differs(&self.instance_policy_name, base.instance_policy_name),
            instance_role_name: differs(&self.instance_role_name, base.instance_role_name),
            instance_profile_name: differs(&self.instance_profile_name, base.instance_profile_name),
            launch_template_name: differs(&self.launch_template_name, base.launch_template_name),
            auto_scaling_group_name: differs(&self.auto_scaling_group_name, base.auto_scaling_group_name),
            target_group_name: differs(&self.target_group_name, base.target_group_name),
            load_balancer_name: differs(&self.load_balancer_name, base.load_balancer_name),
            ssm_table_name_key: differs(&self.ssm_table_name_key, base.ssm_table_name_key),
            ssm_failure_response_key: differs(&self.ssm_failure_response_key, base.ssm_failure_response_key),
            ssm_health_check_key: differs(&self.ssm_health_check_key, base.ssm_health_check_key),
        }
    }

    /// 空の名前があれば、そのフィールド名を返す
    pub(super) fn first_empty(&self) -> Option<&'static str> {
        [
            ("table_name", &self.table_name),
            ("key_pair_name", &self.key_pair_name),
            ("instance_policy_name", &self.instance_policy_name),
            ("instance_role_name", &self.instance_role_name),
            ("instance_profile_name", &self.instance_profile_name),
            ("launch_template_name", &self.launch_template_name),
            ("auto_scaling_group_name", &self.auto_scaling_group_name),
            ("target_group_name", &self.target_group_name),
            ("load_balancer_name", &self.load_balancer_name),
            ("ssm_table_name_key", &self.ssm_table_name_key),
            ("ssm_failure_response_key", &self.ssm_failure_response_key),
            ("ssm_health_check_key", &self.ssm_health_check_key),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
    }
}

impl Default for ResourceNames {
    fn default() -> Self {
        Self::from_prefix(DEFAULT_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_names() {
        let names = ResourceNames::default();
        assert_eq!(names.table_name, "doc-example-resilience-table");
        assert_eq!(names.key_pair_name, "doc-example-resilience-key-pair");
        assert_eq!(names.load_balancer_name, "doc-example-resilience-lb");
        assert_eq!(names.ssm_health_check_key, "/doc-example-resilience/health-check");
    }

    #[test]
    fn test_overrides_applied_and_extracted() {
        let overrides = NamesDto {
            table_name: Some("custom-table".to_string()),
            ..NamesDto::default()
        };
        let names = ResourceNames::with_overrides("demo", overrides);
        assert_eq!(names.table_name, "custom-table");
        assert_eq!(names.key_pair_name, "demo-key-pair");

        let extracted = names.overrides("demo");
        assert_eq!(extracted.table_name.as_deref(), Some("custom-table"));
        assert!(extracted.key_pair_name.is_none());
    }

    #[test]
    fn test_first_empty() {
        let mut names = ResourceNames::from_prefix("demo");
        assert_eq!(names.first_empty(), None);

        names.target_group_name = " ".to_string();
        assert_eq!(names.first_empty(), Some("target_group_name"));
    }
}
