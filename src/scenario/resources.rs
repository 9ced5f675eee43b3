//! デプロイで使う文書・データの読み込み
//!
//! 設定でパスが指定されていればそのファイルを、なければ組み込みの既定値を使います。

use crate::config::ResourcePaths;
use crate::error::ConfigError;
use serde_json::Value;
use std::path::Path;

const DEFAULT_RECOMMENDATIONS: &str = include_str!("../../resources/recommendations.json");
const DEFAULT_INSTANCE_POLICY: &str = include_str!("../../resources/instance_policy.json");
const DEFAULT_ASSUME_ROLE_POLICY: &str = include_str!("../../resources/assume_role_policy.json");
const DEFAULT_STARTUP_SCRIPT: &str = include_str!("../../resources/server_startup_script.sh");

/// デプロイで使う文書・データ
#[derive(Debug, Clone, PartialEq)]
pub struct DeployResources {
    /// テーブルに投入する項目
    pub recommendations: Vec<Value>,
    /// インスタンスポリシー文書（JSON）
    pub instance_policy: String,
    /// ロールの信頼ポリシー文書（JSON）
    pub assume_role_policy: String,
    /// インスタンスの起動スクリプト
    pub startup_script: String,
}

impl DeployResources {
    /// 設定されたパスから読み込む
    ///
    /// # エラー
    ///
    /// - [`ConfigError::FileRead`] - ファイルを読み込めない場合
    /// - [`ConfigError::Validation`] - 項目が JSON オブジェクトの配列でない場合、
    ///   またはポリシー文書が JSON でない場合
    pub async fn load(paths: &ResourcePaths) -> Result<Self, ConfigError> {
        let recommendations = read_or(paths.recommendations.as_deref(), DEFAULT_RECOMMENDATIONS).await?;
        let instance_policy = read_or(paths.instance_policy.as_deref(), DEFAULT_INSTANCE_POLICY).await?;
        let assume_role_policy = read_or(paths.assume_role_policy.as_deref(), DEFAULT_ASSUME_ROLE_POLICY).await?;
        let startup_script = read_or(paths.startup_script.as_deref(), DEFAULT_STARTUP_SCRIPT).await?;

        Ok(Self {
            recommendations: parse_items(&recommendations)?,
            instance_policy: ensure_json("instance_policy", instance_policy)?,
            assume_role_policy: ensure_json("assume_role_policy", assume_role_policy)?,
            startup_script,
        })
    }
}

impl Default for DeployResources {
    fn default() -> Self {
        Self {
            recommendations: serde_json::from_str(DEFAULT_RECOMMENDATIONS).unwrap_or_default(),
            instance_policy: DEFAULT_INSTANCE_POLICY.to_string(),
            assume_role_policy: DEFAULT_ASSUME_ROLE_POLICY.to_string(),
            startup_script: DEFAULT_STARTUP_SCRIPT.to_string(),
        }
    }
}

async fn read_or(path: Option<&Path>, default: &str) -> Result<String, ConfigError> {
    match path {
        Some(path) => Ok(tokio::fs::read_to_string(path).await?),
        None => Ok(default.to_string()),
    }
}

fn parse_items(content: &str) -> Result<Vec<Value>, ConfigError> {
    let items: Vec<Value> = serde_json::from_str(content)
        .map_err(|e| ConfigError::Validation(format!("recommendations が JSON 配列ではありません: {e}")))?;

    if let Some(index) = items.iter().position(|item| !item.is_object()) {
        return Err(ConfigError::Validation(format!(
            "recommendations の {index} 番目の項目がオブジェクトではありません"
        )));
    }
    Ok(items)
}

fn ensure_json(field: &str, document: String) -> Result<String, ConfigError> {
    serde_json::from_str::<Value>(&document)
        .map_err(|e| ConfigError::Validation(format!("{field} が JSON ではありません: {e}")))?;
    Ok(document)
}
