//! 外部コラボレーターの共通インターフェース定義
//!
//! # 責務
//!
//! - デプロイシナリオが呼び出す名前付きクラウド操作の共通トレイト [`DeployOperations`] を定義
//! - エンドポイント疎通確認の共通トレイト [`EndpointProbe`] を定義
//! - 各操作の入出力型を定義
//!
//! オーケストレーションのコアは、これらの操作がどのサービス・プロトコルで
//! 実現されているかを知りません。Action ハンドラーにはトレイトオブジェクトとして注入され、
//! テストでは [`SimulatedCloud`](super::simulated::SimulatedCloud) に差し替えます。

use async_trait::async_trait;
use crate::error::CollaboratorError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 最新の Amazon Linux 2 AMI のIDを保持する公開パラメーター
pub const LATEST_AMI_PARAMETER: &str = "/aws/service/ami-amazon-linux-latest/amzn2-ami-hvm-x86_64-gp2";

/// キー属性の型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeType {
    /// 文字列
    #[serde(rename = "S")]
    String,
    /// 数値
    #[serde(rename = "N")]
    Number,
}

/// テーブルのキー属性
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyAttribute {
    /// 属性名
    pub name: String,
    /// 属性の型
    pub attribute_type: AttributeType,
}

/// テーブル作成の入力
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    /// テーブル名
    pub name: String,
    /// パーティションキー
    pub partition_key: KeyAttribute,
    /// ソートキー
    pub sort_key: Option<KeyAttribute>,
    /// 読み込みキャパシティ
    pub read_capacity: u32,
    /// 書き込みキャパシティ
    pub write_capacity: u32,
}

/// 作成されたキーペア
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    /// キーペア名
    pub name: String,
    /// 秘密鍵（PEM）
    pub key_material: String,
}

/// 起動テンプレート作成の入力
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchTemplateSpec {
    /// テンプレート名
    pub name: String,
    /// インスタンスタイプ
    pub instance_type: String,
    /// マシンイメージID
    pub image_id: String,
    /// インスタンスプロファイル名
    pub instance_profile_name: String,
    /// 起動時に実行するスクリプト
    pub user_data: String,
    /// キーペア名
    pub key_name: String,
}

/// オートスケーリンググループ作成の入力
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoScalingGroupSpec {
    /// グループ名
    pub name: String,
    /// 配置するアベイラビリティゾーン
    pub availability_zones: Vec<String>,
    /// 使用する起動テンプレート名
    pub launch_template_name: String,
    /// 最小インスタンス数
    pub min_size: u32,
    /// 最大インスタンス数
    pub max_size: u32,
}

/// ターゲットグループ作成の入力
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetGroupSpec {
    /// ターゲットグループ名
    pub name: String,
    /// プロトコル
    pub protocol: String,
    /// ポート
    pub port: u16,
    /// ヘルスチェックのパス
    pub health_check_path: String,
    /// ヘルスチェック間隔（秒）
    pub health_check_interval_secs: u32,
    /// ヘルスチェックのタイムアウト（秒）
    pub health_check_timeout_secs: u32,
    /// 正常とみなす連続成功回数
    pub healthy_threshold: u32,
    /// 異常とみなす連続失敗回数
    pub unhealthy_threshold: u32,
    /// 所属するVPC
    pub vpc_id: String,
}

/// 作成されたターゲットグループ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetGroup {
    /// ARN
    pub arn: String,
    /// プロトコル
    pub protocol: String,
    /// ポート
    pub port: u16,
}

/// 作成されたロードバランサー
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancer {
    /// ARN
    pub arn: String,
    /// DNS名
    pub dns_name: String,
}

/// リスナー作成の入力
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerSpec {
    /// ロードバランサーのARN
    pub load_balancer_arn: String,
    /// プロトコル
    pub protocol: String,
    /// ポート
    pub port: u16,
    /// 転送先ターゲットグループのARN
    pub target_group_arn: String,
}

/// セキュリティグループのインバウンドルール
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpPermission {
    /// プロトコル（"tcp" など）
    pub ip_protocol: String,
    /// 開始ポート
    pub from_port: u16,
    /// 終了ポート
    pub to_port: u16,
    /// 許可するCIDR
    pub ip_ranges: Vec<String>,
}

/// セキュリティグループ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroup {
    /// グループID
    pub group_id: String,
    /// グループ名
    pub group_name: String,
    /// インバウンドルール
    pub ip_permissions: Vec<IpPermission>,
}

/// インバウンドルール追加の入力
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    /// 対象のセキュリティグループID
    pub group_id: String,
    /// 許可するCIDR
    pub cidr: String,
    /// プロトコル
    pub ip_protocol: String,
    /// 開始ポート
    pub from_port: u16,
    /// 終了ポート
    pub to_port: u16,
}

/// デプロイシナリオが使う名前付きクラウド操作
///
/// # 実装要件
///
/// - `Send + Sync`: Action ハンドラー間で `Arc` 共有される
/// - 非同期実行対応（`async_trait`を使用）
/// - 再試行で回復しうる失敗は [`CollaboratorError::Transient`] で返す
#[async_trait]
pub trait DeployOperations: Send + Sync {
    /// テーブルを作成する
    async fn create_table(&self, spec: &TableSpec) -> Result<(), CollaboratorError>;

    /// テーブルが利用可能になるまで待つ
    async fn wait_until_table_exists(&self, table_name: &str) -> Result<(), CollaboratorError>;

    /// テーブルに項目を一括書き込みし、書き込んだ件数を返す
    async fn batch_write_items(&self, table_name: &str, items: &[Value]) -> Result<usize, CollaboratorError>;

    /// キーペアを作成する
    async fn create_key_pair(&self, name: &str) -> Result<KeyPair, CollaboratorError>;

    /// ポリシーを作成し、ARNを返す
    async fn create_policy(&self, name: &str, document: &str) -> Result<String, CollaboratorError>;

    /// ロールを作成し、ARNを返す
    async fn create_role(&self, name: &str, assume_role_policy: &str) -> Result<String, CollaboratorError>;

    /// ロールにポリシーをアタッチする
    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<(), CollaboratorError>;

    /// インスタンスプロファイルを作成し、ARNを返す
    async fn create_instance_profile(&self, name: &str) -> Result<String, CollaboratorError>;

    /// インスタンスプロファイルが利用可能になるまで待つ
    async fn wait_until_instance_profile_exists(&self, name: &str) -> Result<(), CollaboratorError>;

    /// インスタンスプロファイルにロールを追加する
    async fn add_role_to_instance_profile(&self, role_name: &str, profile_name: &str) -> Result<(), CollaboratorError>;

    /// パラメーターを書き込む
    async fn put_parameter(&self, name: &str, value: &str, overwrite: bool) -> Result<(), CollaboratorError>;

    /// パラメーターを読み出す
    async fn get_parameter(&self, name: &str) -> Result<String, CollaboratorError>;

    /// 起動テンプレートを作成し、IDを返す
    async fn create_launch_template(&self, spec: &LaunchTemplateSpec) -> Result<String, CollaboratorError>;

    /// 利用可能なアベイラビリティゾーン名を返す
    async fn describe_availability_zones(&self) -> Result<Vec<String>, CollaboratorError>;

    /// オートスケーリンググループを作成する
    async fn create_auto_scaling_group(&self, spec: &AutoScalingGroupSpec) -> Result<(), CollaboratorError>;

    /// デフォルトVPCのIDを返す
    async fn describe_default_vpc(&self) -> Result<String, CollaboratorError>;

    /// 指定ゾーンにあるデフォルトサブネットのIDを返す
    async fn describe_default_subnets(&self, vpc_id: &str, zones: &[String]) -> Result<Vec<String>, CollaboratorError>;

    /// ターゲットグループを作成する
    async fn create_target_group(&self, spec: &TargetGroupSpec) -> Result<TargetGroup, CollaboratorError>;

    /// ロードバランサーを作成する
    async fn create_load_balancer(&self, name: &str, subnets: &[String]) -> Result<LoadBalancer, CollaboratorError>;

    /// ロードバランサーが利用可能になるまで待つ
    async fn wait_until_load_balancer_available(&self, name: &str) -> Result<(), CollaboratorError>;

    /// リスナーを作成し、ARNを返す
    async fn create_listener(&self, spec: &ListenerSpec) -> Result<String, CollaboratorError>;

    /// オートスケーリンググループにターゲットグループを関連付ける
    async fn attach_load_balancer_target_groups(
        &self,
        group_name: &str,
        target_group_arns: &[String],
    ) -> Result<(), CollaboratorError>;

    /// 名前でセキュリティグループを取得する
    async fn describe_security_group(&self, group_name: &str) -> Result<SecurityGroup, CollaboratorError>;

    /// セキュリティグループにインバウンドルールを追加する
    async fn authorize_ingress(&self, rule: &IngressRule) -> Result<(), CollaboratorError>;
}

/// HTTP 応答
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    /// ステータスコード
    pub status: u16,
    /// 応答本文
    pub body: String,
}

/// エンドポイント疎通確認
#[async_trait]
pub trait EndpointProbe: Send + Sync {
    /// 自身のグローバルIPアドレスを返す
    async fn public_ip(&self) -> Result<String, CollaboratorError>;

    /// URL に GET し、2xx 応答を返す（それ以外はエラー）
    async fn get(&self, url: &str) -> Result<ProbeResponse, CollaboratorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_type_wire_names() {
        assert_eq!(serde_json::to_string(&AttributeType::String).unwrap(), "\"S\"");
        assert_eq!(serde_json::to_string(&AttributeType::Number).unwrap(), "\"N\"");
    }

    #[test]
    fn test_ip_permission_roundtrip_in_context_shape() {
        let permission = IpPermission {
            ip_protocol: "tcp".to_string(),
            from_port: 80,
            to_port: 80,
            ip_ranges: vec!["0.0.0.0/0".to_string()],
        };
        let value = serde_json::to_value(&permission).unwrap();
        assert_eq!(value["from_port"], 80);
        assert_eq!(serde_json::from_value::<IpPermission>(value).unwrap(), permission);
    }
}
