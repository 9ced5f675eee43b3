//! 耐障害性のある Web サービスのデプロイシナリオ
//!
//! # 責務
//!
//! - デプロイ手順を Output / Input / Action ステップの列として組み立てる
//! - 各 Action の処理（[`DeployTask`]）をコラボレーター呼び出しとして実装する
//!
//! # 処理フロー
//!
//! ```text
//! 確認 → テーブル作成・投入 → キーペア → ポリシー・ロール・プロファイル
//!      → パラメーター → 起動テンプレート → オートスケーリンググループ（リトライ）
//!      → 確認 → VPC・サブネット → ターゲットグループ → ロードバランサー → リスナー
//!      → インバウンドルール確認（必要なら追加） → エンドポイント疎通確認（リトライ）
//! ```
//!
//! 各 Action は結果をコンテキストに書き込み、後続のステップがそれを読み出します。
//! 読み書きするキーは [`keys`] にまとめています。

use async_trait::async_trait;
use crate::collaborator::traits::{
    AttributeType, AutoScalingGroupSpec, DeployOperations, EndpointProbe, IngressRule, IpPermission, KeyAttribute,
    LATEST_AMI_PARAMETER, LaunchTemplateSpec, ListenerSpec, SecurityGroup, TableSpec, TargetGroupSpec,
};
use crate::config::{ResourceNames, RetrySettings, ScenarioConfig};
use crate::engine::context::ExecutionContext;
use crate::engine::retry::retry;
use crate::engine::step::{ActionHandler, ActionOutcome, InputOptions, Message, Scenario, Step};
use crate::error::StepError;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use super::messages::{self as msg, fill};
use super::resources::DeployResources;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// シナリオ名
pub const SCENARIO_NAME: &str = "deploy";

/// 1回の一括書き込みで送る最大項目数
const BATCH_WRITE_LIMIT: usize = 25;

/// Web サーバーが待ち受けるポート
const HTTP_PORT: u16 = 80;

/// インバウンドルールを確認するセキュリティグループ
const DEFAULT_SECURITY_GROUP: &str = "default";

/// オートスケーリンググループのインスタンス数（最小・最大とも）
const GROUP_SIZE: u32 = 3;

/// コンテキストのキー
pub mod keys {
    pub const CONFIRM_DEPLOYMENT: &str = "confirmDeployment";
    pub const POPULATED_ITEM_COUNT: &str = "populatedItemCount";
    pub const KEY_PAIR_FILE: &str = "keyPairFile";
    pub const INSTANCE_POLICY_ARN: &str = "instancePolicyArn";
    pub const INSTANCE_PROFILE_ARN: &str = "instanceProfileArn";
    pub const LAUNCH_TEMPLATE_ID: &str = "launchTemplateId";
    pub const AVAILABILITY_ZONE_NAMES: &str = "availabilityZoneNames";
    pub const CONFIRM_CONTINUE: &str = "confirmContinue";
    pub const DEFAULT_VPC: &str = "defaultVpc";
    pub const SUBNETS: &str = "subnets";
    pub const TARGET_GROUP_ARN: &str = "targetGroupArn";
    pub const TARGET_GROUP_PROTOCOL: &str = "targetGroupProtocol";
    pub const TARGET_GROUP_PORT: &str = "targetGroupPort";
    pub const LOAD_BALANCER_DNS: &str = "loadBalancerDns";
    pub const LOAD_BALANCER_ARN: &str = "loadBalancerArn";
    pub const LB_LISTENER_ARN: &str = "lbListenerArn";
    pub const DEFAULT_SECURITY_GROUP: &str = "defaultSecurityGroup";
    pub const MY_IP: &str = "myIp";
    pub const MY_IP_RULES: &str = "myIpRules";
    pub const SHOULD_ADD_INBOUND_RULE: &str = "shouldAddInboundRule";
    pub const ENDPOINT_RESPONSE: &str = "endpointResponse";
    pub const VERIFY_ENDPOINT_ERROR: &str = "verifyEndpointError";
}

/// デプロイシナリオの実行環境
///
/// すべての Action ハンドラーが `Arc` で共有します。
pub struct DeployEnv {
    /// クラウド操作
    pub operations: Arc<dyn DeployOperations>,
    /// 疎通確認
    pub probe: Arc<dyn EndpointProbe>,
    /// リソース名
    pub names: ResourceNames,
    /// 起動テンプレートのインスタンスタイプ
    pub instance_type: String,
    /// リトライ設定
    pub retry: RetrySettings,
    /// 文書・データ
    pub resources: DeployResources,
    /// 秘密鍵の保存先
    pub key_pair_dir: PathBuf,
}

impl DeployEnv {
    /// 設定とコラボレーターから実行環境を組み立てる
    pub fn new(
        config: &ScenarioConfig,
        operations: Arc<dyn DeployOperations>,
        probe: Arc<dyn EndpointProbe>,
        resources: DeployResources,
    ) -> Self {
        Self {
            operations,
            probe,
            names: config.names.clone(),
            instance_type: config.instance_type.clone(),
            retry: config.retry,
            resources,
            key_pair_dir: config.paths.key_pair_dir.clone(),
        }
    }

    /// 秘密鍵を書き出すパス
    pub fn key_file_path(&self) -> PathBuf {
        self.key_pair_dir.join(format!("{}.pem", self.names.key_pair_name))
    }

    async fn create_table(&self) -> Result<(), StepError> {
        let spec = TableSpec {
            name: self.names.table_name.clone(),
            partition_key: KeyAttribute {
                name: "MediaType".to_string(),
                attribute_type: AttributeType::String,
            },
            sort_key: Some(KeyAttribute {
                name: "ItemId".to_string(),
                attribute_type: AttributeType::Number,
            }),
            read_capacity: 5,
            write_capacity: 5,
        };
        self.operations.create_table(&spec).await?;
        self.operations.wait_until_table_exists(&spec.name).await?;
        info!(table = %spec.name, "テーブルを作成しました");
        Ok(())
    }

    async fn populate_table(&self, ctx: &mut ExecutionContext) -> Result<(), StepError> {
        let mut written = 0;
        for chunk in self.resources.recommendations.chunks(BATCH_WRITE_LIMIT) {
            written += self
                .operations
                .batch_write_items(&self.names.table_name, chunk)
                .await?;
        }
        info!(table = %self.names.table_name, items = written, "テーブルに項目を書き込みました");
        ctx.insert(keys::POPULATED_ITEM_COUNT, written);
        Ok(())
    }

    async fn create_key_pair(&self, ctx: &mut ExecutionContext) -> Result<(), StepError> {
        let key_pair = self.operations.create_key_pair(&self.names.key_pair_name).await?;
        let path = self.key_file_path();

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options.open(&path).await?;
        file.write_all(key_pair.key_material.as_bytes()).await?;
        file.flush().await?;

        info!(key_pair = %key_pair.name, path = %path.display(), "秘密鍵を保存しました");
        ctx.insert(keys::KEY_PAIR_FILE, path.display().to_string());
        Ok(())
    }

    async fn create_instance_policy(&self, ctx: &mut ExecutionContext) -> Result<(), StepError> {
        let arn = self
            .operations
            .create_policy(&self.names.instance_policy_name, &self.resources.instance_policy)
            .await?;
        ctx.insert(keys::INSTANCE_POLICY_ARN, arn);
        Ok(())
    }

    async fn create_instance_role(&self) -> Result<(), StepError> {
        self.operations
            .create_role(&self.names.instance_role_name, &self.resources.assume_role_policy)
            .await?;
        Ok(())
    }

    async fn attach_policy_to_role(&self, ctx: &mut ExecutionContext) -> Result<(), StepError> {
        let policy_arn = ctx.require_str(keys::INSTANCE_POLICY_ARN)?;
        self.operations
            .attach_role_policy(&self.names.instance_role_name, policy_arn)
            .await?;
        Ok(())
    }

    async fn create_instance_profile(&self, ctx: &mut ExecutionContext) -> Result<(), StepError> {
        let name = &self.names.instance_profile_name;
        let arn = self.operations.create_instance_profile(name).await?;
        ctx.insert(keys::INSTANCE_PROFILE_ARN, arn);
        self.operations.wait_until_instance_profile_exists(name).await?;
        Ok(())
    }

    async fn add_role_to_instance_profile(&self) -> Result<(), StepError> {
        self.operations
            .add_role_to_instance_profile(&self.names.instance_role_name, &self.names.instance_profile_name)
            .await?;
        Ok(())
    }

    /// Web サーバーが参照するパラメーターを初期値に戻す
    async fn baseline_parameters(&self) -> Result<(), StepError> {
        let parameters = [
            (&self.names.ssm_table_name_key, self.names.table_name.as_str()),
            (&self.names.ssm_failure_response_key, "none"),
            (&self.names.ssm_health_check_key, "shallow"),
        ];
        for (name, value) in parameters {
            self.operations.put_parameter(name, value, true).await?;
            debug!(parameter = %name, value, "パラメーターを設定しました");
        }
        Ok(())
    }

    async fn create_launch_template(&self, ctx: &mut ExecutionContext) -> Result<(), StepError> {
        let image_id = self.operations.get_parameter(LATEST_AMI_PARAMETER).await?;
        let spec = LaunchTemplateSpec {
            name: self.names.launch_template_name.clone(),
            instance_type: self.instance_type.clone(),
            image_id,
            instance_profile_name: self.names.instance_profile_name.clone(),
            user_data: self.resources.startup_script.clone(),
            key_name: self.names.key_pair_name.clone(),
        };
        let id = self.operations.create_launch_template(&spec).await?;
        info!(template = %spec.name, %id, image = %spec.image_id, "起動テンプレートを作成しました");
        ctx.insert(keys::LAUNCH_TEMPLATE_ID, id);
        Ok(())
    }

    /// インスタンスプロファイルの反映に時間がかかるため、作成をリトライする
    async fn create_auto_scaling_group(&self, ctx: &mut ExecutionContext) -> Result<(), StepError> {
        let zones = self.operations.describe_availability_zones().await?;
        ctx.set(keys::AVAILABILITY_ZONE_NAMES, &zones)?;

        let spec = AutoScalingGroupSpec {
            name: self.names.auto_scaling_group_name.clone(),
            availability_zones: zones,
            launch_template_name: self.names.launch_template_name.clone(),
            min_size: GROUP_SIZE,
            max_size: GROUP_SIZE,
        };
        retry(&self.retry.auto_scaling_group, || {
            self.operations.create_auto_scaling_group(&spec)
        })
        .await?;
        Ok(())
    }

    async fn get_vpc(&self, ctx: &mut ExecutionContext) -> Result<(), StepError> {
        let vpc_id = self.operations.describe_default_vpc().await?;
        ctx.insert(keys::DEFAULT_VPC, vpc_id);
        Ok(())
    }

    async fn get_subnets(&self, ctx: &mut ExecutionContext) -> Result<(), StepError> {
        let vpc_id = ctx.require_str(keys::DEFAULT_VPC)?;
        let zones: Vec<String> = ctx.get_as(keys::AVAILABILITY_ZONE_NAMES)?;
        let subnets = self.operations.describe_default_subnets(vpc_id, &zones).await?;
        ctx.set(keys::SUBNETS, subnets)?;
        Ok(())
    }

    async fn create_target_group(&self, ctx: &mut ExecutionContext) -> Result<(), StepError> {
        let spec = TargetGroupSpec {
            name: self.names.target_group_name.clone(),
            protocol: "HTTP".to_string(),
            port: HTTP_PORT,
            health_check_path: "/healthcheck".to_string(),
            health_check_interval_secs: 10,
            health_check_timeout_secs: 5,
            healthy_threshold: 2,
            unhealthy_threshold: 2,
            vpc_id: ctx.require_str(keys::DEFAULT_VPC)?.to_string(),
        };
        let group = self.operations.create_target_group(&spec).await?;
        ctx.insert(keys::TARGET_GROUP_ARN, group.arn);
        ctx.insert(keys::TARGET_GROUP_PROTOCOL, group.protocol);
        ctx.insert(keys::TARGET_GROUP_PORT, group.port);
        Ok(())
    }

    async fn create_load_balancer(&self, ctx: &mut ExecutionContext) -> Result<(), StepError> {
        let subnets: Vec<String> = ctx.get_as(keys::SUBNETS)?;
        let name = &self.names.load_balancer_name;
        let balancer = self.operations.create_load_balancer(name, &subnets).await?;
        ctx.insert(keys::LOAD_BALANCER_DNS, balancer.dns_name);
        ctx.insert(keys::LOAD_BALANCER_ARN, balancer.arn);
        self.operations.wait_until_load_balancer_available(name).await?;
        Ok(())
    }

    async fn create_listener(&self, ctx: &mut ExecutionContext) -> Result<(), StepError> {
        let spec = ListenerSpec {
            load_balancer_arn: ctx.require_str(keys::LOAD_BALANCER_ARN)?.to_string(),
            protocol: ctx.require_str(keys::TARGET_GROUP_PROTOCOL)?.to_string(),
            port: ctx.get_as(keys::TARGET_GROUP_PORT)?,
            target_group_arn: ctx.require_str(keys::TARGET_GROUP_ARN)?.to_string(),
        };
        let arn = self.operations.create_listener(&spec).await?;
        ctx.insert(keys::LB_LISTENER_ARN, arn);
        Ok(())
    }

    async fn attach_target_group(&self, ctx: &mut ExecutionContext) -> Result<(), StepError> {
        let target_group_arn = ctx.require_str(keys::TARGET_GROUP_ARN)?.to_string();
        self.operations
            .attach_load_balancer_target_groups(&self.names.auto_scaling_group_name, &[target_group_arn])
            .await?;
        Ok(())
    }

    async fn verify_inbound_port(&self, ctx: &mut ExecutionContext) -> Result<(), StepError> {
        let group = self.operations.describe_security_group(DEFAULT_SECURITY_GROUP).await?;
        let my_ip = self.probe.public_ip().await?;
        let rules = rules_allowing(&group, &my_ip);
        debug!(group = %group.group_id, ip = %my_ip, matching = rules.len(), "インバウンドルールを確認しました");

        ctx.set(keys::DEFAULT_SECURITY_GROUP, &group)?;
        ctx.insert(keys::MY_IP, my_ip);
        ctx.set(keys::MY_IP_RULES, rules)?;
        Ok(())
    }

    async fn add_inbound_rule(&self, ctx: &mut ExecutionContext) -> Result<(), StepError> {
        if ctx.get_bool(keys::SHOULD_ADD_INBOUND_RULE) != Some(true) {
            return Ok(());
        }

        let group: SecurityGroup = ctx.get_as(keys::DEFAULT_SECURITY_GROUP)?;
        let rule = IngressRule {
            group_id: group.group_id,
            cidr: format!("{}/32", ctx.require_str(keys::MY_IP)?),
            ip_protocol: "tcp".to_string(),
            from_port: HTTP_PORT,
            to_port: HTTP_PORT,
        };
        self.operations.authorize_ingress(&rule).await?;
        info!(cidr = %rule.cidr, "インバウンドルールを追加しました");
        Ok(())
    }

    /// 疎通確認の失敗はシナリオを止めず、コンテキストに記録する
    async fn verify_endpoint(&self, ctx: &mut ExecutionContext) -> Result<(), StepError> {
        let url = format!("http://{}", ctx.require_str(keys::LOAD_BALANCER_DNS)?);

        match retry(&self.retry.endpoint, || self.probe.get(&url)).await {
            Ok(response) => {
                ctx.insert(keys::ENDPOINT_RESPONSE, pretty_body(response.body));
            }
            Err(err) => {
                warn!(%url, error = %err, "エンドポイントが応答しませんでした");
                ctx.insert(keys::VERIFY_ENDPOINT_ERROR, err.to_string());
            }
        }
        Ok(())
    }
}

/// 自分のIPアドレス（または全アドレス）から tcp/80 への受信を許可するルール
fn rules_allowing(group: &SecurityGroup, my_ip: &str) -> Vec<IpPermission> {
    group
        .ip_permissions
        .iter()
        .filter(|p| {
            p.ip_ranges
                .iter()
                .any(|cidr| cidr.starts_with(my_ip) || cidr == "0.0.0.0/0")
        })
        .filter(|p| p.ip_protocol == "tcp")
        .filter(|p| p.from_port == HTTP_PORT)
        .cloned()
        .collect()
}

/// JSON の応答本文は整形し、それ以外はそのまま返す
fn pretty_body(body: String) -> String {
    serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or(body)
}

/// デプロイシナリオの Action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployTask {
    CreateTable,
    PopulateTable,
    CreateKeyPair,
    CreateInstancePolicy,
    CreateInstanceRole,
    AttachPolicyToRole,
    CreateInstanceProfile,
    AddRoleToInstanceProfile,
    BaselineParameters,
    CreateLaunchTemplate,
    CreateAutoScalingGroup,
    GetVpc,
    GetSubnets,
    CreateTargetGroup,
    CreateLoadBalancer,
    CreateListener,
    AttachTargetGroup,
    VerifyInboundPort,
    AddInboundRule,
    VerifyEndpoint,
}

impl DeployTask {
    /// ステップ名
    pub fn step_name(self) -> &'static str {
        match self {
            Self::CreateTable => "createTable",
            Self::PopulateTable => "populateTable",
            Self::CreateKeyPair => "createKeyPair",
            Self::CreateInstancePolicy => "createInstancePolicy",
            Self::CreateInstanceRole => "createInstanceRole",
            Self::AttachPolicyToRole => "attachPolicyToRole",
            Self::CreateInstanceProfile => "createInstanceProfile",
            Self::AddRoleToInstanceProfile => "addRoleToInstanceProfile",
            Self::BaselineParameters => "baselineSsmParams",
            Self::CreateLaunchTemplate => "createLaunchTemplate",
            Self::CreateAutoScalingGroup => "createAutoScalingGroup",
            Self::GetVpc => "getVpc",
            Self::GetSubnets => "getSubnets",
            Self::CreateTargetGroup => "createLBTargetGroup",
            Self::CreateLoadBalancer => "createLoadBalancer",
            Self::CreateListener => "createListener",
            Self::AttachTargetGroup => "attachLoadBalancerTargetGroup",
            Self::VerifyInboundPort => "verifyInboundPort",
            Self::AddInboundRule => "addInboundRule",
            Self::VerifyEndpoint => "verifyEndpoint",
        }
    }
}

/// [`DeployTask`] を実行する Action ハンドラー
pub struct DeployAction {
    task: DeployTask,
    env: Arc<DeployEnv>,
}

impl DeployAction {
    pub fn new(task: DeployTask, env: Arc<DeployEnv>) -> Self {
        Self { task, env }
    }

    /// 対応するステップを生成
    pub fn step(task: DeployTask, env: &Arc<DeployEnv>) -> Step {
        Step::action(task.step_name(), Self::new(task, Arc::clone(env)))
    }
}

#[async_trait]
impl ActionHandler for DeployAction {
    async fn run(&self, ctx: &mut ExecutionContext) -> Result<ActionOutcome, StepError> {
        let env = &self.env;
        match self.task {
            DeployTask::CreateTable => env.create_table().await?,
            DeployTask::PopulateTable => env.populate_table(ctx).await?,
            DeployTask::CreateKeyPair => env.create_key_pair(ctx).await?,
            DeployTask::CreateInstancePolicy => env.create_instance_policy(ctx).await?,
            DeployTask::CreateInstanceRole => env.create_instance_role().await?,
            DeployTask::AttachPolicyToRole => env.attach_policy_to_role(ctx).await?,
            DeployTask::CreateInstanceProfile => env.create_instance_profile(ctx).await?,
            DeployTask::AddRoleToInstanceProfile => env.add_role_to_instance_profile().await?,
            DeployTask::BaselineParameters => env.baseline_parameters().await?,
            DeployTask::CreateLaunchTemplate => env.create_launch_template(ctx).await?,
            DeployTask::CreateAutoScalingGroup => env.create_auto_scaling_group(ctx).await?,
            DeployTask::GetVpc => env.get_vpc(ctx).await?,
            DeployTask::GetSubnets => env.get_subnets(ctx).await?,
            DeployTask::CreateTargetGroup => env.create_target_group(ctx).await?,
            DeployTask::CreateLoadBalancer => env.create_load_balancer(ctx).await?,
            DeployTask::CreateListener => env.create_listener(ctx).await?,
            DeployTask::AttachTargetGroup => env.attach_target_group(ctx).await?,
            DeployTask::VerifyInboundPort => env.verify_inbound_port(ctx).await?,
            DeployTask::AddInboundRule => env.add_inbound_rule(ctx).await?,
            DeployTask::VerifyEndpoint => env.verify_endpoint(ctx).await?,
        }
        Ok(ActionOutcome::Continue)
    }
}

/// 確認ステップで `false` が入力されていれば中断する
fn abort_if_declined(gate: &'static str) -> impl Fn(&mut ExecutionContext) -> Result<ActionOutcome, StepError> {
    move |ctx| match ctx.get_bool(gate) {
        Some(false) => Ok(ActionOutcome::declined(gate)),
        _ => Ok(ActionOutcome::Continue),
    }
}

/// デプロイシナリオを組み立てる
pub fn deploy_scenario(env: Arc<DeployEnv>) -> Scenario {
    let names = env.names.clone();
    let n = &names;

    Scenario::builder(SCENARIO_NAME)
        .expects(keys::CONFIRM_DEPLOYMENT, "confirmDeployment: デプロイを続行するか")
        .expects(keys::POPULATED_ITEM_COUNT, "populateTable: テーブルに書き込んだ項目数")
        .expects(keys::KEY_PAIR_FILE, "createKeyPair: 秘密鍵を保存したパス")
        .expects(keys::INSTANCE_POLICY_ARN, "createInstancePolicy: ポリシーの ARN")
        .expects(keys::INSTANCE_PROFILE_ARN, "createInstanceProfile: インスタンスプロファイルの ARN")
        .expects(keys::LAUNCH_TEMPLATE_ID, "createLaunchTemplate: 起動テンプレートの ID")
        .expects(keys::AVAILABILITY_ZONE_NAMES, "createAutoScalingGroup: アベイラビリティゾーン名")
        .expects(keys::CONFIRM_CONTINUE, "confirmContinue: ロードバランサーの作成に進むか")
        .expects(keys::DEFAULT_VPC, "getVpc: デフォルト VPC の ID")
        .expects(keys::SUBNETS, "getSubnets: サブネット ID")
        .expects(keys::TARGET_GROUP_ARN, "createLBTargetGroup: ターゲットグループの ARN")
        .expects(keys::TARGET_GROUP_PROTOCOL, "createLBTargetGroup: ターゲットグループのプロトコル")
        .expects(keys::TARGET_GROUP_PORT, "createLBTargetGroup: ターゲットグループのポート")
        .expects(keys::LOAD_BALANCER_DNS, "createLoadBalancer: ロードバランサーの DNS 名")
        .expects(keys::LOAD_BALANCER_ARN, "createLoadBalancer: ロードバランサーの ARN")
        .expects(keys::LB_LISTENER_ARN, "createListener: リスナーの ARN")
        .expects(keys::DEFAULT_SECURITY_GROUP, "verifyInboundPort: デフォルトセキュリティグループ")
        .expects(keys::MY_IP, "verifyInboundPort: 自分のグローバル IP アドレス")
        .expects(keys::MY_IP_RULES, "verifyInboundPort: 自分の IP から tcp/80 を許可するルール")
        .expects(keys::SHOULD_ADD_INBOUND_RULE, "shouldAddInboundRule: ルールを追加するか（ルールがあれば未設定）")
        .expects(keys::ENDPOINT_RESPONSE, "verifyEndpoint: エンドポイントの応答（整形済み）")
        .expects(keys::VERIFY_ENDPOINT_ERROR, "verifyEndpoint: 疎通確認に失敗した場合のエラー")
        // 確認
        .header("introduction", msg::INTRODUCTION)
        .confirm(keys::CONFIRM_DEPLOYMENT, msg::CONFIRM_DEPLOYMENT)
        .action_fn("handleConfirmDeployment", abort_if_declined(keys::CONFIRM_DEPLOYMENT))
        // テーブル
        .output("creatingTable", fill(msg::CREATING_TABLE, &[("TABLE_NAME", &n.table_name)]))
        .step(DeployAction::step(DeployTask::CreateTable, &env))
        .output("createdTable", fill(msg::CREATED_TABLE, &[("TABLE_NAME", &n.table_name)]))
        .output("populatingTable", fill(msg::POPULATING_TABLE, &[("TABLE_NAME", &n.table_name)]))
        .step(DeployAction::step(DeployTask::PopulateTable, &env))
        .output_fn("populatedTable", {
            let table = n.table_name.clone();
            move |ctx| {
                let count: usize = ctx.get_as(keys::POPULATED_ITEM_COUNT)?;
                Ok(Some(fill(
                    msg::POPULATED_TABLE,
                    &[("ITEM_COUNT", &count.to_string()), ("TABLE_NAME", &table)],
                )))
            }
        })
        // キーペア
        .output("creatingKeyPair", fill(msg::CREATING_KEY_PAIR, &[("KEY_PAIR_NAME", &n.key_pair_name)]))
        .step(DeployAction::step(DeployTask::CreateKeyPair, &env))
        .output_fn("createdKeyPair", {
            let key_pair = n.key_pair_name.clone();
            move |ctx| {
                Ok(Some(fill(
                    msg::CREATED_KEY_PAIR,
                    &[("KEY_PAIR_NAME", &key_pair), ("KEY_FILE", ctx.require_str(keys::KEY_PAIR_FILE)?)],
                )))
            }
        })
        // ポリシー・ロール・プロファイル
        .output(
            "creatingInstancePolicy",
            fill(msg::CREATING_INSTANCE_POLICY, &[("INSTANCE_POLICY_NAME", &n.instance_policy_name)]),
        )
        .step(DeployAction::step(DeployTask::CreateInstancePolicy, &env))
        .output_fn("createdInstancePolicy", {
            let policy = n.instance_policy_name.clone();
            move |ctx| {
                Ok(Some(fill(
                    msg::CREATED_INSTANCE_POLICY,
                    &[
                        ("INSTANCE_POLICY_NAME", &policy),
                        ("INSTANCE_POLICY_ARN", ctx.require_str(keys::INSTANCE_POLICY_ARN)?),
                    ],
                )))
            }
        })
        .output(
            "creatingInstanceRole",
            fill(msg::CREATING_INSTANCE_ROLE, &[("INSTANCE_ROLE_NAME", &n.instance_role_name)]),
        )
        .step(DeployAction::step(DeployTask::CreateInstanceRole, &env))
        .output(
            "createdInstanceRole",
            fill(msg::CREATED_INSTANCE_ROLE, &[("INSTANCE_ROLE_NAME", &n.instance_role_name)]),
        )
        .output(
            "attachingPolicyToRole",
            fill(
                msg::ATTACHING_POLICY_TO_ROLE,
                &[
                    ("INSTANCE_ROLE_NAME", &n.instance_role_name),
                    ("INSTANCE_POLICY_NAME", &n.instance_policy_name),
                ],
            ),
        )
        .step(DeployAction::step(DeployTask::AttachPolicyToRole, &env))
        .output(
            "attachedPolicyToRole",
            fill(
                msg::ATTACHED_POLICY_TO_ROLE,
                &[
                    ("INSTANCE_POLICY_NAME", &n.instance_policy_name),
                    ("INSTANCE_ROLE_NAME", &n.instance_role_name),
                ],
            ),
        )
        .output(
            "creatingInstanceProfile",
            fill(msg::CREATING_INSTANCE_PROFILE, &[("INSTANCE_PROFILE_NAME", &n.instance_profile_name)]),
        )
        .step(DeployAction::step(DeployTask::CreateInstanceProfile, &env))
        .output_fn("createdInstanceProfile", {
            let profile = n.instance_profile_name.clone();
            move |ctx| {
                Ok(Some(fill(
                    msg::CREATED_INSTANCE_PROFILE,
                    &[
                        ("INSTANCE_PROFILE_NAME", &profile),
                        ("INSTANCE_PROFILE_ARN", ctx.require_str(keys::INSTANCE_PROFILE_ARN)?),
                    ],
                )))
            }
        })
        .output(
            "addingRoleToInstanceProfile",
            fill(
                msg::ADDING_ROLE_TO_INSTANCE_PROFILE,
                &[
                    ("INSTANCE_PROFILE_NAME", &n.instance_profile_name),
                    ("INSTANCE_ROLE_NAME", &n.instance_role_name),
                ],
            ),
        )
        .step(DeployAction::step(DeployTask::AddRoleToInstanceProfile, &env))
        .output(
            "addedRoleToInstanceProfile",
            fill(
                msg::ADDED_ROLE_TO_INSTANCE_PROFILE,
                &[
                    ("INSTANCE_PROFILE_NAME", &n.instance_profile_name),
                    ("INSTANCE_ROLE_NAME", &n.instance_role_name),
                ],
            ),
        )
        // パラメーター・起動テンプレート・オートスケーリンググループ
        .output("baseliningSsmParams", msg::BASELINING_PARAMETERS)
        .step(DeployAction::step(DeployTask::BaselineParameters, &env))
        .output("creatingLaunchTemplate", msg::CREATING_LAUNCH_TEMPLATE)
        .step(DeployAction::step(DeployTask::CreateLaunchTemplate, &env))
        .output_fn("createdLaunchTemplate", {
            let template = n.launch_template_name.clone();
            move |ctx| {
                Ok(Some(fill(
                    msg::CREATED_LAUNCH_TEMPLATE,
                    &[
                        ("LAUNCH_TEMPLATE_NAME", &template),
                        ("LAUNCH_TEMPLATE_ID", ctx.require_str(keys::LAUNCH_TEMPLATE_ID)?),
                    ],
                )))
            }
        })
        .output(
            "creatingAutoScalingGroup",
            fill(
                msg::CREATING_AUTO_SCALING_GROUP,
                &[("AUTO_SCALING_GROUP_NAME", &n.auto_scaling_group_name)],
            ),
        )
        .step(DeployAction::step(DeployTask::CreateAutoScalingGroup, &env))
        .output_fn("createdAutoScalingGroup", {
            let group = n.auto_scaling_group_name.clone();
            move |ctx| {
                let zones: Vec<String> = ctx.get_as(keys::AVAILABILITY_ZONE_NAMES)?;
                Ok(Some(fill(
                    msg::CREATED_AUTO_SCALING_GROUP,
                    &[("AUTO_SCALING_GROUP_NAME", &group), ("AVAILABILITY_ZONE_NAMES", &zones.join(", "))],
                )))
            }
        })
        .confirm(keys::CONFIRM_CONTINUE, msg::CONFIRM_CONTINUE)
        .action_fn("handleConfirmContinue", abort_if_declined(keys::CONFIRM_CONTINUE))
        // ネットワーク
        .output("loadBalancer", msg::LOAD_BALANCER)
        .output("gettingVpc", msg::GETTING_VPC)
        .step(DeployAction::step(DeployTask::GetVpc, &env))
        .output_fn("gotVpc", |ctx| {
            Ok(Some(fill(msg::GOT_VPC, &[("VPC_ID", ctx.require_str(keys::DEFAULT_VPC)?)])))
        })
        .output("gettingSubnets", msg::GETTING_SUBNETS)
        .step(DeployAction::step(DeployTask::GetSubnets, &env))
        .output_fn("gotSubnets", |ctx| {
            let subnets: Vec<String> = ctx.get_as(keys::SUBNETS)?;
            Ok(Some(fill(msg::GOT_SUBNETS, &[("SUBNETS", &subnets.join(", "))])))
        })
        // ロードバランサー
        .output(
            "creatingLBTargetGroup",
            fill(msg::CREATING_TARGET_GROUP, &[("TARGET_GROUP_NAME", &n.target_group_name)]),
        )
        .step(DeployAction::step(DeployTask::CreateTargetGroup, &env))
        .output(
            "createdLBTargetGroup",
            fill(msg::CREATED_TARGET_GROUP, &[("TARGET_GROUP_NAME", &n.target_group_name)]),
        )
        .output("creatingLoadBalancer", fill(msg::CREATING_LOAD_BALANCER, &[("LB_NAME", &n.load_balancer_name)]))
        .step(DeployAction::step(DeployTask::CreateLoadBalancer, &env))
        .output_fn("createdLoadBalancer", {
            let balancer = n.load_balancer_name.clone();
            move |ctx| {
                Ok(Some(fill(
                    msg::CREATED_LOAD_BALANCER,
                    &[("LB_NAME", &balancer), ("DNS_NAME", ctx.require_str(keys::LOAD_BALANCER_DNS)?)],
                )))
            }
        })
        .output(
            "creatingListener",
            fill(
                msg::CREATING_LISTENER,
                &[("LB_NAME", &n.load_balancer_name), ("TARGET_GROUP_NAME", &n.target_group_name)],
            ),
        )
        .step(DeployAction::step(DeployTask::CreateListener, &env))
        .output_fn("createdListener", |ctx| {
            Ok(Some(fill(
                msg::CREATED_LISTENER,
                &[("LB_LISTENER_ARN", ctx.require_str(keys::LB_LISTENER_ARN)?)],
            )))
        })
        .output(
            "attachingLoadBalancerTargetGroup",
            fill(
                msg::ATTACHING_TARGET_GROUP,
                &[
                    ("TARGET_GROUP_NAME", &n.target_group_name),
                    ("AUTO_SCALING_GROUP_NAME", &n.auto_scaling_group_name),
                ],
            ),
        )
        .step(DeployAction::step(DeployTask::AttachTargetGroup, &env))
        .output("attachedLoadBalancerTargetGroup", msg::ATTACHED_TARGET_GROUP)
        // インバウンドルール
        .output("verifyingInboundPort", msg::VERIFYING_INBOUND_PORT)
        .step(DeployAction::step(DeployTask::VerifyInboundPort, &env))
        .output_fn("verifiedInboundPort", |ctx| {
            let rules: Vec<IpPermission> = ctx.get_as(keys::MY_IP_RULES)?;
            if rules.is_empty() {
                return Ok(Some(fill(msg::NO_IP_RULES, &[("IP_ADDRESS", ctx.require_str(keys::MY_IP)?)])));
            }
            let rendered = serde_json::to_string_pretty(&rules)
                .map_err(|e| StepError::Failed(format!("ルールを表示できません: {e}")))?;
            Ok(Some(fill(msg::FOUND_IP_RULES, &[("IP_RULES", &rendered)])))
        })
        .input(
            keys::SHOULD_ADD_INBOUND_RULE,
            Message::computed(|ctx| {
                if ctx.is_truthy(keys::MY_IP_RULES) {
                    return Ok(None);
                }
                Ok(Some(fill(
                    msg::SHOULD_ADD_INBOUND_RULE,
                    &[("IP_ADDRESS", ctx.require_str(keys::MY_IP)?)],
                )))
            }),
            InputOptions::confirm(),
        )
        .step(DeployAction::step(DeployTask::AddInboundRule, &env))
        .output_fn("addedInboundRule", |ctx| {
            if ctx.get_bool(keys::SHOULD_ADD_INBOUND_RULE) != Some(true) {
                return Ok(None);
            }
            Ok(Some(fill(msg::ADDED_INBOUND_RULE, &[("IP_ADDRESS", ctx.require_str(keys::MY_IP)?)])))
        })
        // 疎通確認
        .output_fn("verifyingEndpoint", |ctx| {
            Ok(Some(fill(
                msg::VERIFYING_ENDPOINT,
                &[("DNS_NAME", ctx.require_str(keys::LOAD_BALANCER_DNS)?)],
            )))
        })
        .step(DeployAction::step(DeployTask::VerifyEndpoint, &env))
        .output_fn("verifiedEndpoint", |ctx| {
            if let Some(error) = ctx.get(keys::VERIFY_ENDPOINT_ERROR).and_then(Value::as_str) {
                return Ok(Some(fill(msg::ENDPOINT_UNREACHABLE, &[("ERROR", error)])));
            }
            Ok(Some(fill(
                msg::VERIFIED_ENDPOINT,
                &[("ENDPOINT_RESPONSE", ctx.require_str(keys::ENDPOINT_RESPONSE)?)],
            )))
        })
        .build()
}
