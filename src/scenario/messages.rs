//! デプロイシナリオの表示メッセージ
//!
//! テンプレート中の `${NAME}` は [`fill`] で置き換えます。

pub const INTRODUCTION: &str = "\
Welcome to the resilient web service demo.

This scenario deploys a load-balanced web service backed by an auto scaling group
of instances. Each instance serves book, movie, and song recommendations from a
table. Once the service is up, you can send requests to its endpoint and watch
how the load balancer routes around failures.";

pub const CONFIRM_DEPLOYMENT: &str =
    "This will create resources that can incur charges to your account. Do you want to continue?";

pub const CREATING_TABLE: &str = "Creating table: ${TABLE_NAME}.";
pub const CREATED_TABLE: &str = "Created table: ${TABLE_NAME}.";
pub const POPULATING_TABLE: &str = "Populating table ${TABLE_NAME} with recommendations.";
pub const POPULATED_TABLE: &str = "Wrote ${ITEM_COUNT} items to ${TABLE_NAME}.";

pub const CREATING_KEY_PAIR: &str = "Creating key pair: ${KEY_PAIR_NAME}.";
pub const CREATED_KEY_PAIR: &str = "Created key pair ${KEY_PAIR_NAME} and saved the private key to ${KEY_FILE}.";

pub const CREATING_INSTANCE_POLICY: &str = "Creating instance policy: ${INSTANCE_POLICY_NAME}.";
pub const CREATED_INSTANCE_POLICY: &str = "Created instance policy ${INSTANCE_POLICY_NAME}: ${INSTANCE_POLICY_ARN}.";
pub const CREATING_INSTANCE_ROLE: &str = "Creating instance role: ${INSTANCE_ROLE_NAME}.";
pub const CREATED_INSTANCE_ROLE: &str = "Created instance role: ${INSTANCE_ROLE_NAME}.";
pub const ATTACHING_POLICY_TO_ROLE: &str =
    "Attaching policy ${INSTANCE_POLICY_NAME} to role ${INSTANCE_ROLE_NAME}.";
pub const ATTACHED_POLICY_TO_ROLE: &str = "Attached policy ${INSTANCE_POLICY_NAME} to role ${INSTANCE_ROLE_NAME}.";
pub const CREATING_INSTANCE_PROFILE: &str = "Creating instance profile: ${INSTANCE_PROFILE_NAME}.";
pub const CREATED_INSTANCE_PROFILE: &str =
    "Created instance profile ${INSTANCE_PROFILE_NAME}: ${INSTANCE_PROFILE_ARN}.";
pub const ADDING_ROLE_TO_INSTANCE_PROFILE: &str =
    "Adding role ${INSTANCE_ROLE_NAME} to instance profile ${INSTANCE_PROFILE_NAME}.";
pub const ADDED_ROLE_TO_INSTANCE_PROFILE: &str =
    "Added role ${INSTANCE_ROLE_NAME} to instance profile ${INSTANCE_PROFILE_NAME}.";

pub const BASELINING_PARAMETERS: &str = "Setting the parameters used by the web server to their starting values.";

pub const CREATING_LAUNCH_TEMPLATE: &str = "Creating launch template.";
pub const CREATED_LAUNCH_TEMPLATE: &str = "Created launch template ${LAUNCH_TEMPLATE_NAME} (${LAUNCH_TEMPLATE_ID}).";

pub const CREATING_AUTO_SCALING_GROUP: &str = "Creating auto scaling group: ${AUTO_SCALING_GROUP_NAME}.";
pub const CREATED_AUTO_SCALING_GROUP: &str =
    "Created auto scaling group ${AUTO_SCALING_GROUP_NAME} in availability zones: ${AVAILABILITY_ZONE_NAMES}.";

pub const CONFIRM_CONTINUE: &str = "The instances are starting. Continue with the load balancer setup?";

pub const LOAD_BALANCER: &str = "\
Next, a load balancer is created in front of the auto scaling group. It forwards
requests to healthy instances and stops sending traffic to instances that fail
their health checks.";

pub const GETTING_VPC: &str = "Getting the default VPC.";
pub const GOT_VPC: &str = "Found the default VPC: ${VPC_ID}.";
pub const GETTING_SUBNETS: &str = "Getting the default subnets for the availability zones.";
pub const GOT_SUBNETS: &str = "Found subnets: ${SUBNETS}.";

pub const CREATING_TARGET_GROUP: &str = "Creating load balancer target group: ${TARGET_GROUP_NAME}.";
pub const CREATED_TARGET_GROUP: &str = "Created load balancer target group: ${TARGET_GROUP_NAME}.";
pub const CREATING_LOAD_BALANCER: &str = "Creating load balancer: ${LB_NAME}.";
pub const CREATED_LOAD_BALANCER: &str = "Created load balancer ${LB_NAME}. Its endpoint is http://${DNS_NAME}.";
pub const CREATING_LISTENER: &str = "Creating a listener for ${LB_NAME} that forwards to ${TARGET_GROUP_NAME}.";
pub const CREATED_LISTENER: &str = "Created listener: ${LB_LISTENER_ARN}.";
pub const ATTACHING_TARGET_GROUP: &str =
    "Attaching target group ${TARGET_GROUP_NAME} to auto scaling group ${AUTO_SCALING_GROUP_NAME}.";
pub const ATTACHED_TARGET_GROUP: &str = "Attached the target group to the auto scaling group.";

pub const VERIFYING_INBOUND_PORT: &str = "Checking that the default security group allows inbound HTTP from your IP address.";
pub const FOUND_IP_RULES: &str = "Found inbound rules that allow your IP address on port 80:\n${IP_RULES}";
pub const NO_IP_RULES: &str = "No inbound rule allows your IP address (${IP_ADDRESS}) on port 80.";
pub const SHOULD_ADD_INBOUND_RULE: &str =
    "Do you want to add an inbound rule for ${IP_ADDRESS} to the default security group?";
pub const ADDED_INBOUND_RULE: &str = "Added an inbound rule allowing ${IP_ADDRESS} on port 80.";

pub const VERIFYING_ENDPOINT: &str = "Sending a request to http://${DNS_NAME} until the service responds.";
pub const VERIFIED_ENDPOINT: &str = "The endpoint responded:\n${ENDPOINT_RESPONSE}";
pub const ENDPOINT_UNREACHABLE: &str = "The endpoint did not respond: ${ERROR}";

/// `${KEY}` を値で置き換える
///
/// 対応する値のないプレースホルダーはそのまま残します。
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    values.iter().fold(template.to_string(), |text, (key, value)| {
        text.replace(&format!("${{{key}}}"), value)
    })
}
