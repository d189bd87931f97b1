use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_ec2::Client;
use aws_sdk_ec2::operation::describe_instances::DescribeInstancesOutput;
use aws_sdk_ec2::operation::describe_security_groups::DescribeSecurityGroupsOutput;
use aws_sdk_ec2::operation::describe_subnets::DescribeSubnetsOutput;
use aws_sdk_ec2::operation::run_instances::RunInstancesOutput;
use aws_sdk_ec2::operation::terminate_instances::TerminateInstancesOutput;
use aws_sdk_ec2::types::{InstanceType, Placement, Tenancy};
use tracing::{debug, info};

use super::{
    AuthorizeRequest, CreateSecurityGroupRequest, CreateTagsRequest, DescribeInstancesRequest,
    DescribeSecurityGroupsRequest, DescribeSubnetsRequest, Ec2Api, InstanceIdsRequest,
    RunInstancesRequest,
};
use crate::error::{ApiError, ApiResult};

/// `Ec2Api` backed by the AWS SDK.
pub struct Ec2Client {
    client: Client,
    region: String,
}

impl Ec2Client {
    /// Creates a new EC2 client with AWS SDK configuration
    ///
    /// Region resolution priority:
    /// 1. Explicit region from Config (--region CLI arg or AWS_REGION env var)
    /// 2. AWS SDK defaults (environment variables, ~/.aws/config, IMDS)
    pub async fn new(region: Option<&str>, profile: Option<&str>) -> Self {
        let config = Self::load_aws_config(region, profile).await;
        let region_name = config
            .region()
            .map(|r| r.as_ref())
            .unwrap_or("unknown")
            .to_string();

        info!(
            region = %region_name,
            profile = profile.unwrap_or("default"),
            "AWS EC2 client initialized"
        );

        Self {
            client: Client::new(&config),
            region: region_name,
        }
    }

    async fn load_aws_config(region: Option<&str>, profile: Option<&str>) -> aws_config::SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(r) = region {
            debug!(region = %r, "Using explicit AWS region from configuration");
            loader = loader.region(aws_config::Region::new(r.to_string()));
        }
        if let Some(p) = profile {
            debug!(profile = %p, "Using named AWS profile");
            loader = loader.profile_name(p);
        }

        loader.load().await
    }

    pub fn region(&self) -> &str {
        &self.region
    }
}

#[async_trait]
impl Ec2Api for Ec2Client {
    async fn describe_instances(
        &self,
        request: DescribeInstancesRequest,
    ) -> ApiResult<DescribeInstancesOutput> {
        debug!(
            instance_ids = ?request.instance_ids,
            filter_count = request.filters.len(),
            dry_run = request.dry_run,
            api_action = "DescribeInstances",
            "Sending request to AWS EC2 API"
        );

        let mut call = self.client.describe_instances().dry_run(request.dry_run);
        if !request.instance_ids.is_empty() {
            call = call.set_instance_ids(Some(request.instance_ids));
        }
        if !request.filters.is_empty() {
            call = call.set_filters(Some(request.filters));
        }

        call.send()
            .await
            .map_err(|e| ApiError::from_sdk("DescribeInstances", e))
    }

    async fn run_instances(&self, request: RunInstancesRequest) -> ApiResult<RunInstancesOutput> {
        debug!(
            image_id = %request.image_id,
            instance_type = %request.instance_type,
            availability_zone = ?request.availability_zone,
            dry_run = request.dry_run,
            api_action = "RunInstances",
            "Sending request to AWS EC2 API"
        );

        let mut call = self
            .client
            .run_instances()
            .image_id(request.image_id)
            .instance_type(InstanceType::from(request.instance_type.as_str()))
            .min_count(1)
            .max_count(1)
            .dry_run(request.dry_run)
            .set_key_name(request.key_name);

        if !request.security_group_ids.is_empty() {
            call = call.set_security_group_ids(Some(request.security_group_ids));
        }
        if let Some(zone) = request.availability_zone {
            call = call.placement(
                Placement::builder()
                    .availability_zone(zone)
                    .tenancy(Tenancy::Default)
                    .build(),
            );
        }
        if !request.block_device_mappings.is_empty() {
            call = call.set_block_device_mappings(Some(request.block_device_mappings));
        }

        call.send()
            .await
            .map_err(|e| ApiError::from_sdk("RunInstances", e))
    }

    async fn terminate_instances(
        &self,
        request: InstanceIdsRequest,
    ) -> ApiResult<TerminateInstancesOutput> {
        info!(
            instance_ids = ?request.instance_ids,
            region = %self.region,
            dry_run = request.dry_run,
            api_action = "TerminateInstances",
            "Sending terminate request to AWS EC2 API"
        );

        self.client
            .terminate_instances()
            .set_instance_ids(Some(request.instance_ids))
            .dry_run(request.dry_run)
            .send()
            .await
            .map_err(|e| ApiError::from_sdk("TerminateInstances", e))
    }

    async fn reboot_instances(&self, request: InstanceIdsRequest) -> ApiResult<()> {
        info!(
            instance_ids = ?request.instance_ids,
            region = %self.region,
            dry_run = request.dry_run,
            api_action = "RebootInstances",
            "Sending reboot request to AWS EC2 API"
        );

        self.client
            .reboot_instances()
            .set_instance_ids(Some(request.instance_ids))
            .dry_run(request.dry_run)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| ApiError::from_sdk("RebootInstances", e))
    }

    async fn create_tags(&self, request: CreateTagsRequest) -> ApiResult<()> {
        debug!(
            resource_ids = ?request.resource_ids,
            tag_count = request.tags.len(),
            api_action = "CreateTags",
            "Sending request to AWS EC2 API"
        );

        self.client
            .create_tags()
            .set_resources(Some(request.resource_ids))
            .set_tags(Some(request.tags))
            .send()
            .await
            .map(|_| ())
            .map_err(|e| ApiError::from_sdk("CreateTags", e))
    }

    async fn describe_subnets(
        &self,
        request: DescribeSubnetsRequest,
    ) -> ApiResult<DescribeSubnetsOutput> {
        debug!(
            filter_count = request.filters.len(),
            api_action = "DescribeSubnets",
            "Sending request to AWS EC2 API"
        );

        self.client
            .describe_subnets()
            .set_filters(Some(request.filters))
            .send()
            .await
            .map_err(|e| ApiError::from_sdk("DescribeSubnets", e))
    }

    async fn describe_security_groups(
        &self,
        request: DescribeSecurityGroupsRequest,
    ) -> ApiResult<DescribeSecurityGroupsOutput> {
        debug!(
            filter_count = request.filters.len(),
            dry_run = request.dry_run,
            api_action = "DescribeSecurityGroups",
            "Sending request to AWS EC2 API"
        );

        let mut call = self
            .client
            .describe_security_groups()
            .dry_run(request.dry_run);
        if !request.filters.is_empty() {
            call = call.set_filters(Some(request.filters));
        }

        call.send()
            .await
            .map_err(|e| ApiError::from_sdk("DescribeSecurityGroups", e))
    }

    async fn create_security_group(
        &self,
        request: CreateSecurityGroupRequest,
    ) -> ApiResult<Option<String>> {
        info!(
            group_name = %request.group_name,
            dry_run = request.dry_run,
            api_action = "CreateSecurityGroup",
            "Sending request to AWS EC2 API"
        );

        self.client
            .create_security_group()
            .group_name(request.group_name)
            .description(request.description)
            .dry_run(request.dry_run)
            .send()
            .await
            .map(|output| output.group_id().map(str::to_string))
            .map_err(|e| ApiError::from_sdk("CreateSecurityGroup", e))
    }

    async fn authorize_ingress(&self, request: AuthorizeRequest) -> ApiResult<()> {
        debug!(
            group_id = %request.group_id,
            permission_count = request.ip_permissions.len(),
            api_action = "AuthorizeSecurityGroupIngress",
            "Sending request to AWS EC2 API"
        );

        self.client
            .authorize_security_group_ingress()
            .group_id(request.group_id)
            .set_ip_permissions(Some(request.ip_permissions))
            .send()
            .await
            .map(|_| ())
            .map_err(|e| ApiError::from_sdk("AuthorizeSecurityGroupIngress", e))
    }

    async fn authorize_egress(&self, request: AuthorizeRequest) -> ApiResult<()> {
        debug!(
            group_id = %request.group_id,
            permission_count = request.ip_permissions.len(),
            api_action = "AuthorizeSecurityGroupEgress",
            "Sending request to AWS EC2 API"
        );

        self.client
            .authorize_security_group_egress()
            .group_id(request.group_id)
            .set_ip_permissions(Some(request.ip_permissions))
            .send()
            .await
            .map(|_| ())
            .map_err(|e| ApiError::from_sdk("AuthorizeSecurityGroupEgress", e))
    }
}
