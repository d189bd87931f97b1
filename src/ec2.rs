//! Provider seam: the EC2 operations the facades depend on.
//!
//! Requests are small owned structs so fakes can record them; responses are
//! the SDK's own output shapes.

pub mod client;
pub mod response;
pub mod tags;

pub use client::Ec2Client;

use async_trait::async_trait;
use aws_sdk_ec2::operation::describe_instances::DescribeInstancesOutput;
use aws_sdk_ec2::operation::describe_security_groups::DescribeSecurityGroupsOutput;
use aws_sdk_ec2::operation::describe_subnets::DescribeSubnetsOutput;
use aws_sdk_ec2::operation::run_instances::RunInstancesOutput;
use aws_sdk_ec2::operation::terminate_instances::TerminateInstancesOutput;
use aws_sdk_ec2::types::{BlockDeviceMapping, Filter, IpPermission, Tag};

use crate::error::ApiResult;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescribeInstancesRequest {
    pub instance_ids: Vec<String>,
    pub filters: Vec<Filter>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunInstancesRequest {
    pub image_id: String,
    pub instance_type: String,
    pub key_name: Option<String>,
    pub security_group_ids: Vec<String>,
    pub availability_zone: Option<String>,
    pub block_device_mappings: Vec<BlockDeviceMapping>,
    pub dry_run: bool,
}

/// Shared by terminate and reboot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceIdsRequest {
    pub instance_ids: Vec<String>,
    pub dry_run: bool,
}

impl InstanceIdsRequest {
    pub fn single(instance_id: &str) -> Self {
        Self {
            instance_ids: vec![instance_id.to_string()],
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateTagsRequest {
    pub resource_ids: Vec<String>,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescribeSubnetsRequest {
    pub filters: Vec<Filter>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescribeSecurityGroupsRequest {
    pub filters: Vec<Filter>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateSecurityGroupRequest {
    pub group_name: String,
    pub description: String,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthorizeRequest {
    pub group_id: String,
    pub ip_permissions: Vec<IpPermission>,
}

/// Handle to the EC2 API. Every method is one request/response round trip.
///
/// Retries, signing and pagination are the implementation's concern.
#[async_trait]
pub trait Ec2Api: Send + Sync {
    async fn describe_instances(
        &self,
        request: DescribeInstancesRequest,
    ) -> ApiResult<DescribeInstancesOutput>;

    async fn run_instances(&self, request: RunInstancesRequest) -> ApiResult<RunInstancesOutput>;

    async fn terminate_instances(
        &self,
        request: InstanceIdsRequest,
    ) -> ApiResult<TerminateInstancesOutput>;

    async fn reboot_instances(&self, request: InstanceIdsRequest) -> ApiResult<()>;

    async fn create_tags(&self, request: CreateTagsRequest) -> ApiResult<()>;

    async fn describe_subnets(
        &self,
        request: DescribeSubnetsRequest,
    ) -> ApiResult<DescribeSubnetsOutput>;

    async fn describe_security_groups(
        &self,
        request: DescribeSecurityGroupsRequest,
    ) -> ApiResult<DescribeSecurityGroupsOutput>;

    /// Returns the new group's id when the provider reports one.
    async fn create_security_group(
        &self,
        request: CreateSecurityGroupRequest,
    ) -> ApiResult<Option<String>>;

    async fn authorize_ingress(&self, request: AuthorizeRequest) -> ApiResult<()>;

    async fn authorize_egress(&self, request: AuthorizeRequest) -> ApiResult<()>;
}

/// Builds a single-value filter.
pub fn filter(name: impl Into<String>, value: impl Into<String>) -> Filter {
    Filter::builder().name(name).values(value).build()
}
