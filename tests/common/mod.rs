//! In-memory `Ec2Api` that records every request.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use aws_sdk_ec2::operation::describe_instances::DescribeInstancesOutput;
use aws_sdk_ec2::operation::describe_security_groups::DescribeSecurityGroupsOutput;
use aws_sdk_ec2::operation::describe_subnets::DescribeSubnetsOutput;
use aws_sdk_ec2::operation::run_instances::RunInstancesOutput;
use aws_sdk_ec2::operation::terminate_instances::TerminateInstancesOutput;
use aws_sdk_ec2::types::{
    Filter, Instance, InstanceState, InstanceStateChange, InstanceStateName, Reservation,
    SecurityGroup, Subnet, Tag,
};

use ec2_adapter::ec2::{
    AuthorizeRequest, CreateSecurityGroupRequest, CreateTagsRequest, DescribeInstancesRequest,
    DescribeSecurityGroupsRequest, DescribeSubnetsRequest, Ec2Api, InstanceIdsRequest,
    RunInstancesRequest,
};
use ec2_adapter::ec2::tags::{DEFAULT_MARKER_TAG_KEY, DEFAULT_MARKER_TAG_VALUE};
use ec2_adapter::error::{ApiError, ApiResult};

/// Default marker tag, for instances the adapter manages.
pub const MARKER: (&str, &str) = (DEFAULT_MARKER_TAG_KEY, DEFAULT_MARKER_TAG_VALUE);

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    DescribeInstances(DescribeInstancesRequest),
    RunInstances(RunInstancesRequest),
    TerminateInstances(InstanceIdsRequest),
    RebootInstances(InstanceIdsRequest),
    CreateTags(CreateTagsRequest),
    DescribeSubnets(DescribeSubnetsRequest),
    DescribeSecurityGroups(DescribeSecurityGroupsRequest),
    CreateSecurityGroup(CreateSecurityGroupRequest),
    AuthorizeIngress(AuthorizeRequest),
    AuthorizeEgress(AuthorizeRequest),
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Call::RunInstances(_)
                | Call::TerminateInstances(_)
                | Call::RebootInstances(_)
                | Call::CreateTags(_)
                | Call::CreateSecurityGroup(_)
                | Call::AuthorizeIngress(_)
                | Call::AuthorizeEgress(_)
        )
    }

    pub fn is_dry_run(&self) -> bool {
        match self {
            Call::DescribeInstances(r) => r.dry_run,
            Call::RunInstances(r) => r.dry_run,
            Call::TerminateInstances(r) | Call::RebootInstances(r) => r.dry_run,
            Call::DescribeSecurityGroups(r) => r.dry_run,
            Call::CreateSecurityGroup(r) => r.dry_run,
            _ => false,
        }
    }

    /// Protocol of a single-permission authorize request.
    pub fn protocol(&self) -> Option<String> {
        match self {
            Call::AuthorizeIngress(r) | Call::AuthorizeEgress(r) => r
                .ip_permissions
                .first()
                .and_then(|p| p.ip_protocol())
                .map(str::to_string),
            _ => None,
        }
    }
}

#[derive(Default)]
pub struct FakeState {
    pub reservations: Vec<Reservation>,
    pub describe_instances_error: Option<ApiError>,
    pub launched: Vec<Instance>,
    pub terminating: Vec<InstanceStateChange>,
    pub subnets: Vec<Subnet>,
    pub groups: Vec<SecurityGroup>,
    /// Created groups are not returned by later describes.
    pub lose_created_groups: bool,
    /// Returned for blanket (`-1`) ingress rules.
    pub blanket_ingress_error: Option<ApiError>,
    /// Returned for blanket (`-1`) egress rules.
    pub blanket_egress_error: Option<ApiError>,
    /// Returned for ingress rules of the given protocol.
    pub protocol_ingress_error: Option<(String, ApiError)>,
    /// Returned for every dry run; defaults to `DryRunOperation`.
    pub dry_run_error: Option<ApiError>,
    /// Returned for dry runs of one operation, keyed by operation name.
    /// Takes precedence over `dry_run_error`.
    pub dry_run_errors: HashMap<&'static str, ApiError>,
    pub calls: Vec<Call>,
}

pub struct FakeEc2 {
    pub state: Mutex<FakeState>,
}

impl FakeEc2 {
    pub fn new() -> Self {
        Self::with(|_| {})
    }

    pub fn with(setup: impl FnOnce(&mut FakeState)) -> Self {
        let mut state = FakeState::default();
        setup(&mut state);
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub fn groups(&self) -> Vec<SecurityGroup> {
        self.state.lock().unwrap().groups.clone()
    }

    fn record(&self, call: Call) -> std::sync::MutexGuard<'_, FakeState> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        state
    }

    fn dry_run_result<T>(state: &FakeState, operation: &'static str) -> ApiResult<T> {
        if let Some(e) = state.dry_run_errors.get(operation) {
            return Err(e.clone());
        }
        Err(state.dry_run_error.clone().unwrap_or_else(|| {
            ApiError::new(
                operation,
                Some("DryRunOperation"),
                "Request would have succeeded, but DryRun flag is set.",
            )
        }))
    }
}

pub fn instance(id: &str, state: InstanceStateName, tags: &[(&str, &str)]) -> Instance {
    let mut builder = Instance::builder()
        .instance_id(id)
        .state(InstanceState::builder().name(state).build())
        .private_ip_address("10.0.0.10");
    for (key, value) in tags {
        builder = builder.tags(Tag::builder().key(*key).value(*value).build());
    }
    builder.build()
}

pub fn reservation(instances: Vec<Instance>) -> Reservation {
    Reservation::builder().set_instances(Some(instances)).build()
}

pub fn subnet(zone: &str) -> Subnet {
    Subnet::builder().availability_zone(zone).default_for_az(true).build()
}

pub fn api_error(operation: &'static str, code: &str) -> ApiError {
    ApiError::new(operation, Some(code), format!("{code}: rejected by fake"))
}

fn tag_filters_match(instance: &Instance, filters: &[Filter]) -> bool {
    filters.iter().all(|f| {
        let Some(key) = f.name().and_then(|n| n.strip_prefix("tag:")) else {
            return true;
        };
        instance.tags().iter().any(|t| {
            t.key() == Some(key) && t.value().is_some_and(|v| f.values().iter().any(|w| w == v))
        })
    })
}

fn group_name_filter(request: &DescribeSecurityGroupsRequest) -> Option<String> {
    request
        .filters
        .iter()
        .find(|f| f.name() == Some("group-name"))
        .and_then(|f| f.values().first().cloned())
}

#[async_trait]
impl Ec2Api for FakeEc2 {
    async fn describe_instances(
        &self,
        request: DescribeInstancesRequest,
    ) -> ApiResult<DescribeInstancesOutput> {
        let state = self.record(Call::DescribeInstances(request.clone()));
        if request.dry_run {
            return Self::dry_run_result(&state, "DescribeInstances");
        }
        if let Some(e) = &state.describe_instances_error {
            return Err(e.clone());
        }

        let reservations: Vec<Reservation> = state
            .reservations
            .iter()
            .filter_map(|r| {
                let instances: Vec<Instance> = r
                    .instances()
                    .iter()
                    .filter(|i| {
                        request.instance_ids.is_empty()
                            || i.instance_id()
                                .is_some_and(|id| request.instance_ids.iter().any(|w| w == id))
                    })
                    .filter(|i| tag_filters_match(i, &request.filters))
                    .cloned()
                    .collect();
                (!instances.is_empty()).then(|| reservation(instances))
            })
            .collect();

        Ok(DescribeInstancesOutput::builder()
            .set_reservations(Some(reservations))
            .build())
    }

    async fn run_instances(&self, request: RunInstancesRequest) -> ApiResult<RunInstancesOutput> {
        let dry_run = request.dry_run;
        let state = self.record(Call::RunInstances(request));
        if dry_run {
            return Self::dry_run_result(&state, "RunInstances");
        }
        Ok(RunInstancesOutput::builder()
            .set_instances(Some(state.launched.clone()))
            .build())
    }

    async fn terminate_instances(
        &self,
        request: InstanceIdsRequest,
    ) -> ApiResult<TerminateInstancesOutput> {
        let dry_run = request.dry_run;
        let state = self.record(Call::TerminateInstances(request));
        if dry_run {
            return Self::dry_run_result(&state, "TerminateInstances");
        }
        Ok(TerminateInstancesOutput::builder()
            .set_terminating_instances(Some(state.terminating.clone()))
            .build())
    }

    async fn reboot_instances(&self, request: InstanceIdsRequest) -> ApiResult<()> {
        let dry_run = request.dry_run;
        let state = self.record(Call::RebootInstances(request));
        if dry_run {
            return Self::dry_run_result(&state, "RebootInstances");
        }
        Ok(())
    }

    async fn create_tags(&self, request: CreateTagsRequest) -> ApiResult<()> {
        self.record(Call::CreateTags(request));
        Ok(())
    }

    async fn describe_subnets(
        &self,
        request: DescribeSubnetsRequest,
    ) -> ApiResult<DescribeSubnetsOutput> {
        let state = self.record(Call::DescribeSubnets(request));
        Ok(DescribeSubnetsOutput::builder()
            .set_subnets(Some(state.subnets.clone()))
            .build())
    }

    async fn describe_security_groups(
        &self,
        request: DescribeSecurityGroupsRequest,
    ) -> ApiResult<DescribeSecurityGroupsOutput> {
        let dry_run = request.dry_run;
        let name = group_name_filter(&request);
        let state = self.record(Call::DescribeSecurityGroups(request));
        if dry_run {
            return Self::dry_run_result(&state, "DescribeSecurityGroups");
        }

        let groups: Vec<SecurityGroup> = state
            .groups
            .iter()
            .filter(|g| name.is_none() || g.group_name() == name.as_deref())
            .cloned()
            .collect();

        Ok(DescribeSecurityGroupsOutput::builder()
            .set_security_groups(Some(groups))
            .build())
    }

    async fn create_security_group(
        &self,
        request: CreateSecurityGroupRequest,
    ) -> ApiResult<Option<String>> {
        let dry_run = request.dry_run;
        let mut state = self.record(Call::CreateSecurityGroup(request.clone()));
        if dry_run {
            return Self::dry_run_result(&state, "CreateSecurityGroup");
        }
        if state.lose_created_groups {
            return Ok(None);
        }

        let group_id = format!("sg-{:08}", state.groups.len() + 1);
        let group = SecurityGroup::builder()
            .group_id(group_id.as_str())
            .group_name(request.group_name)
            .description(request.description)
            .build();
        state.groups.push(group);

        Ok(Some(group_id))
    }

    async fn authorize_ingress(&self, request: AuthorizeRequest) -> ApiResult<()> {
        let protocol = Call::AuthorizeIngress(request.clone()).protocol();
        let mut state = self.record(Call::AuthorizeIngress(request.clone()));

        if protocol.as_deref() == Some("-1")
            && let Some(e) = &state.blanket_ingress_error
        {
            return Err(e.clone());
        }
        if let Some((failing, e)) = &state.protocol_ingress_error
            && protocol.as_deref() == Some(failing.as_str())
        {
            return Err(e.clone());
        }

        authorize(&mut state.groups, &request, false);
        Ok(())
    }

    async fn authorize_egress(&self, request: AuthorizeRequest) -> ApiResult<()> {
        let protocol = Call::AuthorizeEgress(request.clone()).protocol();
        let mut state = self.record(Call::AuthorizeEgress(request.clone()));

        if protocol.as_deref() == Some("-1")
            && let Some(e) = &state.blanket_egress_error
        {
            return Err(e.clone());
        }

        authorize(&mut state.groups, &request, true);
        Ok(())
    }
}

fn authorize(groups: &mut [SecurityGroup], request: &AuthorizeRequest, egress: bool) {
    if let Some(group) = groups
        .iter_mut()
        .find(|g| g.group_id() == Some(request.group_id.as_str()))
    {
        let rules = if egress {
            &mut group.ip_permissions_egress
        } else {
            &mut group.ip_permissions
        };
        rules
            .get_or_insert_with(Vec::new)
            .extend(request.ip_permissions.iter().cloned());
    }
}
