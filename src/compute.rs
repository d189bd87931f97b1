//! Compute facade: tagged instance lifecycle and usable availability zones.

use std::collections::BTreeSet;
use std::sync::Arc;

use aws_sdk_ec2::types::{BlockDeviceMapping, EbsBlockDevice, Instance};
use serde::Serialize;
use tabled::Tabled;
use tracing::{debug, info, warn};

use crate::ec2::response::flatten_instances;
use crate::ec2::tags::TagScheme;
use crate::ec2::{
    CreateTagsRequest, DescribeInstancesRequest, DescribeSubnetsRequest, Ec2Api,
    InstanceIdsRequest, RunInstancesRequest, filter,
};
use crate::error::{Error, Result};
use crate::permission::{self, Probe};

const STATUS_RUNNING: &str = "running";
const STATUS_ACTIVE: &str = "active";

const ROOT_DEVICE_NAME: &str = "/dev/sda1";
const INSTANCE_NOT_FOUND: &str = "InvalidInstanceID.NotFound";

/// Maps a provider lifecycle state onto the platform's vocabulary.
pub fn translate_status(status: &str) -> String {
    match status {
        STATUS_RUNNING => STATUS_ACTIVE.to_string(),
        other => other.to_string(),
    }
}

/// Flat view of a managed instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
pub struct InstanceRecord {
    #[tabled(rename = "INSTANCE ID")]
    pub id: String,
    #[tabled(rename = "NAME")]
    pub name: String,
    #[tabled(rename = "STATUS")]
    pub status: String,
    #[tabled(rename = "EXTERNAL IP", display = "display_ip")]
    pub external_ip: Option<String>,
    #[tabled(rename = "INTERNAL IP", display = "display_ip")]
    pub internal_ip: Option<String>,
}

fn display_ip(ip: &Option<String>) -> String {
    ip.clone().unwrap_or_else(|| "-".to_string())
}

impl InstanceRecord {
    pub fn from_instance(instance: &Instance, tags: &TagScheme) -> Self {
        let status = instance
            .state()
            .and_then(|s| s.name())
            .map(|n| n.as_str())
            .unwrap_or("unknown");

        Self {
            id: instance.instance_id().unwrap_or_default().to_string(),
            name: tags.name_of(instance.tags()).to_string(),
            status: translate_status(status),
            external_ip: instance.public_ip_address().map(str::to_string),
            internal_ip: instance.private_ip_address().map(str::to_string),
        }
    }
}

/// Parameters for launching one managed instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub name: String,
    /// Instance type, e.g. `t3.micro`.
    pub size: String,
    /// Root volume size in GiB.
    pub disk_size: i32,
    pub image_id: String,
    pub availability_zone: String,
    pub key_name: String,
    pub security_group_id: String,
}

impl LaunchSpec {
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("name", &self.name),
            ("size", &self.size),
            ("image_id", &self.image_id),
            ("availability_zone", &self.availability_zone),
            ("key_name", &self.key_name),
            ("security_group_id", &self.security_group_id),
        ];

        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(Error::InvalidLaunchSpec(format!("{field} must not be empty")));
        }
        if self.disk_size <= 0 {
            return Err(Error::InvalidLaunchSpec(format!(
                "disk_size must be positive, got {}",
                self.disk_size
            )));
        }

        Ok(())
    }

    fn root_volume(&self) -> BlockDeviceMapping {
        BlockDeviceMapping::builder()
            .device_name(ROOT_DEVICE_NAME)
            .ebs(
                EbsBlockDevice::builder()
                    .volume_size(self.disk_size)
                    .delete_on_termination(true)
                    .build(),
            )
            .build()
    }

    fn to_request(&self) -> RunInstancesRequest {
        RunInstancesRequest {
            image_id: self.image_id.clone(),
            instance_type: self.size.clone(),
            key_name: Some(self.key_name.clone()),
            security_group_ids: vec![self.security_group_id.clone()],
            availability_zone: Some(self.availability_zone.clone()),
            block_device_mappings: vec![self.root_volume()],
            dry_run: false,
        }
    }
}

/// Targets for the launch and terminate dry runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSettings {
    pub image_id: String,
    pub instance_type: String,
    /// Managed instance for the terminate dry run. When unset the first
    /// listed managed instance is used.
    pub instance_id: Option<String>,
}

pub struct Compute {
    api: Arc<dyn Ec2Api>,
    tags: TagScheme,
}

impl Compute {
    pub fn new(api: Arc<dyn Ec2Api>, tags: TagScheme) -> Self {
        Self { api, tags }
    }

    /// All instances carrying the marker tag.
    pub async fn list_instances(&self) -> Result<Vec<InstanceRecord>> {
        let output = self
            .api
            .describe_instances(DescribeInstancesRequest {
                filters: vec![self.tags.marker_filter()],
                ..Default::default()
            })
            .await?;

        let instances: Vec<InstanceRecord> = flatten_instances(&output)
            .into_iter()
            .map(|i| InstanceRecord::from_instance(i, &self.tags))
            .collect();

        debug!(
            reservation_count = output.reservations().len(),
            instance_count = instances.len(),
            "Listed managed instances"
        );

        Ok(instances)
    }

    pub async fn get_instance(&self, instance_id: &str) -> Result<Option<InstanceRecord>> {
        let result = self
            .api
            .describe_instances(DescribeInstancesRequest {
                instance_ids: vec![instance_id.to_string()],
                filters: vec![self.tags.marker_filter()],
                dry_run: false,
            })
            .await;

        let output = match result {
            Ok(output) => output,
            Err(e) if e.has_code(INSTANCE_NOT_FOUND) => {
                debug!(instance_id = %instance_id, "Instance not found");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        Ok(flatten_instances(&output)
            .first()
            .map(|i| InstanceRecord::from_instance(i, &self.tags)))
    }

    /// Launches one instance, tags it, and returns it under the requested name.
    pub async fn launch_instance(&self, spec: &LaunchSpec) -> Result<InstanceRecord> {
        spec.validate()?;

        info!(
            name = %spec.name,
            size = %spec.size,
            disk_size = spec.disk_size,
            image_id = %spec.image_id,
            availability_zone = %spec.availability_zone,
            "Launching instance"
        );

        let output = self.api.run_instances(spec.to_request()).await?;
        let instance = output
            .instances()
            .first()
            .ok_or_else(|| Error::missing("RunInstances", "Instances"))?;

        let mut record = InstanceRecord::from_instance(instance, &self.tags);
        if record.id.is_empty() {
            return Err(Error::missing("RunInstances", "InstanceId"));
        }

        self.api
            .create_tags(CreateTagsRequest {
                resource_ids: vec![record.id.clone()],
                tags: self.tags.launch_tags(&spec.name),
            })
            .await?;

        record.name = spec.name.clone();

        info!(
            instance_id = %record.id,
            name = %record.name,
            status = %record.status,
            "Instance launched and tagged"
        );

        Ok(record)
    }

    pub async fn reboot_instance(&self, instance_id: &str) -> Result<()> {
        self.api
            .reboot_instances(InstanceIdsRequest::single(instance_id))
            .await?;
        Ok(())
    }

    /// Terminates the instance and returns the state the provider now reports.
    pub async fn terminate_instance(&self, instance_id: &str) -> Result<String> {
        let output = self
            .api
            .terminate_instances(InstanceIdsRequest::single(instance_id))
            .await?;

        let change = output
            .terminating_instances()
            .iter()
            .find(|c| c.instance_id() == Some(instance_id))
            .or_else(|| output.terminating_instances().first())
            .ok_or_else(|| Error::missing("TerminateInstances", "TerminatingInstances"))?;

        let state = change
            .current_state()
            .and_then(|s| s.name())
            .map(|n| n.as_str().to_string())
            .ok_or_else(|| Error::missing("TerminateInstances", "CurrentState"))?;

        info!(instance_id = %instance_id, state = %state, "Instance termination requested");

        Ok(state)
    }

    /// Zones with a default subnet, deduplicated and sorted.
    pub async fn list_availability_zones(&self) -> Result<Vec<String>> {
        let output = self
            .api
            .describe_subnets(DescribeSubnetsRequest {
                filters: vec![filter("default-for-az", "true")],
            })
            .await?;

        let zones: BTreeSet<&str> = output
            .subnets()
            .iter()
            .filter_map(|s| s.availability_zone())
            .collect();

        if zones.is_empty() {
            warn!("No default subnets found; launches need an explicitly configured subnet");
        }

        Ok(zones.into_iter().map(str::to_string).collect())
    }

    /// Dry-runs describe, launch and terminate to validate credentials.
    ///
    /// EC2 checks that the terminate target exists before answering a dry
    /// run, so that probe needs a managed instance and is skipped without one.
    pub async fn check_permission(&self, probe: &ProbeSettings) -> Result<()> {
        let api = &self.api;

        permission::check(
            Probe::DescribeInstances,
            api.describe_instances(DescribeInstancesRequest {
                dry_run: true,
                ..Default::default()
            }),
        )
        .await?;

        permission::check(
            Probe::RunInstances,
            api.run_instances(RunInstancesRequest {
                image_id: probe.image_id.clone(),
                instance_type: probe.instance_type.clone(),
                dry_run: true,
                ..Default::default()
            }),
        )
        .await?;

        let Some(target) = self.terminate_target(probe).await? else {
            warn!(
                probe = %Probe::TerminateInstances,
                "No managed instance to dry-run against, skipping"
            );
            return Ok(());
        };

        permission::check(
            Probe::TerminateInstances,
            api.terminate_instances(InstanceIdsRequest {
                instance_ids: vec![target],
                dry_run: true,
            }),
        )
        .await?;

        Ok(())
    }

    async fn terminate_target(&self, probe: &ProbeSettings) -> Result<Option<String>> {
        if let Some(id) = &probe.instance_id {
            return Ok(Some(id.clone()));
        }
        Ok(self.list_instances().await?.into_iter().next().map(|i| i.id))
    }
}
