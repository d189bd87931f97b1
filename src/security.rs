//! Security facade: one well-known security group with permissive defaults.

pub mod rules;

use std::sync::Arc;

use aws_sdk_ec2::types::SecurityGroup;
use serde::Serialize;
use tabled::Tabled;
use tracing::{debug, info};

use crate::ec2::{CreateSecurityGroupRequest, DescribeSecurityGroupsRequest, Ec2Api, filter};
use crate::error::{Error, Result};
use crate::permission::{self, Probe};
use rules::RulePolicy;

pub const DEFAULT_GROUP_NAME: &str = "ec2-adapter";
pub const DEFAULT_GROUP_DESCRIPTION: &str = "Default security group policy for ec2-adapter instances";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSettings {
    pub name: String,
    pub description: String,
}

impl Default for GroupSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_GROUP_NAME.to_string(),
            description: DEFAULT_GROUP_DESCRIPTION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
pub struct SecurityGroupRecord {
    #[tabled(rename = "GROUP ID")]
    pub id: String,
    #[tabled(rename = "NAME")]
    pub name: String,
    #[tabled(rename = "DESCRIPTION")]
    pub description: String,
    /// At least one inbound rule exists.
    #[tabled(rename = "INBOUND")]
    pub inbound: bool,
    /// At least one outbound rule exists.
    #[tabled(rename = "OUTBOUND")]
    pub outbound: bool,
}

impl SecurityGroupRecord {
    pub fn from_group(group: &SecurityGroup) -> Self {
        Self {
            id: group.group_id().unwrap_or_default().to_string(),
            name: group.group_name().unwrap_or_default().to_string(),
            description: group.description().unwrap_or_default().to_string(),
            inbound: !group.ip_permissions().is_empty(),
            outbound: !group.ip_permissions_egress().is_empty(),
        }
    }
}

pub struct Security {
    api: Arc<dyn Ec2Api>,
    settings: GroupSettings,
}

impl Security {
    pub fn new(api: Arc<dyn Ec2Api>, settings: GroupSettings) -> Self {
        Self { api, settings }
    }

    /// Fetches or creates the group, then applies any missing default rules.
    ///
    /// Concurrent callers can both see the group as absent and both try to
    /// create it; the loser's create fails with the provider's duplicate error.
    pub async fn ensure_group(&self) -> Result<SecurityGroupRecord> {
        let mut group = match self.fetch_group().await? {
            Some(group) => group,
            None => self.create_group().await?,
        };

        if !group.inbound {
            RulePolicy::inbound().apply(self.api.as_ref(), &group.id).await?;
            group.inbound = true;
        }

        if !group.outbound {
            RulePolicy::outbound().apply(self.api.as_ref(), &group.id).await?;
            group.outbound = true;
        }

        Ok(group)
    }

    /// The group with the configured name, if it exists.
    pub async fn fetch_group(&self) -> Result<Option<SecurityGroupRecord>> {
        let output = self
            .api
            .describe_security_groups(DescribeSecurityGroupsRequest {
                filters: vec![filter("group-name", self.settings.name.as_str())],
                dry_run: false,
            })
            .await?;

        let group = output
            .security_groups()
            .first()
            .map(SecurityGroupRecord::from_group);

        debug!(
            group_name = %self.settings.name,
            found = group.is_some(),
            "Fetched security group"
        );

        Ok(group)
    }

    async fn create_group(&self) -> Result<SecurityGroupRecord> {
        let group_id = self
            .api
            .create_security_group(CreateSecurityGroupRequest {
                group_name: self.settings.name.clone(),
                description: self.settings.description.clone(),
                dry_run: false,
            })
            .await?;

        info!(
            group_name = %self.settings.name,
            group_id = group_id.as_deref().unwrap_or("unknown"),
            "Security group created"
        );

        self.fetch_group()
            .await?
            .ok_or_else(|| Error::GroupNotFound(self.settings.name.clone()))
    }

    /// Dry-runs describe and create to validate credentials.
    pub async fn check_permission(&self) -> Result<()> {
        permission::check(
            Probe::DescribeSecurityGroups,
            self.api
                .describe_security_groups(DescribeSecurityGroupsRequest {
                    filters: Vec::new(),
                    dry_run: true,
                }),
        )
        .await?;

        permission::check(
            Probe::CreateSecurityGroup,
            self.api
                .create_security_group(CreateSecurityGroupRequest {
                    group_name: self.settings.name.clone(),
                    description: self.settings.description.clone(),
                    dry_run: true,
                }),
        )
        .await?;

        Ok(())
    }
}
