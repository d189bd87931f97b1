//! Default firewall policies as ordered lists of rule strategies.

use aws_sdk_ec2::types::{IpPermission, IpRange};
use tracing::{debug, info, warn};

use crate::ec2::{AuthorizeRequest, Ec2Api};
use crate::error::{ApiResult, KnownError, Result};

const ANY_SOURCE: &str = "0.0.0.0/0";
const ALL_PROTOCOLS: &str = "-1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }

    async fn authorize(&self, api: &dyn Ec2Api, request: AuthorizeRequest) -> ApiResult<()> {
        match self {
            Direction::Inbound => api.authorize_ingress(request).await,
            Direction::Outbound => api.authorize_egress(request).await,
        }
    }
}

/// One way of expressing "allow everything".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleStrategy {
    /// A single all-protocol rule.
    Blanket,
    /// TCP and UDP over all ports plus all ICMP types, one request each.
    PerProtocol,
}

impl RuleStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleStrategy::Blanket => "blanket",
            RuleStrategy::PerProtocol => "per-protocol",
        }
    }

    /// Permissions to authorize, one entry per request.
    pub fn requests(&self) -> Vec<IpPermission> {
        match self {
            RuleStrategy::Blanket => vec![permission(ALL_PROTOCOLS, None)],
            RuleStrategy::PerProtocol => vec![
                permission("tcp", Some((0, 65535))),
                permission("udp", Some((0, 65535))),
                permission("icmp", Some((-1, -1))),
            ],
        }
    }
}

fn permission(protocol: &str, ports: Option<(i32, i32)>) -> IpPermission {
    let mut builder = IpPermission::builder()
        .ip_protocol(protocol)
        .ip_ranges(IpRange::builder().cidr_ip(ANY_SOURCE).build());

    if let Some((from, to)) = ports {
        builder = builder.from_port(from).to_port(to);
    }

    builder.build()
}

/// Strategies tried in order until one applies cleanly.
///
/// Only errors listed in `fallback_on` move on to the next strategy; anything
/// else, or a failure of the last strategy, is returned. Rules applied before
/// a failure are left in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulePolicy {
    pub direction: Direction,
    pub strategies: Vec<RuleStrategy>,
    pub fallback_on: Vec<KnownError>,
}

impl RulePolicy {
    pub fn inbound() -> Self {
        Self {
            direction: Direction::Inbound,
            strategies: vec![RuleStrategy::Blanket, RuleStrategy::PerProtocol],
            fallback_on: vec![KnownError::InvalidPermissionMalformed],
        }
    }

    pub fn outbound() -> Self {
        Self {
            direction: Direction::Outbound,
            strategies: vec![RuleStrategy::Blanket, RuleStrategy::PerProtocol],
            fallback_on: vec![
                KnownError::InvalidPermissionMalformed,
                KnownError::UnknownParameter,
            ],
        }
    }

    /// Applies the policy to `group_id` and returns the strategy that succeeded,
    /// or `None` when the policy has no strategies.
    pub async fn apply(&self, api: &dyn Ec2Api, group_id: &str) -> Result<Option<RuleStrategy>> {
        let direction = self.direction.as_str();
        let mut strategies = self.strategies.iter().peekable();

        while let Some(strategy) = strategies.next() {
            debug!(
                group_id = %group_id,
                direction = direction,
                strategy = strategy.as_str(),
                "Applying rule strategy"
            );

            match self.apply_strategy(api, group_id, *strategy).await {
                Ok(()) => {
                    info!(
                        group_id = %group_id,
                        direction = direction,
                        strategy = strategy.as_str(),
                        "Default rules applied"
                    );
                    return Ok(Some(*strategy));
                }
                Err(e) if e.is_any(&self.fallback_on) && strategies.peek().is_some() => {
                    warn!(
                        group_id = %group_id,
                        direction = direction,
                        strategy = strategy.as_str(),
                        error = %e,
                        "Rule strategy rejected, falling back"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(None)
    }

    async fn apply_strategy(
        &self,
        api: &dyn Ec2Api,
        group_id: &str,
        strategy: RuleStrategy,
    ) -> ApiResult<()> {
        for permission in strategy.requests() {
            self.direction
                .authorize(
                    api,
                    AuthorizeRequest {
                        group_id: group_id.to_string(),
                        ip_permissions: vec![permission],
                    },
                )
                .await?;
        }
        Ok(())
    }
}
