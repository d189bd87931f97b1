//! Dry-run permission probes.
//!
//! A permitted dry run fails with `DryRunOperation`; that failure is the
//! success signal. Any other provider error is returned unchanged.

use std::fmt;
use std::future::Future;

use tracing::{debug, warn};

use crate::error::{ApiResult, KnownError, Result};

/// Operation being probed, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    DescribeInstances,
    RunInstances,
    TerminateInstances,
    DescribeSecurityGroups,
    CreateSecurityGroup,
}

impl Probe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Probe::DescribeInstances => "DescribeInstances",
            Probe::RunInstances => "RunInstances",
            Probe::TerminateInstances => "TerminateInstances",
            Probe::DescribeSecurityGroups => "DescribeSecurityGroups",
            Probe::CreateSecurityGroup => "CreateSecurityGroup",
        }
    }
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Awaits one dry-run request and interprets its outcome.
pub async fn check<T, F>(probe: Probe, request: F) -> Result<()>
where
    F: Future<Output = ApiResult<T>>,
{
    match request.await {
        Err(e) if e.is(KnownError::DryRunOperation) => {
            debug!(probe = %probe, "Dry run permitted");
            Ok(())
        }
        Err(e) => {
            warn!(probe = %probe, error = %e, "Dry run rejected");
            Err(e.into())
        }
        Ok(_) => {
            // Some endpoints ignore the DryRun flag and simply answer.
            debug!(probe = %probe, "Dry run answered without DryRunOperation");
            Ok(())
        }
    }
}
