//! Thin adapter from platform operations to the EC2 API.
//!
//! [`compute::Compute`] manages tagged instances and [`security::Security`]
//! maintains one security group with permissive default rules. Both talk to
//! EC2 only through the [`ec2::Ec2Api`] trait.

pub mod compute;
pub mod config;
pub mod ec2;
pub mod error;
pub mod logging;
pub mod output;
pub mod permission;
pub mod security;

pub use compute::{Compute, InstanceRecord, LaunchSpec, ProbeSettings, translate_status};
pub use ec2::tags::TagScheme;
pub use ec2::{Ec2Api, Ec2Client};
pub use error::{ApiError, Error, KnownError, Result};
pub use security::{GroupSettings, Security, SecurityGroupRecord};
