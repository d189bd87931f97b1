use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::compute::{LaunchSpec, ProbeSettings};
use crate::ec2::tags::{
    DEFAULT_MARKER_TAG_KEY, DEFAULT_MARKER_TAG_VALUE, DEFAULT_NAME_TAG_KEY, TagScheme,
};
use crate::security::{DEFAULT_GROUP_DESCRIPTION, DEFAULT_GROUP_NAME, GroupSettings};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "ec2-adapter",
    version,
    about = "Manage tagged EC2 instances and a default security group"
)]
pub struct Config {
    #[command(subcommand)]
    pub command: Command,

    /// AWS region
    #[arg(long, env = "AWS_REGION", global = true)]
    pub region: Option<String>,

    /// AWS profile
    #[arg(long, env = "AWS_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Tag key marking instances managed by this tool
    #[arg(long, env = "MARKER_TAG_KEY", default_value = DEFAULT_MARKER_TAG_KEY, global = true)]
    pub marker_tag_key: String,

    /// Value of the marker tag
    #[arg(long, env = "MARKER_TAG_VALUE", default_value = DEFAULT_MARKER_TAG_VALUE, global = true)]
    pub marker_tag_value: String,

    /// Tag key holding the instance name
    #[arg(long, env = "NAME_TAG_KEY", default_value = DEFAULT_NAME_TAG_KEY, global = true)]
    pub name_tag_key: String,

    /// Name of the managed security group
    #[arg(long, env = "SECURITY_GROUP_NAME", default_value = DEFAULT_GROUP_NAME, global = true)]
    pub security_group_name: String,

    /// Description used when creating the security group
    #[arg(
        long,
        env = "SECURITY_GROUP_DESCRIPTION",
        default_value = DEFAULT_GROUP_DESCRIPTION,
        global = true
    )]
    pub security_group_description: String,

    /// Output format for command results
    #[arg(long, env = "OUTPUT_FORMAT", value_enum, default_value_t = OutputFormat::Table, global = true)]
    pub output: OutputFormat,

    /// Log format: json or pretty
    #[arg(long, env = "LOG_FORMAT", default_value = "pretty", global = true)]
    pub log_format: String,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "warn", global = true)]
    pub log_level: String,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List managed instances
    List,
    /// Describe one instance
    Get {
        instance_id: String,
    },
    /// Launch and tag a new instance
    Launch(LaunchArgs),
    /// Reboot an instance
    Reboot {
        instance_id: String,
    },
    /// Terminate an instance and print its new state
    Terminate {
        instance_id: String,
    },
    /// List availability zones that have a default subnet
    Zones,
    /// Fetch or create the managed security group
    SecurityGroup,
    /// Validate credentials with dry-run requests
    CheckPermissions(ProbeArgs),
}

#[derive(Args, Debug, Clone)]
pub struct LaunchArgs {
    /// Instance name, stored as a tag
    #[arg(long)]
    pub name: String,

    /// Instance type
    #[arg(long, default_value = "t3.micro")]
    pub size: String,

    /// Root volume size in GiB
    #[arg(long, default_value = "20")]
    pub disk_size: i32,

    /// Machine image (AMI) id
    #[arg(long)]
    pub image_id: String,

    #[arg(long)]
    pub availability_zone: String,

    /// EC2 key pair name
    #[arg(long)]
    pub key_name: String,

    #[arg(long)]
    pub security_group_id: String,
}

impl From<LaunchArgs> for LaunchSpec {
    fn from(args: LaunchArgs) -> Self {
        Self {
            name: args.name,
            size: args.size,
            disk_size: args.disk_size,
            image_id: args.image_id,
            availability_zone: args.availability_zone,
            key_name: args.key_name,
            security_group_id: args.security_group_id,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ProbeArgs {
    /// Image used for the RunInstances dry run
    #[arg(long, env = "PROBE_IMAGE_ID")]
    pub image_id: String,

    /// Instance type used for the RunInstances dry run
    #[arg(long, env = "PROBE_INSTANCE_TYPE", default_value = "t3.micro")]
    pub instance_type: String,

    /// Managed instance used for the TerminateInstances dry run
    #[arg(long, env = "PROBE_INSTANCE_ID")]
    pub instance_id: Option<String>,
}

impl From<ProbeArgs> for ProbeSettings {
    fn from(args: ProbeArgs) -> Self {
        Self {
            image_id: args.image_id,
            instance_type: args.instance_type,
            instance_id: args.instance_id,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl Config {
    pub fn from_args() -> Self {
        Self::parse()
    }

    pub fn tag_scheme(&self) -> TagScheme {
        TagScheme {
            marker_key: self.marker_tag_key.clone(),
            marker_value: self.marker_tag_value.clone(),
            name_key: self.name_tag_key.clone(),
        }
    }

    pub fn group_settings(&self) -> GroupSettings {
        GroupSettings {
            name: self.security_group_name.clone(),
            description: self.security_group_description.clone(),
        }
    }

    pub fn display(&self, actual_region: &str) {
        let region_info = match &self.region {
            Some(region) => region.clone(),
            None => format!("auto-detect ({})", actual_region),
        };

        tracing::info!(
            region = %region_info,
            profile = self.profile.as_deref().unwrap_or("default"),
            marker_tag = %format!("{}={}", self.marker_tag_key, self.marker_tag_value),
            name_tag_key = %self.name_tag_key,
            security_group_name = %self.security_group_name,
            output = ?self.output,
            log_format = %self.log_format,
            log_level = %self.log_level,
            "Configuration initialized"
        );
    }
}
