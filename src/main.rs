use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};

use ec2_adapter::compute::{Compute, LaunchSpec, ProbeSettings};
use ec2_adapter::config::{Command, Config};
use ec2_adapter::ec2::{Ec2Api, Ec2Client};
use ec2_adapter::logging;
use ec2_adapter::output;
use ec2_adapter::security::Security;

#[tokio::main]
async fn main() {
    let config = Config::from_args();
    logging::init(&config.log_format, &config.log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("GIT_COMMIT"),
        build_date = env!("BUILD_DATE"),
        "ec2-adapter starting"
    );

    if let Err(e) = run(config).await {
        error!(error = %format!("{:#}", e), "Command failed");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<()> {
    let client = Ec2Client::new(config.region.as_deref(), config.profile.as_deref()).await;
    config.display(client.region());

    let api: Arc<dyn Ec2Api> = Arc::new(client);
    let compute = Compute::new(api.clone(), config.tag_scheme());
    let security = Security::new(api, config.group_settings());
    let format = config.output;

    let rendered = match config.command {
        Command::List => {
            let instances = compute
                .list_instances()
                .await
                .context("Failed to list instances")?;
            output::render_rows(&instances, format)?
        }
        Command::Get { instance_id } => {
            let instance = compute
                .get_instance(&instance_id)
                .await
                .with_context(|| format!("Failed to describe instance {}", instance_id))?
                .with_context(|| format!("Instance not found: {}", instance_id))?;
            output::render_row(&instance, format)?
        }
        Command::Launch(args) => {
            let spec = LaunchSpec::from(args);
            let instance = compute
                .launch_instance(&spec)
                .await
                .with_context(|| format!("Failed to launch instance {}", spec.name))?;
            output::render_row(&instance, format)?
        }
        Command::Reboot { instance_id } => {
            compute
                .reboot_instance(&instance_id)
                .await
                .with_context(|| format!("Failed to reboot instance {}", instance_id))?;
            output::render_values("rebooted", &[instance_id], format)?
        }
        Command::Terminate { instance_id } => {
            let state = compute
                .terminate_instance(&instance_id)
                .await
                .with_context(|| format!("Failed to terminate instance {}", instance_id))?;
            output::render_values("state", &[state], format)?
        }
        Command::Zones => {
            let zones = compute
                .list_availability_zones()
                .await
                .context("Failed to list availability zones")?;
            output::render_values("zones", &zones, format)?
        }
        Command::SecurityGroup => {
            let group = security
                .ensure_group()
                .await
                .context("Failed to ensure security group")?;
            output::render_row(&group, format)?
        }
        Command::CheckPermissions(args) => {
            let probe = ProbeSettings::from(args);
            compute
                .check_permission(&probe)
                .await
                .context("Compute permission check failed")?;
            security
                .check_permission()
                .await
                .context("Security group permission check failed")?;
            output::render_values("permissions", &["ok".to_string()], format)?
        }
    };

    println!("{}", rendered);
    Ok(())
}
