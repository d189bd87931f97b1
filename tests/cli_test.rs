use assert_cmd::Command;
use predicates::prelude::*;

fn adapter_cmd() -> Command {
    let mut cmd = Command::cargo_bin("ec2-adapter").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove("AWS_PROFILE")
        .env("AWS_EC2_METADATA_DISABLED", "true")
        .env("LOG_FORMAT", "pretty")
        .env("LOG_LEVEL", "warn");
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    adapter_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("check-permissions"))
        .stdout(predicate::str::contains("security-group"));
}

#[test]
fn test_failure_is_reported_once() {
    // Launch validation fails before any request leaves the process.
    let output = adapter_cmd()
        .args([
            "--region",
            "us-east-1",
            "launch",
            "--name",
            " ",
            "--image-id",
            "ami-1",
            "--availability-zone",
            "us-east-1a",
            "--key-name",
            "deploy",
            "--security-group-id",
            "sg-1",
        ])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(
        stderr.matches("name must not be empty").count(),
        1,
        "stderr: {stderr}"
    );
}
