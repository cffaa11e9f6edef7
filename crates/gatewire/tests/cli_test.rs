#![allow(deprecated)] // TODO: cargo_bin → cargo_bin_cmd! once assert_cmd 2.1 is the floor

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// `gatewire` running in an empty project with no ambient overrides
fn gatewire(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("gatewire").unwrap();
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .env("XDG_CONFIG_HOME", dir.path().join(".config"))
        .env_remove("GATEWIRE_CONFIG_PATH")
        .env_remove("GATEWIRE_ACCOUNT")
        .env_remove("GATEWIRE_REGION")
        .env_remove("GATEWIRE_STACK")
        .env_remove("AWS_PROFILE")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_help() {
    let dir = TempDir::new().unwrap();
    gatewire(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("bootstrap"))
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("destroy"))
        .stdout(predicate::str::contains("synth"));
}

#[test]
fn test_cli_version() {
    let dir = TempDir::new().unwrap();
    gatewire(&dir)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("gatewire"));
}

#[test]
fn test_deploy_help() {
    let dir = TempDir::new().unwrap();
    gatewire(&dir)
        .args(["deploy", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--yes"))
        .stdout(predicate::str::contains("--region"));
}

#[test]
fn test_synth_default_stack() {
    let dir = TempDir::new().unwrap();
    let output = gatewire(&dir).arg("synth").assert().success();
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let template: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    assert_eq!(
        template["Resources"]["MyVpcLink"]["Type"],
        "AWS::ApiGateway::VpcLink"
    );
    assert_eq!(
        template["Resources"]["MyNLB"]["Properties"]["Scheme"],
        "internal"
    );
    assert_eq!(
        template["Outputs"]["ApiEndpoint"]["Description"],
        "API Gateway Endpoint"
    );
}

#[test]
fn test_synth_yaml() {
    let dir = TempDir::new().unwrap();
    gatewire(&dir)
        .args(["synth", "--format", "yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("AWSTemplateFormatVersion"))
        .stdout(predicate::str::contains("AWS::EC2::Instance"));
}

#[test]
fn test_synth_to_file() {
    let dir = TempDir::new().unwrap();
    gatewire(&dir)
        .args(["synth", "--out", "out/template.json"])
        .assert()
        .success();
    let written = fs::read_to_string(dir.path().join("out/template.json")).unwrap();
    assert!(written.contains("AWS::ApiGateway::RestApi"));
}

#[test]
fn test_validate_default_stack() {
    let dir = TempDir::new().unwrap();
    gatewire(&dir)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("built-in defaults"))
        .stdout(predicate::str::contains("MyVpc"))
        .stdout(predicate::str::contains("MyRestApi"))
        .stdout(predicate::str::contains("Stack is valid"));
}

#[test]
fn test_stack_file_overrides_defaults() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("stack.kdl"),
        r#"
stack "EdgeStack" {
    route "backend"
    stage "dev"
}
"#,
    )
    .unwrap();

    gatewire(&dir)
        .arg("synth")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"PathPart\": \"backend\""))
        .stdout(predicate::str::contains("\"StageName\": \"dev\""));
}

#[test]
fn test_flag_beats_stack_file() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("stack.kdl"),
        r#"stack { region "us-west-2"; image "us-west-2" "ami-0123456789abcdef0" }"#,
    )
    .unwrap();

    // the file only maps us-west-2, so us-east-1 from the flag has no image
    gatewire(&dir)
        .args(["--region", "us-east-1", "synth"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("us-east-1"));

    gatewire(&dir)
        .arg("synth")
        .assert()
        .success()
        .stdout(predicate::str::contains("ami-0123456789abcdef0"));
}

#[test]
fn test_unmapped_region_is_rejected() {
    let dir = TempDir::new().unwrap();
    gatewire(&dir)
        .env("GATEWIRE_REGION", "eu-central-1")
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No machine image configured"));
}

#[test]
fn test_invalid_stack_file() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("stack.kdl"), "stack {").unwrap();
    gatewire(&dir)
        .arg("synth")
        .assert()
        .failure()
        .stderr(predicate::str::contains("KDL parse error"));
}

#[test]
fn test_destroy_requires_yes() {
    let dir = TempDir::new().unwrap();
    gatewire(&dir)
        .arg("destroy")
        .assert()
        .success()
        .stdout(predicate::str::contains("--yes"));
}

#[test]
fn test_outputs_without_deployment() {
    let dir = TempDir::new().unwrap();
    gatewire(&dir)
        .arg("outputs")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No recorded deployment"));
}
