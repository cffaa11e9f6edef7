use super::*;
use crate::model::{DEFAULT_IMAGE_ID, DEFAULT_STACK_NAME};
use std::io::Write;

#[test]
fn test_empty_document_keeps_defaults() {
    let config = parse_stack_string("").unwrap();
    assert_eq!(config, StackConfig::default());
    assert_eq!(config.name, DEFAULT_STACK_NAME);
}

#[test]
fn test_parse_full_stack() {
    let kdl = r#"
stack "EdgeStack" {
    account "123456789012"
    region "us-west-2"
    image "us-west-2" "ami-0123456789abcdef0"
    instance-type "t3.small"
    vpc-cidr "10.1.0.0/16"
    subnet-mask 20
    route "backend"
    stage "dev"
    boot-script "nginx"
}
"#;
    let config = parse_stack_string(kdl).unwrap();
    assert_eq!(config.name, "EdgeStack");
    assert_eq!(config.account, "123456789012");
    assert_eq!(config.region, "us-west-2");
    assert_eq!(config.images.len(), 1);
    assert_eq!(config.image_id().unwrap(), "ami-0123456789abcdef0");
    assert_eq!(config.instance_type, "t3.small");
    assert_eq!(config.vpc_cidr, "10.1.0.0/16");
    assert_eq!(config.subnet_mask, 20);
    assert_eq!(config.route, "backend");
    assert_eq!(config.stage, "dev");
    config.validate().unwrap();
}

#[test]
fn test_partial_override() {
    let config = parse_stack_string(r#"stack { stage "staging" }"#).unwrap();
    assert_eq!(config.stage, "staging");
    assert_eq!(config.name, DEFAULT_STACK_NAME);
    assert_eq!(config.image_id().unwrap(), DEFAULT_IMAGE_ID);
}

#[test]
fn test_unquoted_account() {
    let config = parse_stack_string("stack { account 123456789012 }").unwrap();
    assert_eq!(config.account, "123456789012");
}

#[test]
fn test_underscore_aliases() {
    let config =
        parse_stack_string(r#"stack { instance_type "t3.nano"; subnet_mask 26 }"#).unwrap();
    assert_eq!(config.instance_type, "t3.nano");
    assert_eq!(config.subnet_mask, 26);
}

#[test]
fn test_region_without_image_fails_validation() {
    let config = parse_stack_string(r#"stack { region "eu-west-1" }"#).unwrap();
    assert!(matches!(
        config.validate(),
        Err(StackError::UnsupportedRegion { .. })
    ));
}

#[test]
fn test_unknown_setting() {
    let err = parse_stack_string(r#"stack { flavour "large" }"#).unwrap_err();
    assert!(matches!(err, StackError::InvalidConfig(_)));
}

#[test]
fn test_duplicate_stack_node() {
    assert!(parse_stack_string("stack \"a\"\nstack \"b\"").is_err());
}

#[test]
fn test_subnet_mask_out_of_range() {
    assert!(parse_stack_string("stack { subnet-mask 300 }").is_err());
}

#[test]
fn test_invalid_kdl() {
    assert!(matches!(
        parse_stack_string("stack {"),
        Err(StackError::KdlParse(_))
    ));
}

#[test]
fn test_parse_stack_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, r#"stack "FileStack" {{ route "api" }}"#).unwrap();
    let config = parse_stack_file(file.path()).unwrap();
    assert_eq!(config.name, "FileStack");
    assert_eq!(config.route, "api");
}

#[test]
fn test_missing_file() {
    let err = parse_stack_file("/nonexistent/stack.kdl").unwrap_err();
    assert!(matches!(err, StackError::IoError { .. }));
}
