//! `stack` node

use crate::error::{Result, StackError};
use crate::model::StackConfig;
use kdl::{KdlNode, KdlValue};

pub fn parse_stack_node(node: &KdlNode, config: &mut StackConfig) -> Result<()> {
    if let Some(name) = node.entries().first().and_then(|e| e.value().as_string()) {
        config.name = name.to_string();
    }

    let Some(children) = node.children() else {
        return Ok(());
    };

    let mut images_replaced = false;
    for child in children.nodes() {
        match child.name().value() {
            "account" => config.account = required_text(child, "account")?,
            "region" => config.region = required_string(child, "region")?,
            "image" => {
                let region = required_string(child, "image")?;
                let image_id = child
                    .entries()
                    .get(1)
                    .and_then(|e| e.value().as_string())
                    .ok_or_else(|| {
                        StackError::InvalidConfig(format!(
                            "image for '{}' requires an image id",
                            region
                        ))
                    })?;
                // the first image in the file replaces the built-in map
                if !images_replaced {
                    config.images.clear();
                    images_replaced = true;
                }
                config.images.insert(region, image_id.to_string());
            }
            "instance-type" | "instance_type" => {
                config.instance_type = required_string(child, "instance-type")?
            }
            "vpc-cidr" | "vpc_cidr" => config.vpc_cidr = required_string(child, "vpc-cidr")?,
            "subnet-mask" | "subnet_mask" => {
                let mask = child
                    .entries()
                    .first()
                    .and_then(|e| e.value().as_integer())
                    .ok_or_else(|| {
                        StackError::InvalidConfig("subnet-mask requires a number".to_string())
                    })?;
                config.subnet_mask = u8::try_from(mask).map_err(|_| {
                    StackError::InvalidConfig(format!("subnet-mask out of range: {}", mask))
                })?;
            }
            "route" => config.route = required_string(child, "route")?,
            "stage" => config.stage = required_string(child, "stage")?,
            "boot-script" | "boot_script" => {
                config.boot_script = required_string(child, "boot-script")?
            }
            other => {
                return Err(StackError::InvalidConfig(format!(
                    "unknown stack setting: '{}'",
                    other
                )));
            }
        }
    }

    Ok(())
}

fn required_string(node: &KdlNode, name: &str) -> Result<String> {
    node.entries()
        .first()
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
        .ok_or_else(|| StackError::InvalidConfig(format!("{} requires a string value", name)))
}

/// A string, or an integer written without quotes (account ids)
fn required_text(node: &KdlNode, name: &str) -> Result<String> {
    match node.entries().first().map(|e| e.value()) {
        Some(KdlValue::String(s)) => Ok(s.clone()),
        Some(KdlValue::Integer(i)) => Ok(i.to_string()),
        _ => Err(StackError::InvalidConfig(format!(
            "{} requires a value",
            name
        ))),
    }
}
