//! KDL parser for `stack.kdl`
//!
//! Values absent from the file keep their built-in defaults.

mod stack;

#[cfg(test)]
mod tests;

use crate::error::{Result, StackError};
use crate::model::StackConfig;
use kdl::KdlDocument;
use stack::parse_stack_node;
use std::fs;
use std::path::Path;

/// Parse a stack file into a configuration
pub fn parse_stack_file<P: AsRef<Path>>(path: P) -> Result<StackConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| StackError::IoError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    tracing::debug!("Parsing stack file {}", path.display());
    parse_stack_string(&content)
}

/// Parse KDL text into a configuration
pub fn parse_stack_string(content: &str) -> Result<StackConfig> {
    let doc: KdlDocument = content.parse()?;
    let mut config = StackConfig::default();
    let mut seen = false;

    for node in doc.nodes() {
        match node.name().value() {
            "stack" => {
                if seen {
                    return Err(StackError::InvalidConfig(
                        "only one stack node is allowed".to_string(),
                    ));
                }
                seen = true;
                parse_stack_node(node, &mut config)?;
            }
            other => {
                tracing::warn!("Ignoring unknown top-level node: {}", other);
            }
        }
    }

    Ok(config)
}
