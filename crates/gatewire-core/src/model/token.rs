//! Deploy-time value references

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

/// A value that only exists once the deployment engine has created a resource.
///
/// Renders to a CloudFormation intrinsic during synthesis and to a
/// `${Id}` / `${Id.Attribute}` placeholder for display.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Token {
    /// Primary identifier of a resource (`Ref`)
    Ref { logical_id: String },
    /// Named attribute of a resource (`Fn::GetAtt`)
    Attr {
        logical_id: String,
        attribute: String,
    },
}

impl Token {
    pub fn reference(logical_id: impl Into<String>) -> Self {
        Token::Ref {
            logical_id: logical_id.into(),
        }
    }

    pub fn attr(logical_id: impl Into<String>, attribute: impl Into<String>) -> Self {
        Token::Attr {
            logical_id: logical_id.into(),
            attribute: attribute.into(),
        }
    }

    /// Logical id of the resource this token points at
    pub fn logical_id(&self) -> &str {
        match self {
            Token::Ref { logical_id } | Token::Attr { logical_id, .. } => logical_id,
        }
    }

    pub fn to_intrinsic(&self) -> serde_json::Value {
        match self {
            Token::Ref { logical_id } => json!({ "Ref": logical_id }),
            Token::Attr {
                logical_id,
                attribute,
            } => json!({ "Fn::GetAtt": [logical_id, attribute] }),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ref { logical_id } => write!(f, "${{{}}}", logical_id),
            Token::Attr {
                logical_id,
                attribute,
            } => write!(f, "${{{}.{}}}", logical_id, attribute),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_placeholders() {
        assert_eq!(Token::reference("MyVpc").to_string(), "${MyVpc}");
        assert_eq!(Token::attr("MyNLB", "DNSName").to_string(), "${MyNLB.DNSName}");
    }

    #[test]
    fn test_intrinsics() {
        assert_eq!(
            Token::reference("MyVpc").to_intrinsic(),
            json!({ "Ref": "MyVpc" })
        );
        assert_eq!(
            Token::attr("MyNLB", "DNSName").to_intrinsic(),
            json!({ "Fn::GetAtt": ["MyNLB", "DNSName"] })
        );
    }
}
