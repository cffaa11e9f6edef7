//! Stack outputs surfaced after deployment

use crate::model::{ApiEndpoint, Token};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputValue {
    Literal { value: String },
    /// Invoke URL of a REST API stage
    ApiUrl {
        rest_api: String,
        region: String,
        stage: String,
    },
}

impl OutputValue {
    pub fn literal(value: impl Into<String>) -> Self {
        OutputValue::Literal {
            value: value.into(),
        }
    }

    pub fn api_url(api: &ApiEndpoint, region: impl Into<String>) -> Self {
        OutputValue::ApiUrl {
            rest_api: api.logical_id.clone(),
            region: region.into(),
            stage: api.stage_name.clone(),
        }
    }

    /// Human-readable value with deploy-time parts shown as placeholders
    pub fn render(&self) -> String {
        match self {
            OutputValue::Literal { value } => value.clone(),
            OutputValue::ApiUrl {
                rest_api,
                region,
                stage,
            } => format!(
                "https://{}.execute-api.{}.amazonaws.com/{}/",
                Token::reference(rest_api),
                region,
                stage
            ),
        }
    }

    pub fn to_intrinsic(&self, api: Option<&ApiEndpoint>) -> serde_json::Value {
        match self {
            OutputValue::Literal { value } => json!(value),
            OutputValue::ApiUrl {
                rest_api,
                region,
                stage,
            } => {
                let stage_ref = match api {
                    Some(api) => Token::reference(api.stage_logical_id()).to_intrinsic(),
                    None => json!(stage),
                };
                json!({
                    "Fn::Join": ["", [
                        "https://",
                        Token::reference(rest_api).to_intrinsic(),
                        ".execute-api.",
                        region,
                        ".",
                        { "Ref": "AWS::URLSuffix" },
                        "/",
                        stage_ref,
                        "/"
                    ]]
                })
            }
        }
    }

    pub fn references(&self) -> Vec<&str> {
        match self {
            OutputValue::Literal { .. } => Vec::new(),
            OutputValue::ApiUrl { rest_api, .. } => vec![rest_api.as_str()],
        }
    }
}

/// Named value the engine reports once the stack is deployed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackOutput {
    pub name: String,
    pub value: OutputValue,
    pub description: Option<String>,
}

impl StackOutput {
    pub fn new(name: impl Into<String>, value: OutputValue) -> Self {
        Self {
            name: name.into(),
            value,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
