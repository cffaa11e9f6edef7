//! API Gateway declarations: the VPC link and the REST API in front of it

use crate::model::{LoadBalancer, Token};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bridge from the public API front-end to private load balancers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayLink {
    pub logical_id: String,
    /// Logical ids of the load balancers this link reaches
    pub targets: Vec<String>,
}

impl GatewayLink {
    pub fn new(logical_id: impl Into<String>, targets: &[&LoadBalancer]) -> Self {
        Self {
            logical_id: logical_id.into(),
            targets: targets.iter().map(|t| t.logical_id.clone()).collect(),
        }
    }

    pub fn link_id(&self) -> Token {
        Token::reference(&self.logical_id)
    }

    pub fn references(&self) -> Vec<&str> {
        self.targets.iter().map(|s| s.as_str()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EndpointType {
    Regional,
    Edge,
    Private,
}

impl fmt::Display for EndpointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointType::Regional => write!(f, "REGIONAL"),
            EndpointType::Edge => write!(f, "EDGE"),
            EndpointType::Private => write!(f, "PRIVATE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Any,
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HttpMethod::Any => "ANY",
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntegrationType {
    /// Pass the request through untouched
    HttpProxy,
    Http,
}

impl fmt::Display for IntegrationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrationType::HttpProxy => write!(f, "HTTP_PROXY"),
            IntegrationType::Http => write!(f, "HTTP"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connection {
    Internet,
    /// Route through a VPC link (logical id)
    VpcLink(String),
}

/// Backend URI the integration forwards to (`http://<host>`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyTarget {
    pub scheme: String,
    pub host: Token,
}

impl ProxyTarget {
    pub fn http(host: Token) -> Self {
        Self {
            scheme: "http".to_string(),
            host,
        }
    }
}

impl fmt::Display for ProxyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Integration {
    pub kind: IntegrationType,
    pub http_method: HttpMethod,
    pub uri: ProxyTarget,
    pub connection: Connection,
}

/// One path segment under the API root with a single method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiRoute {
    pub path_part: String,
    pub method: HttpMethod,
    pub integration: Integration,
}

impl ApiRoute {
    /// Logical id prefix of the resource/method pair in the template
    pub fn logical_id(&self, api: &ApiEndpoint) -> String {
        format!("{}{}", api.logical_id, id_fragment(&self.path_part))
    }
}

/// Template logical ids are alphanumeric; path parts and stage names may
/// also carry `-`, `_` or `.`
pub fn id_fragment(name: &str) -> String {
    name.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// Publicly routable REST API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEndpoint {
    pub logical_id: String,
    pub endpoint_type: EndpointType,
    pub stage_name: String,
    pub routes: Vec<ApiRoute>,
}

impl ApiEndpoint {
    pub fn new(
        logical_id: impl Into<String>,
        endpoint_type: EndpointType,
        stage_name: impl Into<String>,
    ) -> Self {
        Self {
            logical_id: logical_id.into(),
            endpoint_type,
            stage_name: stage_name.into(),
            routes: Vec::new(),
        }
    }

    /// Add `method` on `/<path_part>` proxied by `integration`
    pub fn add_route(
        &mut self,
        path_part: impl Into<String>,
        method: HttpMethod,
        integration: Integration,
    ) {
        self.routes.push(ApiRoute {
            path_part: path_part.into(),
            method,
            integration,
        });
    }

    pub fn stage_logical_id(&self) -> String {
        format!(
            "{}DeploymentStage{}",
            self.logical_id,
            id_fragment(&self.stage_name)
        )
    }

    pub fn deployment_logical_id(&self) -> String {
        format!("{}Deployment", self.logical_id)
    }

    pub fn references(&self) -> Vec<&str> {
        let mut refs: Vec<&str> = Vec::new();
        for route in &self.routes {
            let host = route.integration.uri.host.logical_id();
            if !refs.contains(&host) {
                refs.push(host);
            }
            if let Connection::VpcLink(link) = &route.integration.connection {
                if !refs.contains(&link.as_str()) {
                    refs.push(link.as_str());
                }
            }
        }
        refs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logical_ids_drop_punctuation() {
        let mut api = ApiEndpoint::new("MyRestApi", EndpointType::Regional, "dev-1");
        api.add_route(
            "my-nlb",
            HttpMethod::Any,
            Integration {
                kind: IntegrationType::HttpProxy,
                http_method: HttpMethod::Any,
                uri: ProxyTarget::http(Token::attr("MyNLB", "DNSName")),
                connection: Connection::VpcLink("MyVpcLink".to_string()),
            },
        );

        assert_eq!(api.routes[0].logical_id(&api), "MyRestApimynlb");
        assert_eq!(api.stage_logical_id(), "MyRestApiDeploymentStagedev1");
        assert_eq!(api.routes[0].path_part, "my-nlb");
        assert_eq!(api.stage_name, "dev-1");
    }
}
