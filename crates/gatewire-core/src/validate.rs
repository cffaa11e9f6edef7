//! Structural checks on a built stack

use crate::error::{Result, StackError};
use crate::model::{
    Connection, Declaration, HTTP_PORT, IngressRule, OutputValue, Peer, Protocol, ResourceKind,
    Stack,
};
use crate::sequencer::ENDPOINT_OUTPUT;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// A reference to a resource that is not declared earlier
    OutOfOrder { resource: String, reference: String },
    /// Wrong number of resources of a kind
    Cardinality { kind: ResourceKind, count: usize },
    /// Ingress other than TCP on port 80 from anywhere
    Ingress { policy: String, rule: String },
    /// No rule lets HTTP in
    MissingHttpIngress { policy: String },
    HealthCheck { target_group: String, interval_secs: u64, timeout_secs: u64 },
    /// API integration does not proxy to a declared balancer's DNS name
    ProxyTarget { api: String, target: String },
    /// API without any proxied route
    NoRoutes { api: String },
    MissingEndpointOutput,
    /// Endpoint output does not point at the declared API and its stage
    EndpointTarget { rest_api: String, stage: String },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::OutOfOrder {
                resource,
                reference,
            } => write!(
                f,
                "'{}' references '{}', which is not declared before it",
                resource, reference
            ),
            Violation::Cardinality { kind, count } => {
                write!(f, "expected exactly one {}, found {}", kind, count)
            }
            Violation::Ingress { policy, rule } => write!(
                f,
                "security policy '{}' allows {} (only tcp/{} from anywhere is permitted)",
                policy, rule, HTTP_PORT
            ),
            Violation::MissingHttpIngress { policy } => write!(
                f,
                "security policy '{}' does not allow tcp/{} from anywhere",
                policy, HTTP_PORT
            ),
            Violation::HealthCheck {
                target_group,
                interval_secs,
                timeout_secs,
            } => write!(
                f,
                "target group '{}': health check interval {}s must exceed timeout {}s",
                target_group, interval_secs, timeout_secs
            ),
            Violation::ProxyTarget { api, target } => write!(
                f,
                "API '{}' proxies to {}, which is not a load balancer DNS name reachable through a VPC link",
                api, target
            ),
            Violation::NoRoutes { api } => write!(f, "API '{}' has no routes", api),
            Violation::MissingEndpointOutput => {
                write!(f, "output '{}' is missing or empty", ENDPOINT_OUTPUT)
            }
            Violation::EndpointTarget { rest_api, stage } => write!(
                f,
                "output '{}' points at API '{}' stage '{}', which is not the declared API endpoint",
                ENDPOINT_OUTPUT, rest_api, stage
            ),
        }
    }
}

/// Collect every violation in `stack`
pub fn check_stack(stack: &Stack) -> Vec<Violation> {
    let mut violations = Vec::new();

    for (position, declaration) in stack.declarations.iter().enumerate() {
        for reference in declaration.references() {
            match stack.position(reference) {
                Some(target) if target < position => {}
                _ => violations.push(Violation::OutOfOrder {
                    resource: declaration.logical_id().to_string(),
                    reference: reference.to_string(),
                }),
            }
        }
    }

    for kind in ResourceKind::ALL {
        let count = stack.count(kind);
        if count != 1 {
            violations.push(Violation::Cardinality { kind, count });
        }
    }

    for policy in stack.security_policies() {
        for rule in policy.ingress.iter().filter(|r| !is_http_from_anywhere(r)) {
            violations.push(Violation::Ingress {
                policy: policy.logical_id.clone(),
                rule: format!("{}/{} from {}", rule.protocol, rule.port, rule.peer.cidr()),
            });
        }
        if !policy.ingress.iter().any(is_http_from_anywhere) {
            violations.push(Violation::MissingHttpIngress {
                policy: policy.logical_id.clone(),
            });
        }
    }

    for nlb in stack.load_balancers() {
        for listener in &nlb.listeners {
            let check = &listener.target_group.health_check;
            if check.interval <= check.timeout {
                violations.push(Violation::HealthCheck {
                    target_group: listener.target_group.logical_id.clone(),
                    interval_secs: check.interval.as_secs(),
                    timeout_secs: check.timeout.as_secs(),
                });
            }
        }
    }

    for api in stack.api_endpoints() {
        if api.routes.is_empty() {
            violations.push(Violation::NoRoutes {
                api: api.logical_id.clone(),
            });
        }
        for route in &api.routes {
            let host = &route.integration.uri.host;
            let is_nlb_dns = stack.load_balancers().any(|nlb| nlb.dns_name() == *host);
            let linked = match &route.integration.connection {
                Connection::VpcLink(link) => stack.get(link).is_some_and(|d| {
                    matches!(d, Declaration::GatewayLink(l) if l.targets.iter().any(|t| t == host.logical_id()))
                }),
                Connection::Internet => false,
            };
            if !is_nlb_dns || !linked {
                violations.push(Violation::ProxyTarget {
                    api: api.logical_id.clone(),
                    target: route.integration.uri.to_string(),
                });
            }
        }
    }

    match stack.output(ENDPOINT_OUTPUT).map(|o| &o.value) {
        Some(OutputValue::ApiUrl {
            rest_api, stage, ..
        }) if !rest_api.is_empty() => {
            let declared = stack
                .api_endpoints()
                .any(|api| api.logical_id == *rest_api && api.stage_name == *stage);
            if !declared {
                violations.push(Violation::EndpointTarget {
                    rest_api: rest_api.clone(),
                    stage: stage.clone(),
                });
            }
        }
        _ => violations.push(Violation::MissingEndpointOutput),
    }

    violations
}

fn is_http_from_anywhere(rule: &IngressRule) -> bool {
    rule.protocol == Protocol::Tcp && rule.port == HTTP_PORT && rule.peer == Peer::AnyIpv4
}

/// Fail with every violation listed when the stack is not well-formed
pub fn validate_stack(stack: &Stack) -> Result<()> {
    let violations = check_stack(stack);
    if violations.is_empty() {
        return Ok(());
    }
    let message = violations
        .iter()
        .map(|v| format!("  - {}", v))
        .collect::<Vec<_>>()
        .join("\n");
    Err(StackError::Invalid(message))
}
