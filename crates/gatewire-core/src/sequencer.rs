//! Declaration sequencer
//!
//! Builds the stack in one straight pass:
//! Network → SecurityPolicy → ComputeInstance → LoadBalancer → GatewayLink
//! → ApiEndpoint → outputs. Each record is constructed from references to the
//! records built before it and then handed to [`StackBuilder`], which refuses
//! anything out of order.

use crate::error::Result;
use crate::model::{
    ApiEndpoint, ComputeInstance, Connection, EndpointType, GatewayLink, HEALTH_CHECK_INTERVAL,
    HEALTH_CHECK_PATH, HEALTH_CHECK_TIMEOUT, HTTP_PORT, HealthCheck, HealthCheckProtocol,
    HttpMethod, Integration, IntegrationType, LoadBalancer, Network, OutputValue, Peer, Protocol,
    ProxyTarget, SecurityPolicy, Stack, StackBuilder, StackConfig, StackOutput, SubnetKind,
    TargetGroup,
};

pub const NETWORK_ID: &str = "MyVpc";
pub const SECURITY_POLICY_ID: &str = "MySecurityGroup";
pub const INSTANCE_ID: &str = "MyEC2Instance1";
pub const LOAD_BALANCER_ID: &str = "MyNLB";
pub const GATEWAY_LINK_ID: &str = "MyVpcLink";
pub const API_ID: &str = "MyRestApi";

pub const IMAGE_OUTPUT: &str = "AMI_ID";
pub const ENDPOINT_OUTPUT: &str = "ApiEndpoint";

/// Declare every resource of the stack described by `config`
#[tracing::instrument(skip(config), fields(stack = %config.name, region = %config.region))]
pub fn sequence(config: &StackConfig) -> Result<Stack> {
    config.validate()?;

    let network = declare_network(config)?;
    let security = declare_security_policy(&network);
    let instance = declare_instance(config, &network, &security)?;
    let nlb = declare_load_balancer(&network, &instance);
    let link = GatewayLink::new(GATEWAY_LINK_ID, &[&nlb]);
    let api = declare_api(config, &nlb, &link);

    let image_id = config.image_id()?;
    let endpoint = OutputValue::api_url(&api, &config.region);

    let mut builder = StackBuilder::new(&config.name, config.env());
    builder.declare(network)?;
    builder.declare(security)?;
    builder.declare(instance)?;
    builder.declare(nlb)?;
    builder.declare(link)?;
    builder.declare(api)?;

    builder.output(StackOutput::new(IMAGE_OUTPUT, OutputValue::literal(image_id)))?;
    builder.output(
        StackOutput::new(ENDPOINT_OUTPUT, endpoint).with_description("API Gateway Endpoint"),
    )?;

    let stack = builder.build();
    tracing::debug!("Sequenced {} declarations", stack.declarations.len());
    Ok(stack)
}

fn declare_network(config: &StackConfig) -> Result<Network> {
    Network::new(NETWORK_ID, config.vpc_cidr()?, 1)
        .with_subnet("Public", SubnetKind::Public, config.subnet_mask)?
        .with_subnet("Private", SubnetKind::PrivateWithEgress, config.subnet_mask)
}

fn declare_security_policy(network: &Network) -> SecurityPolicy {
    let mut policy = SecurityPolicy::new(
        SECURITY_POLICY_ID,
        network,
        "Allow HTTP inbound traffic",
        true,
    );
    policy.add_ingress_rule(Peer::AnyIpv4, Protocol::Tcp, HTTP_PORT, "Allow HTTP traffic");
    policy
}

fn declare_instance(
    config: &StackConfig,
    network: &Network,
    security: &SecurityPolicy,
) -> Result<ComputeInstance> {
    let mut instance = ComputeInstance::new(
        INSTANCE_ID,
        network,
        security,
        &config.instance_type,
        config.machine_image(),
        SubnetKind::PrivateWithEgress,
    );
    instance.user_data.add_commands(config.boot_script()?);
    Ok(instance)
}

fn declare_load_balancer(network: &Network, instance: &ComputeInstance) -> LoadBalancer {
    let mut nlb = LoadBalancer::new(LOAD_BALANCER_ID, network, false, true);
    let target_group = TargetGroup::new(
        format!("{}ListenerTargetGroup", LOAD_BALANCER_ID),
        HTTP_PORT,
        &[instance],
        HealthCheck {
            path: HEALTH_CHECK_PATH.to_string(),
            port: HTTP_PORT.to_string(),
            protocol: HealthCheckProtocol::Http,
            interval: HEALTH_CHECK_INTERVAL,
            timeout: HEALTH_CHECK_TIMEOUT,
        },
    );
    nlb.add_listener("Listener", HTTP_PORT, target_group);
    nlb
}

fn declare_api(config: &StackConfig, nlb: &LoadBalancer, link: &GatewayLink) -> ApiEndpoint {
    let mut api = ApiEndpoint::new(API_ID, EndpointType::Regional, &config.stage);
    api.add_route(
        &config.route,
        HttpMethod::Any,
        Integration {
            kind: IntegrationType::HttpProxy,
            http_method: HttpMethod::Any,
            uri: ProxyTarget::http(nlb.dns_name()),
            connection: Connection::VpcLink(link.logical_id.clone()),
        },
    );
    api
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StackError;
    use crate::model::{Declaration, ResourceKind};

    #[test]
    fn test_sequence_default_stack() {
        let stack = sequence(&StackConfig::default()).unwrap();

        let ids: Vec<&str> = stack.declarations.iter().map(|d| d.logical_id()).collect();
        assert_eq!(
            ids,
            vec![
                NETWORK_ID,
                SECURITY_POLICY_ID,
                INSTANCE_ID,
                LOAD_BALANCER_ID,
                GATEWAY_LINK_ID,
                API_ID
            ]
        );
        assert_eq!(stack.name, "NeelStack");
        assert_eq!(stack.env.region, "us-east-1");
    }

    #[test]
    fn test_references_point_strictly_backwards() {
        let stack = sequence(&StackConfig::default()).unwrap();

        for (position, declaration) in stack.declarations.iter().enumerate() {
            for reference in declaration.references() {
                let target = stack.position(reference).unwrap_or_else(|| {
                    panic!("{} references unknown {}", declaration.logical_id(), reference)
                });
                assert!(
                    target < position,
                    "{} (#{}) references {} (#{})",
                    declaration.logical_id(),
                    position,
                    reference,
                    target
                );
            }
        }
    }

    #[test]
    fn test_exactly_one_of_each_kind() {
        let stack = sequence(&StackConfig::default()).unwrap();
        for kind in ResourceKind::ALL {
            assert_eq!(stack.count(kind), 1, "expected exactly one {}", kind);
        }
    }

    #[test]
    fn test_us_east_1_scenario() {
        let config = StackConfig {
            region: "us-east-1".to_string(),
            ..Default::default()
        };
        let stack = sequence(&config).unwrap();
        assert_eq!(stack.declarations.len(), 6);

        let Some(Declaration::ApiEndpoint(api)) = stack.declarations.last() else {
            panic!("last declaration must be the API endpoint");
        };
        let nlb = stack.load_balancers().next().unwrap();
        assert_eq!(api.routes.len(), 1);
        assert_eq!(api.routes[0].integration.uri.host, nlb.dns_name());
        assert_eq!(api.routes[0].path_part, "mynlb");
        assert_eq!(api.routes[0].method, HttpMethod::Any);
    }

    #[test]
    fn test_endpoint_output_is_url_of_api() {
        let stack = sequence(&StackConfig::default()).unwrap();
        let output = stack.output(ENDPOINT_OUTPUT).unwrap();
        let url = output.value.render();

        assert!(url.starts_with("https://"));
        assert!(url.contains(API_ID));
        assert!(url.ends_with("/prod/"));
        assert_eq!(output.value.references(), vec![API_ID]);

        let image = stack.output(IMAGE_OUTPUT).unwrap();
        assert_eq!(image.value.render(), "ami-0ba8562d785e35387");
    }

    #[test]
    fn test_instance_is_private_with_nginx() {
        let stack = sequence(&StackConfig::default()).unwrap();
        let Some(Declaration::ComputeInstance(instance)) = stack.get(INSTANCE_ID) else {
            panic!("instance missing");
        };
        assert_eq!(instance.subnet, SubnetKind::PrivateWithEgress);
        assert_eq!(instance.security_policy, SECURITY_POLICY_ID);
        assert!(
            instance
                .user_data
                .commands()
                .iter()
                .any(|c| c.contains("apt-get install nginx"))
        );
    }

    #[test]
    fn test_unsupported_region_fails() {
        let config = StackConfig {
            region: "eu-central-1".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            sequence(&config),
            Err(StackError::UnsupportedRegion { .. })
        ));
    }

    #[test]
    fn test_custom_route_and_stage() {
        let config = StackConfig {
            route: "backend".to_string(),
            stage: "dev".to_string(),
            ..Default::default()
        };
        let stack = sequence(&config).unwrap();
        let api = stack.api_endpoints().next().unwrap();
        assert_eq!(api.routes[0].path_part, "backend");
        assert!(stack.output(ENDPOINT_OUTPUT).unwrap().value.render().ends_with("/dev/"));
    }
}
