//! CloudFormation template synthesis
//!
//! Renders a [`Stack`] into the template the deployment engine consumes.
//! Resources are emitted in declaration order; cross-resource values become
//! `Ref` / `Fn::GetAtt` intrinsics.

use crate::error::{Result, StackError};
use crate::graph::DependencyGraph;
use crate::model::{
    ApiEndpoint, ComputeInstance, Connection, Declaration, GatewayLink, LoadBalancer, Network,
    SecurityPolicy, Stack, Subnet, SubnetKind, Token,
};
use serde_json::{Map, Value, json};

const TEMPLATE_VERSION: &str = "2010-09-09";

/// A synthesized CloudFormation template
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    body: Value,
}

impl Template {
    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.body)?)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.body)?)
    }

    pub fn resource(&self, logical_id: &str) -> Option<&Value> {
        self.body.get("Resources").and_then(|r| r.get(logical_id))
    }

    /// `(logical id, resource type)` pairs in template order
    pub fn resources(&self) -> Vec<(&str, &str)> {
        self.body
            .get("Resources")
            .and_then(Value::as_object)
            .map(|resources| {
                resources
                    .iter()
                    .map(|(id, r)| {
                        let ty = r.get("Type").and_then(Value::as_str).unwrap_or_default();
                        (id.as_str(), ty)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn resources_of_type(&self, resource_type: &str) -> Vec<&str> {
        self.resources()
            .into_iter()
            .filter(|(_, ty)| *ty == resource_type)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn output_names(&self) -> Vec<&str> {
        self.body
            .get("Outputs")
            .and_then(Value::as_object)
            .map(|o| o.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

/// Render `stack` as a CloudFormation template
#[tracing::instrument(skip(stack), fields(stack = %stack.name))]
pub fn synthesize(stack: &Stack) -> Result<Template> {
    // refuses cyclic or dangling references before anything is rendered
    DependencyGraph::from_stack(stack)?.deploy_order()?;

    let mut resources = Map::new();
    let mut mappings = Map::new();

    for declaration in &stack.declarations {
        match declaration {
            Declaration::Network(network) => synth_network(network, &mut resources),
            Declaration::SecurityPolicy(policy) => {
                synth_security_policy(policy, &mut resources)
            }
            Declaration::ComputeInstance(instance) => {
                let network = lookup_network(stack, &instance.logical_id, &instance.network)?;
                synth_instance(instance, network, &mut resources, &mut mappings)?
            }
            Declaration::LoadBalancer(nlb) => {
                let network = lookup_network(stack, &nlb.logical_id, &nlb.network)?;
                synth_load_balancer(nlb, network, &mut resources)
            }
            Declaration::GatewayLink(link) => synth_gateway_link(link, &mut resources),
            Declaration::ApiEndpoint(api) => synth_api(api, &mut resources)?,
        }
    }

    let mut outputs = Map::new();
    for output in &stack.outputs {
        let api = output
            .value
            .references()
            .first()
            .and_then(|id| stack.api_endpoints().find(|a| a.logical_id == *id));
        let mut body = Map::new();
        if let Some(description) = &output.description {
            body.insert("Description".to_string(), json!(description));
        }
        body.insert("Value".to_string(), output.value.to_intrinsic(api));
        outputs.insert(output.name.clone(), Value::Object(body));
    }

    let mut body = Map::new();
    body.insert(
        "AWSTemplateFormatVersion".to_string(),
        json!(TEMPLATE_VERSION),
    );
    body.insert(
        "Description".to_string(),
        json!(format!(
            "{}: API Gateway -> VPC link -> internal NLB -> EC2 ({})",
            stack.name, stack.env.region
        )),
    );
    if !mappings.is_empty() {
        body.insert("Mappings".to_string(), Value::Object(mappings));
    }
    body.insert("Resources".to_string(), Value::Object(resources));
    body.insert("Outputs".to_string(), Value::Object(outputs));

    tracing::debug!("Synthesized template for {}", stack.name);
    Ok(Template {
        body: Value::Object(body),
    })
}

fn lookup_network<'a>(stack: &'a Stack, resource: &str, network: &str) -> Result<&'a Network> {
    stack
        .network(network)
        .ok_or_else(|| StackError::UnresolvedReference {
            resource: resource.to_string(),
            reference: network.to_string(),
        })
}

fn default_route_id(network: &Network, subnet: &Subnet) -> String {
    format!("{}DefaultRoute", network.subnet_logical_id(subnet))
}

fn subnet_refs(network: &Network, kind: SubnetKind) -> Vec<Value> {
    network
        .subnets
        .iter()
        .filter(|s| s.kind == kind)
        .map(|s| Token::reference(network.subnet_logical_id(s)).to_intrinsic())
        .collect()
}

fn synth_network(network: &Network, resources: &mut Map<String, Value>) {
    let vpc = &network.logical_id;
    let vpc_ref = network.vpc_id().to_intrinsic();
    let igw = format!("{}IGW", vpc);
    let attachment = format!("{}VPCGW", vpc);

    resources.insert(
        vpc.clone(),
        json!({
            "Type": "AWS::EC2::VPC",
            "Properties": {
                "CidrBlock": network.cidr.to_string(),
                "EnableDnsHostnames": true,
                "EnableDnsSupport": true,
                "InstanceTenancy": "default",
                "Tags": [{ "Key": "Name", "Value": vpc }]
            }
        }),
    );
    resources.insert(igw.clone(), json!({ "Type": "AWS::EC2::InternetGateway" }));
    resources.insert(
        attachment.clone(),
        json!({
            "Type": "AWS::EC2::VPCGatewayAttachment",
            "Properties": {
                "VpcId": vpc_ref,
                "InternetGatewayId": { "Ref": igw }
            }
        }),
    );

    let nat = network
        .subnet(SubnetKind::Public)
        .map(|s| format!("{}NATGateway", network.subnet_logical_id(s)));

    for subnet in &network.subnets {
        let id = network.subnet_logical_id(subnet);
        let route_table = format!("{}RouteTable", id);
        let association = format!("{}RouteTableAssociation", id);
        let default_route = default_route_id(network, subnet);
        let public = subnet.kind == SubnetKind::Public;

        resources.insert(
            id.clone(),
            json!({
                "Type": "AWS::EC2::Subnet",
                "Properties": {
                    "VpcId": vpc_ref,
                    "CidrBlock": subnet.cidr.to_string(),
                    "AvailabilityZone": { "Fn::Select": [0, { "Fn::GetAZs": "" }] },
                    "MapPublicIpOnLaunch": public,
                    "Tags": [{ "Key": "Name", "Value": format!("{}/{}Subnet1", vpc, subnet.name) }]
                }
            }),
        );
        resources.insert(
            route_table.clone(),
            json!({
                "Type": "AWS::EC2::RouteTable",
                "Properties": { "VpcId": vpc_ref }
            }),
        );
        resources.insert(
            association.clone(),
            json!({
                "Type": "AWS::EC2::SubnetRouteTableAssociation",
                "Properties": {
                    "RouteTableId": { "Ref": route_table },
                    "SubnetId": { "Ref": id }
                }
            }),
        );

        match subnet.kind {
            SubnetKind::Public => {
                let eip = format!("{}EIP", id);
                resources.insert(
                    default_route.clone(),
                    json!({
                        "Type": "AWS::EC2::Route",
                        "Properties": {
                            "RouteTableId": { "Ref": route_table },
                            "DestinationCidrBlock": "0.0.0.0/0",
                            "GatewayId": { "Ref": igw }
                        },
                        "DependsOn": [attachment]
                    }),
                );
                resources.insert(
                    eip.clone(),
                    json!({
                        "Type": "AWS::EC2::EIP",
                        "Properties": { "Domain": "vpc" }
                    }),
                );
                if let Some(nat) = &nat {
                    resources.insert(
                        nat.clone(),
                        json!({
                            "Type": "AWS::EC2::NatGateway",
                            "Properties": {
                                "SubnetId": { "Ref": id },
                                "AllocationId": { "Fn::GetAtt": [eip, "AllocationId"] }
                            },
                            "DependsOn": [default_route, association]
                        }),
                    );
                }
            }
            SubnetKind::PrivateWithEgress => {
                if let Some(nat) = &nat {
                    resources.insert(
                        default_route,
                        json!({
                            "Type": "AWS::EC2::Route",
                            "Properties": {
                                "RouteTableId": { "Ref": route_table },
                                "DestinationCidrBlock": "0.0.0.0/0",
                                "NatGatewayId": { "Ref": nat }
                            }
                        }),
                    );
                }
            }
        }
    }
}

fn synth_security_policy(policy: &SecurityPolicy, resources: &mut Map<String, Value>) {
    let ingress: Vec<Value> = policy
        .ingress
        .iter()
        .map(|rule| {
            json!({
                "CidrIp": rule.peer.cidr().to_string(),
                "Description": rule.description,
                "FromPort": rule.port,
                "IpProtocol": rule.protocol.as_str(),
                "ToPort": rule.port
            })
        })
        .collect();

    let mut properties = Map::new();
    properties.insert("GroupDescription".to_string(), json!(policy.description));
    properties.insert("SecurityGroupIngress".to_string(), json!(ingress));
    if policy.allow_all_outbound {
        properties.insert(
            "SecurityGroupEgress".to_string(),
            json!([{
                "CidrIp": "0.0.0.0/0",
                "Description": "Allow all outbound traffic by default",
                "IpProtocol": "-1"
            }]),
        );
    }
    properties.insert(
        "VpcId".to_string(),
        Token::reference(&policy.network).to_intrinsic(),
    );

    resources.insert(
        policy.logical_id.clone(),
        json!({
            "Type": "AWS::EC2::SecurityGroup",
            "Properties": properties
        }),
    );
}

fn synth_instance(
    instance: &ComputeInstance,
    network: &Network,
    resources: &mut Map<String, Value>,
    mappings: &mut Map<String, Value>,
) -> Result<()> {
    let subnet = network.subnet(instance.subnet).ok_or_else(|| {
        StackError::InvalidConfig(format!(
            "instance '{}' wants a {} subnet, which network '{}' does not have",
            instance.logical_id, instance.subnet, network.logical_id
        ))
    })?;

    let map_name = format!("{}AmiMap", instance.logical_id);
    let mut regions = Map::new();
    for (region, image) in instance.image.iter() {
        regions.insert(region.to_string(), json!({ "ami": image }));
    }
    mappings.insert(map_name.clone(), Value::Object(regions));

    let mut depends_on = Vec::new();
    if instance.subnet == SubnetKind::PrivateWithEgress {
        depends_on.push(json!(default_route_id(network, subnet)));
    }

    resources.insert(
        instance.logical_id.clone(),
        json!({
            "Type": "AWS::EC2::Instance",
            "Properties": {
                "ImageId": { "Fn::FindInMap": [map_name, { "Ref": "AWS::Region" }, "ami"] },
                "InstanceType": instance.instance_type,
                "SecurityGroupIds": [
                    Token::attr(&instance.security_policy, "GroupId").to_intrinsic()
                ],
                "SubnetId": Token::reference(network.subnet_logical_id(subnet)).to_intrinsic(),
                "UserData": { "Fn::Base64": instance.user_data.render() },
                "Tags": [{ "Key": "Name", "Value": instance.logical_id }]
            },
            "DependsOn": depends_on
        }),
    );
    Ok(())
}

fn synth_load_balancer(nlb: &LoadBalancer, network: &Network, resources: &mut Map<String, Value>) {
    let subnets = if nlb.internet_facing {
        subnet_refs(network, SubnetKind::Public)
    } else {
        subnet_refs(network, SubnetKind::PrivateWithEgress)
    };

    resources.insert(
        nlb.logical_id.clone(),
        json!({
            "Type": "AWS::ElasticLoadBalancingV2::LoadBalancer",
            "Properties": {
                "LoadBalancerAttributes": [{
                    "Key": "load_balancing.cross_zone.enabled",
                    "Value": nlb.cross_zone_enabled.to_string()
                }],
                "Scheme": if nlb.internet_facing { "internet-facing" } else { "internal" },
                "Subnets": subnets,
                "Type": "network"
            }
        }),
    );

    for listener in &nlb.listeners {
        let group = &listener.target_group;
        let check = &group.health_check;
        let targets: Vec<Value> = group
            .targets
            .iter()
            .map(|t| json!({ "Id": { "Ref": t } }))
            .collect();

        resources.insert(
            listener.logical_id.clone(),
            json!({
                "Type": "AWS::ElasticLoadBalancingV2::Listener",
                "Properties": {
                    "DefaultActions": [{
                        "TargetGroupArn": { "Ref": group.logical_id },
                        "Type": "forward"
                    }],
                    "LoadBalancerArn": nlb.arn().to_intrinsic(),
                    "Port": listener.port,
                    "Protocol": "TCP"
                }
            }),
        );
        resources.insert(
            group.logical_id.clone(),
            json!({
                "Type": "AWS::ElasticLoadBalancingV2::TargetGroup",
                "Properties": {
                    "HealthCheckIntervalSeconds": check.interval.as_secs(),
                    "HealthCheckPath": check.path,
                    "HealthCheckPort": check.port,
                    "HealthCheckProtocol": check.protocol.to_string(),
                    "HealthCheckTimeoutSeconds": check.timeout.as_secs(),
                    "Port": group.port,
                    "Protocol": "TCP",
                    "TargetType": "instance",
                    "Targets": targets,
                    "VpcId": Token::reference(&network.logical_id).to_intrinsic()
                }
            }),
        );
    }
}

fn synth_gateway_link(link: &GatewayLink, resources: &mut Map<String, Value>) {
    let targets: Vec<Value> = link
        .targets
        .iter()
        .map(|t| Token::reference(t).to_intrinsic())
        .collect();
    resources.insert(
        link.logical_id.clone(),
        json!({
            "Type": "AWS::ApiGateway::VpcLink",
            "Properties": {
                "Name": link.logical_id,
                "TargetArns": targets
            }
        }),
    );
}

fn synth_api(api: &ApiEndpoint, resources: &mut Map<String, Value>) -> Result<()> {
    let api_ref = Token::reference(&api.logical_id).to_intrinsic();

    resources.insert(
        api.logical_id.clone(),
        json!({
            "Type": "AWS::ApiGateway::RestApi",
            "Properties": {
                "EndpointConfiguration": { "Types": [api.endpoint_type.to_string()] },
                "Name": api.logical_id
            }
        }),
    );

    let mut methods = Vec::new();
    for route in &api.routes {
        let route_id = route.logical_id(api);
        let method_id = format!("{}{}", route_id, route.method);
        let integration = &route.integration;

        let mut integration_body = Map::new();
        integration_body.insert(
            "IntegrationHttpMethod".to_string(),
            json!(integration.http_method.to_string()),
        );
        integration_body.insert("Type".to_string(), json!(integration.kind.to_string()));
        integration_body.insert(
            "Uri".to_string(),
            json!({
                "Fn::Join": ["", [
                    format!("{}://", integration.uri.scheme),
                    integration.uri.host.to_intrinsic()
                ]]
            }),
        );
        match &integration.connection {
            Connection::VpcLink(link) => {
                integration_body.insert("ConnectionType".to_string(), json!("VPC_LINK"));
                integration_body.insert(
                    "ConnectionId".to_string(),
                    Token::reference(link).to_intrinsic(),
                );
            }
            Connection::Internet => {
                integration_body.insert("ConnectionType".to_string(), json!("INTERNET"));
            }
        }

        resources.insert(
            route_id.clone(),
            json!({
                "Type": "AWS::ApiGateway::Resource",
                "Properties": {
                    "ParentId": { "Fn::GetAtt": [api.logical_id, "RootResourceId"] },
                    "PathPart": route.path_part,
                    "RestApiId": api_ref
                }
            }),
        );
        resources.insert(
            method_id.clone(),
            json!({
                "Type": "AWS::ApiGateway::Method",
                "Properties": {
                    "AuthorizationType": "NONE",
                    "HttpMethod": route.method.to_string(),
                    "Integration": integration_body,
                    "ResourceId": { "Ref": route_id },
                    "RestApiId": api_ref
                }
            }),
        );
        methods.push(json!(method_id));
    }

    if methods.is_empty() {
        return Err(StackError::InvalidConfig(format!(
            "API '{}' has no methods and cannot be deployed",
            api.logical_id
        )));
    }

    let deployment = api.deployment_logical_id();
    resources.insert(
        deployment.clone(),
        json!({
            "Type": "AWS::ApiGateway::Deployment",
            "Properties": {
                "Description": "Automatically created by gatewire",
                "RestApiId": api_ref
            },
            "DependsOn": methods
        }),
    );
    resources.insert(
        api.stage_logical_id(),
        json!({
            "Type": "AWS::ApiGateway::Stage",
            "Properties": {
                "DeploymentId": { "Ref": deployment },
                "RestApiId": api_ref,
                "StageName": api.stage_name
            }
        }),
    );
    Ok(())
}
