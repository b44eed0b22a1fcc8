/// CloudFormation template synthesis from the resource graph
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::debug;

use crate::graph::models::{
    CacheEngine, IngressRule, LogicalId, Peer, SecurityGroup, Subnet, SubnetTier,
};
use crate::graph::ResourceGraph;

const FORMAT_VERSION: &str = "2010-09-09";

/// A synthesized CloudFormation template
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,

    #[serde(rename = "Description")]
    pub description: String,

    #[serde(rename = "Resources")]
    pub resources: BTreeMap<String, Resource>,

    #[serde(rename = "Outputs")]
    pub outputs: BTreeMap<String, Output>,
}

/// Template resource entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resource {
    #[serde(rename = "Type")]
    pub resource_type: String,

    pub properties: Value,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

/// Template output entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    pub description: String,
    pub value: Value,
}

fn reference(id: &LogicalId) -> Value {
    json!({ "Ref": id.as_str() })
}

fn get_att(id: &LogicalId, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [id.as_str(), attribute] })
}

fn name_tag(stack_name: &str, id: &LogicalId) -> Value {
    json!([{ "Key": "Name", "Value": format!("{}/{}", stack_name, id) }])
}

impl Template {
    /// Render the graph as a template
    pub fn synthesize(graph: &ResourceGraph) -> Result<Self> {
        let mut template = Self {
            format_version: FORMAT_VERSION.to_string(),
            description: format!("{} - Fargate service with Redis cache", graph.stack_name),
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        };

        template.add_network(graph)?;
        template.add_security_groups(graph)?;
        template.add_cache(graph)?;
        template.add_task(graph)?;
        template.add_load_balanced_service(graph)?;
        template.add_outputs(graph);

        debug!("Synthesized {} template resources", template.resources.len());
        Ok(template)
    }

    fn add(&mut self, id: &LogicalId, resource_type: &str, properties: Value) -> Result<()> {
        self.add_with_deps(id, resource_type, properties, vec![])
    }

    fn add_with_deps(
        &mut self,
        id: &LogicalId,
        resource_type: &str,
        properties: Value,
        depends_on: Vec<String>,
    ) -> Result<()> {
        match self.resources.entry(id.to_string()) {
            Entry::Occupied(existing) => anyhow::bail!(
                "Template resource id {} is used by both {} and {}",
                id,
                existing.get().resource_type,
                resource_type
            ),
            Entry::Vacant(slot) => {
                slot.insert(Resource {
                    resource_type: resource_type.to_string(),
                    properties,
                    depends_on,
                });
                Ok(())
            }
        }
    }

    fn add_network(&mut self, graph: &ResourceGraph) -> Result<()> {
        let vpc = &graph.vpc;
        let stack = &graph.stack_name;
        let attachment = vpc.id.child("VPCGW");

        self.add(
            &vpc.id,
            "AWS::EC2::VPC",
            json!({
                "CidrBlock": vpc.cidr.to_string(),
                "EnableDnsHostnames": true,
                "EnableDnsSupport": true,
                "InstanceTenancy": "default",
                "Tags": name_tag(stack, &vpc.id),
            }),
        )?;
        self.add(
            &vpc.internet_gateway,
            "AWS::EC2::InternetGateway",
            json!({ "Tags": name_tag(stack, &vpc.id) }),
        )?;
        self.add(
            &attachment,
            "AWS::EC2::VPCGatewayAttachment",
            json!({
                "VpcId": reference(&vpc.id),
                "InternetGatewayId": reference(&vpc.internet_gateway),
            }),
        )?;

        for subnet in vpc.subnets() {
            self.add_subnet(graph, subnet)?;
        }

        for subnet in &vpc.public_subnets {
            self.add_with_deps(
                &subnet.id.child("DefaultRoute"),
                "AWS::EC2::Route",
                json!({
                    "RouteTableId": reference(&subnet.id.child("RouteTable")),
                    "DestinationCidrBlock": "0.0.0.0/0",
                    "GatewayId": reference(&vpc.internet_gateway),
                }),
                vec![attachment.to_string()],
            )?;
        }

        for nat in &vpc.nat_gateways {
            let eip = nat.subnet.child("EIP");
            self.add(
                &eip,
                "AWS::EC2::EIP",
                json!({ "Domain": "vpc", "Tags": name_tag(stack, &nat.subnet) }),
            )?;
            self.add_with_deps(
                &nat.id,
                "AWS::EC2::NatGateway",
                json!({
                    "SubnetId": reference(&nat.subnet),
                    "AllocationId": get_att(&eip, "AllocationId"),
                    "Tags": name_tag(stack, &nat.subnet),
                }),
                vec![
                    nat.subnet.child("DefaultRoute").to_string(),
                    nat.subnet.child("RouteTableAssociation").to_string(),
                ],
            )?;
            self.add(
                &nat.serves.child("DefaultRoute"),
                "AWS::EC2::Route",
                json!({
                    "RouteTableId": reference(&nat.serves.child("RouteTable")),
                    "DestinationCidrBlock": "0.0.0.0/0",
                    "NatGatewayId": reference(&nat.id),
                }),
            )?;
        }

        self.add(&graph.cluster.id, "AWS::ECS::Cluster", json!({}))
    }

    fn add_subnet(&mut self, graph: &ResourceGraph, subnet: &Subnet) -> Result<()> {
        let route_table = subnet.id.child("RouteTable");
        self.add(
            &subnet.id,
            "AWS::EC2::Subnet",
            json!({
                "VpcId": reference(&graph.vpc.id),
                "AvailabilityZone": subnet.availability_zone,
                "CidrBlock": subnet.cidr.to_string(),
                "MapPublicIpOnLaunch": subnet.tier == SubnetTier::Public,
                "Tags": name_tag(&graph.stack_name, &subnet.id),
            }),
        )?;
        self.add(
            &route_table,
            "AWS::EC2::RouteTable",
            json!({
                "VpcId": reference(&graph.vpc.id),
                "Tags": name_tag(&graph.stack_name, &subnet.id),
            }),
        )?;
        self.add(
            &subnet.id.child("RouteTableAssociation"),
            "AWS::EC2::SubnetRouteTableAssociation",
            json!({
                "RouteTableId": reference(&route_table),
                "SubnetId": reference(&subnet.id),
            }),
        )
    }

    fn add_security_groups(&mut self, graph: &ResourceGraph) -> Result<()> {
        for sg in graph.security_groups() {
            self.add_security_group(sg)?;
        }
        Ok(())
    }

    /// CIDR rules go inline; rules sourced from another group become
    /// standalone ingress resources so groups can reference each other.
    fn add_security_group(&mut self, sg: &SecurityGroup) -> Result<()> {
        let inline: Vec<Value> = sg
            .ingress
            .iter()
            .filter_map(|rule| match &rule.peer {
                Peer::Cidr(cidr) => Some(json!({
                    "CidrIp": cidr.to_string(),
                    "Description": rule.description,
                    "FromPort": rule.port.number,
                    "ToPort": rule.port.number,
                    "IpProtocol": rule.port.protocol.to_string(),
                })),
                Peer::SecurityGroup(_) => None,
            })
            .collect();

        let mut properties = json!({
            "GroupDescription": sg.description,
            "VpcId": reference(&sg.vpc),
            "SecurityGroupIngress": inline,
        });
        if sg.allow_all_outbound {
            properties["SecurityGroupEgress"] = json!([{
                "CidrIp": "0.0.0.0/0",
                "Description": "Allow all outbound traffic by default",
                "IpProtocol": "-1",
            }]);
        }
        self.add(&sg.id, "AWS::EC2::SecurityGroup", properties)?;

        for rule in &sg.ingress {
            if let Peer::SecurityGroup(source) = &rule.peer {
                self.add_group_ingress(sg, source, rule)?;
            }
        }
        Ok(())
    }

    fn add_group_ingress(
        &mut self,
        sg: &SecurityGroup,
        source: &LogicalId,
        rule: &IngressRule,
    ) -> Result<()> {
        let id = sg
            .id
            .child(&format!("from{}{}", source, rule.port.number));
        self.add(
            &id,
            "AWS::EC2::SecurityGroupIngress",
            json!({
                "IpProtocol": rule.port.protocol.to_string(),
                "Description": rule.description,
                "FromPort": rule.port.number,
                "ToPort": rule.port.number,
                "GroupId": get_att(&sg.id, "GroupId"),
                "SourceSecurityGroupId": get_att(source, "GroupId"),
            }),
        )
    }

    fn add_cache(&mut self, graph: &ResourceGraph) -> Result<()> {
        let group = &graph.cache_subnet_group;
        self.add(
            &group.id,
            "AWS::ElastiCache::SubnetGroup",
            json!({
                "Description": group.description,
                "SubnetIds": group.subnets.iter().map(reference).collect::<Vec<_>>(),
            }),
        )?;

        let cache = &graph.cache_cluster;
        self.add(
            &cache.id,
            "AWS::ElastiCache::CacheCluster",
            json!({
                "CacheNodeType": cache.node_type,
                "Engine": cache.engine.to_string(),
                "NumCacheNodes": cache.num_nodes,
                "ClusterName": cache.cluster_name,
                "AutoMinorVersionUpgrade": cache.auto_minor_version_upgrade,
                "CacheSubnetGroupName": reference(&group.id),
                "VpcSecurityGroupIds": cache
                    .security_groups
                    .iter()
                    .map(|sg| get_att(sg, "GroupId"))
                    .collect::<Vec<_>>(),
            }),
        )
    }

    /// Image URI of a repository in the deploying account and region
    fn image_uri(graph: &ResourceGraph) -> Value {
        let repo = &graph.repository;
        json!({
            "Fn::Join": ["", [
                { "Ref": "AWS::AccountId" },
                ".dkr.ecr.",
                { "Ref": "AWS::Region" },
                ".",
                { "Ref": "AWS::URLSuffix" },
                format!("/{}:{}", repo.repository_name, repo.tag),
            ]]
        })
    }

    fn repository_arn(graph: &ResourceGraph) -> Value {
        json!({
            "Fn::Join": ["", [
                "arn:",
                { "Ref": "AWS::Partition" },
                ":ecr:",
                { "Ref": "AWS::Region" },
                ":",
                { "Ref": "AWS::AccountId" },
                format!(":repository/{}", graph.repository.repository_name),
            ]]
        })
    }

    fn add_task(&mut self, graph: &ResourceGraph) -> Result<()> {
        let role = &graph.execution_role;
        self.add(
            &role.id,
            "AWS::IAM::Role",
            json!({
                "AssumeRolePolicyDocument": {
                    "Statement": [{
                        "Action": "sts:AssumeRole",
                        "Effect": "Allow",
                        "Principal": { "Service": "ecs-tasks.amazonaws.com" },
                    }],
                    "Version": "2012-10-17",
                },
            }),
        )?;
        self.add(
            &role.id.child("DefaultPolicy"),
            "AWS::IAM::Policy",
            json!({
                "PolicyDocument": {
                    "Statement": [
                        {
                            "Action": [
                                "ecr:BatchCheckLayerAvailability",
                                "ecr:GetDownloadUrlForLayer",
                                "ecr:BatchGetImage",
                            ],
                            "Effect": "Allow",
                            "Resource": Self::repository_arn(graph),
                        },
                        {
                            "Action": "ecr:GetAuthorizationToken",
                            "Effect": "Allow",
                            "Resource": "*",
                        },
                    ],
                    "Version": "2012-10-17",
                },
                "PolicyName": format!("{}DefaultPolicy", role.id),
                "Roles": [reference(&role.id)],
            }),
        )?;

        let task = &graph.task_definition;
        let containers: Vec<Value> = task
            .containers
            .iter()
            .map(|c| {
                json!({
                    "Name": c.name,
                    "Image": Self::image_uri(graph),
                    "Cpu": c.cpu,
                    "Memory": c.memory_mib,
                    "Essential": true,
                    "PortMappings": c.port_mappings.iter().map(|m| json!({
                        "ContainerPort": m.container_port,
                        "HostPort": m.host_port,
                        "Protocol": m.protocol.to_string(),
                    })).collect::<Vec<_>>(),
                })
            })
            .collect();

        self.add(
            &task.id,
            "AWS::ECS::TaskDefinition",
            json!({
                "Family": format!("{}{}", graph.stack_name, task.id),
                "Cpu": task.cpu.to_string(),
                "Memory": task.memory_mib.to_string(),
                "NetworkMode": "awsvpc",
                "RequiresCompatibilities": ["FARGATE"],
                "RuntimePlatform": {
                    "CpuArchitecture": task.cpu_architecture.as_ecs(),
                    "OperatingSystemFamily": "LINUX",
                },
                "ExecutionRoleArn": get_att(&role.id, "Arn"),
                "ContainerDefinitions": containers,
            }),
        )
    }

    fn add_load_balanced_service(&mut self, graph: &ResourceGraph) -> Result<()> {
        let lb = &graph.load_balancer;
        let public_routes = graph
            .vpc
            .public_subnets
            .iter()
            .flat_map(|s| {
                [
                    s.id.child("DefaultRoute").to_string(),
                    s.id.child("RouteTableAssociation").to_string(),
                ]
            })
            .collect();

        self.add_with_deps(
            &lb.id,
            "AWS::ElasticLoadBalancingV2::LoadBalancer",
            json!({
                "Scheme": "internet-facing",
                "Type": "application",
                "Subnets": lb.subnets.iter().map(reference).collect::<Vec<_>>(),
                "SecurityGroups": [get_att(&lb.security_group, "GroupId")],
                "LoadBalancerAttributes": [
                    { "Key": "deletion_protection.enabled", "Value": "false" },
                ],
            }),
            public_routes,
        )?;

        let tg = &graph.target_group;
        let hc = &tg.health_check;
        self.add(
            &tg.id,
            "AWS::ElasticLoadBalancingV2::TargetGroup",
            json!({
                "Port": tg.port.number,
                "Protocol": "HTTP",
                "TargetType": "ip",
                "VpcId": reference(&tg.vpc),
                "HealthCheckPath": hc.path,
                "HealthCheckIntervalSeconds": hc.interval_secs,
                "HealthCheckTimeoutSeconds": hc.timeout_secs,
                "HealthyThresholdCount": hc.healthy_threshold,
                "UnhealthyThresholdCount": hc.unhealthy_threshold,
                "TargetGroupAttributes": tg
                    .attributes
                    .iter()
                    .map(|(k, v)| json!({ "Key": k, "Value": v }))
                    .collect::<Vec<_>>(),
            }),
        )?;

        self.add(
            &lb.listener.id,
            "AWS::ElasticLoadBalancingV2::Listener",
            json!({
                "LoadBalancerArn": reference(&lb.id),
                "Port": lb.listener.port.number,
                "Protocol": "HTTP",
                "DefaultActions": [{
                    "Type": "forward",
                    "TargetGroupArn": reference(&lb.listener.target_group),
                }],
            }),
        )?;

        let service = &graph.service;
        self.add_with_deps(
            &service.id,
            "AWS::ECS::Service",
            json!({
                "Cluster": reference(&service.cluster),
                "DesiredCount": service.desired_count,
                "LaunchType": "FARGATE",
                "TaskDefinition": reference(&service.task_definition),
                "HealthCheckGracePeriodSeconds": 60,
                "DeploymentConfiguration": {
                    "MaximumPercent": 200,
                    "MinimumHealthyPercent": 50,
                },
                "LoadBalancers": [{
                    "ContainerName": service.container_name,
                    "ContainerPort": service.container_port,
                    "TargetGroupArn": reference(&service.target_group),
                }],
                "NetworkConfiguration": {
                    "AwsvpcConfiguration": {
                        "AssignPublicIp": "DISABLED",
                        "SecurityGroups": [get_att(&service.security_group, "GroupId")],
                        "Subnets": service.subnets.iter().map(reference).collect::<Vec<_>>(),
                    },
                },
            }),
            vec![lb.listener.id.to_string(), tg.id.to_string()],
        )
    }

    fn add_outputs(&mut self, graph: &ResourceGraph) {
        let lb = &graph.load_balancer;
        self.outputs.insert(
            format!("{}LoadBalancerDNS", graph.service.id),
            Output {
                description: "Load balancer DNS name".to_string(),
                value: get_att(&lb.id, "DNSName"),
            },
        );
        self.outputs.insert(
            format!("{}ServiceURL", graph.service.id),
            Output {
                description: "Service URL".to_string(),
                value: json!({ "Fn::Join": ["", ["http://", get_att(&lb.id, "DNSName")]] }),
            },
        );

        let cache = &graph.cache_cluster;
        let endpoint = match cache.engine {
            CacheEngine::Redis => "RedisEndpoint",
            CacheEngine::Memcached => "ConfigurationEndpoint",
        };
        self.outputs.insert(
            format!("{}Endpoint", cache.id),
            Output {
                description: "Cache endpoint address".to_string(),
                value: get_att(&cache.id, &format!("{}.Address", endpoint)),
            },
        );
        self.outputs.insert(
            format!("{}Port", cache.id),
            Output {
                description: "Cache endpoint port".to_string(),
                value: get_att(&cache.id, &format!("{}.Port", endpoint)),
            },
        );
    }

    /// Number of resources per CloudFormation type
    pub fn resource_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for resource in self.resources.values() {
            *counts.entry(resource.resource_type.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Logical ids of resources of one type
    #[cfg(test)]
    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a Resource)> {
        self.resources
            .iter()
            .filter(move |(_, r)| r.resource_type == resource_type)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize template as JSON")
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize template as YAML")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StackConfig;

    fn template() -> Template {
        let config = StackConfig::example();
        let graph = ResourceGraph::build(&config, &config.region).unwrap();
        Template::synthesize(&graph).unwrap()
    }

    /// Collect every Ref / Fn::GetAtt target in a value
    fn collect_refs(value: &Value, out: &mut Vec<String>) {
        match value {
            Value::Object(map) => {
                if let Some(Value::String(target)) = map.get("Ref") {
                    out.push(target.clone());
                }
                if let Some(Value::Array(parts)) = map.get("Fn::GetAtt") {
                    if let Some(Value::String(target)) = parts.first() {
                        out.push(target.clone());
                    }
                }
                for v in map.values() {
                    collect_refs(v, out);
                }
            }
            Value::Array(items) => {
                for v in items {
                    collect_refs(v, out);
                }
            }
            _ => {}
        }
    }

    #[test]
    fn test_single_instances() {
        let template = template();
        let counts = template.resource_counts();
        assert_eq!(counts["AWS::EC2::VPC"], 1);
        assert_eq!(counts["AWS::ECS::Cluster"], 1);
        assert_eq!(counts["AWS::ElastiCache::CacheCluster"], 1);
        assert_eq!(counts["AWS::ECS::TaskDefinition"], 1);
        assert_eq!(counts["AWS::ECS::Service"], 1);
        assert_eq!(counts["AWS::EC2::Subnet"], 4);
        assert_eq!(counts["AWS::EC2::NatGateway"], 2);
        assert_eq!(counts["AWS::ElasticLoadBalancingV2::LoadBalancer"], 1);
    }

    #[test]
    fn test_no_dangling_references() {
        let template = template();
        let mut refs = Vec::new();
        for resource in template.resources.values() {
            collect_refs(&resource.properties, &mut refs);
            refs.extend(resource.depends_on.iter().cloned());
        }
        for output in template.outputs.values() {
            collect_refs(&output.value, &mut refs);
        }

        assert!(!refs.is_empty());
        for target in refs {
            assert!(
                target.starts_with("AWS::") || template.resources.contains_key(&target),
                "dangling reference to {}",
                target
            );
        }
    }

    #[test]
    fn test_cache_cluster_properties() {
        let template = template();
        let cache = &template.resources["demoCache"].properties;
        assert_eq!(cache["CacheNodeType"], "cache.t3.micro");
        assert_eq!(cache["Engine"], "redis");
        assert_eq!(cache["NumCacheNodes"], 1);
        assert_eq!(cache["ClusterName"], "demo-cache");
        assert_eq!(cache["AutoMinorVersionUpgrade"], true);
        assert_eq!(cache["CacheSubnetGroupName"], json!({ "Ref": "demoSbG" }));
    }

    #[test]
    fn test_ingress_rules() {
        let template = template();
        let sg = &template.resources["demoSG"].properties;
        assert_eq!(
            sg["SecurityGroupIngress"],
            json!([{
                "CidrIp": "0.0.0.0/0",
                "Description": "Allow port 80 access from internet",
                "FromPort": 80,
                "ToPort": 80,
                "IpProtocol": "tcp",
            }])
        );

        let to_cache: Vec<&Resource> = template
            .resources_of_type("AWS::EC2::SecurityGroupIngress")
            .map(|(_, r)| r)
            .filter(|r| r.properties["FromPort"] == 6379)
            .collect();
        assert_eq!(to_cache.len(), 1);
        assert_eq!(
            to_cache[0].properties["SourceSecurityGroupId"],
            json!({ "Fn::GetAtt": ["demoServiceServiceSecurityGroup", "GroupId"] })
        );
        assert_eq!(
            to_cache[0].properties["GroupId"],
            json!({ "Fn::GetAtt": ["demoSG", "GroupId"] })
        );
    }

    #[test]
    fn test_target_group_health_check() {
        let template = template();
        let (_, tg) = template
            .resources_of_type("AWS::ElasticLoadBalancingV2::TargetGroup")
            .next()
            .unwrap();
        let props = &tg.properties;
        assert_eq!(props["HealthCheckPath"], "/");
        assert_eq!(props["HealthCheckTimeoutSeconds"], 60);
        assert_eq!(props["HealthCheckIntervalSeconds"], 70);
        assert_eq!(props["HealthyThresholdCount"], 3);
        assert_eq!(props["UnhealthyThresholdCount"], 2);
        assert_eq!(
            props["TargetGroupAttributes"],
            json!([{ "Key": "deregistration_delay.timeout_seconds", "Value": "60" }])
        );
    }

    #[test]
    fn test_task_definition() {
        let template = template();
        let td = &template.resources["demoTd"].properties;
        assert_eq!(td["Cpu"], "1024");
        assert_eq!(td["Memory"], "2048");
        assert_eq!(td["RuntimePlatform"]["CpuArchitecture"], "ARM64");

        let containers = td["ContainerDefinitions"].as_array().unwrap();
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0]["Name"], "sentinel-core");
        assert_eq!(containers[0]["Cpu"], 512);
        assert_eq!(containers[0]["Memory"], 1024);
        assert_eq!(
            containers[0]["PortMappings"],
            json!([{ "ContainerPort": 80, "HostPort": 80, "Protocol": "tcp" }])
        );
    }

    #[test]
    fn test_service_wiring() {
        let template = template();
        let service = &template.resources["demoServiceService"];
        assert_eq!(service.properties["DesiredCount"], 1);
        assert_eq!(service.properties["TaskDefinition"], json!({ "Ref": "demoTd" }));
        assert!(service
            .depends_on
            .contains(&"demoServiceLBPublicListener".to_string()));
    }

    #[test]
    fn test_synthesis_is_idempotent() {
        let first = template().to_json().unwrap();
        let second = template().to_json().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_derived_id_collision_rejected() {
        let mut config = StackConfig::example();
        config.cluster.id = "demoVpcVPCGW".to_string();
        let graph = ResourceGraph::build(&config, &config.region).unwrap();

        let err = Template::synthesize(&graph).unwrap_err().to_string();
        assert!(err.contains("demoVpcVPCGW"));
        assert!(err.contains("AWS::EC2::VPCGatewayAttachment"));
        assert!(err.contains("AWS::ECS::Cluster"));
    }

    #[test]
    fn test_yaml_output() {
        let yaml = template().to_yaml().unwrap();
        assert!(yaml.contains("AWSTemplateFormatVersion"));
        assert!(yaml.contains("AWS::ElastiCache::CacheCluster"));
    }
}
