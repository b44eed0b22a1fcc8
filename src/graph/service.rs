/// Fargate task definition and the application load balanced service
use std::collections::BTreeMap;

use super::models::{
    ContainerDefinition, ExecutionRole, FargateService, Listener, LoadBalancer, LogicalId, Peer,
    Port, PortMapping, Protocol, RepositoryRef, SecurityGroup, TargetGroup, TaskDefinition, Vpc,
};
use super::GraphError;
use crate::config::{ServiceConfig, TaskConfig};

/// Target group attribute holding the deregistration delay
pub const DEREGISTRATION_DELAY_ATTRIBUTE: &str = "deregistration_delay.timeout_seconds";

/// Task definition plus the role that pulls its image
pub fn build_task_definition(
    config: &TaskConfig,
    repository: &RepositoryRef,
) -> (TaskDefinition, ExecutionRole) {
    let id = LogicalId::new(&config.id);
    let execution_role = ExecutionRole {
        id: id.child("ExecutionRole"),
        pull_from: vec![repository.id.clone()],
    };

    let container = ContainerDefinition {
        id: LogicalId::new(&config.container.id),
        name: config.container.name.clone(),
        image: repository.id.clone(),
        cpu: config.container.cpu,
        memory_mib: config.container.memory_mib,
        port_mappings: vec![PortMapping {
            container_port: config.container.port,
            host_port: config.container.port,
            protocol: Protocol::Tcp,
        }],
    };

    let task = TaskDefinition {
        id,
        cpu: config.cpu,
        memory_mib: config.memory_mib,
        cpu_architecture: config.cpu_architecture,
        execution_role: execution_role.id.clone(),
        containers: vec![container],
    };

    (task, execution_role)
}

/// Everything the load balanced service pattern creates
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceResources {
    pub load_balancer: LoadBalancer,
    pub load_balancer_security_group: SecurityGroup,
    pub target_group: TargetGroup,
    pub service: FargateService,
    pub service_security_group: SecurityGroup,
}

pub fn build_load_balanced_service(
    config: &ServiceConfig,
    cluster: &LogicalId,
    task: &TaskDefinition,
    vpc: &Vpc,
) -> Result<ServiceResources, GraphError> {
    let id = LogicalId::new(&config.id);
    let lb_id = id.child("LB");

    // The first container with a port mapping receives the traffic
    let (container_name, container_port) = task
        .containers
        .iter()
        .find_map(|c| c.port_mappings.first().map(|m| (c.name.clone(), m.container_port)))
        .ok_or_else(|| GraphError::UnmappedServicePort {
            service: id.child("Service"),
            port: config.listener_port,
        })?;

    let listener_port = Port::tcp(config.listener_port);

    let mut load_balancer_security_group = SecurityGroup::new(
        lb_id.child("SecurityGroup"),
        &vpc.id,
        format!("Automatically created Security Group for ELB {}", lb_id),
    );
    load_balancer_security_group.add_ingress_rule(
        Peer::any_ipv4(),
        listener_port,
        format!("Allow from anyone on port {}", config.listener_port),
    );

    let mut service_security_group = SecurityGroup::new(
        id.child("ServiceSecurityGroup"),
        &vpc.id,
        format!("{} service security group", id),
    );
    service_security_group.add_ingress_rule(
        Peer::SecurityGroup(load_balancer_security_group.id.clone()),
        Port::tcp(container_port),
        "Load balancer to target",
    );

    let mut attributes = BTreeMap::new();
    attributes.insert(
        DEREGISTRATION_DELAY_ATTRIBUTE.to_string(),
        config.deregistration_delay_secs.to_string(),
    );

    let target_group = TargetGroup {
        id: lb_id.child("PublicListenerECSGroup"),
        vpc: vpc.id.clone(),
        port: Port::tcp(container_port),
        health_check: config.health_check.clone(),
        attributes,
    };

    let load_balancer = LoadBalancer {
        subnets: vpc.public_subnet_ids(),
        security_group: load_balancer_security_group.id.clone(),
        listener: Listener {
            id: lb_id.child("PublicListener"),
            port: listener_port,
            target_group: target_group.id.clone(),
        },
        id: lb_id,
    };

    let service = FargateService {
        id: id.child("Service"),
        cluster: cluster.clone(),
        task_definition: task.id.clone(),
        desired_count: config.desired_count,
        subnets: vpc.private_subnet_ids(),
        security_group: service_security_group.id.clone(),
        target_group: target_group.id.clone(),
        container_name,
        container_port,
    };

    Ok(ServiceResources {
        load_balancer,
        load_balancer_security_group,
        target_group,
        service,
        service_security_group,
    })
}
