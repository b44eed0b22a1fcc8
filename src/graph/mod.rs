/// Resource graph for the Fargate service, its load balancer and the Redis cache
pub mod cache;
pub mod cidr;
pub mod models;
pub mod network;
pub mod security;
pub mod service;
pub mod validate;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::StackConfig;
use cidr::{CidrError, Ipv4Cidr};
use models::{
    CacheCluster, CacheSubnetGroup, Cluster, ExecutionRole, FargateService, LoadBalancer,
    LogicalId, RepositoryRef, SecurityGroup, TargetGroup, TaskDefinition, Vpc,
};
use network::NetworkBuilder;
use security::Connections;

/// Structural problems in a resource graph
#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error(transparent)]
    Cidr(#[from] CidrError),

    #[error("no availability zones available")]
    NoAvailabilityZones,

    #[error("expected {} subnets for {zones} zones, found {subnets}", .zones * 2)]
    SubnetCountMismatch { zones: usize, subnets: usize },

    #[error("subnet {subnet} ({cidr}) lies outside the VPC block {vpc}")]
    SubnetOutsideVpc {
        subnet: LogicalId,
        cidr: Ipv4Cidr,
        vpc: Ipv4Cidr,
    },

    #[error("duplicate logical id: {0}")]
    DuplicateId(LogicalId),

    #[error("{from} references unknown {kind} {to}")]
    DanglingReference {
        from: LogicalId,
        kind: &'static str,
        to: LogicalId,
    },

    #[error("task definition {task} must have exactly one container, found {found}")]
    ContainerCount { task: LogicalId, found: usize },

    #[error("container {container} exceeds the resources of task {task}")]
    ContainerExceedsTask { task: LogicalId, container: String },

    #[error("unsupported Fargate task size: {cpu} CPU / {memory_mib} MiB")]
    UnsupportedTaskSize { cpu: u32, memory_mib: u32 },

    #[error("cache port {port} must only be reachable from {expected}")]
    CacheExposed { port: u16, expected: LogicalId },

    #[error("service {service} routes to port {port} but no container maps it")]
    UnmappedServicePort { service: LogicalId, port: u16 },
}

/// The complete set of resources in the stack
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceGraph {
    pub stack_name: String,
    pub vpc: Vpc,
    pub cluster: Cluster,
    pub repository: RepositoryRef,
    pub cache_subnet_group: CacheSubnetGroup,
    pub cache_security_group: SecurityGroup,
    pub cache_cluster: CacheCluster,
    pub execution_role: ExecutionRole,
    pub task_definition: TaskDefinition,
    pub load_balancer: LoadBalancer,
    pub load_balancer_security_group: SecurityGroup,
    pub target_group: TargetGroup,
    pub service: FargateService,
    pub service_security_group: SecurityGroup,
}

impl ResourceGraph {
    /// Evaluate the stack definition for `region` into a validated graph
    pub fn build(config: &StackConfig, region: &str) -> Result<Self, GraphError> {
        debug!("Building resource graph for {} in {}", config.stack_name, region);

        let vpc = NetworkBuilder::new(&config.network, region).build()?;

        let cluster = Cluster {
            id: LogicalId::new(&config.cluster.id),
            vpc: vpc.id.clone(),
        };

        let repository = RepositoryRef {
            id: LogicalId::new(&config.repository.id),
            repository_name: config.repository.name.clone(),
            tag: config.repository.tag.clone(),
        };

        let cache = cache::build_cache(&config.cache, &vpc)?;
        let mut cache_security_group = cache.security_group;

        let (task_definition, execution_role) =
            service::build_task_definition(&config.task, &repository);

        let svc = service::build_load_balanced_service(
            &config.service,
            &cluster.id,
            &task_definition,
            &vpc,
        )?;

        // The service may reach the cache on the engine port
        let cache_port = cache.cluster.port();
        Connections::new(vec![&mut cache_security_group], cache_port)
            .allow_default_port_from(&svc.service_security_group, "from service to cache");

        let graph = Self {
            stack_name: config.stack_name.clone(),
            vpc,
            cluster,
            repository,
            cache_subnet_group: cache.subnet_group,
            cache_security_group,
            cache_cluster: cache.cluster,
            execution_role,
            task_definition,
            load_balancer: svc.load_balancer,
            load_balancer_security_group: svc.load_balancer_security_group,
            target_group: svc.target_group,
            service: svc.service,
            service_security_group: svc.service_security_group,
        };

        graph.validate()?;
        info!(
            "Resource graph built: {} resources",
            graph.logical_ids().len()
        );

        Ok(graph)
    }

    /// Security groups in the graph
    pub fn security_groups(&self) -> [&SecurityGroup; 3] {
        [
            &self.cache_security_group,
            &self.load_balancer_security_group,
            &self.service_security_group,
        ]
    }

    /// Every declared logical id, paired with its kind, in declaration order
    pub fn logical_ids(&self) -> Vec<(&'static str, &LogicalId)> {
        let mut ids: Vec<(&'static str, &LogicalId)> = vec![("vpc", &self.vpc.id)];
        ids.extend(self.vpc.subnets().map(|s| ("subnet", &s.id)));
        ids.push(("internet gateway", &self.vpc.internet_gateway));
        ids.extend(self.vpc.nat_gateways.iter().map(|n| ("nat gateway", &n.id)));
        ids.push(("cluster", &self.cluster.id));
        ids.push(("repository", &self.repository.id));
        ids.push(("cache subnet group", &self.cache_subnet_group.id));
        ids.push(("cache cluster", &self.cache_cluster.id));
        ids.extend(self.security_groups().map(|sg| ("security group", &sg.id)));
        ids.push(("role", &self.execution_role.id));
        ids.push(("task definition", &self.task_definition.id));
        ids.push(("load balancer", &self.load_balancer.id));
        ids.push(("listener", &self.load_balancer.listener.id));
        ids.push(("target group", &self.target_group.id));
        ids.push(("service", &self.service.id));
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::models::{Peer, Port};

    fn example_graph() -> ResourceGraph {
        let config = StackConfig::example();
        ResourceGraph::build(&config, &config.region).unwrap()
    }

    #[test]
    fn test_build_example_graph() {
        let graph = example_graph();

        assert_eq!(graph.vpc.cidr.to_string(), "192.100.0.0/16");
        assert_eq!(graph.vpc.availability_zones.len(), 2);
        assert_eq!(graph.task_definition.containers.len(), 1);
        assert_eq!(graph.service.task_definition, graph.task_definition.id);
        assert_eq!(graph.cache_cluster.subnet_group, graph.cache_subnet_group.id);
        assert_eq!(graph.cache_subnet_group.subnets, graph.vpc.private_subnet_ids());
    }

    #[test]
    fn test_cache_ingress_rules() {
        let graph = example_graph();
        let sg = &graph.cache_security_group;

        assert!(sg.allows(&Peer::any_ipv4(), Port::tcp(80)));
        assert_eq!(
            sg.peers_on(Port::tcp(6379)),
            vec![&Peer::SecurityGroup(graph.service_security_group.id.clone())]
        );
    }

    #[test]
    fn test_health_check_literals() {
        let graph = example_graph();
        let hc = &graph.target_group.health_check;
        assert_eq!(hc.path, "/");
        assert_eq!(hc.timeout_secs, 60);
        assert_eq!(hc.interval_secs, 70);
        assert_eq!(hc.healthy_threshold, 3);
        assert_eq!(hc.unhealthy_threshold, 2);
    }

    #[test]
    fn test_build_is_deterministic() {
        let config = StackConfig::example();
        let first = ResourceGraph::build(&config, &config.region).unwrap();
        let second = ResourceGraph::build(&config, &config.region).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_region_comes_from_caller() {
        let config = StackConfig::example();
        let graph = ResourceGraph::build(&config, "eu-west-1").unwrap();
        assert_eq!(
            graph.vpc.availability_zones,
            vec!["eu-west-1a".to_string(), "eu-west-1b".to_string()]
        );
        assert!(graph
            .vpc
            .subnets()
            .all(|s| s.availability_zone.starts_with("eu-west-1")));

        let home = ResourceGraph::build(&config, &config.region).unwrap();
        assert_eq!(
            home.vpc.availability_zones,
            vec!["us-east-1a".to_string(), "us-east-1b".to_string()]
        );
    }

    #[test]
    fn test_logical_ids_unique() {
        let graph = example_graph();
        let ids = graph.logical_ids();
        let unique: std::collections::BTreeSet<_> = ids.iter().map(|(_, id)| *id).collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut config = StackConfig::example();
        config.cluster.id = config.cache.id.clone();
        assert!(matches!(
            ResourceGraph::build(&config, &config.region),
            Err(GraphError::DuplicateId(_))
        ));
    }
}
