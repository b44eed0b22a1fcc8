/// Internal consistency checks on a built resource graph
use std::collections::BTreeMap;

use super::models::{LogicalId, Peer};
use super::{GraphError, ResourceGraph};

/// Fargate task sizes: CPU units, memory range in MiB (inclusive), memory step
const FARGATE_SIZES: &[(u32, u32, u32, u32)] = &[
    (256, 512, 2048, 512),
    (512, 1024, 4096, 1024),
    (1024, 2048, 8192, 1024),
    (2048, 4096, 16384, 1024),
    (4096, 8192, 30720, 1024),
    (8192, 16384, 61440, 4096),
    (16384, 32768, 122880, 8192),
];

/// Whether Fargate accepts this CPU/memory pairing
pub fn is_supported_task_size(cpu: u32, memory_mib: u32) -> bool {
    FARGATE_SIZES.iter().any(|&(c, min, max, step)| {
        c == cpu && memory_mib >= min && memory_mib <= max && (memory_mib - min) % step == 0
    })
}

impl ResourceGraph {
    /// Check that the graph is internally consistent
    pub fn validate(&self) -> Result<(), GraphError> {
        let declared = self.declared_ids()?;
        self.check_references(&declared)?;
        self.check_subnets()?;
        self.check_task()?;
        self.check_service_port()?;
        self.check_cache_exposure()?;
        Ok(())
    }

    fn declared_ids(&self) -> Result<BTreeMap<&LogicalId, &'static str>, GraphError> {
        let mut declared = BTreeMap::new();
        for (kind, id) in self.logical_ids() {
            if declared.insert(id, kind).is_some() {
                return Err(GraphError::DuplicateId(id.clone()));
            }
        }
        Ok(declared)
    }

    fn check_references(
        &self,
        declared: &BTreeMap<&LogicalId, &'static str>,
    ) -> Result<(), GraphError> {
        let require = |from: &LogicalId, kind: &'static str, to: &LogicalId| {
            match declared.get(to) {
                Some(k) if *k == kind => Ok(()),
                _ => Err(GraphError::DanglingReference {
                    from: from.clone(),
                    kind,
                    to: to.clone(),
                }),
            }
        };

        for nat in &self.vpc.nat_gateways {
            require(&nat.id, "subnet", &nat.subnet)?;
            require(&nat.id, "subnet", &nat.serves)?;
        }

        require(&self.cluster.id, "vpc", &self.cluster.vpc)?;

        for subnet in &self.cache_subnet_group.subnets {
            require(&self.cache_subnet_group.id, "subnet", subnet)?;
        }
        require(
            &self.cache_cluster.id,
            "cache subnet group",
            &self.cache_cluster.subnet_group,
        )?;
        for sg in &self.cache_cluster.security_groups {
            require(&self.cache_cluster.id, "security group", sg)?;
        }

        for sg in self.security_groups() {
            require(&sg.id, "vpc", &sg.vpc)?;
            for rule in &sg.ingress {
                if let Peer::SecurityGroup(source) = &rule.peer {
                    require(&sg.id, "security group", source)?;
                }
            }
        }

        for repo in &self.execution_role.pull_from {
            require(&self.execution_role.id, "repository", repo)?;
        }
        require(
            &self.task_definition.id,
            "role",
            &self.task_definition.execution_role,
        )?;
        for container in &self.task_definition.containers {
            require(&self.task_definition.id, "repository", &container.image)?;
        }

        let lb = &self.load_balancer;
        for subnet in &lb.subnets {
            require(&lb.id, "subnet", subnet)?;
        }
        require(&lb.id, "security group", &lb.security_group)?;
        require(&lb.listener.id, "target group", &lb.listener.target_group)?;
        require(&self.target_group.id, "vpc", &self.target_group.vpc)?;

        let service = &self.service;
        require(&service.id, "cluster", &service.cluster)?;
        require(&service.id, "task definition", &service.task_definition)?;
        require(&service.id, "security group", &service.security_group)?;
        require(&service.id, "target group", &service.target_group)?;
        for subnet in &service.subnets {
            require(&service.id, "subnet", subnet)?;
        }

        Ok(())
    }

    fn check_subnets(&self) -> Result<(), GraphError> {
        let zones = self.vpc.availability_zones.len();
        let subnets = self.vpc.subnets().count();
        if zones == 0 {
            return Err(GraphError::NoAvailabilityZones);
        }
        if self.vpc.public_subnets.len() != zones || self.vpc.private_subnets.len() != zones {
            return Err(GraphError::SubnetCountMismatch { zones, subnets });
        }
        if let Some(subnet) = self.vpc.subnets().find(|s| !self.vpc.cidr.contains(&s.cidr)) {
            return Err(GraphError::SubnetOutsideVpc {
                subnet: subnet.id.clone(),
                cidr: subnet.cidr,
                vpc: self.vpc.cidr,
            });
        }
        Ok(())
    }

    fn check_task(&self) -> Result<(), GraphError> {
        let task = &self.task_definition;
        if task.containers.len() != 1 {
            return Err(GraphError::ContainerCount {
                task: task.id.clone(),
                found: task.containers.len(),
            });
        }
        if !is_supported_task_size(task.cpu, task.memory_mib) {
            return Err(GraphError::UnsupportedTaskSize {
                cpu: task.cpu,
                memory_mib: task.memory_mib,
            });
        }
        for container in &task.containers {
            if container.cpu > task.cpu || container.memory_mib > task.memory_mib {
                return Err(GraphError::ContainerExceedsTask {
                    task: task.id.clone(),
                    container: container.name.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_service_port(&self) -> Result<(), GraphError> {
        let port = self.service.container_port;
        let mapped = self.task_definition.containers.iter().any(|c| {
            c.name == self.service.container_name
                && c.port_mappings.iter().any(|m| m.container_port == port)
        });
        if !mapped || self.target_group.port.number != port {
            return Err(GraphError::UnmappedServicePort {
                service: self.service.id.clone(),
                port,
            });
        }
        Ok(())
    }

    /// The cache engine port must be open to the service security group and nothing else
    fn check_cache_exposure(&self) -> Result<(), GraphError> {
        let port = self.cache_cluster.port();
        let expected = Peer::SecurityGroup(self.service_security_group.id.clone());
        let peers = self.cache_security_group.peers_on(port);
        if peers != [&expected] {
            return Err(GraphError::CacheExposed {
                port: port.number,
                expected: self.service_security_group.id.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StackConfig;
    use crate::graph::models::Port;

    fn graph() -> ResourceGraph {
        let config = StackConfig::example();
        ResourceGraph::build(&config, &config.region).unwrap()
    }

    #[test]
    fn test_supported_task_sizes() {
        assert!(is_supported_task_size(1024, 2048));
        assert!(is_supported_task_size(256, 512));
        assert!(is_supported_task_size(256, 1024));
        assert!(!is_supported_task_size(1024, 1024));
        assert!(!is_supported_task_size(1024, 2500));
        assert!(!is_supported_task_size(300, 2048));
    }

    #[test]
    fn test_example_is_valid() {
        assert!(graph().validate().is_ok());
    }

    #[test]
    fn test_dangling_task_reference() {
        let mut graph = graph();
        graph.service.task_definition = LogicalId::new("missingTd");
        assert_eq!(
            graph.validate(),
            Err(GraphError::DanglingReference {
                from: graph.service.id.clone(),
                kind: "task definition",
                to: LogicalId::new("missingTd"),
            })
        );
    }

    #[test]
    fn test_reference_to_wrong_kind() {
        let mut graph = graph();
        graph.cache_subnet_group.subnets[0] = graph.cluster.id.clone();
        assert!(matches!(
            graph.validate(),
            Err(GraphError::DanglingReference { kind: "subnet", .. })
        ));
    }

    #[test]
    fn test_exactly_one_container() {
        let mut graph = graph();
        let extra = graph.task_definition.containers[0].clone();
        graph.task_definition.containers.push(extra);
        assert!(matches!(
            graph.validate(),
            Err(GraphError::ContainerCount { found: 2, .. })
        ));
    }

    #[test]
    fn test_subnet_count_invariant() {
        let mut graph = graph();
        graph.vpc.private_subnets.pop();
        graph.vpc.nat_gateways.pop();
        graph.cache_subnet_group.subnets.pop();
        graph.service.subnets.pop();
        assert!(matches!(
            graph.validate(),
            Err(GraphError::SubnetCountMismatch { zones: 2, subnets: 3 })
        ));
    }

    #[test]
    fn test_subnet_outside_vpc_rejected() {
        let mut graph = graph();
        graph.vpc.public_subnets[1].cidr = "10.0.0.0/24".parse().unwrap();
        assert!(matches!(
            graph.validate(),
            Err(GraphError::SubnetOutsideVpc { subnet, .. }) if subnet.as_str() == "demoVpcPublicSubnet2"
        ));
    }

    #[test]
    fn test_cache_open_to_world_rejected() {
        let mut graph = graph();
        graph
            .cache_security_group
            .add_ingress_rule(Peer::any_ipv4(), Port::tcp(6379), "oops");
        assert!(matches!(
            graph.validate(),
            Err(GraphError::CacheExposed { port: 6379, .. })
        ));
    }

    #[test]
    fn test_service_port_must_be_mapped() {
        let mut graph = graph();
        graph.service.container_port = 8080;
        assert!(matches!(
            graph.validate(),
            Err(GraphError::UnmappedServicePort { port: 8080, .. })
        ));
    }
}
