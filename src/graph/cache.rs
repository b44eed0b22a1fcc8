/// ElastiCache subnet group, cluster and its security group
use super::cidr::Ipv4Cidr;
use super::models::{CacheCluster, CacheSubnetGroup, LogicalId, Peer, Port, SecurityGroup, Vpc};
use super::GraphError;
use crate::config::CacheConfig;

/// The cache cluster together with what it owns
#[derive(Debug, Clone, PartialEq)]
pub struct CacheResources {
    pub subnet_group: CacheSubnetGroup,
    pub security_group: SecurityGroup,
    pub cluster: CacheCluster,
}

pub fn build_cache(config: &CacheConfig, vpc: &Vpc) -> Result<CacheResources, GraphError> {
    let subnet_group = CacheSubnetGroup {
        id: LogicalId::new(&config.subnet_group_id),
        description: "List of subnets used for the redis cache".to_string(),
        subnets: vpc.private_subnet_ids(),
    };

    let mut security_group = SecurityGroup::new(
        LogicalId::new(&config.security_group_id),
        &vpc.id,
        format!("Access to the {} cache", config.cluster_name),
    );
    for rule in &config.ingress {
        let source: Ipv4Cidr = rule.source.parse()?;
        security_group.add_ingress_rule(Peer::Cidr(source), Port::tcp(rule.port), &rule.description);
    }

    let cluster = CacheCluster {
        id: LogicalId::new(&config.id),
        cluster_name: config.cluster_name.clone(),
        engine: config.engine,
        node_type: config.node_type.clone(),
        num_nodes: config.num_nodes,
        auto_minor_version_upgrade: config.auto_minor_version_upgrade,
        subnet_group: subnet_group.id.clone(),
        security_groups: vec![security_group.id.clone()],
    };

    Ok(CacheResources {
        subnet_group,
        security_group,
        cluster,
    })
}
