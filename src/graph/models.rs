/// Resource graph data models
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::cidr::Ipv4Cidr;

/// Logical id of a resource inside the graph
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalId(String);

impl LogicalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive a child id, e.g. `demoVpc` + `PublicSubnet1`
    pub fn child(&self, suffix: &str) -> Self {
        Self(format!("{}{}", self.0, suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Subnet tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubnetTier {
    Public,
    Private,
}

impl fmt::Display for SubnetTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubnetTier::Public => write!(f, "Public"),
            SubnetTier::Private => write!(f, "Private"),
        }
    }
}

/// Isolated network with its derived subnets
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vpc {
    pub id: LogicalId,
    pub cidr: Ipv4Cidr,
    pub availability_zones: Vec<String>,
    pub public_subnets: Vec<Subnet>,
    pub private_subnets: Vec<Subnet>,
    pub internet_gateway: LogicalId,
    pub nat_gateways: Vec<NatGateway>,
}

impl Vpc {
    pub fn subnets(&self) -> impl Iterator<Item = &Subnet> {
        self.public_subnets.iter().chain(self.private_subnets.iter())
    }

    pub fn private_subnet_ids(&self) -> Vec<LogicalId> {
        self.private_subnets.iter().map(|s| s.id.clone()).collect()
    }

    pub fn public_subnet_ids(&self) -> Vec<LogicalId> {
        self.public_subnets.iter().map(|s| s.id.clone()).collect()
    }
}

/// Network subnet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subnet {
    pub id: LogicalId,
    pub tier: SubnetTier,
    pub availability_zone: String,
    pub cidr: Ipv4Cidr,
}

/// NAT gateway giving a private subnet outbound access
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NatGateway {
    pub id: LogicalId,
    /// Public subnet hosting the gateway
    pub subnet: LogicalId,
    /// Private subnet routed through it
    pub serves: LogicalId,
}

/// ECS cluster
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster {
    pub id: LogicalId,
    pub vpc: LogicalId,
}

/// Image repository owned by an external registry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepositoryRef {
    pub id: LogicalId,
    pub repository_name: String,
    pub tag: String,
}

/// Transport protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Udp => write!(f, "udp"),
        }
    }
}

/// A single port on a protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Port {
    pub protocol: Protocol,
    pub number: u16,
}

impl Port {
    pub fn tcp(number: u16) -> Self {
        Self {
            protocol: Protocol::Tcp,
            number,
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.protocol, self.number)
    }
}

/// Source of inbound traffic
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Peer {
    Cidr(Ipv4Cidr),
    SecurityGroup(LogicalId),
}

impl Peer {
    pub fn any_ipv4() -> Self {
        Peer::Cidr(Ipv4Cidr::any())
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Peer::Cidr(cidr) => write!(f, "{}", cidr),
            Peer::SecurityGroup(id) => write!(f, "sg:{}", id),
        }
    }
}

/// Ingress rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngressRule {
    pub peer: Peer,
    pub port: Port,
    pub description: String,
}

/// Security group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityGroup {
    pub id: LogicalId,
    pub vpc: LogicalId,
    pub description: String,
    pub ingress: Vec<IngressRule>,
    pub allow_all_outbound: bool,
}

/// Task CPU architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuArchitecture {
    #[serde(rename = "x86_64")]
    X86_64,
    #[serde(rename = "arm64")]
    Arm64,
}

impl CpuArchitecture {
    /// Value used by the ECS runtime platform
    pub fn as_ecs(&self) -> &'static str {
        match self {
            CpuArchitecture::X86_64 => "X86_64",
            CpuArchitecture::Arm64 => "ARM64",
        }
    }
}

/// Container port mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortMapping {
    pub container_port: u16,
    pub host_port: u16,
    pub protocol: Protocol,
}

/// Container inside a task definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerDefinition {
    pub id: LogicalId,
    pub name: String,
    /// Repository the image is pulled from
    pub image: LogicalId,
    pub cpu: u32,
    pub memory_mib: u32,
    pub port_mappings: Vec<PortMapping>,
}

/// Fargate task definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskDefinition {
    pub id: LogicalId,
    pub cpu: u32,
    pub memory_mib: u32,
    pub cpu_architecture: CpuArchitecture,
    pub execution_role: LogicalId,
    pub containers: Vec<ContainerDefinition>,
}

/// IAM role assumed by the ECS agent to pull images
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionRole {
    pub id: LogicalId,
    /// Repositories the role may pull from
    pub pull_from: Vec<LogicalId>,
}

/// Managed cache engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheEngine {
    Redis,
    Memcached,
}

impl CacheEngine {
    pub fn default_port(&self) -> u16 {
        match self {
            CacheEngine::Redis => 6379,
            CacheEngine::Memcached => 11211,
        }
    }
}

impl fmt::Display for CacheEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheEngine::Redis => write!(f, "redis"),
            CacheEngine::Memcached => write!(f, "memcached"),
        }
    }
}

/// Subnets the cache nodes are placed in
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheSubnetGroup {
    pub id: LogicalId,
    pub description: String,
    pub subnets: Vec<LogicalId>,
}

/// Managed cache node group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheCluster {
    pub id: LogicalId,
    pub cluster_name: String,
    pub engine: CacheEngine,
    pub node_type: String,
    pub num_nodes: u32,
    pub auto_minor_version_upgrade: bool,
    pub subnet_group: LogicalId,
    pub security_groups: Vec<LogicalId>,
}

impl CacheCluster {
    pub fn port(&self) -> Port {
        Port::tcp(self.engine.default_port())
    }
}

/// Target group health check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub path: String,
    pub timeout_secs: u32,
    pub interval_secs: u32,
    pub healthy_threshold: u32,
    pub unhealthy_threshold: u32,
}

/// Load balancer target group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetGroup {
    pub id: LogicalId,
    pub vpc: LogicalId,
    pub port: Port,
    pub health_check: HealthCheck,
    pub attributes: BTreeMap<String, String>,
}

/// Listener forwarding to a target group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listener {
    pub id: LogicalId,
    pub port: Port,
    pub target_group: LogicalId,
}

/// Internet-facing application load balancer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadBalancer {
    pub id: LogicalId,
    pub subnets: Vec<LogicalId>,
    pub security_group: LogicalId,
    pub listener: Listener,
}

/// Fargate service registered behind the load balancer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FargateService {
    pub id: LogicalId,
    pub cluster: LogicalId,
    pub task_definition: LogicalId,
    pub desired_count: u32,
    pub subnets: Vec<LogicalId>,
    pub security_group: LogicalId,
    pub target_group: LogicalId,
    pub container_name: String,
    pub container_port: u16,
}
