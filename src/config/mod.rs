/// Configuration management for the Sentinel stack
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::graph::cidr::Ipv4Cidr;
use crate::graph::models::{CacheEngine, CpuArchitecture, HealthCheck};
use crate::graph::network::MAX_DERIVED_AZS;
use crate::graph::validate::is_supported_task_size;

/// Main stack configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackConfig {
    /// Stack name (used as the CloudFormation stack name)
    pub stack_name: String,

    /// AWS region (can also be set via AWS_REGION env var)
    pub region: String,

    /// VPC configuration
    pub network: NetworkConfig,

    /// ECS cluster configuration
    pub cluster: ClusterConfig,

    /// Container image repository reference
    pub repository: RepositoryConfig,

    /// ElastiCache configuration
    pub cache: CacheConfig,

    /// Fargate task definition
    pub task: TaskConfig,

    /// Load balanced service
    pub service: ServiceConfig,
}

/// VPC configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Logical id of the VPC
    pub id: String,

    /// VPC CIDR (e.g., "192.100.0.0/16")
    pub cidr: String,

    /// Maximum number of availability zones to spread subnets over
    #[serde(default = "default_max_azs")]
    pub max_azs: u32,

    /// Explicit availability zones; derived from the region when empty
    #[serde(default)]
    pub availability_zones: Vec<String>,
}

/// ECS cluster configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub id: String,
}

/// Reference to an image repository that lives outside this stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub id: String,

    /// Repository name in the registry (e.g., "test")
    pub name: String,

    /// Image tag to pull
    #[serde(default = "default_tag")]
    pub tag: String,
}

/// Managed cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub id: String,

    /// Logical id of the cache subnet group
    pub subnet_group_id: String,

    /// Logical id of the security group guarding the cache
    pub security_group_id: String,

    /// Cache cluster name
    pub cluster_name: String,

    pub engine: CacheEngine,

    /// Node type (e.g., "cache.t3.micro")
    pub node_type: String,

    #[serde(default = "default_one")]
    pub num_nodes: u32,

    #[serde(default = "default_true")]
    pub auto_minor_version_upgrade: bool,

    /// Extra ingress rules on the cache security group
    #[serde(default)]
    pub ingress: Vec<IngressConfig>,
}

/// Ingress rule from an IPv4 range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngressConfig {
    /// Source CIDR ("0.0.0.0/0" for any IPv4)
    pub source: String,

    /// TCP port
    pub port: u16,

    #[serde(default)]
    pub description: String,
}

/// Fargate task definition configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskConfig {
    pub id: String,

    /// Task CPU units
    pub cpu: u32,

    /// Task memory in MiB
    pub memory_mib: u32,

    pub cpu_architecture: CpuArchitecture,

    pub container: ContainerConfig,
}

/// Single container of the task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerConfig {
    pub id: String,

    /// Container name
    pub name: String,

    pub cpu: u32,

    pub memory_mib: u32,

    /// Container port, mapped 1:1 on the host (awsvpc networking)
    pub port: u16,
}

/// Application load balanced Fargate service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub id: String,

    #[serde(default = "default_one")]
    pub desired_count: u32,

    /// Listener port on the load balancer
    #[serde(default = "default_listener_port")]
    pub listener_port: u16,

    /// Target group deregistration delay in seconds
    pub deregistration_delay_secs: u32,

    pub health_check: HealthCheck,
}

fn default_true() -> bool {
    true
}

fn default_one() -> u32 {
    1
}

fn default_max_azs() -> u32 {
    2
}

fn default_tag() -> String {
    "latest".to_string()
}

fn default_listener_port() -> u16 {
    80
}

impl StackConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        let config: StackConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file, falling back to the built-in stack.
    /// Only for commands that do not touch a deployed stack.
    pub fn from_file_or_example<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            tracing::info!(
                "No configuration at {}, using built-in stack definition",
                path.as_ref().display()
            );
            Ok(Self::example())
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.stack_name.is_empty() {
            anyhow::bail!("stack_name cannot be empty");
        }

        self.network
            .cidr
            .parse::<Ipv4Cidr>()
            .map_err(|e| anyhow::anyhow!("network.cidr: {}", e))?;

        if self.network.max_azs == 0 {
            anyhow::bail!("network.max_azs must be at least 1");
        }

        if self.network.availability_zones.is_empty() && self.network.max_azs > MAX_DERIVED_AZS {
            anyhow::bail!(
                "network.max_azs is {} but at most {} zones can be derived from the region; list availability_zones explicitly",
                self.network.max_azs,
                MAX_DERIVED_AZS
            );
        }

        for rule in &self.cache.ingress {
            rule.source
                .parse::<Ipv4Cidr>()
                .map_err(|e| anyhow::anyhow!("cache.ingress source: {}", e))?;
        }

        if self.cache.num_nodes == 0 {
            anyhow::bail!("cache.num_nodes must be at least 1");
        }

        self.validate_task_size(self.task.cpu, self.task.memory_mib)?;

        let container = &self.task.container;
        if container.cpu > self.task.cpu || container.memory_mib > self.task.memory_mib {
            anyhow::bail!(
                "container {} ({} CPU / {} MiB) exceeds task size ({} CPU / {} MiB)",
                container.name,
                container.cpu,
                container.memory_mib,
                self.task.cpu,
                self.task.memory_mib
            );
        }

        if !self.service.health_check.path.starts_with('/') {
            anyhow::bail!(
                "health check path must start with '/': {}",
                self.service.health_check.path
            );
        }

        Ok(())
    }

    /// Validate a Fargate CPU/memory pairing
    fn validate_task_size(&self, cpu: u32, memory_mib: u32) -> anyhow::Result<()> {
        if !is_supported_task_size(cpu, memory_mib) {
            anyhow::bail!(
                "Unsupported Fargate task size: {} CPU / {} MiB",
                cpu,
                memory_mib
            );
        }
        Ok(())
    }

    /// Get the AWS region from environment or config
    pub fn resolve_region(&self) -> String {
        std::env::var("AWS_REGION")
            .ok()
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| self.region.clone())
    }

    /// Generate the example configuration (the stack as deployed)
    pub fn example() -> Self {
        Self {
            stack_name: "InfraStack".to_string(),
            region: "us-east-1".to_string(),
            network: NetworkConfig {
                id: "demoVpc".to_string(),
                cidr: "192.100.0.0/16".to_string(),
                max_azs: 2,
                availability_zones: vec![],
            },
            cluster: ClusterConfig {
                id: "demoCluster".to_string(),
            },
            repository: RepositoryConfig {
                id: "TestRepository".to_string(),
                name: "test".to_string(),
                tag: "latest".to_string(),
            },
            cache: CacheConfig {
                id: "demoCache".to_string(),
                subnet_group_id: "demoSbG".to_string(),
                security_group_id: "demoSG".to_string(),
                cluster_name: "demo-cache".to_string(),
                engine: CacheEngine::Redis,
                node_type: "cache.t3.micro".to_string(),
                num_nodes: 1,
                auto_minor_version_upgrade: true,
                ingress: vec![IngressConfig {
                    source: "0.0.0.0/0".to_string(),
                    port: 80,
                    description: "Allow port 80 access from internet".to_string(),
                }],
            },
            task: TaskConfig {
                id: "demoTd".to_string(),
                cpu: 1024,
                memory_mib: 2048,
                cpu_architecture: CpuArchitecture::Arm64,
                container: ContainerConfig {
                    id: "demoContainer".to_string(),
                    name: "sentinel-core".to_string(),
                    cpu: 512,
                    memory_mib: 1024,
                    port: 80,
                },
            },
            service: ServiceConfig {
                id: "demoService".to_string(),
                desired_count: 1,
                listener_port: 80,
                deregistration_delay_secs: 60,
                health_check: HealthCheck {
                    path: "/".to_string(),
                    timeout_secs: 60,
                    interval_secs: 70,
                    healthy_threshold: 3,
                    unhealthy_threshold: 2,
                },
            },
        }
    }
}
