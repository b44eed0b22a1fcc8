/// Sentinel - Fargate service with a Redis cache
///
/// Declares the VPC, ECS Fargate service, load balancer and ElastiCache
/// cluster as a resource graph, synthesizes it to a CloudFormation template
/// and hands it to the AWS CLI. Also ships the stub HTTP service.
mod config;
mod deploy;
mod graph;
mod probe;
mod server;
mod template;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use crate::config::StackConfig;
use crate::deploy::StackDeployer;
use crate::graph::ResourceGraph;
use crate::probe::{HealthProber, TargetState};
use crate::template::Template;

#[derive(Parser)]
#[command(name = "sentinel-infra")]
#[command(about = "Fargate service with Redis cache on AWS", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "stack.yaml")]
    config: PathBuf,

    /// Output directory for synthesized templates
    #[arg(short, long, default_value = "./cdk.out")]
    output: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate example configuration file
    Init,

    /// Show the resources the stack declares
    Plan,

    /// Write the CloudFormation template
    Synth,

    /// Synthesize and deploy the stack
    Deploy,

    /// Delete the deployed stack
    Destroy,

    /// Run the stub HTTP service
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = 80)]
        port: u16,

        /// Address to bind
        #[arg(long, default_value = "0.0.0.0")]
        bind: IpAddr,
    },

    /// Probe a running service with the target group health check
    Probe {
        /// Base URL of the target (e.g., http://localhost:80)
        #[arg(long)]
        target: Url,

        /// Seconds between probes (defaults to the health check interval)
        #[arg(long)]
        interval: Option<u64>,

        /// Give up after this many seconds
        #[arg(long, default_value_t = 600)]
        max_wait: u64,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("sentinel_infra={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Execute command
    let result = match cli.command {
        Commands::Init => init_config(&cli).await,
        Commands::Plan => show_plan(&cli),
        Commands::Synth => synth(&cli).await.map(|_| ()),
        Commands::Deploy => deploy_stack(&cli).await,
        Commands::Destroy => destroy_stack(&cli).await,
        Commands::Serve { port, bind } => server::serve(SocketAddr::new(bind, port)).await,
        Commands::Probe {
            ref target,
            interval,
            max_wait,
        } => probe_target(&cli, target, interval, max_wait).await,
    };

    if let Err(e) = result {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Load configuration. Commands that change a deployed stack need the file
/// to exist; the rest fall back to the built-in stack.
fn load_config(cli: &Cli, require_file: bool) -> Result<StackConfig> {
    let config = if require_file {
        StackConfig::from_file(&cli.config)
    } else {
        StackConfig::from_file_or_example(&cli.config)
    };
    config.context("Failed to load configuration")
}

/// Load configuration and evaluate the resource graph in the resolved region
fn load_graph(cli: &Cli, require_file: bool) -> Result<(StackConfig, ResourceGraph)> {
    let config = load_config(cli, require_file)?;
    let region = config.resolve_region();
    let graph = ResourceGraph::build(&config, &region).context("Invalid resource graph")?;
    Ok((config, graph))
}

/// Initialize example configuration file
async fn init_config(cli: &Cli) -> Result<()> {
    if cli.config.exists() {
        anyhow::bail!(
            "Configuration file already exists: {}",
            cli.config.display()
        );
    }

    let example_config = StackConfig::example();
    let yaml = serde_yaml::to_string(&example_config)?;

    tokio::fs::write(&cli.config, yaml)
        .await
        .context("Failed to write configuration file")?;

    info!("Example configuration created: {}", cli.config.display());
    info!("");
    info!("Next steps:");
    info!("  1. Edit the configuration file to match your requirements");
    info!("  2. Review the resources:");
    info!("     sentinel-infra plan");
    info!("  3. Deploy the stack (uses your AWS CLI credentials):");
    info!("     sentinel-infra deploy");

    Ok(())
}

/// Log a summary of the declared resources
fn show_plan(cli: &Cli) -> Result<()> {
    let (config, graph) = load_graph(cli, false)?;
    let template = Template::synthesize(&graph)?;

    info!("Stack: {} ({})", config.stack_name, config.resolve_region());
    info!("");
    info!("Network:");
    info!("  VPC {}: {}", graph.vpc.id, graph.vpc.cidr);
    for subnet in graph.vpc.subnets() {
        info!(
            "    - {} {} in {}: {}",
            subnet.tier, subnet.id, subnet.availability_zone, subnet.cidr
        );
    }

    info!("Service:");
    let task = &graph.task_definition;
    info!(
        "  Task {}: {} CPU / {} MiB ({})",
        task.id,
        task.cpu,
        task.memory_mib,
        task.cpu_architecture.as_ecs()
    );
    for container in &task.containers {
        info!(
            "    - {} from {}:{} ({} CPU / {} MiB)",
            container.name,
            graph.repository.repository_name,
            graph.repository.tag,
            container.cpu,
            container.memory_mib
        );
    }
    let hc = &graph.target_group.health_check;
    info!(
        "  Desired count: {}, health check {} every {}s (timeout {}s, {}/{} thresholds)",
        graph.service.desired_count,
        hc.path,
        hc.interval_secs,
        hc.timeout_secs,
        hc.healthy_threshold,
        hc.unhealthy_threshold
    );

    info!("Cache:");
    let cache = &graph.cache_cluster;
    info!(
        "  {} ({}): {} x {}",
        cache.cluster_name, cache.engine, cache.num_nodes, cache.node_type
    );

    info!("Security groups:");
    for sg in graph.security_groups() {
        info!("  {}", sg.id);
        for rule in &sg.ingress {
            info!("    - allow {} from {}", rule.port, rule.peer);
        }
    }

    info!("");
    info!("Template resources:");
    for (resource_type, count) in template.resource_counts() {
        info!("  {:<45} {}", resource_type, count);
    }

    Ok(())
}

/// Write the template as JSON and YAML, returning the JSON path
async fn synth(cli: &Cli) -> Result<PathBuf> {
    let (_, graph) = load_graph(cli, false)?;
    let template = Template::synthesize(&graph)?;
    write_template(&template, &cli.output).await
}

async fn write_template(template: &Template, output: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(output)
        .await
        .context("Failed to create output directory")?;

    let json_path = output.join("template.json");
    let yaml_path = output.join("template.yaml");

    tokio::fs::write(&json_path, template.to_json()?)
        .await
        .context("Failed to write JSON template")?;
    tokio::fs::write(&yaml_path, template.to_yaml()?)
        .await
        .context("Failed to write YAML template")?;

    info!(
        "✓ Synthesized {} resources to {}",
        template.resources.len(),
        json_path.display()
    );

    Ok(json_path)
}

/// Synthesize and deploy the stack
async fn deploy_stack(cli: &Cli) -> Result<()> {
    StackDeployer::check_aws_installed()
        .await
        .context("aws CLI is required")?;

    let (config, graph) = load_graph(cli, true)?;
    let template = Template::synthesize(&graph)?;
    let template_path = write_template(&template, &cli.output).await?;

    let deployer = StackDeployer::new(&config.stack_name, config.resolve_region());
    deployer.deploy(&template_path).await?;

    info!("");
    info!("To check the service:");
    info!(
        "  aws cloudformation describe-stacks --stack-name {} --query 'Stacks[0].Outputs'",
        config.stack_name
    );

    Ok(())
}

/// Delete the deployed stack, including the cache cluster
async fn destroy_stack(cli: &Cli) -> Result<()> {
    StackDeployer::check_aws_installed()
        .await
        .context("aws CLI is required")?;

    let config = load_config(cli, true)?;

    StackDeployer::new(&config.stack_name, config.resolve_region())
        .destroy()
        .await?;

    info!("✓ Stack destroyed successfully");
    Ok(())
}

/// Run the health check against a target until it is decided
async fn probe_target(
    cli: &Cli,
    target: &Url,
    interval: Option<u64>,
    max_wait: u64,
) -> Result<()> {
    let (_, graph) = load_graph(cli, false)?;

    let mut prober = HealthProber::new(target, graph.target_group.health_check.clone())?;
    if let Some(secs) = interval {
        prober = prober.with_interval(Duration::from_secs(secs));
    }

    let state = prober.run(Duration::from_secs(max_wait)).await?;
    match state {
        TargetState::Healthy => {
            info!("✓ Target {} is healthy", prober.url());
            Ok(())
        }
        other => anyhow::bail!("Target {} is {}", prober.url(), other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("sentinel-infra").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_stack_changes_require_config_file() {
        let cli = cli(&["--config", "/nonexistent/typo.yaml", "destroy"]);
        let err = load_config(&cli, true).unwrap_err();
        assert!(format!("{:#}", err).contains("typo.yaml"));
    }

    #[test]
    fn test_read_only_commands_fall_back() {
        let cli = cli(&["--config", "/nonexistent/typo.yaml", "plan"]);
        let config = load_config(&cli, false).unwrap();
        assert_eq!(config.stack_name, "InfraStack");
    }
}
