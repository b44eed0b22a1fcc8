/// Hand-off of synthesized templates to CloudFormation via the AWS CLI
use anyhow::Result;
use std::path::Path;
use tracing::info;

use crate::utils::command::{check_tool_installed, CommandBuilder};

/// Deploys and tears down one CloudFormation stack
pub struct StackDeployer {
    stack_name: String,
    region: String,
}

impl StackDeployer {
    pub fn new(stack_name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            stack_name: stack_name.into(),
            region: region.into(),
        }
    }

    /// Check if the AWS CLI is installed
    pub async fn check_aws_installed() -> Result<()> {
        check_tool_installed(
            "aws",
            &["--version"],
            "https://docs.aws.amazon.com/cli/latest/userguide/getting-started-install.html",
        )
        .await
    }

    /// Arguments for `aws cloudformation deploy`
    fn deploy_args(&self, template: &Path) -> Vec<String> {
        vec![
            "cloudformation".to_string(),
            "deploy".to_string(),
            "--template-file".to_string(),
            template.display().to_string(),
            "--stack-name".to_string(),
            self.stack_name.clone(),
            "--capabilities".to_string(),
            "CAPABILITY_IAM".to_string(),
            "--no-fail-on-empty-changeset".to_string(),
        ]
    }

    /// Create or update the stack from a template file
    pub async fn deploy(&self, template: &Path) -> Result<()> {
        info!(
            "Deploying stack {} to {} from {}",
            self.stack_name,
            self.region,
            template.display()
        );

        let stdout = CommandBuilder::new("aws")
            .args(self.deploy_args(template))
            .aws_region(&self.region)
            .context("Failed to deploy stack")
            .run()
            .await?;

        for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
            info!("{}", line.trim());
        }

        info!("Stack {} deployed", self.stack_name);
        Ok(())
    }

    /// Delete the stack and wait until it is gone
    pub async fn destroy(&self) -> Result<()> {
        info!("Deleting stack {} in {}", self.stack_name, self.region);

        CommandBuilder::new("aws")
            .args(["cloudformation", "delete-stack", "--stack-name"])
            .arg(&self.stack_name)
            .aws_region(&self.region)
            .context("Failed to delete stack")
            .run()
            .await?;

        info!("Waiting for stack deletion to complete...");
        CommandBuilder::new("aws")
            .args(["cloudformation", "wait", "stack-delete-complete", "--stack-name"])
            .arg(&self.stack_name)
            .aws_region(&self.region)
            .context("Stack deletion did not complete")
            .run()
            .await?;

        info!("Stack {} deleted", self.stack_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deploy_args() {
        let deployer = StackDeployer::new("InfraStack", "us-east-1");
        let args = deployer.deploy_args(Path::new("cdk.out/template.json"));
        assert_eq!(
            args,
            vec![
                "cloudformation",
                "deploy",
                "--template-file",
                "cdk.out/template.json",
                "--stack-name",
                "InfraStack",
                "--capabilities",
                "CAPABILITY_IAM",
                "--no-fail-on-empty-changeset",
            ]
        );
    }

    #[tokio::test]
    async fn test_check_aws() {
        // Informational: passes whether or not the AWS CLI is installed
        let result = StackDeployer::check_aws_installed().await;
        if result.is_err() {
            println!("aws CLI not installed (expected in test environment)");
        }
    }
}
