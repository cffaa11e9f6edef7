use crate::utils::{self, LoadedConfig};
use colored::Colorize;
use gatewire_cloud::CloudProvider;
use std::path::Path;

pub async fn handle(loaded: &LoadedConfig, project_root: &Path) -> anyhow::Result<()> {
    println!("{}", "Checking the target environment...".blue());
    utils::print_target(&loaded.config);

    let (stack, template) = utils::build_stack(&loaded.config)?;
    let desired = utils::resource_set(&stack, &template)?;
    let provider = utils::provider(loaded, project_root);

    let report = provider.bootstrap(&desired).await?;
    println!();
    for check in &report.checks {
        if check.passed {
            println!("  {} {}: {}", "✓".green(), check.name, check.detail);
        } else {
            println!("  {} {}: {}", "✗".red(), check.name.red(), check.detail);
        }
    }

    println!();
    if !report.is_ready() {
        anyhow::bail!(
            "{} is not ready for {}",
            loaded.config.region,
            loaded.config.name
        );
    }
    println!(
        "{}",
        format!("✓ Ready to deploy to {}", provider.display_name())
            .green()
            .bold()
    );
    Ok(())
}
