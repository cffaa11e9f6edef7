use crate::commands::diff::print_plan;
use crate::utils::{self, LoadedConfig};
use colored::Colorize;
use gatewire_cloud::{CloudProvider, StateManager};
use gatewire_core::sequencer::ENDPOINT_OUTPUT;
use std::path::Path;

pub async fn handle(loaded: &LoadedConfig, project_root: &Path, yes: bool) -> anyhow::Result<()> {
    println!("{}", "Starting deployment...".blue().bold());
    utils::print_loaded_config_file(loaded);
    utils::print_target(&loaded.config);

    let (stack, template) = utils::build_stack(&loaded.config)?;
    let desired = utils::resource_set(&stack, &template)?;
    let provider = utils::provider(loaded, project_root);

    let auth = provider.check_auth().await?;
    if !auth.authenticated {
        anyhow::bail!(
            "Not authenticated with {}: {}",
            provider.display_name(),
            auth.error.unwrap_or_default()
        );
    }

    let plan = provider.plan(&desired).await?;
    print_plan(&plan);

    if !yes {
        println!();
        println!("To deploy, pass the --yes option");
        return Ok(());
    }

    let state = StateManager::new(project_root);
    let lock = state.acquire_lock("deploy").await?;

    println!();
    println!(
        "{}",
        format!("Deploying {} (this can take several minutes)...", stack.name).blue()
    );
    let result = provider.apply(&desired, &plan).await?;

    if !result.is_success() {
        lock.release().await?;
        eprintln!("{}", "✗ Deployment failed".red().bold());
        for failure in &result.failed {
            eprintln!("  {}", failure.error.as_deref().unwrap_or("unknown error"));
        }
        anyhow::bail!("deployment of {} failed", stack.name);
    }

    match provider.get_state(&stack.name).await? {
        Some(deployed) => state.record_stack(deployed).await?,
        None => tracing::warn!("Stack {} not visible after deploy", stack.name),
    }
    lock.release().await?;

    println!(
        "{}",
        format!("✓ Deployed in {:.1}s", result.duration_ms as f64 / 1000.0)
            .green()
            .bold()
    );
    println!();
    println!("Outputs:");
    for (name, value) in &result.outputs {
        println!("  {} = {}", name.cyan(), value);
    }
    if let Some(endpoint) = result.outputs.get(ENDPOINT_OUTPUT) {
        println!();
        println!(
            "Try it: {}",
            format!("curl {}{}", endpoint, loaded.config.route).bold()
        );
    }
    Ok(())
}
