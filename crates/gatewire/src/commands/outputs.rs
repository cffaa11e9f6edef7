use crate::utils::{self, LoadedConfig};
use colored::Colorize;
use gatewire_cloud::{CloudProvider, StateManager};
use std::path::Path;

pub async fn handle(
    loaded: &LoadedConfig,
    project_root: &Path,
    refresh: bool,
) -> anyhow::Result<()> {
    let name = &loaded.config.name;
    let state = StateManager::new(project_root);

    let stack = if refresh {
        let provider = utils::provider(loaded, project_root);
        let deployed = provider
            .get_state(name)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Stack '{}' is not deployed", name))?;
        state.record_stack(deployed.clone()).await?;
        deployed
    } else {
        state.load().await?.get_stack(name).cloned().ok_or_else(|| {
            anyhow::anyhow!(
                "No recorded deployment of '{}'. Run `gatewire deploy --yes` or `gatewire outputs --refresh`",
                name
            )
        })?
    };

    println!(
        "Stack: {} ({}, {})",
        stack.stack_name.cyan(),
        stack.region,
        stack.status
    );
    for (key, value) in &stack.outputs {
        println!("  {} = {}", key.cyan(), value);
    }
    Ok(())
}
