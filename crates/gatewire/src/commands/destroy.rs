use crate::utils::{self, LoadedConfig};
use colored::Colorize;
use gatewire_cloud::{CloudProvider, StateManager};
use std::path::Path;

pub async fn handle(loaded: &LoadedConfig, project_root: &Path, yes: bool) -> anyhow::Result<()> {
    let name = &loaded.config.name;
    utils::print_target(&loaded.config);

    if !yes {
        println!();
        println!(
            "{}",
            format!("Warning: every resource of stack {} will be deleted.", name).yellow()
        );
        println!("To destroy, pass the --yes option");
        return Ok(());
    }

    let provider = utils::provider(loaded, project_root);
    let state = StateManager::new(project_root);
    let lock = state.acquire_lock("destroy").await?;

    println!("{}", format!("Deleting stack {}...", name).blue());
    let result = match provider.destroy_all(name).await {
        Ok(result) => result,
        Err(e) => {
            lock.release().await?;
            return Err(e.into());
        }
    };

    if !result.is_success() {
        lock.release().await?;
        for failure in &result.failed {
            eprintln!("  {}", failure.error.as_deref().unwrap_or("unknown error"));
        }
        anyhow::bail!("deleting {} failed", name);
    }

    state.forget_stack(name).await?;
    lock.release().await?;
    println!("{}", format!("✓ Stack {} deleted", name).green().bold());
    Ok(())
}
