use crate::TargetArgs;
use colored::Colorize;
use gatewire_cloud::ResourceSet;
use gatewire_cloud_aws::AwsProvider;
use gatewire_core::{Stack, StackConfig, Template};
use std::path::{Path, PathBuf};

/// Configuration after stack file and flags are applied
pub struct LoadedConfig {
    pub config: StackConfig,
    pub source: Option<PathBuf>,
    pub profile: Option<String>,
}

/// Defaults, then the stack file, then flags / environment
pub fn load_config(target: &TargetArgs) -> anyhow::Result<LoadedConfig> {
    let source = match &target.config {
        Some(path) => Some(path.clone()),
        None => gatewire_config::find_optional_stack_file()?,
    };

    let mut config = match &source {
        Some(path) => gatewire_core::parse_stack_file(path)?,
        None => StackConfig::default(),
    };

    if let Some(account) = &target.account {
        config.account = account.clone();
    }
    if let Some(region) = &target.region {
        config.region = region.clone();
    }
    if let Some(name) = &target.stack_name {
        config.name = name.clone();
    }

    tracing::debug!(
        "Resolved stack {} in {} ({})",
        config.name,
        config.region,
        config.account
    );

    Ok(LoadedConfig {
        config,
        source,
        profile: target.profile.clone(),
    })
}

pub fn print_loaded_config_file(loaded: &LoadedConfig) {
    match &loaded.source {
        Some(path) => println!("Stack file: {}", path.display().to_string().cyan()),
        None => println!("Stack file: {}", "(built-in defaults)".dimmed()),
    }
}

pub fn print_target(config: &StackConfig) {
    println!(
        "Stack: {}  account: {}  region: {}",
        config.name.cyan(),
        config.account,
        config.region
    );
}

/// Sequence, check and synthesize the configured stack
pub fn build_stack(config: &StackConfig) -> anyhow::Result<(Stack, Template)> {
    let stack = gatewire_core::sequence(config)?;
    gatewire_core::validate_stack(&stack)?;
    let template = gatewire_core::synthesize(&stack)?;
    Ok((stack, template))
}

pub fn resource_set(stack: &Stack, template: &Template) -> anyhow::Result<ResourceSet> {
    Ok(ResourceSet::from_template(
        &stack.name,
        &stack.env.account,
        &stack.env.region,
        template.body().clone(),
    )?)
}

pub fn provider(loaded: &LoadedConfig, project_root: &Path) -> AwsProvider {
    AwsProvider::new(&loaded.config.region, loaded.profile.clone(), project_root)
}
