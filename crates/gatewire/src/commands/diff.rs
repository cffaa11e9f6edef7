use crate::utils::{self, LoadedConfig};
use colored::Colorize;
use gatewire_cloud::{ActionType, CloudProvider, Plan};
use std::path::Path;

pub async fn handle(loaded: &LoadedConfig, project_root: &Path) -> anyhow::Result<()> {
    utils::print_target(&loaded.config);

    let (stack, template) = utils::build_stack(&loaded.config)?;
    let desired = utils::resource_set(&stack, &template)?;
    let provider = utils::provider(loaded, project_root);

    println!("{}", "Comparing with the deployed stack...".blue());
    let plan = provider.plan(&desired).await?;
    print_plan(&plan);
    Ok(())
}

pub fn print_plan(plan: &Plan) {
    println!();
    for action in &plan.actions {
        let line = format!("{} ({})", action.resource_id, action.resource_type);
        match action.action_type {
            ActionType::Create => println!("  {} {}", "+".green().bold(), line.green()),
            ActionType::Update => println!(
                "  {} {}  {}",
                "~".yellow().bold(),
                line.yellow(),
                action.description.dimmed()
            ),
            ActionType::Delete => println!("  {} {}", "-".red().bold(), line.red()),
            ActionType::NoOp => println!("  {} {}", "=".dimmed(), line.dimmed()),
        }
    }
    println!();
    println!("Plan: {}", plan.summary().to_string().bold());
    if !plan.has_changes {
        println!("{}", "No changes. The deployed stack is up to date.".green());
    }
}
