use crate::utils::{self, LoadedConfig};
use colored::Colorize;
use gatewire_core::{DependencyGraph, check_stack};

pub fn handle(loaded: &LoadedConfig) -> anyhow::Result<()> {
    println!("{}", "Validating stack...".blue());
    utils::print_loaded_config_file(loaded);
    utils::print_target(&loaded.config);

    let stack = gatewire_core::sequence(&loaded.config)?;
    let graph = DependencyGraph::from_stack(&stack)?;
    graph.deploy_order()?;

    println!();
    println!("Declarations ({}):", stack.declarations.len());
    for (index, declaration) in stack.declarations.iter().enumerate() {
        let deps = graph.dependencies_of(declaration.logical_id());
        let deps = if deps.is_empty() {
            String::new()
        } else {
            format!(" <- {}", deps.join(", "))
        };
        println!(
            "  {}. {} ({}){}",
            index + 1,
            declaration.logical_id().cyan(),
            declaration.kind(),
            deps.dimmed()
        );
    }

    println!("Outputs ({}):", stack.outputs.len());
    for output in &stack.outputs {
        println!("  - {} = {}", output.name.cyan(), output.value.render());
    }

    let violations = check_stack(&stack);
    if !violations.is_empty() {
        eprintln!();
        eprintln!("{}", "✗ Stack is invalid".red().bold());
        for violation in &violations {
            eprintln!("  - {}", violation);
        }
        anyhow::bail!("{} problem(s) found", violations.len());
    }

    gatewire_core::synthesize(&stack)?;
    println!();
    println!("{}", "✓ Stack is valid".green().bold());
    Ok(())
}
