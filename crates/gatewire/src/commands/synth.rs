use crate::TemplateFormat;
use crate::utils::{self, LoadedConfig};
use colored::Colorize;
use std::path::PathBuf;

pub fn handle(
    loaded: &LoadedConfig,
    format: TemplateFormat,
    out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let (_, template) = utils::build_stack(&loaded.config)?;
    let rendered = match format {
        TemplateFormat::Json => template.to_json_string()?,
        TemplateFormat::Yaml => template.to_yaml_string()?,
    };

    match out {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)?;
            }
            std::fs::write(&path, rendered)?;
            eprintln!(
                "{} {}",
                "✓ Template written to".green(),
                path.display().to_string().cyan()
            );
        }
        None => println!("{}", rendered),
    }
    Ok(())
}
