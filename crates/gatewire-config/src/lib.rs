//! Locating gatewire's files on disk
//!
//! Everything gatewire writes for a project lives under `./.gatewire/`:
//! synthesized templates in `out/`, deployment state in `state.json` and the
//! command lock in `lock.json`.

pub mod error;

pub use error::*;

use std::path::{Path, PathBuf};

pub const CONFIG_PATH_ENV: &str = "GATEWIRE_CONFIG_PATH";
pub const PROJECT_DIR: &str = ".gatewire";
pub const OUT_DIR: &str = "out";

const CANDIDATES: [&str; 4] = [
    "stack.local.kdl",
    ".stack.local.kdl",
    "stack.kdl",
    ".stack.kdl",
];

/// Project directory for `base`
pub fn project_dir(base: &Path) -> PathBuf {
    base.join(PROJECT_DIR)
}

/// Where the synthesized template of `stack_name` is written
pub fn template_path(base: &Path, stack_name: &str) -> PathBuf {
    project_dir(base)
        .join(OUT_DIR)
        .join(format!("{}.template.json", stack_name))
}

/// Find the project's stack file
///
/// Search order:
/// 1. `GATEWIRE_CONFIG_PATH`
/// 2. current directory: stack.local.kdl, .stack.local.kdl, stack.kdl, .stack.kdl
/// 3. `./.gatewire/`, same order
/// 4. `~/.config/gatewire/stack.kdl`
pub fn find_stack_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(&config_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::ConfiguredPathMissing(config_path));
    }

    let current_dir = std::env::current_dir()?;
    if let Some(path) = find_in(&current_dir) {
        return Ok(path);
    }

    let project = project_dir(&current_dir);
    if project.is_dir() {
        if let Some(path) = find_in(&project) {
            return Ok(path);
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("gatewire").join("stack.kdl");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::StackFileNotFound)
}

/// Like [`find_stack_file`], but a missing file is `None`
pub fn find_optional_stack_file() -> Result<Option<PathBuf>> {
    match find_stack_file() {
        Ok(path) => {
            tracing::debug!("Using stack file {}", path.display());
            Ok(Some(path))
        }
        Err(ConfigError::StackFileNotFound) => {
            tracing::debug!("No stack file found, using built-in defaults");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn find_in(dir: &Path) -> Option<PathBuf> {
    CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    /// Run `f` inside `dir` with no explicit config path set
    fn in_dir<T>(dir: &Path, f: impl FnOnce() -> T) -> T {
        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir).unwrap();
        let result = temp_env::with_var_unset(CONFIG_PATH_ENV, f);
        std::env::set_current_dir(original_dir).unwrap();
        result
    }

    #[test]
    fn test_template_path() {
        let path = template_path(Path::new("/work"), "NeelStack");
        assert_eq!(
            path,
            PathBuf::from("/work/.gatewire/out/NeelStack.template.json")
        );
    }

    #[test]
    #[serial]
    fn test_find_stack_file_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("stack.kdl"), "// test").unwrap();

        let result = in_dir(temp_dir.path(), find_stack_file).unwrap();
        assert!(result.ends_with("stack.kdl"));
    }

    #[test]
    #[serial]
    fn test_local_file_takes_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("stack.kdl"), "// shared").unwrap();
        fs::write(temp_dir.path().join("stack.local.kdl"), "// local").unwrap();

        let result = in_dir(temp_dir.path(), find_stack_file).unwrap();
        assert!(result.ends_with("stack.local.kdl"));
    }

    #[test]
    #[serial]
    fn test_hidden_local_beats_visible_shared() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join(".stack.local.kdl"), "// hidden").unwrap();
        fs::write(temp_dir.path().join("stack.kdl"), "// visible").unwrap();

        let result = in_dir(temp_dir.path(), find_stack_file).unwrap();
        assert!(result.ends_with(".stack.local.kdl"));
    }

    #[test]
    #[serial]
    fn test_find_stack_file_in_project_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let project = temp_dir.path().join(PROJECT_DIR);
        fs::create_dir(&project).unwrap();
        fs::write(project.join("stack.kdl"), "// project").unwrap();

        let result = in_dir(temp_dir.path(), find_stack_file).unwrap();
        assert!(result.ends_with(".gatewire/stack.kdl"));
    }

    #[test]
    #[serial]
    fn test_env_var_wins() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.kdl");
        fs::write(&config_path, "// custom").unwrap();

        let result = temp_env::with_var(CONFIG_PATH_ENV, Some(&config_path), find_stack_file);
        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    #[serial]
    fn test_env_var_pointing_nowhere() {
        let result = temp_env::with_var(
            CONFIG_PATH_ENV,
            Some("/nonexistent/gatewire/stack.kdl"),
            find_stack_file,
        );
        assert!(matches!(result, Err(ConfigError::ConfiguredPathMissing(_))));
    }

    #[test]
    #[serial]
    fn test_missing_file_is_optional() {
        let temp_dir = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();

        // keep a real ~/.config/gatewire/stack.kdl out of the picture
        let result = temp_env::with_vars(
            [
                ("HOME", Some(home.path().as_os_str())),
                ("XDG_CONFIG_HOME", Some(home.path().as_os_str())),
            ],
            || in_dir(temp_dir.path(), find_optional_stack_file),
        );
        assert!(result.unwrap().is_none());
    }
}
