use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::config::Config;

pub fn run_status(config: &Config) -> Result<()> {
    let command = &config.worker.command;
    let resolved = resolve_command(command);

    let (location, healthy) = match &resolved {
        Some(path) => (path.display().to_string(), true),
        None => ("NOT FOUND".to_string(), false),
    };

    println!("{:<12} {:<40} HEALTHY", "COMPONENT", "COMMAND");
    println!("{:<12} {:<40} {}", "worker", command, healthy);
    println!("{:<12} {:<40}", "resolved", location);
    println!("{:<12} {:<40}", "bind", config.server.bind);

    Ok(())
}

/// Resolve the worker command the way the OS will: a path with separators is
/// checked directly, a bare name is searched on `PATH`.
fn resolve_command(command: &str) -> Option<PathBuf> {
    let path = Path::new(command);
    if path.components().count() > 1 {
        return path.exists().then(|| path.to_path_buf());
    }

    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(command))
        .find(|candidate| candidate.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_absolute_path() {
        assert_eq!(resolve_command("/bin/sh"), Some(PathBuf::from("/bin/sh")));
    }

    #[test]
    fn test_resolve_bare_name_on_path() {
        assert!(resolve_command("sh").is_some());
    }

    #[test]
    fn test_resolve_missing_command() {
        assert!(resolve_command("definitely-not-a-real-binary-xyz").is_none());
        assert!(resolve_command("/nonexistent/dir/worker").is_none());
    }
}
