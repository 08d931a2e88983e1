use std::path::Path;

use tracing::warn;

use super::types::EnvVar;
use crate::error::{Error, Result};

/// Environment declarations shipped with the application source.
pub const ENVIRONMENT_FILE: &str = ".s2i/environment";

/// Read `.s2i/environment` under `source_dir`. A missing file declares
/// nothing.
pub fn load(source_dir: &Path) -> Result<Vec<EnvVar>> {
    let path = source_dir.join(ENVIRONMENT_FILE);
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let contents = std::fs::read_to_string(&path)
        .map_err(|e| Error::io("failed to read environment file", &path, e))?;
    Ok(parse(&contents))
}

/// Parse `NAME=VALUE` lines in file order, skipping blanks and `#` comments.
/// Malformed lines are skipped with a warning.
pub fn parse(contents: &str) -> Vec<EnvVar> {
    contents
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            match line.parse::<EnvVar>() {
                Ok(var) => Some(var),
                Err(reason) => {
                    warn!(line = idx + 1, %reason, "skipping environment file entry");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keeps_file_order_and_skips_comments() {
        let vars = parse("# build settings\n\nB=2\n   # indented comment\nA=1\n");
        assert_eq!(vars, vec![EnvVar::new("B", "2"), EnvVar::new("A", "1")]);
    }

    #[test]
    fn parse_skips_malformed_lines() {
        let vars = parse("GOOD=yes\nnot an assignment\n=nothing\n");
        assert_eq!(vars, vec![EnvVar::new("GOOD", "yes")]);
    }

    #[test]
    fn parse_empty_contents() {
        assert!(parse("").is_empty());
        assert!(parse("\n  \n# only comments\n").is_empty());
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn load_reads_environment_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".s2i")).unwrap();
        std::fs::write(dir.path().join(ENVIRONMENT_FILE), "PORT=8080\n").unwrap();
        assert_eq!(load(dir.path()).unwrap(), vec![EnvVar::new("PORT", "8080")]);
    }
}
