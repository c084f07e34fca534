//! Balance data validation utilities.

use std::path::{Path, PathBuf};

use wb_core::balance::BalanceConfig;
use wb_core::error::{CombatError, Result};

/// Outcome of validating a directory of balance files.
#[derive(Debug, Default)]
pub struct ValidationReport {
    /// Files that parsed and validated.
    pub passed: Vec<PathBuf>,
    /// Files that failed, with the reason.
    pub failed: Vec<(PathBuf, String)>,
}

impl ValidationReport {
    /// Whether every checked file passed.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of files checked.
    #[must_use]
    pub fn checked(&self) -> usize {
        self.passed.len() + self.failed.len()
    }
}

/// Parse and validate one balance RON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, does not parse, or holds
/// values the simulation cannot run with.
pub fn validate_balance_file(path: &Path) -> Result<BalanceConfig> {
    let balance = BalanceConfig::load(path)?;
    tracing::debug!(path = %path.display(), tiers = balance.enemy.tiers.len(), "Balance file ok");
    Ok(balance)
}

/// Validate every `.ron` file in a directory, in name order.
///
/// # Errors
///
/// Returns an error only if the directory itself cannot be listed; bad files
/// are collected into the report.
pub fn validate_data_directory(path: &Path) -> Result<ValidationReport> {
    let entries = std::fs::read_dir(path).map_err(|source| CombatError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "ron"))
        .collect();
    files.sort();

    let mut report = ValidationReport::default();
    for file in files {
        match validate_balance_file(&file) {
            Ok(_) => report.passed.push(file),
            Err(e) => {
                tracing::warn!(path = %file.display(), error = %e, "Invalid balance file");
                report.failed.push((file, e.to_string()));
            }
        }
    }
    Ok(report)
}

/// The built-in balance table as pretty RON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn dump_balance() -> Result<String> {
    BalanceConfig::default().to_ron_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wb_core::math::fx;

    #[test]
    fn test_dump_round_trips() {
        let text = dump_balance().unwrap();
        let parsed = BalanceConfig::from_ron_str(&text, "dump").unwrap();
        assert_eq!(parsed, BalanceConfig::default());
    }

    #[test]
    fn test_validate_file_rejects_bad_hit_chance() {
        let dir = tempfile::tempdir().unwrap();
        let mut balance = BalanceConfig::default();
        balance.spells.earth_barrage.hit_chance = fx(1.5);
        let path = dir.path().join("bad.ron");
        std::fs::write(&path, balance.to_ron_string().unwrap()).unwrap();

        let err = validate_balance_file(&path).unwrap_err();
        assert!(matches!(err, CombatError::InvalidBalance { .. }));
        assert!(err.to_string().contains("hit_chance"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = validate_balance_file(&dir.path().join("nope.ron")).unwrap_err();
        assert!(matches!(err, CombatError::Io { .. }));
    }

    #[test]
    fn test_directory_report() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a_default.ron"), dump_balance().unwrap()).unwrap();
        std::fs::write(dir.path().join("b_broken.ron"), "(beam: ").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let report = validate_data_directory(dir.path()).unwrap();
        assert_eq!(report.checked(), 2);
        assert!(!report.is_ok());
        assert!(report.passed[0].ends_with("a_default.ron"));
        assert!(report.failed[0].0.ends_with("b_broken.ron"));
    }
}
