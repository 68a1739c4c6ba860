//! Tandem configuration file.
//!
//! # Storage layout
//!
//! ```text
//! ~/.tandem/
//!   config.yaml     (mode 0600, created by `tandem init`)
//!   watermark.json  (owned by tandem-sync)
//! ```
//!
//! # API pattern
//!
//! Every filesystem-touching function has two forms:
//! - `fn_at(home: &Path, …)` — explicit home; used in tests with `TempDir`
//! - `fn(…)` — derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable consulted when `sheet.token_file` is unset.
pub const TOKEN_ENV_VAR: &str = "TANDEM_SHEET_TOKEN";

// ---------------------------------------------------------------------------
// Settings types
// ---------------------------------------------------------------------------

/// Root of the `config.yaml` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub version: u32,
    pub database: DatabaseSettings,
    pub sheet: SheetSettings,
    /// Seconds between cycles under `tandem watch`.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// When true (the default, matching historical behavior), records present
    /// on both sides are only compared if at least one timestamp exceeds the
    /// watermark. One-sided records always propagate either way.
    #[serde(default = "default_watermark_gating")]
    pub watermark_gating: bool,
}

/// Database-side store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Path to the SQLite database file.
    pub path: PathBuf,
    /// Table holding the roster.
    #[serde(default = "default_table")]
    pub table: String,
}

/// Spreadsheet-side store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetSettings {
    /// Values-API endpoint root; overridable for tests and self-hosted
    /// deployments.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub spreadsheet_id: String,
    #[serde(default = "default_tab")]
    pub tab: String,
    /// Header column used to locate existing rows by record id.
    #[serde(default = "default_id_column")]
    pub id_column: String,
    /// File containing the bearer token. When unset, [`TOKEN_ENV_VAR`] is
    /// consulted instead.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_file: Option<PathBuf>,
}

fn default_interval_secs() -> u64 {
    60
}

fn default_watermark_gating() -> bool {
    true
}

fn default_table() -> String {
    "employees".to_string()
}

fn default_base_url() -> String {
    "https://sheets.googleapis.com".to_string()
}

fn default_tab() -> String {
    "Sheet1".to_string()
}

fn default_id_column() -> String {
    crate::types::ID_FIELD.to_string()
}

impl Settings {
    /// A starter document for `tandem init`.
    pub fn template(database_path: PathBuf, spreadsheet_id: String) -> Self {
        Self {
            version: 1,
            database: DatabaseSettings {
                path: database_path,
                table: default_table(),
            },
            sheet: SheetSettings {
                base_url: default_base_url(),
                spreadsheet_id,
                tab: default_tab(),
                id_column: default_id_column(),
                token_file: None,
            },
            interval_secs: default_interval_secs(),
            watermark_gating: default_watermark_gating(),
        }
    }
}

impl SheetSettings {
    /// Resolve the bearer token: `token_file` contents when configured,
    /// otherwise the [`TOKEN_ENV_VAR`] environment variable.
    ///
    /// Missing credentials are an unrecoverable startup error.
    pub fn resolve_token(&self) -> Result<String, ConfigError> {
        if let Some(path) = &self.token_file {
            let raw = std::fs::read_to_string(path)?;
            let token = raw.trim();
            if !token.is_empty() {
                return Ok(token.to_string());
            }
        }
        match std::env::var(TOKEN_ENV_VAR) {
            Ok(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
            _ => Err(ConfigError::MissingToken {
                env_var: TOKEN_ENV_VAR,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.tandem/` — pure, no I/O.
pub fn tandem_root(home: &Path) -> PathBuf {
    home.join(".tandem")
}

/// `<home>/.tandem/config.yaml` — pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    tandem_root(home).join("config.yaml")
}

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// Load settings from `<home>/.tandem/config.yaml`.
///
/// Returns `ConfigError::NotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(home: &Path) -> Result<Settings, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Err(ConfigError::NotFound { path });
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Settings, ConfigError> {
    load_at(&home()?)
}

/// Atomically save settings to `<home>/.tandem/config.yaml`.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
/// The `.tmp` lives in the target directory (same filesystem — no EXDEV).
pub fn save_at(home: &Path, settings: &Settings) -> Result<(), ConfigError> {
    let dir = tandem_root(home);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
        set_dir_permissions(&dir)?;
    }
    let path = config_path_at(home);
    let tmp_path = path.with_extension("yaml.tmp");

    let yaml = serde_yaml::to_string(settings)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(())
}

/// `save_at` convenience wrapper.
pub fn save(settings: &Settings) -> Result<(), ConfigError> {
    save_at(&home()?, settings)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Settings {
        Settings::template(PathBuf::from("/var/lib/tandem/roster.db"), "sheet-1".into())
    }

    #[test]
    fn roundtrip_save_load() {
        let home = TempDir::new().unwrap();
        let settings = sample();
        save_at(home.path(), &settings).unwrap();

        let loaded = load_at(home.path()).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let home = TempDir::new().unwrap();
        let err = load_at(home.path()).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn malformed_yaml_reports_path() {
        let home = TempDir::new().unwrap();
        let dir = tandem_root(home.path());
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(config_path_at(home.path()), "version: [not-a-number").unwrap();

        let err = load_at(home.path()).unwrap_err();
        match err {
            ConfigError::Parse { path, .. } => {
                assert!(path.ends_with("config.yaml"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn tmp_file_cleaned_up_after_save() {
        let home = TempDir::new().unwrap();
        save_at(home.path(), &sample()).unwrap();
        let tmp = config_path_at(home.path()).with_extension("yaml.tmp");
        assert!(!tmp.exists(), "tmp file should be removed after rename");
    }

    #[test]
    fn defaults_fill_omitted_fields() {
        let yaml = r#"
version: 1
database:
  path: /tmp/roster.db
sheet:
  spreadsheet_id: abc123
"#;
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.database.table, "employees");
        assert_eq!(settings.sheet.tab, "Sheet1");
        assert_eq!(settings.sheet.id_column, "EmployeeID");
        assert_eq!(settings.interval_secs, 60);
        assert!(settings.watermark_gating);
    }

    #[test]
    fn token_file_wins_over_env() {
        let dir = TempDir::new().unwrap();
        let token_path = dir.path().join("token");
        std::fs::write(&token_path, "secret-token\n").unwrap();

        let mut sheet = sample().sheet;
        sheet.token_file = Some(token_path);
        assert_eq!(sheet.resolve_token().unwrap(), "secret-token");
    }

    #[test]
    fn missing_token_is_a_startup_error() {
        let mut sheet = sample().sheet;
        sheet.token_file = None;
        // The env var may leak in from the outer environment; only assert
        // when it is unset.
        if std::env::var(TOKEN_ENV_VAR).is_err() {
            let err = sheet.resolve_token().unwrap_err();
            assert!(matches!(err, ConfigError::MissingToken { .. }));
        }
    }

    #[cfg(unix)]
    #[test]
    fn config_file_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let home = TempDir::new().unwrap();
        save_at(home.path(), &sample()).unwrap();
        let mode = std::fs::metadata(config_path_at(home.path()))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
