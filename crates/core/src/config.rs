use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

use crate::columns::ColumnMap;
use crate::error::ConfigError;

pub const DEFAULT_CONFIG: &str = "sheetgrade.toml";
pub const PLACEHOLDER_API_KEY: &str = "YOUR_API_KEY_HERE";
pub const PLACEHOLDER_SPREADSHEET_ID: &str = "YOUR_SHEET_ID_HERE";
pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 30;
pub const DEFAULT_DEMO_LATENCY_MS: u64 = 500;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    pub api_key: String,
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub base_url: String,
    pub cache_ttl_secs: u64,
    pub demo_latency_ms: u64,
    pub request_timeout_secs: u64,
    pub columns: ColumnMap,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            api_key: PLACEHOLDER_API_KEY.to_string(),
            spreadsheet_id: PLACEHOLDER_SPREADSHEET_ID.to_string(),
            sheet_name: "Sheet1".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            demo_latency_ms: DEFAULT_DEMO_LATENCY_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            columns: ColumnMap::default(),
        }
    }
}

impl SheetConfig {
    /// Reads `path` (or `$SHEETGRADE_CONFIG`, or `sheetgrade.toml`) when it
    /// exists, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(|| {
            env::var("SHEETGRADE_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG))
        });
        let mut config = if path.exists() {
            let cfg = Self::from_file(&path)?;
            info!(path = %path.display(), "loaded sheet config");
            cfg
        } else {
            Self::default()
        };
        config.apply_env()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(value) = env::var("SHEETGRADE_API_KEY") {
            self.api_key = value;
        }
        if let Ok(value) = env::var("SHEETGRADE_SPREADSHEET_ID") {
            self.spreadsheet_id = value;
        }
        if let Ok(value) = env::var("SHEETGRADE_SHEET_NAME") {
            self.sheet_name = value;
        }
        if let Some(secs) = parse_env_u64("SHEETGRADE_CACHE_TTL_SECS")? {
            self.cache_ttl_secs = secs;
        }
        if let Some(ms) = parse_env_u64("SHEETGRADE_DEMO_LATENCY_MS")? {
            self.demo_latency_ms = ms;
        }
        Ok(())
    }

    /// Placeholder credentials mean no real backend has been configured.
    pub fn is_demo(&self) -> bool {
        self.api_key == PLACEHOLDER_API_KEY || self.spreadsheet_id == PLACEHOLDER_SPREADSHEET_ID
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn demo_latency(&self) -> Duration {
        Duration::from_millis(self.demo_latency_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> bool {
        if self.is_demo() {
            info!("demo mode active: configure api_key and spreadsheet_id to use google sheets");
            return true;
        }
        let mut ok = true;
        for (field, value) in [
            ("api_key", &self.api_key),
            ("spreadsheet_id", &self.spreadsheet_id),
            ("sheet_name", &self.sheet_name),
            ("base_url", &self.base_url),
        ] {
            if value.trim().is_empty() {
                warn!(field, "sheet config field is empty");
                ok = false;
            }
        }
        if !self.columns.is_consistent() {
            warn!(columns = ?self.columns, "column map overlaps or places a field after the image columns");
            ok = false;
        }
        ok
    }
}

fn parse_env_u64(var: &'static str) -> Result<Option<u64>, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { var, value }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use parking_lot::{Mutex, MutexGuard};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ENV_VARS: [&str; 6] = [
        "SHEETGRADE_CONFIG",
        "SHEETGRADE_API_KEY",
        "SHEETGRADE_SPREADSHEET_ID",
        "SHEETGRADE_SHEET_NAME",
        "SHEETGRADE_CACHE_TTL_SECS",
        "SHEETGRADE_DEMO_LATENCY_MS",
    ];

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    /// Serialises tests that touch the process environment and leaves it
    /// clean on both ends.
    struct EnvGuard {
        _lock: MutexGuard<'static, ()>,
    }

    impl EnvGuard {
        fn new(vars: &[(&str, &str)]) -> Self {
            let lock = ENV_LOCK.lock();
            for var in ENV_VARS {
                env::remove_var(var);
            }
            for (var, value) in vars {
                env::set_var(var, value);
            }
            Self { _lock: lock }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for var in ENV_VARS {
                env::remove_var(var);
            }
        }
    }

    fn config_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_are_demo() {
        let cfg = SheetConfig::default();
        assert!(cfg.is_demo());
        assert!(cfg.validate());
        assert_eq!(cfg.cache_ttl(), Duration::from_secs(DEFAULT_CACHE_TTL_SECS));
    }

    #[test]
    fn toml_overrides_fields_and_keeps_column_defaults() {
        let cfg = SheetConfig::from_toml(
            r#"
            api_key = "AIzaTest"
            spreadsheet_id = "sheet-123"
            sheet_name = "template-sheet.csv"
            cache_ttl_secs = 10

            [columns]
            image_start = 6
            "#,
        )
        .unwrap();
        assert!(!cfg.is_demo());
        assert_eq!(cfg.sheet_name, "template-sheet.csv");
        assert_eq!(cfg.cache_ttl_secs, 10);
        assert_eq!(cfg.columns.image_start, 6);
        assert_eq!(cfg.columns.grade, 4);
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert!(cfg.validate());
    }

    #[test]
    fn empty_sheet_name_fails_validation() {
        let cfg = SheetConfig {
            api_key: "AIzaTest".to_string(),
            spreadsheet_id: "sheet-123".to_string(),
            sheet_name: "  ".to_string(),
            ..SheetConfig::default()
        };
        assert!(!cfg.validate());
    }

    #[test]
    fn inconsistent_columns_fail_validation() {
        let cfg = SheetConfig {
            api_key: "AIzaTest".to_string(),
            spreadsheet_id: "sheet-123".to_string(),
            columns: ColumnMap {
                grade: 9,
                ..ColumnMap::default()
            },
            ..SheetConfig::default()
        };
        assert!(!cfg.validate());
    }

    #[test]
    fn from_file_reports_parse_errors() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "cache_ttl_secs = \"soon\"").unwrap();
        let err = SheetConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_loads_defaults() {
        let _env = EnvGuard::new(&[]);
        let dir = tempfile::tempdir().unwrap();
        let cfg = SheetConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert!(cfg.is_demo());
        assert_eq!(cfg.sheet_name, "Sheet1");
        assert_eq!(cfg.cache_ttl_secs, DEFAULT_CACHE_TTL_SECS);
    }

    #[test]
    fn explicit_path_is_read() {
        let _env = EnvGuard::new(&[]);
        let file = config_file("api_key = \"AIzaFile\"\nspreadsheet_id = \"sheet-9\"\n");
        let cfg = SheetConfig::load(Some(file.path())).unwrap();
        assert_eq!(cfg.api_key, "AIzaFile");
        assert_eq!(cfg.spreadsheet_id, "sheet-9");
        assert!(!cfg.is_demo());
    }

    #[test]
    fn config_path_falls_back_to_env_var() {
        let file = config_file("sheet_name = \"Grades\"\n");
        let path = file.path().to_string_lossy().into_owned();
        let _env = EnvGuard::new(&[("SHEETGRADE_CONFIG", path.as_str())]);
        let cfg = SheetConfig::load(None).unwrap();
        assert_eq!(cfg.sheet_name, "Grades");
    }

    #[test]
    fn env_overrides_file_values() {
        let file = config_file("api_key = \"AIzaFile\"\ncache_ttl_secs = 10\ndemo_latency_ms = 100\n");
        let _env = EnvGuard::new(&[
            ("SHEETGRADE_API_KEY", "AIzaEnv"),
            ("SHEETGRADE_SPREADSHEET_ID", "sheet-env"),
            ("SHEETGRADE_SHEET_NAME", "Term 2"),
            ("SHEETGRADE_CACHE_TTL_SECS", " 45 "),
            ("SHEETGRADE_DEMO_LATENCY_MS", "0"),
        ]);
        let cfg = SheetConfig::load(Some(file.path())).unwrap();
        assert_eq!(cfg.api_key, "AIzaEnv");
        assert_eq!(cfg.spreadsheet_id, "sheet-env");
        assert_eq!(cfg.sheet_name, "Term 2");
        assert_eq!(cfg.cache_ttl(), Duration::from_secs(45));
        assert_eq!(cfg.demo_latency(), Duration::ZERO);
    }

    #[test]
    fn non_numeric_env_is_rejected() {
        let _env = EnvGuard::new(&[("SHEETGRADE_CACHE_TTL_SECS", "soon")]);
        let dir = tempfile::tempdir().unwrap();
        let err = SheetConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        match err {
            ConfigError::InvalidEnv { var, value } => {
                assert_eq!(var, "SHEETGRADE_CACHE_TTL_SECS");
                assert_eq!(value, "soon");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
