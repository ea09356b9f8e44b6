/// TOML configuration: scan defaults and the garbage-detection tables.
///
/// ```toml
/// [scan]
/// threshold = "10Mi"
/// force_deep = false
/// engine = "signature"      # none | signature | auto
/// parallel = true
/// workers = 8               # omit to size from installed memory
/// collect_attributes = true
///
/// [garbage]
/// garbage_patterns = ['\.(tmp|log|bak)$']
/// protected_patterns = ['\.(sys|dll)$']
/// skip_folders = ["$recycle.bin"]
/// include_empty_files = true
/// ```
///
/// Every key is optional; missing keys take the defaults below. Command-line
/// flags override whatever the file says.
use crate::analysis::{GarbageMatcher, GarbageRules};
use crate::classify::DeepEngine;
use crate::error::{Result, SpiderError};
use crate::model::size::parse_size;
use crate::platform::default_workers;
use crate::scanner::{ScanMode, ScanOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpiderConfig {
    pub scan: ScanSettings,
    pub garbage: GarbageRules,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Deep-classification size limit, with optional SI/IEC suffix.
    pub threshold: String,
    pub force_deep: bool,
    pub engine: DeepEngine,
    pub parallel: bool,
    /// `None` derives the pool size from installed memory.
    pub workers: Option<usize>,
    pub collect_attributes: bool,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            threshold: "1Mi".to_string(),
            force_deep: false,
            engine: DeepEngine::Signature,
            parallel: false,
            workers: None,
            collect_attributes: true,
        }
    }
}

impl ScanSettings {
    /// Resolve into scanner options.
    pub fn to_options(&self) -> Result<ScanOptions> {
        Ok(ScanOptions {
            threshold: parse_size(&self.threshold)?,
            force_deep: self.force_deep,
            engine: self.engine,
            collect_attributes: self.collect_attributes,
            mode: if self.parallel {
                ScanMode::Parallel
            } else {
                ScanMode::Sequential
            },
            workers: self.workers.unwrap_or_else(default_workers),
        })
    }
}

impl SpiderConfig {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let invalid = |details: String| SpiderError::Config {
            path: path.to_path_buf(),
            details,
        };
        let raw = fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let cfg: Self = toml::from_str(&raw).map_err(|e| invalid(e.to_string()))?;
        cfg.validate().map_err(|e| invalid(e.to_string()))?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(cfg)
    }

    /// Load `path` if given, otherwise use the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn garbage_matcher(&self) -> Result<GarbageMatcher> {
        GarbageMatcher::new(&self.garbage)
    }

    fn validate(&self) -> Result<()> {
        parse_size(&self.scan.threshold)?;
        if self.scan.workers == Some(0) {
            return Err(SpiderError::InvalidQuery(
                "scan.workers must be at least 1".into(),
            ));
        }
        self.garbage_matcher()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(body: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let file = write_config(
            r#"
            [scan]
            threshold = "10Mi"
            parallel = true
            workers = 4
            "#,
        );
        let cfg = SpiderConfig::load(file.path()).unwrap();
        assert_eq!(cfg.scan.engine, DeepEngine::Signature);
        assert_eq!(cfg.garbage, GarbageRules::default());

        let opts = cfg.scan.to_options().unwrap();
        assert_eq!(opts.threshold, 10 * 1024 * 1024);
        assert_eq!(opts.mode, ScanMode::Parallel);
        assert_eq!(opts.workers, 4);
    }

    #[test]
    fn garbage_tables_are_data() {
        let file = write_config(
            r#"
            [garbage]
            garbage_patterns = ['\.pyc$']
            skip_folders = ["node_modules"]
            "#,
        );
        let cfg = SpiderConfig::load(file.path()).unwrap();
        assert_eq!(cfg.garbage.garbage_patterns, [r"\.pyc$"]);
        assert_eq!(cfg.garbage.skip_folders, ["node_modules"]);
        assert!(cfg.garbage_matcher().unwrap().skips_folder("Node_Modules"));
    }

    #[test]
    fn invalid_values_are_config_errors() {
        for body in [
            "[scan]\nthreshold = \"lots\"\n",
            "[scan]\nworkers = 0\n",
            "[scan]\nengine = \"magika\"\n",
            "[garbage]\ngarbage_patterns = ['(']\n",
            "not toml at all",
        ] {
            let file = write_config(body);
            assert!(
                matches!(SpiderConfig::load(file.path()), Err(SpiderError::Config { .. })),
                "{body}"
            );
        }
    }

    #[test]
    fn missing_file_is_an_error_but_no_path_means_defaults() {
        assert!(SpiderConfig::load(Path::new("/nonexistent/treespider.toml")).is_err());
        assert_eq!(
            SpiderConfig::load_or_default(None).unwrap(),
            SpiderConfig::default()
        );
    }
}
