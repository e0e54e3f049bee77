use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::{Category, Shortcut};

pub const DEFAULT_CONFIG_PATH: &str = "config/consult.json";
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_PRODUCT_NAME: &str = "Business Consultant";
pub const DEFAULT_GREETING_DELAY_MS: u64 = 2000;
const MAX_GREETING_DELAY_MS: u64 = 60_000;

/// Thứ tự hiển thị câu trả lời khi có nhiều request cùng bay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderingPolicy {
    /// Append answers as soon as they settle.
    #[default]
    Settlement,
    /// Buffer early answers until every earlier request has settled.
    Submission,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub product_name: String,
    pub default_category: Category,
    pub greeting_delay_ms: u64,
    pub ordering: OrderingPolicy,
    pub shortcuts: Vec<Shortcut>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            product_name: DEFAULT_PRODUCT_NAME.to_string(),
            default_category: Category::General,
            greeting_delay_ms: DEFAULT_GREETING_DELAY_MS,
            ordering: OrderingPolicy::Settlement,
            shortcuts: default_shortcuts(),
        }
    }
}

impl AppConfig {
    /// Applies a `--base-url` / `CONSULT_BASE_URL` override when present.
    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        let Some(url) = base_url.filter(|url| !url.trim().is_empty()) else {
            return self;
        };
        match normalize_base_url(&url) {
            Some(url) => {
                log::info!("Backend URL overridden: {} -> {url}", self.base_url);
                self.base_url = url;
            }
            None => log::warn!("Ignoring backend URL override {url:?}: not an http(s) URL"),
        }
        self
    }

    /// Replaces values the session cannot work with by their defaults.
    fn sanitized(mut self, source: &Path) -> Self {
        match normalize_base_url(&self.base_url) {
            Some(url) => self.base_url = url,
            None => {
                log::warn!(
                    "{}: base_url {:?} is not an http(s) URL; using {DEFAULT_BASE_URL}",
                    source.display(),
                    self.base_url
                );
                self.base_url = DEFAULT_BASE_URL.to_string();
            }
        }
        if self.product_name.trim().is_empty() {
            self.product_name = DEFAULT_PRODUCT_NAME.to_string();
        }
        if self.greeting_delay_ms > MAX_GREETING_DELAY_MS {
            log::warn!(
                "{}: greeting_delay_ms {} capped at {MAX_GREETING_DELAY_MS}",
                source.display(),
                self.greeting_delay_ms
            );
            self.greeting_delay_ms = MAX_GREETING_DELAY_MS;
        }
        self.shortcuts.retain(|shortcut| !shortcut.label.trim().is_empty());
        self
    }
}

/// Trimmed, without trailing slashes; `None` unless the scheme is http(s).
fn normalize_base_url(url: &str) -> Option<String> {
    let url = url.trim().trim_end_matches('/');
    let has_host = ["http://", "https://"]
        .iter()
        .any(|scheme| url.strip_prefix(scheme).is_some_and(|rest| !rest.is_empty()));
    has_host.then(|| url.to_string())
}

pub fn default_shortcuts() -> Vec<Shortcut> {
    vec![
        Shortcut::new("How can I improve my cash flow?", Category::General),
        Shortcut::new("What tax deductions apply to me?", Category::Finance),
        Shortcut::new("How can I attract more customers online?", Category::Marketing),
        Shortcut::new("How do I streamline my inventory process?", Category::Operations),
        Shortcut::new("How should I hire my first employee?", Category::Hr),
    ]
}

pub fn load_config(path: &str) -> AppConfig {
    let path = Path::new(path);
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            log::info!("No config at {} ({err}); using defaults", path.display());
            return AppConfig::default();
        }
    };

    match serde_json::from_str::<AppConfig>(&content) {
        Ok(config) => {
            let config = config.sanitized(path);
            log::info!(
                "Loaded config from {}: backend {}, {} shortcuts, {:?} ordering",
                path.display(),
                config.base_url,
                config.shortcuts.len(),
                config.ordering
            );
            config
        }
        Err(err) => {
            log::warn!("Config {} is not valid JSON ({err}); using defaults", path.display());
            AppConfig::default()
        }
    }
}

/// Writes the config as pretty JSON, creating missing parent directories.
pub fn save_config(path: &str, config: &AppConfig) -> std::io::Result<()> {
    let path = Path::new(path);
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let mut json = serde_json::to_string_pretty(config)?;
    json.push('\n');
    fs::write(path, json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let config = load_config(path.to_str().unwrap());
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.greeting_delay_ms, 2000);
    }

    #[test]
    fn invalid_json_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_config(path.to_str().unwrap()), AppConfig::default());
    }

    #[test]
    fn save_creates_parent_dirs_and_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("consult.json");
        let path = path.to_str().unwrap();

        let config = AppConfig {
            base_url: "http://consult.local:8080".to_string(),
            ordering: OrderingPolicy::Submission,
            shortcuts: vec![Shortcut::new("Budget help?", Category::Finance)],
            ..AppConfig::default()
        };
        save_config(path, &config).unwrap();

        assert_eq!(load_config(path), config);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        fs::write(&path, r#"{"product_name":"MSME Advisor"}"#).unwrap();

        let config = load_config(path.to_str().unwrap());
        assert_eq!(config.product_name, "MSME Advisor");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.shortcuts, default_shortcuts());
    }

    #[test]
    fn base_url_override_ignores_blank_values() {
        let config = AppConfig::default().with_base_url(Some("  ".to_string()));
        assert_eq!(config.base_url, DEFAULT_BASE_URL);

        let config = AppConfig::default().with_base_url(Some("http://10.0.0.2:5000/".to_string()));
        assert_eq!(config.base_url, "http://10.0.0.2:5000");

        let config = AppConfig::default().with_base_url(Some("10.0.0.2:5000".to_string()));
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn unusable_values_are_replaced_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("odd.json");
        fs::write(
            &path,
            r#"{
                "base_url": "consult.local",
                "product_name": "  ",
                "greeting_delay_ms": 3600000,
                "shortcuts": [{"label": ""}, {"label": "Pricing?", "category": "marketing"}]
            }"#,
        )
        .unwrap();

        let config = load_config(path.to_str().unwrap());
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.product_name, DEFAULT_PRODUCT_NAME);
        assert_eq!(config.greeting_delay_ms, 60_000);
        assert_eq!(
            config.shortcuts,
            [Shortcut::new("Pricing?", Category::Marketing)]
        );
    }

    #[test]
    fn base_url_from_file_loses_trailing_slash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slash.json");
        fs::write(&path, r#"{"base_url":" https://consult.example.com/ "}"#).unwrap();

        assert_eq!(
            load_config(path.to_str().unwrap()).base_url,
            "https://consult.example.com"
        );
    }
}
