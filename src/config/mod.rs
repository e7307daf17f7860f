// Configuration module

use http::Uri;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Top-level worker configuration. Every field has a default matching the
/// production site, so an empty YAML document is a valid config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Site identifier; first component of every partition name
    #[serde(default = "default_site")]
    pub site: String,

    /// Version tag; bumped on every release that changes cached content
    /// semantics. Activation deletes partitions carrying any other tag.
    #[serde(default = "default_version")]
    pub version: String,

    /// Origin base URL root-relative manifest paths resolve against
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Static-asset manifest, pre-warmed at install. All entries are
    /// mandatory; a single failure fails the install.
    #[serde(default = "default_static_manifest")]
    pub static_manifest: Vec<String>,

    /// Model-asset manifest, pre-warmed at install. Each entry is
    /// existence-probed first and silently skipped if absent.
    #[serde(default = "default_model_manifest")]
    pub model_manifest: Vec<String>,

    /// Background-sync tag → drained endpoint path
    #[serde(default = "default_sync_endpoints")]
    pub sync_endpoints: BTreeMap<String, String>,

    /// Periodic content refresh settings
    #[serde(default)]
    pub periodic: PeriodicConfig,

    /// Push notification presentation
    #[serde(default)]
    pub notification: NotificationConfig,
}

/// Periodic refresh: fetching `source_path` refreshes the cached entry for
/// `target_path` in the API partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodicConfig {
    #[serde(default = "default_periodic_tag")]
    pub tag: String,
    #[serde(default = "default_periodic_source")]
    pub source_path: String,
    #[serde(default = "default_periodic_target")]
    pub target_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_notification_title")]
    pub title: String,
    #[serde(default = "default_notification_body")]
    pub default_body: String,
    #[serde(default = "default_notification_icon")]
    pub icon: String,
    #[serde(default = "default_notification_badge")]
    pub badge: String,
}

fn default_site() -> String {
    "machine-health".to_string()
}

fn default_version() -> String {
    "v1".to_string()
}

fn default_origin() -> String {
    "http://localhost:8080".to_string()
}

fn default_static_manifest() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/favicon.ico",
        "/logo.png",
        "/placeholder.svg",
        "/robots.txt",
        "/manifest.json",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_model_manifest() -> Vec<String> {
    ["/models/fault-model.json", "/models/group1-shard1of1.bin"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_sync_endpoints() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("quote-submission".to_string(), "/api/quotes".to_string()),
        ("contact-form".to_string(), "/api/contact".to_string()),
    ])
}

fn default_periodic_tag() -> String {
    "content-sync".to_string()
}

fn default_periodic_source() -> String {
    "/api/sync".to_string()
}

fn default_periodic_target() -> String {
    "/api/products".to_string()
}

fn default_notification_title() -> String {
    "Machine Health".to_string()
}

fn default_notification_body() -> String {
    "New content is available!".to_string()
}

fn default_notification_icon() -> String {
    "/logo.png".to_string()
}

fn default_notification_badge() -> String {
    "/favicon.ico".to_string()
}

impl Default for PeriodicConfig {
    fn default() -> Self {
        Self {
            tag: default_periodic_tag(),
            source_path: default_periodic_source(),
            target_path: default_periodic_target(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            title: default_notification_title(),
            default_body: default_notification_body(),
            icon: default_notification_icon(),
            badge: default_notification_badge(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            site: default_site(),
            version: default_version(),
            origin: default_origin(),
            static_manifest: default_static_manifest(),
            model_manifest: default_model_manifest(),
            sync_endpoints: default_sync_endpoints(),
            periodic: PeriodicConfig::default(),
            notification: NotificationConfig::default(),
        }
    }
}

impl WorkerConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml(&yaml)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, String> {
        let config: WorkerConfig =
            serde_yaml::from_str(yaml).map_err(|e| format!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.site.is_empty() {
            return Err("site must not be empty".to_string());
        }
        if self.version.is_empty() {
            return Err("version must not be empty".to_string());
        }
        self.origin
            .parse::<Uri>()
            .map_err(|e| format!("origin is not a valid URL: {}", e))?;
        for path in self.static_manifest.iter().chain(&self.model_manifest) {
            if !path.starts_with('/') {
                return Err(format!("manifest path must be root-relative: {}", path));
            }
        }
        Ok(())
    }

    /// Resolve a root-relative path against the configured origin.
    pub fn absolute_url(&self, path: &str) -> Result<Uri, String> {
        format!("{}{}", self.origin.trim_end_matches('/'), path)
            .parse::<Uri>()
            .map_err(|e| format!("invalid URL for path {}: {}", path, e))
    }
}
