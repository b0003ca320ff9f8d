//! Application configuration for LeadSift.
//!
//! User config lives at `~/.leadsift/leadsift.toml`.
//! CLI flags override config file values, which override defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LeadSiftError, Result};
use crate::types::CleanProfile;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "leadsift.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".leadsift";

/// Names of the profiles compiled into the binary.
pub const BUILTIN_PROFILES: [&str; 2] = ["legacy", "contacts"];

// ---------------------------------------------------------------------------
// Config structs (matching leadsift.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where the reference tables come from.
    #[serde(default)]
    pub reference: ReferenceConfig,

    /// Output placement.
    #[serde(default)]
    pub output: OutputConfig,

    /// Three-way sort settings.
    #[serde(default)]
    pub sort: SortSettings,

    /// Additional or overriding cleaning profiles, keyed by name.
    #[serde(default)]
    pub profiles: BTreeMap<String, CleanProfile>,
}

/// `[reference]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceConfig {
    /// Blacklist table location (`http(s)://` URL or local path).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blacklist: Option<String>,

    /// Category map table location (`http(s)://` URL or local path).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<String>,

    /// HTTP timeout in seconds for remote tables.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            blacklist: None,
            categories: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Destination directory. Defaults to the user's Desktop.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,

    /// Discriminator appended to cleaned file names.
    #[serde(default = "default_clean_suffix")]
    pub clean_suffix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: None,
            clean_suffix: default_clean_suffix(),
        }
    }
}

fn default_clean_suffix() -> String {
    "_CLEAN".into()
}

/// `[sort]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortSettings {
    /// Numeric review-count column.
    #[serde(default = "default_review_column")]
    pub review_column: String,

    /// Numeric quality-score column.
    #[serde(default = "default_score_column")]
    pub score_column: String,

    /// Primary e-mail column; an empty cell means "no e-mail".
    #[serde(default = "default_email_column")]
    pub email_column: String,

    /// Reviews must be strictly above this for the top bucket.
    #[serde(default = "default_min_reviews")]
    pub min_reviews: f64,

    /// Score must be strictly above this for the top bucket.
    #[serde(default = "default_min_score")]
    pub min_score: f64,

    /// File discriminator for well-reviewed rows with an e-mail.
    #[serde(default = "default_top_label")]
    pub top_label: String,

    /// File discriminator for the remaining rows with an e-mail.
    #[serde(default = "default_trusted_label")]
    pub trusted_label: String,

    /// File discriminator for rows without an e-mail.
    #[serde(default = "default_cold_label")]
    pub cold_label: String,
}

impl Default for SortSettings {
    fn default() -> Self {
        Self {
            review_column: default_review_column(),
            score_column: default_score_column(),
            email_column: default_email_column(),
            min_reviews: default_min_reviews(),
            min_score: default_min_score(),
            top_label: default_top_label(),
            trusted_label: default_trusted_label(),
            cold_label: default_cold_label(),
        }
    }
}

fn default_review_column() -> String {
    "reviewsCount".into()
}
fn default_score_column() -> String {
    "totalScore".into()
}
fn default_email_column() -> String {
    "contactDetails/emails/0".into()
}
fn default_min_reviews() -> f64 {
    300.0
}
fn default_min_score() -> f64 {
    4.0
}
fn default_top_label() -> String {
    " Lisa Mail".into()
}
fn default_trusted_label() -> String {
    " Mails Trust".into()
}
fn default_cold_label() -> String {
    " Cold Call".into()
}

impl AppConfig {
    /// Resolve a cleaning profile: config entries win over built-ins.
    pub fn profile(&self, name: &str) -> Result<CleanProfile> {
        let profile = match self.profiles.get(name) {
            Some(p) => p.clone(),
            None => match name {
                "legacy" => CleanProfile::legacy(),
                "contacts" => CleanProfile::contacts(),
                _ => {
                    let mut known: Vec<&str> = BUILTIN_PROFILES.to_vec();
                    known.extend(self.profiles.keys().map(String::as_str));
                    return Err(LeadSiftError::config(format!(
                        "unknown profile '{name}' (known: {})",
                        known.join(", ")
                    )));
                }
            },
        };
        profile.validate()?;
        Ok(profile)
    }

    /// Resolve the output directory, expanding a leading `~/`.
    pub fn output_dir(&self) -> Result<PathBuf> {
        match self.output.dir.as_deref() {
            Some(dir) => expand_home(dir),
            None => desktop_dir(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.leadsift/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LeadSiftError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.leadsift/leadsift.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// The user's Desktop, falling back to `~/Desktop` where the platform has no notion of one.
pub fn desktop_dir() -> Result<PathBuf> {
    if let Some(dir) = dirs::desktop_dir() {
        return Ok(dir);
    }
    let home = dirs::home_dir()
        .ok_or_else(|| LeadSiftError::config("could not determine home directory"))?;
    Ok(home.join("Desktop"))
}

fn expand_home(dir: &str) -> Result<PathBuf> {
    match dir.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| LeadSiftError::config("could not determine home directory"))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(dir)),
    }
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| LeadSiftError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| LeadSiftError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LeadSiftError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = default_config_toml()?;

    std::fs::write(&path, content).map_err(|e| LeadSiftError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Default config, with the built-in profiles spelled out so they can be edited.
fn default_config_toml() -> Result<String> {
    let mut config = AppConfig::default();
    config
        .profiles
        .insert("legacy".into(), CleanProfile::legacy());
    config
        .profiles
        .insert("contacts".into(), CleanProfile::contacts());
    toml::to_string_pretty(&config).map_err(|e| LeadSiftError::config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExclusionPolicy;

    #[test]
    fn default_config_serializes() {
        let toml_str = default_config_toml().expect("serialize default config");
        assert!(toml_str.contains("clean_suffix"));
        assert!(toml_str.contains("contactDetails/emails/0"));
        assert!(toml_str.contains("domain-suffix"));
    }

    #[test]
    fn config_roundtrip() {
        let toml_str = default_config_toml().expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.reference.timeout_secs, 30);
        assert_eq!(parsed.output.clean_suffix, "_CLEAN");
        assert_eq!(parsed.sort.top_label, " Lisa Mail");
        assert_eq!(parsed.profiles["legacy"], CleanProfile::legacy());
    }

    #[test]
    fn config_with_custom_profile() {
        let toml_str = r#"
[reference]
blacklist = "/srv/lists/blacklist.csv"

[output]
dir = "/tmp/leadsift-out"

[profiles.mini]
columns = ["title", "email"]
trim_cells = true
category_column = "type"

[[profiles.mini.policies]]
kind = "multi-column-email"
email_columns = ["email"]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.reference.blacklist.as_deref(), Some("/srv/lists/blacklist.csv"));
        assert_eq!(config.output_dir().unwrap(), PathBuf::from("/tmp/leadsift-out"));

        let mini = config.profile("mini").expect("mini profile");
        assert_eq!(mini.columns, vec!["title", "email"]);
        assert_eq!(
            mini.policies,
            vec![ExclusionPolicy::MultiColumnEmail {
                email_columns: vec!["email".into()]
            }]
        );
    }

    #[test]
    fn builtin_profile_fallback_and_unknown() {
        let config = AppConfig::default();
        assert_eq!(config.profile("contacts").unwrap(), CleanProfile::contacts());

        let err = config.profile("nope").unwrap_err();
        assert!(err.to_string().contains("unknown profile 'nope'"));
    }

    #[test]
    fn invalid_profile_rejected_on_resolve() {
        let toml_str = r#"
[profiles.broken]
columns = []
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert!(config.profile("broken").is_err());
    }
}
