//! Configuration management
//!
//! Settings live in `settings.json` inside the wio directory:
//! ```json
//! {
//!   "appium": { "serverUrl": "http://localhost:4723", "udid": "...", ... },
//!   "locators": { "transactionXpath": "//XCUIElementTypeStaticText", ... },
//!   "scrape": { "currency": "AED", "maxNoNew": 3, ... },
//!   "export": { "outputDir": "output" }
//! }
//! ```
//! Every section and field is optional. Keys this version does not know about
//! are kept and written back by `save`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Overrides `appium.serverUrl`
pub const APPIUM_URL_ENV: &str = "WIO_APPIUM_URL";
/// Overrides `appium.udid`
pub const DEVICE_UDID_ENV: &str = "WIO_DEVICE_UDID";
/// Overrides `appium.deviceName`
pub const DEVICE_NAME_ENV: &str = "WIO_DEVICE_NAME";
/// Overrides `export.outputDir`
pub const OUTPUT_DIR_ENV: &str = "WIO_OUTPUT_DIR";

const SETTINGS_FILE: &str = "settings.json";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    appium: AppiumSettings,
    #[serde(default)]
    locators: Locators,
    #[serde(default)]
    scrape: ScrapeSettings,
    #[serde(default)]
    export: ExportSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Appium server endpoint and XCUITest device identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppiumSettings {
    pub platform_name: String,
    pub device_name: String,
    pub udid: String,
    pub automation_name: String,
    pub include_safari_in_webviews: bool,
    /// Seconds the server keeps an idle session alive
    pub new_command_timeout: u64,
    pub connect_hardware_keyboard: bool,
    pub server_url: String,
    /// Per-request HTTP timeout for the WebDriver client
    pub request_timeout_secs: u64,
}

impl Default for AppiumSettings {
    fn default() -> Self {
        Self {
            platform_name: "iOS".to_string(),
            device_name: "iPhone".to_string(),
            udid: "00008140-000C19E40E33001C".to_string(),
            automation_name: "XCUITest".to_string(),
            include_safari_in_webviews: true,
            new_command_timeout: 3600,
            connect_hardware_keyboard: true,
            server_url: "http://localhost:4723".to_string(),
            request_timeout_secs: 60,
        }
    }
}

impl AppiumSettings {
    /// W3C capabilities with the `appium:` vendor prefix
    pub fn to_capabilities(&self) -> serde_json::Value {
        serde_json::json!({
            "platformName": self.platform_name,
            "appium:deviceName": self.device_name,
            "appium:udid": self.udid,
            "appium:automationName": self.automation_name,
            "appium:includeSafariInWebviews": self.include_safari_in_webviews,
            "appium:newCommandTimeout": self.new_command_timeout,
            "appium:connectHardwareKeyboard": self.connect_hardware_keyboard,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// XPath selectors into the Wio app's accessibility tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Locators {
    /// Every element that might be a transaction row; visibility filtering narrows it
    pub transaction_xpath: String,
    /// Day section headers such as `SUN, 5 OCTOBER`; empty disables date tracking
    pub date_header_xpath: String,
    /// Reference number text inside a transaction detail view
    pub reference_xpath: String,
    /// Date text inside a transaction detail view; empty keeps the section date
    pub detail_date_xpath: String,
}

impl Default for Locators {
    fn default() -> Self {
        let days = ["DAY,", "MON,", "TUE,", "WED,", "THU,", "FRI,", "SAT,", "SUN,"];
        let predicate = days
            .iter()
            .map(|d| format!("contains(@value, \"{d}\")"))
            .collect::<Vec<_>>()
            .join(" or ");

        Self {
            transaction_xpath: "//XCUIElementTypeStaticText".to_string(),
            date_header_xpath: format!("//XCUIElementTypeStaticText[{predicate}]"),
            reference_xpath:
                "//XCUIElementTypeStaticText[contains(@label, \"Reference\")]".to_string(),
            detail_date_xpath: String::new(),
        }
    }
}

/// How the view is advanced between batches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollMode {
    /// Fixed swipe between two fractions of the screen height
    #[default]
    Swipe,
    /// Drag the last visible row onto the first, falling back to a swipe
    Element,
}

/// What identifies a transaction across scroll batches
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum IdentityStrategy {
    /// `(date, description, amount, currency)` from the row preview text
    #[default]
    Tuple,
    /// A per-element attribute carrying a stable identifier
    Attribute {
        #[serde(default = "default_identity_attribute")]
        name: String,
    },
    /// Reference number read from the transaction detail view
    Detail,
}

fn default_identity_attribute() -> String {
    "UID".to_string()
}

/// Knobs of the scrape loop, passed to `ScrapeService` at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScrapeSettings {
    /// Local currency marker on the primary amount line
    pub currency: String,
    /// Markers of the optional secondary-currency line
    pub foreign_currencies: Vec<String>,
    /// Consecutive batches without new spending before stopping
    pub max_no_new: u32,
    /// Discovery passes per batch before giving up
    pub discovery_attempts: u32,
    pub retry_delay_ms: u64,
    /// Pause after a gesture or detail-view navigation
    pub settle_delay_ms: u64,
    pub swipe_start: f64,
    pub swipe_end: f64,
    pub swipe_duration_ms: u64,
    pub scroll_mode: ScrollMode,
    pub identity: IdentityStrategy,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            currency: "AED".to_string(),
            foreign_currencies: vec!["THB".to_string(), "USD".to_string()],
            max_no_new: 3,
            discovery_attempts: 3,
            retry_delay_ms: 500,
            settle_delay_ms: 1000,
            swipe_start: 0.75,
            swipe_end: 0.40,
            swipe_duration_ms: 800,
            scroll_mode: ScrollMode::Swipe,
            identity: IdentityStrategy::Tuple,
        }
    }
}

impl ScrapeSettings {
    /// No waits at all; for tests and the demo tree
    pub fn without_delays(mut self) -> Self {
        self.retry_delay_ms = 0;
        self.settle_delay_ms = 0;
        self.swipe_duration_ms = 0;
        self
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn swipe_duration(&self) -> Duration {
        Duration::from_millis(self.swipe_duration_ms)
    }
}

/// CSV output location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportSettings {
    pub output_dir: PathBuf,
    /// Prefix of the default timestamped filename
    pub file_prefix: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            file_prefix: "wio_transactions".to_string(),
        }
    }
}

/// Effective configuration (settings file plus environment overrides)
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub appium: AppiumSettings,
    pub locators: Locators,
    pub scrape: ScrapeSettings,
    pub export: ExportSettings,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Config {
    /// Load config from the wio directory
    ///
    /// A missing settings file means defaults. Environment variables
    /// (`WIO_APPIUM_URL`, `WIO_DEVICE_UDID`, `WIO_DEVICE_NAME`, `WIO_OUTPUT_DIR`)
    /// take precedence over the file.
    pub fn load(wio_dir: &Path) -> Result<Self> {
        let settings_path = wio_dir.join(SETTINGS_FILE);

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)
                .with_context(|| format!("Failed to read {}", settings_path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid settings in {}", settings_path.display()))?
        } else {
            SettingsFile::default()
        };

        let mut config = Self {
            appium: raw.appium.clone(),
            locators: raw.locators.clone(),
            scrape: raw.scrape.clone(),
            export: raw.export.clone(),
            _raw_settings: raw,
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var(APPIUM_URL_ENV) {
            self.appium.server_url = url;
        }
        if let Some(udid) = var(DEVICE_UDID_ENV) {
            self.appium.udid = udid;
        }
        if let Some(name) = var(DEVICE_NAME_ENV) {
            self.appium.device_name = name;
        }
        if let Some(dir) = var(OUTPUT_DIR_ENV) {
            self.export.output_dir = PathBuf::from(dir);
        }
    }

    /// Reject settings the scrape loop cannot run with
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.appium.server_url)
            .with_context(|| format!("Invalid Appium server URL: {}", self.appium.server_url))?;

        let scrape = &self.scrape;
        if scrape.currency.trim().is_empty() {
            anyhow::bail!("scrape.currency cannot be empty");
        }
        if scrape.max_no_new == 0 || scrape.discovery_attempts == 0 {
            anyhow::bail!("scrape.maxNoNew and scrape.discoveryAttempts must be at least 1");
        }
        let in_screen = |f: f64| f > 0.0 && f < 1.0;
        if !in_screen(scrape.swipe_start) || !in_screen(scrape.swipe_end) {
            anyhow::bail!("swipe fractions must lie strictly between 0 and 1");
        }
        if scrape.swipe_start <= scrape.swipe_end {
            anyhow::bail!("scrape.swipeStart must be below scrape.swipeEnd on screen");
        }
        if self.locators.transaction_xpath.trim().is_empty() {
            anyhow::bail!("locators.transactionXpath cannot be empty");
        }
        Ok(())
    }

    /// Save config to the wio directory
    /// Preserves other settings that this version doesn't manage
    pub fn save(&self, wio_dir: &Path) -> Result<()> {
        let settings_path = wio_dir.join(SETTINGS_FILE);

        let mut settings = self._raw_settings.clone();
        settings.appium = self.appium.clone();
        settings.locators = self.locators.clone();
        settings.scrape = self.scrape.clone();
        settings.export = self.export.clone();

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)
            .with_context(|| format!("Failed to write {}", settings_path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_settings_file() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::load(dir.path()).unwrap();
        // Process environment may carry overrides; compare the file-derived parts
        config.apply_env_overrides(|_| None);

        assert_eq!(config.scrape.currency, "AED");
        assert_eq!(config.scrape.max_no_new, 3);
        assert_eq!(config.scrape.discovery_attempts, 3);
        assert_eq!(config.scrape.swipe_start, 0.75);
        assert_eq!(config.scrape.swipe_end, 0.40);
        assert_eq!(config.scrape.identity, IdentityStrategy::Tuple);
        assert_eq!(config.locators.transaction_xpath, "//XCUIElementTypeStaticText");
        assert!(config.locators.date_header_xpath.contains("contains(@value, \"SUN,\")"));
    }

    #[test]
    fn test_partial_settings_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{
                "scrape": { "maxNoNew": 5, "identity": { "kind": "attribute" } },
                "export": { "outputDir": "/tmp/wio" }
            }"#,
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.scrape.max_no_new, 5);
        assert_eq!(config.scrape.discovery_attempts, 3);
        assert_eq!(
            config.scrape.identity,
            IdentityStrategy::Attribute { name: "UID".to_string() }
        );
        assert_eq!(config.appium.platform_name, "iOS");
    }

    #[test]
    fn test_env_overrides_win() {
        let mut config = Config::default();
        config.apply_env_overrides(|key| match key {
            APPIUM_URL_ENV => Some("http://10.0.0.5:4723".to_string()),
            DEVICE_UDID_ENV => Some("ABC-123".to_string()),
            _ => None,
        });
        assert_eq!(config.appium.server_url, "http://10.0.0.5:4723");
        assert_eq!(config.appium.udid, "ABC-123");
        assert_eq!(config.appium.device_name, "iPhone");
    }

    #[test]
    fn test_capabilities_are_vendor_prefixed() {
        let caps = AppiumSettings::default().to_capabilities();
        assert_eq!(caps["platformName"], "iOS");
        assert_eq!(caps["appium:automationName"], "XCUITest");
        assert_eq!(caps["appium:newCommandTimeout"], 3600);
        assert_eq!(caps["appium:connectHardwareKeyboard"], true);
    }

    #[test]
    fn test_invalid_swipe_fractions_rejected() {
        let mut config = Config::default();
        config.scrape.swipe_start = 0.3;
        config.scrape.swipe_end = 0.6;
        assert!(config.validate().is_err());

        config.scrape.swipe_start = 1.2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_server_url_rejected() {
        let mut config = Config::default();
        config.appium.server_url = "not a url".to_string();
        assert!(config.validate().unwrap_err().to_string().contains("Appium server URL"));
    }

    #[test]
    fn test_save_preserves_unknown_keys() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{ "notes": { "owner": "me" }, "scrape": { "currency": "AED" } }"#,
        )
        .unwrap();

        let mut config = Config::load(dir.path()).unwrap();
        config.scrape.max_no_new = 4;
        config.save(dir.path()).unwrap();

        let content = std::fs::read_to_string(dir.path().join("settings.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["notes"]["owner"], "me");
        assert_eq!(value["scrape"]["maxNoNew"], 4);
    }
}
