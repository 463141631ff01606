//! Configuration document and provider.
//!
//! The bot is driven by a single YAML document (categories, panels,
//! appearance, message templates, business hours, alerts, ratings). The
//! document is loaded once at startup and validated softly: content problems
//! are logged as warnings so operators can fix the file while the bot runs;
//! only an unreadable or unparseable file is an error.
//!
//! Lookups are pure and cheap (the document is small); callers re-query on
//! each need, so `reload` simply swaps the document in place.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::hours::{self, BusinessHours};

/// Complete bot configuration document.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BotConfig {
    #[serde(default)]
    pub appearance: Appearance,
    #[serde(default)]
    pub categories: Vec<CategoryConfig>,
    #[serde(default)]
    pub panels: Vec<PanelConfig>,
    /// Message templates, keyed by section then key.
    #[serde(default)]
    pub messages: HashMap<String, HashMap<String, String>>,
    #[serde(default)]
    pub business_hours: BusinessHoursConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub ratings: RatingsConfig,
    #[serde(default)]
    pub transcripts: TranscriptsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// A configured ticket category.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CategoryConfig {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub emoji: Option<String>,
    /// Parent channel (platform category) ticket channels are created under.
    #[serde(default)]
    pub discord_category: String,
    /// Channel name template; `{number}`, `{username}`, `{userid}` and
    /// `{category}` are substituted.
    #[serde(default)]
    pub channel_name: Option<String>,
    #[serde(default)]
    pub staff_roles: Vec<String>,
    #[serde(default)]
    pub ping_roles: Vec<String>,
    /// Max simultaneous open tickets per user in this category.
    #[serde(default = "default_member_limit")]
    pub member_limit: u32,
    /// Max simultaneous open tickets in this category overall.
    #[serde(default = "default_total_limit")]
    pub total_limit: u32,
    /// Creation cooldown in milliseconds.
    #[serde(default)]
    pub cooldown: Option<i64>,
    #[serde(default)]
    pub opening_message: Option<String>,
    /// Intake questions shown in a modal before creation (at most 5 used).
    #[serde(default)]
    pub questions: Vec<QuestionConfig>,
}

const fn default_member_limit() -> u32 {
    1
}

const fn default_total_limit() -> u32 {
    50
}

const fn default_true() -> bool {
    true
}

/// An intake question attached to a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionConfig {
    pub label: String,
    #[serde(default)]
    pub style: QuestionStyle,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub min_length: Option<u16>,
    #[serde(default)]
    pub max_length: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuestionStyle {
    #[default]
    Short,
    Paragraph,
}

/// A configured ticket-opening panel.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PanelConfig {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub channel_id: String,
    /// Category ids offered by this panel.
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default, rename = "type")]
    pub kind: PanelKind,
    #[serde(default)]
    pub title: Option<String>,
    /// Panel body; `{hours}` is substituted with [`PanelConfig::hours`].
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Human-readable opening-hours text for the `{hours}` placeholder.
    #[serde(default)]
    pub hours: Option<String>,
    #[serde(default = "default_true")]
    pub auto_refresh: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum PanelKind {
    #[default]
    Buttons,
    SelectMenu,
}

/// Embed appearance settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Appearance {
    #[serde(default)]
    pub colors: Option<Colors>,
    #[serde(default)]
    pub footer: Option<String>,
}

/// Color palette as `#rrggbb` strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Colors {
    pub primary: String,
    pub success: String,
    pub warning: String,
    pub error: String,
    pub info: String,
}

impl Default for Colors {
    fn default() -> Self {
        Self {
            primary: "#5865F2".to_string(),
            success: "#57F287".to_string(),
            warning: "#FEE75C".to_string(),
            error: "#ED4245".to_string(),
            info: "#5865F2".to_string(),
        }
    }
}

/// Parse a `#rrggbb` color string, falling back to the default primary.
pub fn parse_color(value: &str) -> u32 {
    u32::from_str_radix(value.trim_start_matches('#'), 16).unwrap_or(0x5865F2)
}

/// Business-hours window configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BusinessHoursConfig {
    #[serde(default)]
    pub enabled: bool,
    /// IANA timezone name; unknown names fall back to UTC.
    #[serde(default)]
    pub timezone: Option<String>,
    /// Whether tickets may still be opened outside the window.
    #[serde(default = "default_true")]
    pub allow_outside: bool,
    /// Notice posted in tickets opened outside the window; `{hours}`,
    /// `{timezone}`, and `{user}` are substituted.
    #[serde(default)]
    pub outside_message: Option<String>,
    #[serde(default)]
    pub schedule: Vec<DaySchedule>,
}

/// Opening window for one weekday (0 = Sunday .. 6 = Saturday).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DaySchedule {
    pub day: u8,
    #[serde(default)]
    pub start_hour: u32,
    #[serde(default)]
    pub start_minute: u32,
    #[serde(default)]
    pub end_hour: u32,
    #[serde(default)]
    pub end_minute: u32,
    /// Period start times at which the panel refresher reposts panels.
    #[serde(default)]
    pub periods: Vec<PeriodStart>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PeriodStart {
    pub start_hour: u32,
    pub start_minute: u32,
}

/// Inactivity-alert configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertsConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Default alert duration in minutes.
    #[serde(default = "default_alert_minutes")]
    pub default_time: i64,
    #[serde(default)]
    pub admin_roles: Vec<String>,
    /// Alert embed body; `{user}` and `{time}` are substituted.
    #[serde(default)]
    pub alert_message: Option<String>,
    /// Auto-close notice body.
    #[serde(default)]
    pub close_message: Option<String>,
}

const fn default_alert_minutes() -> i64 {
    30
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            default_time: default_alert_minutes(),
            admin_roles: Vec::new(),
            alert_message: None,
            close_message: None,
        }
    }
}

/// Rating-request configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RatingsConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Channel ratings are mirrored to, when set.
    #[serde(default)]
    pub channel_id: Option<String>,
    /// Rating DM body; `{ticket}`, `{category}` and `{user}` are substituted.
    #[serde(default)]
    pub request_message: Option<String>,
    #[serde(default)]
    pub thank_you_message: Option<String>,
}

/// Transcript delivery toggle (rendering lives behind `TranscriptSink`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptsConfig {
    #[serde(default)]
    pub enabled: bool,
}

/// Guild event-log configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub channel_id: Option<String>,
    /// Per-event opt-in, keyed by event name (`ticket_create`, ...).
    #[serde(default)]
    pub events: HashMap<String, bool>,
}

/// Soft-validate the document, returning human-readable issues.
fn validate(config: &BotConfig) -> Vec<String> {
    let mut issues = Vec::new();

    if config.categories.is_empty() {
        issues.push("no categories configured".to_string());
    }
    if config.panels.is_empty() {
        issues.push("no panels configured".to_string());
    }

    for (index, category) in config.categories.iter().enumerate() {
        let label = if category.id.is_empty() {
            format!("category {}", index + 1)
        } else {
            format!("category '{}'", category.id)
        };
        if category.id.is_empty() {
            issues.push(format!("{label}: 'id' is required"));
        }
        if category.name.is_empty() {
            issues.push(format!("{label}: 'name' is required"));
        }
        if category.discord_category.is_empty() {
            issues.push(format!("{label}: 'discordCategory' is required"));
        }
        if category.staff_roles.is_empty() {
            issues.push(format!("{label}: 'staffRoles' needs at least one role"));
        }
    }

    for (index, panel) in config.panels.iter().enumerate() {
        if panel.channel_id.is_empty() {
            issues.push(format!("panel {}: 'channelId' is required", index + 1));
        }
        if panel.categories.is_empty() {
            issues.push(format!(
                "panel {}: 'categories' needs at least one category",
                index + 1
            ));
        }
    }

    issues
}

/// Loaded configuration with reload support and pure lookups.
pub struct ConfigProvider {
    path: Option<PathBuf>,
    inner: RwLock<BotConfig>,
}

impl ConfigProvider {
    /// Load the document from a YAML file.
    ///
    /// Content problems are warnings; only I/O and parse failures error.
    pub fn load(path: &Path) -> Result<Self> {
        let config = read_document(path)?;
        info!(path = %path.display(), "Configuration loaded");
        Ok(Self {
            path: Some(path.to_path_buf()),
            inner: RwLock::new(config),
        })
    }

    /// Build a provider from an in-memory document (used in tests).
    pub fn from_config(config: BotConfig) -> Self {
        for issue in validate(&config) {
            warn!(%issue, "Configuration issue");
        }
        Self {
            path: None,
            inner: RwLock::new(config),
        }
    }

    /// Re-read the document from disk, replacing the in-memory copy.
    pub fn reload(&self) -> Result<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        let config = read_document(path)?;
        *self.write() = config;
        info!(path = %path.display(), "Configuration reloaded");
        Ok(())
    }

    /// Clone of the whole document.
    pub fn snapshot(&self) -> BotConfig {
        self.read().clone()
    }

    pub fn category(&self, category_id: &str) -> Option<CategoryConfig> {
        self.read()
            .categories
            .iter()
            .find(|c| c.id == category_id)
            .cloned()
    }

    pub fn panel(&self, panel_id: &str) -> Option<PanelConfig> {
        self.read().panels.iter().find(|p| p.id == panel_id).cloned()
    }

    pub fn panels(&self) -> Vec<PanelConfig> {
        self.read().panels.clone()
    }

    /// Color palette, with the built-in fallback when unconfigured.
    pub fn colors(&self) -> Colors {
        self.read().appearance.colors.clone().unwrap_or_default()
    }

    pub fn footer(&self) -> Option<String> {
        self.read().appearance.footer.clone()
    }

    /// Look up a message template and substitute `{placeholder}` values.
    ///
    /// Falls back to the key itself when the template is unconfigured, so a
    /// half-configured document still produces something visible.
    pub fn message(&self, section: &str, key: &str, replacements: &[(&str, &str)]) -> String {
        let mut message = self
            .read()
            .messages
            .get(section)
            .and_then(|m| m.get(key))
            .cloned()
            .unwrap_or_else(|| key.to_string());

        for (name, value) in replacements {
            message = message.replace(&format!("{{{name}}}"), value);
        }
        message
    }

    pub fn alerts(&self) -> AlertsConfig {
        self.read().alerts.clone()
    }

    pub fn ratings(&self) -> RatingsConfig {
        self.read().ratings.clone()
    }

    pub fn transcripts(&self) -> TranscriptsConfig {
        self.read().transcripts.clone()
    }

    pub fn logging(&self) -> LoggingConfig {
        self.read().logging.clone()
    }

    pub fn business_hours_config(&self) -> BusinessHoursConfig {
        self.read().business_hours.clone()
    }

    /// Evaluate business hours at the current instant.
    pub fn check_business_hours(&self) -> BusinessHours {
        hours::check(&self.read().business_hours, Utc::now())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BotConfig> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BotConfig> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn read_document(path: &Path) -> Result<BotConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {e}", path.display()))
    })?;
    let config: BotConfig = serde_yaml::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {e}", path.display()))
    })?;

    for issue in validate(&config) {
        warn!(%issue, "Configuration issue");
    }

    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write as _;

    const SAMPLE: &str = r"
appearance:
  colors:
    primary: '#111111'
    success: '#222222'
    warning: '#333333'
    error: '#444444'
    info: '#555555'
  footer: Support team
categories:
  - id: suporte
    name: Suporte
    discordCategory: '900'
    staffRoles: ['800']
    cooldown: 60000
    questions:
      - label: Nome
      - label: Motivo
        style: paragraph
        required: false
panels:
  - id: main
    channelId: '700'
    categories: [suporte]
    type: buttons
    title: Open a ticket
messages:
  errors:
    cooldownActive: 'Wait {time} before opening another ticket.'
";

    fn write_sample() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_and_looks_up_categories() {
        let file = write_sample();
        let provider = ConfigProvider::load(file.path()).unwrap();

        let category = provider.category("suporte").unwrap();
        assert_eq!(category.name, "Suporte");
        assert_eq!(category.member_limit, 1);
        assert_eq!(category.total_limit, 50);
        assert_eq!(category.cooldown, Some(60_000));
        assert_eq!(category.questions.len(), 2);
        assert_eq!(category.questions[0].style, QuestionStyle::Short);
        assert!(category.questions[0].required);
        assert_eq!(category.questions[1].style, QuestionStyle::Paragraph);
        assert!(!category.questions[1].required);

        assert!(provider.category("unknown").is_none());
    }

    #[test]
    fn panel_defaults() {
        let file = write_sample();
        let provider = ConfigProvider::load(file.path()).unwrap();

        let panel = provider.panel("main").unwrap();
        assert_eq!(panel.kind, PanelKind::Buttons);
        assert!(panel.auto_refresh);
    }

    #[test]
    fn message_substitution_and_fallback() {
        let file = write_sample();
        let provider = ConfigProvider::load(file.path()).unwrap();

        let message = provider.message("errors", "cooldownActive", &[("time", "5m")]);
        assert_eq!(message, "Wait 5m before opening another ticket.");

        // Unconfigured keys fall back to the key itself.
        assert_eq!(provider.message("errors", "nope", &[]), "nope");
    }

    #[test]
    fn configured_colors_override_fallback() {
        let file = write_sample();
        let provider = ConfigProvider::load(file.path()).unwrap();
        assert_eq!(provider.colors().primary, "#111111");

        let bare = ConfigProvider::from_config(BotConfig::default());
        assert_eq!(bare.colors().primary, "#5865F2");
    }

    #[test]
    fn parse_color_handles_hash_prefix_and_garbage() {
        assert_eq!(parse_color("#FF0000"), 0x00FF_0000);
        assert_eq!(parse_color("00ff00"), 0x0000_FF00);
        assert_eq!(parse_color("nonsense"), 0x5865_F2);
    }

    #[test]
    fn partial_document_still_loads() {
        // Missing required fields produce warnings, not errors.
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"categories:\n  - name: NoId\n").unwrap();
        let provider = ConfigProvider::load(file.path()).unwrap();
        assert_eq!(provider.snapshot().categories.len(), 1);
    }

    #[test]
    fn unparseable_document_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"categories: {not: [valid").unwrap();
        assert!(ConfigProvider::load(file.path()).is_err());
    }

    #[test]
    fn reload_replaces_document() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        file.flush().unwrap();

        let provider = ConfigProvider::load(file.path()).unwrap();
        assert!(provider.category("suporte").is_some());

        std::fs::write(file.path(), "categories: []\npanels: []\n").unwrap();
        provider.reload().unwrap();
        assert!(provider.category("suporte").is_none());
    }
}
