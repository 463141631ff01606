//! Panel refresher.
//!
//! Reposts ticket-opening panels at the start of each configured business
//! period so the panel stays the newest message in its channel. The task
//! remembers the last hour it fired to avoid refreshing twice within the
//! same period start.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use ticketd_core::ConfigProvider;
use ticketd_core::config::BusinessHoursConfig;
use ticketd_core::hours;

use crate::lifecycle::views;
use crate::platform::Platform;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// How many messages to scan for stale panels.
const SCAN_LIMIT: u8 = 50;

pub fn spawn_panel_refresher(
    config: Arc<ConfigProvider>,
    platform: Arc<dyn Platform>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        let mut last_fired_hour: Option<u32> = None;

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    let hours_config = config.business_hours_config();
                    let (weekday, hour, minute) = hours::local_parts(&hours_config, Utc::now());
                    if should_refresh(&hours_config, weekday, hour, minute, &mut last_fired_hour) {
                        refresh_all(&config, &platform).await;
                    }
                }
                _ = shutdown.changed() => {
                    info!("Panel refresher shutting down");
                    return;
                }
            }
        }
    })
}

/// Decide whether a tick lands on a period start, updating the hour guard.
/// The guard keeps sub-minute tick intervals from refreshing twice.
pub fn should_refresh(
    config: &BusinessHoursConfig,
    weekday: u8,
    hour: u32,
    minute: u32,
    last_fired_hour: &mut Option<u32>,
) -> bool {
    if !config.enabled || !period_starts_now(config, weekday, hour, minute) {
        return false;
    }
    if *last_fired_hour == Some(hour) {
        return false;
    }
    *last_fired_hour = Some(hour);
    true
}

/// Does any of today's configured periods start at exactly this time?
pub fn period_starts_now(
    config: &BusinessHoursConfig,
    weekday: u8,
    hour: u32,
    minute: u32,
) -> bool {
    config
        .schedule
        .iter()
        .filter(|day| day.day == weekday)
        .flat_map(|day| &day.periods)
        .any(|period| period.start_hour == hour && period.start_minute == minute)
}

/// Refresh every auto-refresh panel: drop stale bot panels, post fresh ones.
pub async fn refresh_all(config: &ConfigProvider, platform: &Arc<dyn Platform>) {
    for panel in config.panels() {
        if !panel.auto_refresh {
            continue;
        }
        if let Err(e) = refresh_panel(config, platform, &panel).await {
            warn!(panel = %panel.id, error = %e, "Panel refresh failed");
        }
    }
}

async fn refresh_panel(
    config: &ConfigProvider,
    platform: &Arc<dyn Platform>,
    panel: &ticketd_core::config::PanelConfig,
) -> Result<(), crate::platform::PlatformError> {
    let bot_id = platform.bot_user_id();
    let messages = platform
        .fetch_recent_messages(&panel.channel_id, SCAN_LIMIT)
        .await?;

    // Only the bot's embed-bearing messages are panels; leave its plain
    // replies in the channel alone.
    for message in messages
        .iter()
        .filter(|m| m.author_id == bot_id && m.has_embeds)
    {
        if let Err(e) = platform.delete_message(&panel.channel_id, &message.id).await {
            debug!(panel = %panel.id, message = %message.id, error = %e, "Stale panel not deleted");
        }
    }

    platform
        .send_message(&panel.channel_id, views::panel_message(config, panel))
        .await?;

    info!(panel = %panel.id, channel = %panel.channel_id, "Panel refreshed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use ticketd_core::config::{BotConfig, CategoryConfig, DaySchedule, PanelConfig, PeriodStart};

    use crate::platform::MessageRef;
    use crate::platform::fake::FakePlatform;

    use super::*;

    fn hours_config() -> BusinessHoursConfig {
        BusinessHoursConfig {
            enabled: true,
            timezone: Some("UTC".to_string()),
            allow_outside: true,
            outside_message: None,
            schedule: vec![DaySchedule {
                day: 1,
                start_hour: 9,
                start_minute: 0,
                end_hour: 18,
                end_minute: 0,
                periods: vec![
                    PeriodStart {
                        start_hour: 9,
                        start_minute: 0,
                    },
                    PeriodStart {
                        start_hour: 14,
                        start_minute: 30,
                    },
                ],
            }],
        }
    }

    #[test]
    fn period_matching_is_exact() {
        let config = hours_config();
        assert!(period_starts_now(&config, 1, 9, 0));
        assert!(period_starts_now(&config, 1, 14, 30));
        assert!(!period_starts_now(&config, 1, 9, 1));
        assert!(!period_starts_now(&config, 1, 14, 0));
        // Wrong weekday.
        assert!(!period_starts_now(&config, 2, 9, 0));
    }

    #[test]
    fn refresh_fires_once_per_period_start() {
        let config = hours_config();
        let mut last_fired = None;

        assert!(should_refresh(&config, 1, 9, 0, &mut last_fired));
        // Further ticks within the same period start stay quiet.
        assert!(!should_refresh(&config, 1, 9, 0, &mut last_fired));
        assert!(!should_refresh(&config, 1, 9, 1, &mut last_fired));

        assert!(should_refresh(&config, 1, 14, 30, &mut last_fired));
        assert!(!should_refresh(&config, 1, 14, 30, &mut last_fired));

        // Next morning the guard holds a different hour, so it fires again.
        assert!(should_refresh(&config, 1, 9, 0, &mut last_fired));

        let mut disabled = hours_config();
        disabled.enabled = false;
        assert!(!should_refresh(&disabled, 1, 9, 0, &mut None));
    }

    #[tokio::test]
    async fn refresh_replaces_stale_bot_panels() {
        let mut config = BotConfig::default();
        config.categories.push(CategoryConfig {
            id: "suporte".to_string(),
            name: "Suporte".to_string(),
            discord_category: "900".to_string(),
            staff_roles: vec!["800".to_string()],
            ..CategoryConfig::default()
        });
        config.panels.push(PanelConfig {
            id: "main".to_string(),
            channel_id: "panel-chan".to_string(),
            categories: vec!["suporte".to_string()],
            auto_refresh: true,
            ..PanelConfig::default()
        });
        config.panels.push(PanelConfig {
            id: "static".to_string(),
            channel_id: "static-chan".to_string(),
            categories: vec!["suporte".to_string()],
            auto_refresh: false,
            ..PanelConfig::default()
        });
        let provider = ConfigProvider::from_config(config);

        let platform = Arc::new(FakePlatform::new());
        platform.set_recent(
            "panel-chan",
            vec![
                MessageRef {
                    id: "old-panel".to_string(),
                    channel_id: "panel-chan".to_string(),
                    author_id: "bot".to_string(),
                    author_is_bot: true,
                    has_embeds: true,
                    has_components: true,
                },
                MessageRef {
                    id: "bot-reply".to_string(),
                    channel_id: "panel-chan".to_string(),
                    author_id: "bot".to_string(),
                    author_is_bot: true,
                    has_embeds: false,
                    has_components: false,
                },
                MessageRef {
                    id: "user-msg".to_string(),
                    channel_id: "panel-chan".to_string(),
                    author_id: "u1".to_string(),
                    author_is_bot: false,
                    has_embeds: false,
                    has_components: false,
                },
            ],
        );

        let platform_dyn = Arc::clone(&platform) as Arc<dyn Platform>;
        refresh_all(&provider, &platform_dyn).await;

        let state = platform.state.lock().unwrap();
        // Only the bot's embed-bearing panel was removed; its plain reply
        // and the user's message stay.
        assert_eq!(
            state.deleted_messages,
            vec![("panel-chan".to_string(), "old-panel".to_string())]
        );
        // A fresh panel went out; the auto_refresh=false panel was skipped.
        assert_eq!(state.sent.len(), 1);
        assert_eq!(state.sent[0].0, "panel-chan");
        assert!(!state.sent[0].1.components.is_empty());
    }
}
