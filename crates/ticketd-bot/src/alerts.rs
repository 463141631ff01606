//! Inactivity-alert sweeper.
//!
//! A timer task that closes tickets whose alert deadline passed without a
//! response from the owner. Each alert is marked executed before the close
//! starts, so a crash mid-close cannot double-close on the next sweep.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use ticketd_core::config::parse_color;
use ticketd_core::db::now_ms;

use crate::lifecycle::TicketManager;
use crate::platform::{Embed, OutboundMessage, UserRef};
use crate::storage::ExpiredAlert;

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Spawn the sweeper task. The first sweep runs immediately.
pub fn spawn_alert_sweeper(
    manager: TicketManager,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    sweep(&manager).await;
                }
                _ = shutdown.changed() => {
                    info!("Alert sweeper shutting down");
                    return;
                }
            }
        }
    })
}

/// One sweep pass. Failures on one alert never stop the rest.
pub async fn sweep(manager: &TicketManager) {
    // Cooldown cleanup rides this timer and runs even with alerts disabled.
    match manager.db().clean_expired_cooldowns().await {
        Ok(0) => {}
        Ok(removed) => debug!(removed, "Dropped expired cooldowns"),
        Err(e) => warn!(error = %e, "Cooldown cleanup failed"),
    }

    if !manager.config().alerts().enabled {
        return;
    }

    let expired = match manager.db().get_expired_alerts().await {
        Ok(expired) => expired,
        Err(e) => {
            warn!(error = %e, "Failed to load expired alerts");
            return;
        }
    };

    for alert in expired {
        if let Err(e) = execute_alert(manager, &alert).await {
            warn!(
                ticket = alert.ticket_number,
                alert = alert.id,
                error = %e,
                "Alert execution failed"
            );
        }
    }
}

async fn execute_alert(
    manager: &TicketManager,
    alert: &ExpiredAlert,
) -> Result<(), crate::error::TicketError> {
    let Some(channel_id) = alert.channel_id.as_deref() else {
        // Ticket without a channel cannot be closed through it.
        manager.db().mark_alert_executed(alert.id).await?;
        return Ok(());
    };

    let notice = closure_notice(manager, alert);
    if let Err(e) = manager.platform().send_message(channel_id, notice).await {
        debug!(alert = alert.id, error = %e, "Closure notice not delivered");
    }

    // Resolve who raised the alert; automated closes fall back to System.
    let closer = manager
        .platform()
        .fetch_user(&alert.alerted_by)
        .await
        .ok()
        .flatten()
        .unwrap_or_else(UserRef::system);

    // Executed before closing: a crash between these two steps must not
    // close the ticket twice on the next sweep.
    manager.db().mark_alert_executed(alert.id).await?;

    let reason = manager
        .config()
        .message("alert", "autoCloseReason", &[("user", &closer.username)]);
    manager.close(channel_id, &closer, Some(reason)).await?;

    info!(ticket = alert.ticket_number, "Ticket auto-closed by alert");
    Ok(())
}

fn closure_notice(manager: &TicketManager, alert: &ExpiredAlert) -> OutboundMessage {
    let age_minutes = ((now_ms() - alert.created_at) / 60_000).max(0);
    let mut description = manager
        .config()
        .alerts()
        .close_message
        .unwrap_or_else(|| manager.config().message("alert", "autoClose", &[]))
        .replace("{user}", &format!("<@{}>", alert.owner_id))
        .replace("{time}", &format!("{age_minutes}min"));
    if let Some(reason) = &alert.reason {
        description.push_str(&format!("\n> {reason}"));
    }

    OutboundMessage::embed(Embed {
        title: Some(format!("Ticket #{:04}", alert.ticket_number)),
        description: Some(description),
        color: Some(parse_color(&manager.config().colors().error)),
        ..Embed::default()
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ticketd_core::ConfigProvider;
    use ticketd_core::config::{AlertsConfig, BotConfig, CategoryConfig};

    use crate::platform::fake::FakePlatform;
    use crate::platform::Platform;
    use crate::storage::{STATUS_CLOSED, TicketDatabase};

    use super::*;

    fn test_config() -> BotConfig {
        let mut config = BotConfig::default();
        config.categories.push(CategoryConfig {
            id: "suporte".to_string(),
            name: "Suporte".to_string(),
            discord_category: "900".to_string(),
            staff_roles: vec!["800".to_string()],
            member_limit: 5,
            total_limit: 50,
            ..CategoryConfig::default()
        });
        config.alerts = AlertsConfig {
            enabled: true,
            ..AlertsConfig::default()
        };
        config
    }

    async fn test_manager(config: BotConfig) -> (TicketManager, Arc<FakePlatform>) {
        let db = TicketDatabase::open_in_memory().await.unwrap();
        let platform = Arc::new(FakePlatform::new());
        let manager = TicketManager::new(
            db,
            Arc::new(ConfigProvider::from_config(config)),
            Arc::clone(&platform) as Arc<dyn Platform>,
            None,
        );
        (manager, platform)
    }

    fn owner() -> UserRef {
        UserRef {
            id: "u1".to_string(),
            username: "alice".to_string(),
            is_bot: false,
        }
    }

    #[tokio::test]
    async fn sweep_closes_expired_tickets() {
        let (manager, platform) = test_manager(test_config()).await;

        let ticket = manager
            .create("g1", &owner(), "suporte", Vec::new())
            .await
            .unwrap();
        let channel_id = ticket.channel_id.clone().unwrap();
        manager
            .db()
            .set_ticket_alert(ticket.id, "staff", -1, Some("silent"))
            .await
            .unwrap();

        sweep(&manager).await;

        let closed = manager.db().get_ticket_by_id(ticket.id).await.unwrap().unwrap();
        assert_eq!(closed.status, STATUS_CLOSED);
        assert!(platform
            .state
            .lock()
            .unwrap()
            .deleted_channels
            .contains(&channel_id));
        // Closure notice mentions the owner and the reason.
        let sent = platform.sent_to(&channel_id);
        let notice = &sent[sent.len() - 1];
        let text = notice.embeds[0].description.as_deref().unwrap();
        assert!(text.contains("<@u1>"));
        assert!(text.contains("silent"));

        // Idempotent: a second sweep finds nothing.
        sweep(&manager).await;
        assert!(manager.db().get_expired_alerts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sweep_is_disabled_with_alerts_off() {
        let mut config = test_config();
        config.alerts.enabled = false;
        let (manager, _) = test_manager(config).await;

        let ticket = manager
            .create("g1", &owner(), "suporte", Vec::new())
            .await
            .unwrap();
        manager
            .db()
            .set_ticket_alert(ticket.id, "staff", -1, None)
            .await
            .unwrap();

        sweep(&manager).await;

        let still_open = manager.db().get_ticket_by_id(ticket.id).await.unwrap().unwrap();
        assert!(still_open.is_open());
    }

    #[tokio::test]
    async fn unknown_alerter_falls_back_to_system() {
        let (manager, _) = test_manager(test_config()).await;

        let ticket = manager
            .create("g1", &owner(), "suporte", Vec::new())
            .await
            .unwrap();
        manager
            .db()
            .set_ticket_alert(ticket.id, "ghost-user", -1, None)
            .await
            .unwrap();

        sweep(&manager).await;

        let closed = manager.db().get_ticket_by_id(ticket.id).await.unwrap().unwrap();
        assert_eq!(closed.closed_by.as_deref(), Some(UserRef::system().id.as_str()));
    }

    #[tokio::test]
    async fn failed_close_is_not_retried_and_sweep_continues() {
        let (manager, platform) = test_manager(test_config()).await;

        let first = manager
            .create("g1", &owner(), "suporte", Vec::new())
            .await
            .unwrap();
        let second = manager
            .create(
                "g1",
                &UserRef {
                    id: "u2".to_string(),
                    username: "bob".to_string(),
                    is_bot: false,
                },
                "suporte",
                Vec::new(),
            )
            .await
            .unwrap();

        manager
            .db()
            .set_ticket_alert(first.id, "staff", -3, None)
            .await
            .unwrap();
        // A second pending alert on the same ticket, as left behind by a
        // crash between cancel and insert. Its close loses to the first one.
        sqlx::query(
            "INSERT INTO ticket_alerts \
                 (ticket_id, alerted_by, reason, duration_minutes, expires_at, status, created_at) \
             VALUES (?, 'staff', NULL, -2, ?, 'pending', ?)",
        )
        .bind(first.id)
        .bind(now_ms() - 120_000)
        .bind(now_ms())
        .execute(manager.db().pool())
        .await
        .unwrap();
        manager
            .db()
            .set_ticket_alert(second.id, "staff", -1, None)
            .await
            .unwrap();

        sweep(&manager).await;

        // The failing middle alert did not stop the rest of the pass.
        for id in [first.id, second.id] {
            let closed = manager.db().get_ticket_by_id(id).await.unwrap().unwrap();
            assert_eq!(closed.status, STATUS_CLOSED);
        }
        // First ticket's channel was deleted once; the losing alert was
        // marked executed before its close failed, so nothing retries it.
        let first_channel = first.channel_id.clone().unwrap();
        let deletions = platform
            .state
            .lock()
            .unwrap()
            .deleted_channels
            .iter()
            .filter(|c| **c == first_channel)
            .count();
        assert_eq!(deletions, 1);
        let statuses: Vec<String> = sqlx::query_scalar(
            "SELECT status FROM ticket_alerts WHERE ticket_id = ? ORDER BY id",
        )
        .bind(first.id)
        .fetch_all(manager.db().pool())
        .await
        .unwrap();
        assert_eq!(statuses, vec!["executed".to_string(), "executed".to_string()]);
        assert!(manager.db().get_expired_alerts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cooldown_cleanup_runs_with_alerts_disabled() {
        let mut config = test_config();
        config.alerts.enabled = false;
        let (manager, _) = test_manager(config).await;

        manager
            .db()
            .set_cooldown("u1", "suporte", -1_000)
            .await
            .unwrap();

        sweep(&manager).await;

        // The sweep already dropped the expired row.
        assert_eq!(manager.db().clean_expired_cooldowns().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn sweep_handles_multiple_alerts() {
        let (manager, _) = test_manager(test_config()).await;

        let first = manager
            .create("g1", &owner(), "suporte", Vec::new())
            .await
            .unwrap();
        let second = manager
            .create(
                "g1",
                &UserRef {
                    id: "u2".to_string(),
                    username: "bob".to_string(),
                    is_bot: false,
                },
                "suporte",
                Vec::new(),
            )
            .await
            .unwrap();

        manager
            .db()
            .set_ticket_alert(first.id, "staff", -1, None)
            .await
            .unwrap();
        manager
            .db()
            .set_ticket_alert(second.id, "staff", -1, None)
            .await
            .unwrap();

        sweep(&manager).await;

        assert!(manager.db().get_expired_alerts().await.unwrap().is_empty());
        for id in [first.id, second.id] {
            let closed = manager.db().get_ticket_by_id(id).await.unwrap().unwrap();
            assert_eq!(closed.status, STATUS_CLOSED);
        }
    }
}
