//! Business-hours evaluation.
//!
//! Maps "now" into the configured timezone, finds the schedule entry for the
//! current weekday, and compares the minute-of-day against the day's window.
//! The end boundary is exclusive: a 09:00-18:00 window is open at 17:59 and
//! closed at 18:00.

use chrono::{DateTime, Datelike, Timelike, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::config::{BusinessHoursConfig, DaySchedule};

/// Outcome of a business-hours check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessHours {
    pub is_open: bool,
    /// Outside-hours notice template with `{hours}` and `{timezone}` filled
    /// in; `{user}` is left for the caller, which knows the opener.
    pub message: Option<String>,
    /// Whether tickets may still be opened outside the window.
    pub allow_outside: bool,
}

impl BusinessHours {
    const fn open() -> Self {
        Self {
            is_open: true,
            message: None,
            allow_outside: true,
        }
    }
}

/// Check business hours against a concrete instant.
pub fn check(config: &BusinessHoursConfig, now: DateTime<Utc>) -> BusinessHours {
    if !config.enabled {
        return BusinessHours::open();
    }

    let tz = resolve_timezone(config.timezone.as_deref());
    let local = now.with_timezone(&tz);
    #[allow(clippy::cast_possible_truncation)]
    let weekday = local.weekday().num_days_from_sunday() as u8;
    let minute_of_day = local.hour() * 60 + local.minute();

    evaluate_at(config, weekday, minute_of_day)
}

/// Pure form of [`check`]: weekday is 0 (Sunday) through 6 (Saturday).
pub fn evaluate_at(
    config: &BusinessHoursConfig,
    weekday: u8,
    minute_of_day: u32,
) -> BusinessHours {
    if !config.enabled {
        return BusinessHours::open();
    }

    let Some(today) = config.schedule.iter().find(|s| s.day == weekday) else {
        // No schedule entry for today: treat as closed.
        return BusinessHours {
            is_open: false,
            message: Some(outside_message(config, None)),
            allow_outside: config.allow_outside,
        };
    };

    let start = today.start_hour * 60 + today.start_minute;
    let end = today.end_hour * 60 + today.end_minute;
    let is_open = minute_of_day >= start && minute_of_day < end;

    if is_open {
        BusinessHours::open()
    } else {
        BusinessHours {
            is_open: false,
            message: Some(outside_message(config, Some(today))),
            allow_outside: config.allow_outside,
        }
    }
}

/// Weekday (0 = Sunday) and hour/minute of `now` in the configured timezone.
///
/// Used by the panel refresher to match configured period start times.
pub fn local_parts(config: &BusinessHoursConfig, now: DateTime<Utc>) -> (u8, u32, u32) {
    let tz = resolve_timezone(config.timezone.as_deref());
    let local = now.with_timezone(&tz);
    #[allow(clippy::cast_possible_truncation)]
    let weekday = local.weekday().num_days_from_sunday() as u8;
    (weekday, local.hour(), local.minute())
}

/// Parse the configured IANA timezone, falling back to UTC.
pub fn resolve_timezone(name: Option<&str>) -> Tz {
    let name = name.unwrap_or("UTC");
    name.parse().unwrap_or_else(|_| {
        warn!(timezone = %name, "Unknown timezone in business_hours, falling back to UTC");
        Tz::UTC
    })
}

fn outside_message(config: &BusinessHoursConfig, today: Option<&DaySchedule>) -> String {
    let template = config
        .outside_message
        .clone()
        .unwrap_or_else(|| "We are currently outside business hours.".to_string());

    let mut message = template.replace(
        "{timezone}",
        config.timezone.as_deref().unwrap_or("UTC"),
    );
    if let Some(day) = today {
        message = message.replace("{hours}", &window_text(day));
    }
    message
}

fn window_text(day: &DaySchedule) -> String {
    format!(
        "{:02}:{:02}-{:02}:{:02}",
        day.start_hour, day.start_minute, day.end_hour, day.end_minute
    )
}
