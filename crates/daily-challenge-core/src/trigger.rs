//! Fixed daily trigger times for the bot daemon.

use chrono::{DateTime, Days, FixedOffset, NaiveTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::date::ChallengeDate;
use crate::error::ConfigError;
use crate::reminder::Checkpoint;
use crate::storage::{parse_clock_time, parse_utc_offset, ScheduleConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "checkpoint", rename_all = "snake_case")]
pub enum Trigger {
    PostChallenge,
    Reminder(Checkpoint),
}

#[derive(Debug, Clone)]
pub struct TriggerSchedule {
    offset: FixedOffset,
    /// Sorted by time of day.
    slots: Vec<(NaiveTime, Trigger)>,
    weekdays_only: bool,
}

impl TriggerSchedule {
    pub fn from_config(cfg: &ScheduleConfig) -> Result<Self, ConfigError> {
        let offset = parse_utc_offset(&cfg.utc_offset)?;
        let post_at = parse_clock_time("schedule.post_at", &cfg.post_at)?;
        let afternoon = parse_clock_time("schedule.afternoon_reminder_at", &cfg.afternoon_reminder_at)?;
        let evening = parse_clock_time("schedule.evening_reminder_at", &cfg.evening_reminder_at)?;

        let afternoon_hour = afternoon.hour();
        let mut slots = vec![
            (post_at, Trigger::PostChallenge),
            (
                afternoon,
                Trigger::Reminder(Checkpoint::for_hour(afternoon.hour(), afternoon_hour)),
            ),
            (
                evening,
                Trigger::Reminder(Checkpoint::for_hour(evening.hour(), afternoon_hour)),
            ),
        ];
        slots.sort_by_key(|(time, _)| *time);

        Ok(Self {
            offset,
            slots,
            weekdays_only: cfg.weekdays_only,
        })
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn fires_on(&self, date: ChallengeDate) -> bool {
        !self.weekdays_only || !date.is_weekend()
    }

    /// The first trigger strictly after `now`, in the schedule's offset.
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<(DateTime<FixedOffset>, Trigger)> {
        let local = now.with_timezone(&self.offset);
        let today = local.date_naive();
        // A week always contains a weekday.
        (0..8u64)
            .filter_map(|n| today.checked_add_days(Days::new(n)))
            .filter(|day| self.fires_on(ChallengeDate::new(*day)))
            .flat_map(|day| {
                self.slots.iter().filter_map(move |(time, trigger)| {
                    self.offset
                        .from_local_datetime(&day.and_time(*time))
                        .single()
                        .map(|at| (at, *trigger))
                })
            })
            .find(|(at, _)| *at > local)
    }
}
