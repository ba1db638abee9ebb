//! Cron-style scheduling.
//!
//! Standard 5-field expressions: `minute hour day-of-month month day-of-week`.
//! Each field accepts `*`, `N`, `N-M`, `*/S`, `N-M/S`, `N/S` and comma lists.
//! Day-of-week runs 0–6 from Sunday; `7` is accepted as Sunday too.

use chrono::{DateTime, Datelike, Timelike, Utc};
use tokio::sync::mpsc;
use tokio::time::{Duration, MissedTickBehavior};
use tracing::{debug, info, warn};
use weathercanvas_config::{ScheduleAction, ScheduleConfig};

use crate::trigger::Trigger;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("expected 5 fields (minute hour dom month dow), got {0}")]
    FieldCount(usize),

    #[error("invalid {field} field '{value}': {reason}")]
    InvalidField {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("schedule '{name}': {source}")]
    Schedule {
        name: String,
        #[source]
        source: Box<ScheduleError>,
    },
}

/// Allowed values of one field as a bitmask (bit N set = value N allowed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FieldSet(u64);

impl FieldSet {
    fn contains(self, value: u32) -> bool {
        value < 64 && self.0 & (1 << value) != 0
    }

    fn values(self) -> Vec<u32> {
        (0..64).filter(|v| self.contains(*v)).collect()
    }
}

struct FieldSpec {
    name: &'static str,
    min: u32,
    max: u32,
}

const MINUTE: FieldSpec = FieldSpec {
    name: "minute",
    min: 0,
    max: 59,
};
const HOUR: FieldSpec = FieldSpec {
    name: "hour",
    min: 0,
    max: 23,
};
const DAY_OF_MONTH: FieldSpec = FieldSpec {
    name: "day-of-month",
    min: 1,
    max: 31,
};
const MONTH: FieldSpec = FieldSpec {
    name: "month",
    min: 1,
    max: 12,
};
const DAY_OF_WEEK: FieldSpec = FieldSpec {
    name: "day-of-week",
    min: 0,
    max: 7,
};

impl FieldSpec {
    fn invalid(&self, value: &str, reason: impl Into<String>) -> ScheduleError {
        ScheduleError::InvalidField {
            field: self.name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    fn number(&self, field: &str, text: &str) -> Result<u32, ScheduleError> {
        let n: u32 = text
            .parse()
            .map_err(|_| self.invalid(field, format!("'{text}' is not a number")))?;
        if n < self.min || n > self.max {
            return Err(self.invalid(
                field,
                format!("{n} outside {}-{}", self.min, self.max),
            ));
        }
        Ok(n)
    }

    fn parse(&self, field: &str) -> Result<FieldSet, ScheduleError> {
        let mut mask = 0u64;

        for part in field.split(',') {
            let (range, step) = match part.split_once('/') {
                Some((range, step)) => {
                    let step: u32 = step
                        .parse()
                        .map_err(|_| self.invalid(field, format!("bad step '{step}'")))?;
                    if step == 0 {
                        return Err(self.invalid(field, "step cannot be zero"));
                    }
                    (range, step)
                }
                None => (part, 1),
            };

            let (start, end) = if range == "*" {
                (self.min, self.max)
            } else if let Some((a, b)) = range.split_once('-') {
                let (a, b) = (self.number(field, a)?, self.number(field, b)?);
                if a > b {
                    return Err(self.invalid(field, format!("range {a}-{b} is reversed")));
                }
                (a, b)
            } else {
                let n = self.number(field, range)?;
                // `N/S` runs from N to the field maximum
                if step > 1 { (n, self.max) } else { (n, n) }
            };

            for v in (start..=end).step_by(step as usize) {
                mask |= 1 << v;
            }
        }

        if mask == 0 {
            return Err(self.invalid(field, "no values"));
        }
        Ok(FieldSet(mask))
    }
}

/// A parsed 5-field cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpr {
    minutes: FieldSet,
    hours: FieldSet,
    days_of_month: FieldSet,
    months: FieldSet,
    days_of_week: FieldSet,
}

impl CronExpr {
    pub fn parse(expr: &str) -> Result<Self, ScheduleError> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        let [minute, hour, dom, month, dow] = fields[..] else {
            return Err(ScheduleError::FieldCount(fields.len()));
        };

        let mut days_of_week = DAY_OF_WEEK.parse(dow)?;
        if days_of_week.contains(7) {
            days_of_week = FieldSet((days_of_week.0 | 1) & !(1 << 7));
        }

        Ok(Self {
            minutes: MINUTE.parse(minute)?,
            hours: HOUR.parse(hour)?,
            days_of_month: DAY_OF_MONTH.parse(dom)?,
            months: MONTH.parse(month)?,
            days_of_week,
        })
    }

    pub fn matches(&self, at: &DateTime<Utc>) -> bool {
        self.minutes.contains(at.minute())
            && self.hours.contains(at.hour())
            && self.days_of_month.contains(at.day())
            && self.months.contains(at.month())
            && self.days_of_week.contains(at.weekday().num_days_from_sunday())
    }
}

/// A named, parsed schedule.
#[derive(Debug, Clone)]
pub struct Schedule {
    pub name: String,
    pub expr: CronExpr,
    pub action: ScheduleAction,
    pub enabled: bool,
    last_fired: Option<DateTime<Utc>>,
}

impl Schedule {
    pub fn from_config(config: &ScheduleConfig) -> Result<Self, ScheduleError> {
        let expr = CronExpr::parse(&config.cron).map_err(|e| ScheduleError::Schedule {
            name: config.name.clone(),
            source: Box::new(e),
        })?;
        Ok(Self {
            name: config.name.clone(),
            expr,
            action: config.action,
            enabled: config.enabled,
            last_fired: None,
        })
    }

    /// Whether the schedule fires at `now`; at most once per minute.
    fn due(&self, now: &DateTime<Utc>) -> bool {
        if !self.enabled || !self.expr.matches(now) {
            return false;
        }
        match self.last_fired {
            Some(last) => minute_key(&last) != minute_key(now),
            None => true,
        }
    }
}

fn minute_key(at: &DateTime<Utc>) -> i64 {
    at.timestamp().div_euclid(60)
}

/// Emits a [`Trigger`] whenever one of its schedules matches the clock.
pub struct Scheduler {
    schedules: Vec<Schedule>,
    tick: Duration,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            schedules: Vec::new(),
            tick: Duration::from_secs(60),
        }
    }

    /// Parse every configured schedule; the first invalid one fails the lot.
    pub fn from_config(configs: &[ScheduleConfig]) -> Result<Self, ScheduleError> {
        let mut scheduler = Self::new();
        for config in configs {
            scheduler.add(Schedule::from_config(config)?);
        }
        Ok(scheduler)
    }

    /// Polling interval of the background loop (default 60 s).
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn add(&mut self, schedule: Schedule) {
        info!(
            name = %schedule.name,
            enabled = schedule.enabled,
            action = ?schedule.action,
            "Schedule registered"
        );
        self.schedules.push(schedule);
    }

    pub fn schedules(&self) -> &[Schedule] {
        &self.schedules
    }

    /// Collect the triggers due at `now` and mark them fired.
    pub fn due(&mut self, now: DateTime<Utc>) -> Vec<Trigger> {
        let mut triggers = Vec::new();
        for schedule in &mut self.schedules {
            if schedule.due(&now) {
                schedule.last_fired = Some(now);
                info!(name = %schedule.name, "Schedule fired");
                triggers.push(Trigger::scheduled(&schedule.name, schedule.action, now));
            }
        }
        triggers
    }

    /// Run the polling loop in the background.
    ///
    /// The loop stops when the returned receiver is dropped.
    pub fn start(mut self) -> (mpsc::Receiver<Trigger>, tokio::task::JoinHandle<()>) {
        let (tx, rx) = mpsc::channel::<Trigger>(64);

        let handle = tokio::spawn(async move {
            if self.schedules.iter().all(|s| !s.enabled) {
                warn!("No enabled schedules; scheduler idle");
            }

            let mut interval = tokio::time::interval(self.tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                for trigger in self.due(Utc::now()) {
                    if tx.send(trigger).await.is_err() {
                        debug!("Trigger receiver dropped, stopping scheduler");
                        return;
                    }
                }
            }
        });

        (rx, handle)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
