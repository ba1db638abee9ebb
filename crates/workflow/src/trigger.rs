use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use weathercanvas_config::ScheduleAction;

/// Where a trigger came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum TriggerSource {
    /// A named schedule fired
    Schedule(String),
    /// An operator asked for it (CLI, gateway)
    Manual(String),
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerSource::Schedule(name) => write!(f, "schedule:{name}"),
            TriggerSource::Manual(origin) => write!(f, "manual:{origin}"),
        }
    }
}

/// One request to run the pipeline. Each trigger starts exactly one cycle.
#[derive(Debug, Clone, Serialize)]
pub struct Trigger {
    pub id: Uuid,
    pub source: TriggerSource,
    pub action: ScheduleAction,
    pub at: DateTime<Utc>,
}

impl Trigger {
    pub fn manual(origin: impl Into<String>, action: ScheduleAction) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: TriggerSource::Manual(origin.into()),
            action,
            at: Utc::now(),
        }
    }

    pub fn scheduled(name: impl Into<String>, action: ScheduleAction, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: TriggerSource::Schedule(name.into()),
            action,
            at,
        }
    }
}
