use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::UnknownCareType;

pub type PlantId = i64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CareTaskType {
    Watering,
    Pruning,
    Spraying,
    Rotating,
    Fertilizing,
}

impl CareTaskType {
    pub const ALL: [CareTaskType; 5] = [
        CareTaskType::Watering,
        CareTaskType::Pruning,
        CareTaskType::Spraying,
        CareTaskType::Rotating,
        CareTaskType::Fertilizing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CareTaskType::Watering => "watering",
            CareTaskType::Pruning => "pruning",
            CareTaskType::Spraying => "spraying",
            CareTaskType::Rotating => "rotating",
            CareTaskType::Fertilizing => "fertilizing",
        }
    }
}

impl fmt::Display for CareTaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CareTaskType {
    type Err = UnknownCareType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CareTaskType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownCareType(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntervalUnit {
    Day,
    Week,
    Month,
}

impl IntervalUnit {
    // Day lengths used by the backend when it computes next dates
    pub fn days(self) -> i64 {
        match self {
            IntervalUnit::Day => 1,
            IntervalUnit::Week => 7,
            IntervalUnit::Month => 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CareInterval {
    pub value: u32,
    pub unit: IntervalUnit,
}

impl CareInterval {
    pub fn new(value: u32, unit: IntervalUnit) -> Self {
        Self { value, unit }
    }

    pub fn total_days(&self) -> i64 {
        i64::from(self.value) * self.unit.days()
    }
}

// How the watering interval is chosen: the species' recommended period
// or the user's own `watering_time` + `watering_unit`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WateringType {
    Recommended,
    Manual,
}

// One tracked plant's care record, as the backend serves it.
//
// The interval fields keep the backend's flat naming (`pruning_time` +
// `pruning_time_unit`, ...). Fields this crate does not model are kept in
// `extra` so a PUT sends the record back whole.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlantCareState {
    pub id: PlantId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default)]
    pub last_watered_date: Option<NaiveDate>,
    #[serde(default)]
    pub last_pruning_date: Option<NaiveDate>,
    #[serde(default)]
    pub last_spraying_date: Option<NaiveDate>,
    #[serde(default)]
    pub last_rotating_date: Option<NaiveDate>,
    #[serde(default)]
    pub last_fertilized_date: Option<NaiveDate>,

    #[serde(default, rename = "isWateringReminder", skip_serializing_if = "Option::is_none")]
    pub watering_reminder: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watering_type: Option<WateringType>,
    // {"value": "7-10", "unit": "days"}, possibly sent as a JSON string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watering_period: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watering_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watering_unit: Option<IntervalUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pruning_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pruning_time_unit: Option<IntervalUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sprayed_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sprayed_unit: Option<IntervalUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_unit: Option<IntervalUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fertilizing_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fertilizing_unit: Option<IntervalUnit>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PlantCareState {
    pub fn new(id: PlantId) -> Self {
        Self {
            id,
            custom_name: None,
            common_name: None,
            image: None,
            custom_image: None,
            created_at: None,
            last_watered_date: None,
            last_pruning_date: None,
            last_spraying_date: None,
            last_rotating_date: None,
            last_fertilized_date: None,
            watering_reminder: None,
            watering_type: None,
            watering_period: None,
            watering_time: None,
            watering_unit: None,
            pruning_time: None,
            pruning_time_unit: None,
            sprayed_time: None,
            sprayed_unit: None,
            rotation_time: None,
            rotation_unit: None,
            fertilizing_time: None,
            fertilizing_unit: None,
            extra: Map::new(),
        }
    }

    pub fn last_done(&self, kind: CareTaskType) -> Option<NaiveDate> {
        match kind {
            CareTaskType::Watering => self.last_watered_date,
            CareTaskType::Pruning => self.last_pruning_date,
            CareTaskType::Spraying => self.last_spraying_date,
            CareTaskType::Rotating => self.last_rotating_date,
            CareTaskType::Fertilizing => self.last_fertilized_date,
        }
    }

    pub fn last_done_mut(&mut self, kind: CareTaskType) -> &mut Option<NaiveDate> {
        match kind {
            CareTaskType::Watering => &mut self.last_watered_date,
            CareTaskType::Pruning => &mut self.last_pruning_date,
            CareTaskType::Spraying => &mut self.last_spraying_date,
            CareTaskType::Rotating => &mut self.last_rotating_date,
            CareTaskType::Fertilizing => &mut self.last_fertilized_date,
        }
    }

    // An interval needs both halves; the backend ignores a value without a unit.
    pub fn interval(&self, kind: CareTaskType) -> Option<CareInterval> {
        let (value, unit) = match kind {
            CareTaskType::Watering => (self.watering_time, self.watering_unit),
            CareTaskType::Pruning => (self.pruning_time, self.pruning_time_unit),
            CareTaskType::Spraying => (self.sprayed_time, self.sprayed_unit),
            CareTaskType::Rotating => (self.rotation_time, self.rotation_unit),
            CareTaskType::Fertilizing => (self.fertilizing_time, self.fertilizing_unit),
        };
        match (value, unit) {
            (Some(v), Some(u)) if v > 0 => Some(CareInterval::new(v, u)),
            _ => None,
        }
    }

    pub fn set_interval(&mut self, kind: CareTaskType, interval: CareInterval) {
        let (value, unit) = match kind {
            CareTaskType::Watering => (&mut self.watering_time, &mut self.watering_unit),
            CareTaskType::Pruning => (&mut self.pruning_time, &mut self.pruning_time_unit),
            CareTaskType::Spraying => (&mut self.sprayed_time, &mut self.sprayed_unit),
            CareTaskType::Rotating => (&mut self.rotation_time, &mut self.rotation_unit),
            CareTaskType::Fertilizing => (&mut self.fertilizing_time, &mut self.fertilizing_unit),
        };
        *value = Some(interval.value);
        *unit = Some(interval.unit);
    }

    // Date part of `created_at`, which the backend sends as a timestamp.
    pub fn created_on(&self) -> Option<NaiveDate> {
        let raw = self.created_at.as_deref()?;
        let day = raw.get(..10)?;
        NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CareTask {
    #[serde(rename = "type")]
    pub kind: CareTaskType,
    #[serde(rename = "user_plant")]
    pub plant: PlantCareState,
    #[serde(default)]
    pub next_date: Option<NaiveDate>,
}

impl CareTask {
    pub fn plant_id(&self) -> PlantId {
        self.plant.id
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskBucket {
    Previous,
    Today,
    Next,
}

impl TaskBucket {
    pub const ALL: [TaskBucket; 3] = [TaskBucket::Previous, TaskBucket::Today, TaskBucket::Next];

    // Upcoming tasks are shown but cannot be marked done yet.
    pub fn allows_completion(self) -> bool {
        !matches!(self, TaskBucket::Next)
    }
}

// Payload of the task source (`GET /api/user-tasks/`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskBuckets {
    #[serde(default)]
    pub previous_tasks: Vec<CareTask>,
    #[serde(default)]
    pub today_tasks: Vec<CareTask>,
    #[serde(default)]
    pub next_tasks: Vec<CareTask>,
}

impl TaskBuckets {
    pub fn bucket(&self, bucket: TaskBucket) -> &[CareTask] {
        match bucket {
            TaskBucket::Previous => &self.previous_tasks,
            TaskBucket::Today => &self.today_tasks,
            TaskBucket::Next => &self.next_tasks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_backend_task_payload() {
        let raw = r#"{
            "today_tasks": [{
                "type": "watering",
                "next_date": "2026-01-18",
                "user_plant": {
                    "id": 7,
                    "custom_name": "My Plant",
                    "last_watered_date": "2026-01-17",
                    "last_pruning_date": null,
                    "pruning_time": 2,
                    "pruning_time_unit": "week",
                    "isWateringReminder": true,
                    "watering_type": "recommended",
                    "watering_period": {"value": "7-10", "unit": "days"},
                    "garden_name": "Balcony"
                }
            }]
        }"#;

        let buckets: TaskBuckets = serde_json::from_str(raw).unwrap();
        assert!(buckets.previous_tasks.is_empty());
        assert!(buckets.next_tasks.is_empty());

        let task = &buckets.today_tasks[0];
        assert_eq!(task.kind, CareTaskType::Watering);
        assert_eq!(task.next_date, NaiveDate::from_ymd_opt(2026, 1, 18));
        assert_eq!(task.plant.last_watered_date, NaiveDate::from_ymd_opt(2026, 1, 17));
        assert_eq!(
            task.plant.interval(CareTaskType::Pruning),
            Some(CareInterval::new(2, IntervalUnit::Week))
        );
        assert_eq!(task.plant.watering_reminder, Some(true));
        assert_eq!(task.plant.watering_type, Some(WateringType::Recommended));
        assert!(task.plant.watering_period.is_some());
        assert!(!task.plant.extra.contains_key("isWateringReminder"));
        assert_eq!(task.plant.extra.get("garden_name"), Some(&Value::from("Balcony")));
    }

    #[test]
    fn unknown_care_type_fails_to_decode() {
        let raw = r#"{"type": "repotting", "user_plant": {"id": 1}}"#;
        assert!(serde_json::from_str::<CareTask>(raw).is_err());
    }

    #[test]
    fn care_type_parses_case_insensitively() {
        assert_eq!("Watering".parse::<CareTaskType>(), Ok(CareTaskType::Watering));
        assert_eq!(
            "misting".parse::<CareTaskType>(),
            Err(UnknownCareType("misting".to_string()))
        );
    }

    #[test]
    fn interval_requires_value_and_unit() {
        let mut plant = PlantCareState::new(1);
        plant.rotation_time = Some(3);
        assert_eq!(plant.interval(CareTaskType::Rotating), None);
        plant.rotation_unit = Some(IntervalUnit::Month);
        assert_eq!(plant.interval(CareTaskType::Rotating).map(|i| i.total_days()), Some(90));
    }
}
