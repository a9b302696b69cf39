/*
Grouping, due-day and completion logic for care tasks.
Module is kept free of HTTP and credentials so it can be tested directly
*/

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use serde_json::Value;

use crate::models::{CareTask, CareTaskType, IntervalUnit, PlantCareState, PlantId, TaskBucket, WateringType};

// All tasks of one plant inside a bucket, in the order the source sent them
#[derive(Debug, Clone, PartialEq)]
pub struct PlantTasks {
    pub plant_id: PlantId,
    pub plant: PlantCareState, // record carried by the first task seen
    pub tasks: Vec<CareTask>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueStatus {
    DueToday,
    Upcoming,
    Overdue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelativeDay {
    pub offset: i64, // next_date - today, in whole days
    pub status: DueStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyBucketMessage {
    pub title: &'static str,
    pub body: &'static str,
}

// What a bucket renders as: the "all done" card, or per-plant groups
#[derive(Debug, Clone, PartialEq)]
pub enum BucketView {
    AllComplete(EmptyBucketMessage),
    Groups(Vec<PlantTasks>),
}

// Current calendar day in the local timezone.
pub fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Group tasks by owning plant.
///
/// Rules:
/// - Plants appear in the order of their first task
/// - Tasks keep their relative order inside a plant
/// - Nothing is dropped or deduplicated
pub fn group_by_plant(tasks: &[CareTask]) -> Vec<PlantTasks> {
    let mut index: HashMap<PlantId, usize> = HashMap::new();
    let mut groups: Vec<PlantTasks> = Vec::new();

    for task in tasks {
        let plant_id = task.plant_id();
        let slot = *index.entry(plant_id).or_insert_with(|| {
            groups.push(PlantTasks {
                plant_id,
                plant: task.plant.clone(),
                tasks: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].tasks.push(task.clone());
    }

    groups
}

// offset == 0 -> due today, > 0 -> upcoming, < 0 -> overdue
pub fn relative_day(next_date: NaiveDate, today: NaiveDate) -> RelativeDay {
    let offset = (next_date - today).num_days();
    let status = match offset {
        0 => DueStatus::DueToday,
        o if o > 0 => DueStatus::Upcoming,
        _ => DueStatus::Overdue,
    };
    RelativeDay { offset, status }
}

pub fn relative_day_for(task: &CareTask, today: NaiveDate) -> Option<RelativeDay> {
    task.next_date.map(|d| relative_day(d, today))
}

// "En 3 días" / "Hace 1 día" / "" for today
pub fn relative_day_text(day: RelativeDay) -> String {
    let n = day.offset.abs();
    let plural = if n > 1 { "s" } else { "" };
    match day.status {
        DueStatus::DueToday => String::new(),
        DueStatus::Upcoming => format!("En {n} día{plural}"),
        DueStatus::Overdue => format!("Hace {n} día{plural}"),
    }
}

/// Copy of the plant with the task's last-done date set to `today`.
///
/// Exactly one of the five date fields changes.
pub fn mark_care_done(plant: &PlantCareState, kind: CareTaskType, today: NaiveDate) -> PlantCareState {
    let mut updated = plant.clone();
    *updated.last_done_mut(kind) = Some(today);
    updated
}

// Working list after a confirmed completion: drops every task of the same
// plant and care type, keeps everything else in order.
pub fn remove_completed(tasks: &[CareTask], plant_id: PlantId, kind: CareTaskType) -> Vec<CareTask> {
    tasks
        .iter()
        .filter(|t| !(t.plant_id() == plant_id && t.kind == kind))
        .cloned()
        .collect()
}

pub fn empty_bucket_message(bucket: TaskBucket) -> EmptyBucketMessage {
    match bucket {
        TaskBucket::Today => EmptyBucketMessage {
            title: "Tareas de hoy",
            body: "Todo completado. Las tareas nuevas se muestran aquí",
        },
        TaskBucket::Next => EmptyBucketMessage {
            title: "Tareas próximas",
            body: "Todo completado. Las próximas tareas se muestran aquí",
        },
        TaskBucket::Previous => EmptyBucketMessage {
            title: "Tareas pasadas",
            body: "Todo completado. Las tareas pasadas se muestran aquí",
        },
    }
}

pub fn bucket_view(bucket: TaskBucket, tasks: &[CareTask]) -> BucketView {
    if tasks.is_empty() {
        BucketView::AllComplete(empty_bucket_message(bucket))
    } else {
        BucketView::Groups(group_by_plant(tasks))
    }
}

/// Local projection of the next due date for one care type, following the
/// backend's rules per type.
///
/// Pruning, spraying, rotating:
/// - last date + interval  -> last + interval days
/// - interval only         -> creation day of the plant (or today): due now
/// - no interval           -> no schedule
///
/// Watering: see `next_watering_date`. Fertilizing: never scheduled.
///
/// The task source stays authoritative; this is only a preview.
pub fn next_due_date(plant: &PlantCareState, kind: CareTaskType, today: NaiveDate) -> Option<NaiveDate> {
    match kind {
        CareTaskType::Watering => next_watering_date(plant, today),
        CareTaskType::Fertilizing => None,
        CareTaskType::Pruning | CareTaskType::Spraying | CareTaskType::Rotating => {
            let interval = plant.interval(kind)?;
            match plant.last_done(kind) {
                Some(last) => add_days(last, interval.total_days()),
                None => Some(plant.created_on().unwrap_or(today)),
            }
        }
    }
}

// Watering rules:
// - reminder off (or unset)                      -> no schedule
// - last date + recommended period               -> last + period days (unreadable period: none)
// - last date + manual watering_time             -> last + time * unit (unit defaults to days)
// - anything else                                -> creation day (or today)
fn next_watering_date(plant: &PlantCareState, today: NaiveDate) -> Option<NaiveDate> {
    if plant.watering_reminder != Some(true) {
        return None;
    }
    if let Some(last) = plant.last_watered_date {
        match plant.watering_type {
            Some(WateringType::Recommended) => {
                if let Some(period) = plant.watering_period.as_ref().filter(|p| is_filled(p)) {
                    return add_days(last, recommended_period_days(period)?);
                }
            }
            Some(WateringType::Manual) => {
                if let Some(value) = plant.watering_time.filter(|v| *v > 0) {
                    let unit_days = plant.watering_unit.map_or(1, IntervalUnit::days);
                    return add_days(last, i64::from(value) * unit_days);
                }
            }
            None => {}
        }
    }
    Some(plant.created_on().unwrap_or(today))
}

// Days in a species watering period. A range value ("7-10") uses its
// midpoint; fractional days are dropped.
fn recommended_period_days(period: &Value) -> Option<i64> {
    let parsed;
    let period = match period {
        Value::String(raw) => {
            parsed = serde_json::from_str::<Value>(raw).ok()?;
            &parsed
        }
        other => other,
    };

    let unit_days = match period.get("unit")?.as_str() {
        Some("weeks") => 7.0,
        Some("months") => 30.0,
        _ => 1.0,
    };
    let value = match period.get("value")? {
        Value::String(v) if v.contains('-') => {
            let (low, high) = v.split_once('-')?;
            let low: i64 = low.trim().parse().ok()?;
            let high: i64 = high.trim().parse().ok()?;
            (low + high) as f64 / 2.0
        }
        Value::String(v) => v.trim().parse::<i64>().ok()? as f64,
        Value::Number(n) => n.as_f64()?.trunc(),
        _ => return None,
    };

    Some((value * unit_days).floor() as i64)
}

fn is_filled(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        _ => true,
    }
}

fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    date.checked_add_signed(Duration::days(days))
}

pub fn display_name(plant: &PlantCareState) -> String {
    let name = plant
        .custom_name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .or(plant.common_name.as_deref())
        .unwrap_or("");
    capitalize(name)
}

pub fn care_type_label(kind: CareTaskType) -> String {
    capitalize(kind.as_str())
}

pub fn task_count_label(count: usize) -> String {
    if count == 1 {
        "1 tarea".to_string()
    } else {
        format!("{count} tareas")
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
