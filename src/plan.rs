// Weekly workout plan model and the set editor
use crate::backend::{BackendError, DataAccess, Query};
use crate::volume::{VolumeTrend, classify};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Table receiving one row per logged set when a week is saved.
pub const SET_LOG_TABLE: &str = "workout_set_logs";

/// Days of the training week in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

pub const ALL_WEEKDAYS: [Weekday; 7] = [
    Weekday::Monday,
    Weekday::Tuesday,
    Weekday::Wednesday,
    Weekday::Thursday,
    Weekday::Friday,
    Weekday::Saturday,
    Weekday::Sunday,
];

impl Weekday {
    pub fn label(self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }

    pub fn short_label(self) -> &'static str {
        &self.label()[..3]
    }

    /// Column value used by the backend's `day_of_week` enum.
    pub fn key(self) -> &'static str {
        match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
            Weekday::Sunday => "sunday",
        }
    }
}

/// Rejected edits and malformed plan input.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanError {
    DayOutOfRange(usize),
    ExerciseOutOfRange { day: usize, exercise: usize },
    SetOutOfRange { day: usize, exercise: usize, set: usize },
    OffDay(Weekday),
    InvalidWeight(f64),
    EmptyExerciseName,
    NoSets(String),
    InvalidWeek(u32),
    DayOrder { index: usize, found: Weekday },
}

impl std::fmt::Display for PlanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanError::DayOutOfRange(d) => write!(f, "day index {d} is outside the week"),
            PlanError::ExerciseOutOfRange { day, exercise } => {
                write!(f, "exercise {exercise} does not exist on day {day}")
            }
            PlanError::SetOutOfRange { day, exercise, set } => {
                write!(f, "set {set} does not exist for exercise {exercise} on day {day}")
            }
            PlanError::OffDay(day) => write!(f, "{} is an off-day", day.label()),
            PlanError::InvalidWeight(w) => write!(f, "invalid weight: {w}"),
            PlanError::EmptyExerciseName => write!(f, "exercise name must not be empty"),
            PlanError::NoSets(name) => write!(f, "exercise {name} has no sets"),
            PlanError::InvalidWeek(w) => write!(f, "week number must start at 1, got {w}"),
            PlanError::DayOrder { index, found } => write!(
                f,
                "day {index} should be {} but is {}",
                ALL_WEEKDAYS[*index % 7].label(),
                found.label()
            ),
        }
    }
}

impl std::error::Error for PlanError {}

/// One planned-vs-actual set.
///
/// `volume` is derived from `actual_reps * weight_kg` and is refreshed by
/// every mutator; deserialized values ignore any stored volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredSet")]
pub struct SetRecord {
    planned_reps: u32,
    actual_reps: u32,
    weight_kg: f64,
    volume: f64,
    previous_week_volume: Option<f64>,
}

#[derive(Deserialize)]
struct StoredSet {
    planned_reps: u32,
    actual_reps: u32,
    weight_kg: f64,
    #[serde(default)]
    previous_week_volume: Option<f64>,
}

impl From<StoredSet> for SetRecord {
    fn from(s: StoredSet) -> Self {
        SetRecord::new(
            s.planned_reps,
            s.actual_reps,
            s.weight_kg.max(0.0),
            s.previous_week_volume,
        )
    }
}

impl SetRecord {
    pub fn new(
        planned_reps: u32,
        actual_reps: u32,
        weight_kg: f64,
        previous_week_volume: Option<f64>,
    ) -> Self {
        let mut set = Self {
            planned_reps,
            actual_reps,
            weight_kg,
            volume: 0.0,
            previous_week_volume,
        };
        set.recompute();
        set
    }

    /// A fresh set where the client has not logged anything yet.
    #[cfg(test)]
    pub fn planned(planned_reps: u32, weight_kg: f64) -> Self {
        Self::new(planned_reps, 0, weight_kg, None)
    }

    fn recompute(&mut self) {
        self.volume = self.actual_reps as f64 * self.weight_kg;
    }

    pub fn planned_reps(&self) -> u32 {
        self.planned_reps
    }

    pub fn actual_reps(&self) -> u32 {
        self.actual_reps
    }

    pub fn weight_kg(&self) -> f64 {
        self.weight_kg
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn previous_week_volume(&self) -> Option<f64> {
        self.previous_week_volume
    }

    pub fn trend(&self) -> VolumeTrend {
        classify(self.volume, self.previous_week_volume)
    }

    pub fn set_actual_reps(&mut self, reps: u32) {
        self.actual_reps = reps;
        self.recompute();
    }

    pub fn set_weight_kg(&mut self, weight: f64) -> Result<(), PlanError> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(PlanError::InvalidWeight(weight));
        }
        self.weight_kg = weight;
        self.recompute();
        Ok(())
    }
}

/// A named exercise with at least one set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredExercise")]
pub struct ExerciseRecord {
    name: String,
    sets: Vec<SetRecord>,
}

#[derive(Deserialize)]
struct StoredExercise {
    name: String,
    sets: Vec<SetRecord>,
}

impl TryFrom<StoredExercise> for ExerciseRecord {
    type Error = PlanError;

    fn try_from(e: StoredExercise) -> Result<Self, Self::Error> {
        ExerciseRecord::new(e.name, e.sets)
    }
}

impl ExerciseRecord {
    pub fn new(name: impl Into<String>, sets: Vec<SetRecord>) -> Result<Self, PlanError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PlanError::EmptyExerciseName);
        }
        if sets.is_empty() {
            return Err(PlanError::NoSets(name));
        }
        Ok(Self { name, sets })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sets(&self) -> &[SetRecord] {
        &self.sets
    }

    pub fn total_volume(&self) -> f64 {
        self.sets.iter().map(SetRecord::volume).sum()
    }

    /// Sum of the previous week's volumes, `None` when no set has one.
    pub fn previous_total_volume(&self) -> Option<f64> {
        let prev: Vec<f64> = self
            .sets
            .iter()
            .filter_map(SetRecord::previous_week_volume)
            .collect();
        if prev.is_empty() {
            None
        } else {
            Some(prev.iter().sum())
        }
    }
}

/// A single day of the week, either rest or a list of exercises.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    pub day: Weekday,
    pub is_off_day: bool,
    pub exercises: Vec<ExerciseRecord>,
}

impl DayPlan {
    pub fn off(day: Weekday) -> Self {
        Self {
            day,
            is_off_day: true,
            exercises: Vec::new(),
        }
    }

    pub fn training(day: Weekday, exercises: Vec<ExerciseRecord>) -> Self {
        Self {
            day,
            is_off_day: false,
            exercises,
        }
    }

    /// Exercises that count for tracking; empty on an off-day.
    pub fn active_exercises(&self) -> &[ExerciseRecord] {
        if self.is_off_day {
            &[]
        } else {
            &self.exercises
        }
    }

    pub fn total_volume(&self) -> f64 {
        self.active_exercises()
            .iter()
            .map(ExerciseRecord::total_volume)
            .sum()
    }

    pub fn previous_total_volume(&self) -> Option<f64> {
        let prev: Vec<f64> = self
            .active_exercises()
            .iter()
            .filter_map(ExerciseRecord::previous_total_volume)
            .collect();
        if prev.is_empty() {
            None
        } else {
            Some(prev.iter().sum())
        }
    }

    pub fn set_count(&self) -> usize {
        self.active_exercises().iter().map(|e| e.sets.len()).sum()
    }
}

/// Seven days of training for one week of a program.
///
/// Deserializing checks that the week starts at 1 and that the days run
/// Monday to Sunday.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredWeek")]
pub struct WeeklyPlan {
    pub week_number: u32,
    pub program_name: String,
    pub days: [DayPlan; 7],
}

#[derive(Deserialize)]
struct StoredWeek {
    week_number: u32,
    program_name: String,
    days: [DayPlan; 7],
}

impl TryFrom<StoredWeek> for WeeklyPlan {
    type Error = PlanError;

    fn try_from(w: StoredWeek) -> Result<Self, Self::Error> {
        if w.week_number < 1 {
            return Err(PlanError::InvalidWeek(w.week_number));
        }
        for (index, (day, expected)) in w.days.iter().zip(ALL_WEEKDAYS).enumerate() {
            if day.day != expected {
                return Err(PlanError::DayOrder {
                    index,
                    found: day.day,
                });
            }
        }
        Ok(Self {
            week_number: w.week_number,
            program_name: w.program_name,
            days: w.days,
        })
    }
}

impl WeeklyPlan {
    /// An all-rest week; days are filled in with [`WeeklyPlan::set_day`].
    pub fn new(week_number: u32, program_name: impl Into<String>) -> Self {
        Self {
            week_number: week_number.max(1),
            program_name: program_name.into(),
            days: ALL_WEEKDAYS.map(DayPlan::off),
        }
    }

    /// Replace the plan for `day`, keeping the fixed weekday order.
    pub fn set_day(&mut self, day: Weekday, exercises: Vec<ExerciseRecord>) {
        let idx = ALL_WEEKDAYS.iter().position(|d| *d == day).unwrap_or(0);
        self.days[idx] = DayPlan::training(day, exercises);
    }

    pub fn day(&self, day: Weekday) -> &DayPlan {
        let idx = ALL_WEEKDAYS.iter().position(|d| *d == day).unwrap_or(0);
        &self.days[idx]
    }

    pub fn total_volume(&self) -> f64 {
        self.days.iter().map(DayPlan::total_volume).sum()
    }

    pub fn training_days(&self) -> usize {
        self.days.iter().filter(|d| !d.is_off_day).count()
    }

    pub fn volume_trend(&self) -> VolumeTrend {
        let prev: Vec<f64> = self
            .days
            .iter()
            .filter_map(DayPlan::previous_total_volume)
            .collect();
        let prev = if prev.is_empty() {
            None
        } else {
            Some(prev.iter().sum())
        };
        classify(self.total_volume(), prev)
    }

    /// Demo week shown when no backend is configured.
    pub fn sample() -> Self {
        let mut plan = WeeklyPlan::new(1, "Fat Loss Program");
        let exercise = |name: &str, sets: Vec<SetRecord>| ExerciseRecord {
            name: name.to_string(),
            sets,
        };
        plan.set_day(
            Weekday::Monday,
            vec![
                exercise(
                    "Bench Press",
                    vec![
                        SetRecord::new(8, 8, 60.0, Some(450.0)),
                        SetRecord::new(8, 7, 60.0, Some(480.0)),
                        SetRecord::new(8, 8, 60.0, Some(480.0)),
                    ],
                ),
                exercise(
                    "Incline Dumbbell Press",
                    vec![
                        SetRecord::new(10, 10, 25.0, Some(275.0)),
                        SetRecord::new(10, 9, 25.0, Some(250.0)),
                    ],
                ),
            ],
        );
        plan.set_day(
            Weekday::Wednesday,
            vec![exercise(
                "Squat",
                vec![
                    SetRecord::new(12, 12, 80.0, Some(900.0)),
                    SetRecord::new(12, 10, 80.0, Some(960.0)),
                ],
            )],
        );
        plan
    }
}

/// Which field of a set the client is editing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SetEdit {
    ActualReps(u32),
    WeightKg(f64),
}

/// Session-scoped owner of the week being logged.
///
/// Edits only touch memory; [`WeeklyPlanEditor::save`] is the single point
/// where the week is written to the backend.
#[derive(Debug, Clone)]
pub struct WeeklyPlanEditor {
    plan: WeeklyPlan,
    dirty: bool,
}

impl WeeklyPlanEditor {
    pub fn new(plan: WeeklyPlan) -> Self {
        Self { plan, dirty: false }
    }

    pub fn plan(&self) -> &WeeklyPlan {
        &self.plan
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn replace(&mut self, plan: WeeklyPlan) {
        self.plan = plan;
        self.dirty = false;
    }

    pub fn update_set(
        &mut self,
        day_index: usize,
        exercise_index: usize,
        set_index: usize,
        edit: SetEdit,
    ) -> Result<(), PlanError> {
        let result = self.apply(day_index, exercise_index, set_index, edit);
        match &result {
            Ok(()) => self.dirty = true,
            Err(e) => log::warn!("Rejected set edit {edit:?}: {e}"),
        }
        result
    }

    fn apply(
        &mut self,
        day_index: usize,
        exercise_index: usize,
        set_index: usize,
        edit: SetEdit,
    ) -> Result<(), PlanError> {
        let day = self
            .plan
            .days
            .get_mut(day_index)
            .ok_or(PlanError::DayOutOfRange(day_index))?;
        if day.is_off_day {
            return Err(PlanError::OffDay(day.day));
        }
        let exercise = day
            .exercises
            .get_mut(exercise_index)
            .ok_or(PlanError::ExerciseOutOfRange {
                day: day_index,
                exercise: exercise_index,
            })?;
        let set = exercise
            .sets
            .get_mut(set_index)
            .ok_or(PlanError::SetOutOfRange {
                day: day_index,
                exercise: exercise_index,
                set: set_index,
            })?;
        match edit {
            SetEdit::ActualReps(reps) => set.set_actual_reps(reps),
            SetEdit::WeightKg(weight) => set.set_weight_kg(weight)?,
        }
        Ok(())
    }

    /// Rows written by [`WeeklyPlanEditor::save`], one per tracked set.
    ///
    /// `exercise_index` and `set_index` give each row its position, so a day
    /// may list the same exercise more than once.
    pub fn set_log_rows(&self, client_id: &str) -> Vec<serde_json::Value> {
        let mut rows = Vec::new();
        for day in &self.plan.days {
            for (ex_idx, exercise) in day.active_exercises().iter().enumerate() {
                for (i, set) in exercise.sets().iter().enumerate() {
                    rows.push(json!({
                        "client_id": client_id,
                        "week_number": self.plan.week_number,
                        "program_name": self.plan.program_name,
                        "day_of_week": day.day.key(),
                        "exercise_index": ex_idx,
                        "exercise_name": exercise.name(),
                        "set_index": i,
                        "planned_reps": set.planned_reps(),
                        "actual_reps": set.actual_reps(),
                        "weight_kg": set.weight_kg(),
                        "volume": set.volume(),
                        "previous_week_volume": set.previous_week_volume(),
                    }));
                }
            }
        }
        rows
    }

    /// Store every tracked set of the week and clear the dirty flag.
    ///
    /// Rows are upserted on their position first and rows left over from an
    /// earlier save are removed afterwards, so a failed write never leaves
    /// the stored week emptier than before.
    pub fn save(&mut self, store: &dyn DataAccess, client_id: &str) -> Result<usize, BackendError> {
        let token = next_save_token();
        let mut rows = self.set_log_rows(client_id);
        for row in &mut rows {
            if let serde_json::Value::Object(map) = row {
                map.insert("save_token".into(), token.clone().into());
            }
        }
        let count = rows.len();
        if count > 0 {
            store.upsert(SET_LOG_TABLE, &serde_json::Value::Array(rows), &SET_LOG_KEY)?;
        }
        store.delete(
            SET_LOG_TABLE,
            &Query::new()
                .eq("client_id", client_id)
                .eq("week_number", self.plan.week_number)
                .neq("save_token", &token),
        )?;
        log::info!(
            "Saved week {} ({} sets) for client {client_id}",
            self.plan.week_number,
            count
        );
        self.dirty = false;
        Ok(count)
    }
}

/// Columns identifying one logged set.
const SET_LOG_KEY: [&str; 5] = [
    "client_id",
    "week_number",
    "day_of_week",
    "exercise_index",
    "set_index",
];

fn next_save_token() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    format!(
        "{}-{}",
        chrono::Utc::now().timestamp_micros(),
        COUNTER.fetch_add(1, Ordering::Relaxed)
    )
}

fn row_u32(row: &serde_json::Value, key: &str) -> Option<u32> {
    row.get(key)
        .and_then(serde_json::Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
}

fn row_str<'a>(row: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    row.get(key).and_then(serde_json::Value::as_str)
}

fn row_index(row: &serde_json::Value, key: &str) -> Option<u64> {
    row.get(key).and_then(serde_json::Value::as_u64)
}

/// Rebuild a saved week for `client_id` from its set log rows.
///
/// Exercises keep their saved position. Previous-week volumes come from the
/// rows themselves, falling back to the volume logged at the same position
/// for the same exercise in the week before. Returns `None` when nothing was
/// saved for that week.
pub fn load_week(
    store: &dyn DataAccess,
    client_id: &str,
    week_number: u32,
) -> Result<Option<WeeklyPlan>, BackendError> {
    let week_query = |week: u32| {
        Query::new()
            .eq("client_id", client_id)
            .eq("week_number", week)
            .order("exercise_index", true)
            .order("set_index", true)
    };
    let rows = store.fetch(SET_LOG_TABLE, &week_query(week_number))?;
    if rows.is_empty() {
        return Ok(None);
    }
    let mut previous: HashMap<(String, u64, u64), (String, f64)> = HashMap::new();
    if week_number > 1 {
        for r in store.fetch(SET_LOG_TABLE, &week_query(week_number - 1))? {
            let (Some(day), Some(name), Some(set), Some(volume)) = (
                row_str(&r, "day_of_week"),
                row_str(&r, "exercise_name"),
                row_index(&r, "set_index"),
                r.get("volume").and_then(serde_json::Value::as_f64),
            ) else {
                continue;
            };
            let ex = row_index(&r, "exercise_index").unwrap_or(0);
            previous.insert((day.to_string(), ex, set), (name.to_string(), volume));
        }
    }

    let program_name = row_str(&rows[0], "program_name")
        .unwrap_or_default()
        .to_string();
    let mut plan = WeeklyPlan::new(week_number, program_name);
    for (idx, day) in ALL_WEEKDAYS.iter().enumerate() {
        let mut day_rows: Vec<&serde_json::Value> = rows
            .iter()
            .filter(|r| row_str(r, "day_of_week") == Some(day.key()))
            .collect();
        // Backends may return ties in any order.
        day_rows.sort_by_key(|r| {
            (
                row_index(r, "exercise_index").unwrap_or(u64::MAX),
                row_index(r, "set_index").unwrap_or(0),
            )
        });

        let mut exercises: Vec<(Option<u64>, ExerciseRecord)> = Vec::new();
        for row in day_rows {
            let Some(name) = row_str(row, "exercise_name") else {
                continue;
            };
            let ex_index = row_index(row, "exercise_index");
            let set_index = row_index(row, "set_index").unwrap_or(0);
            let previous_week_volume = row
                .get("previous_week_volume")
                .and_then(serde_json::Value::as_f64)
                .or_else(|| {
                    previous
                        .get(&(day.key().to_string(), ex_index.unwrap_or(0), set_index))
                        .filter(|(prev_name, _)| prev_name == name)
                        .map(|(_, volume)| *volume)
                });
            let set = SetRecord::new(
                row_u32(row, "planned_reps").unwrap_or(0),
                row_u32(row, "actual_reps").unwrap_or(0),
                row.get("weight_kg")
                    .and_then(serde_json::Value::as_f64)
                    .unwrap_or(0.0)
                    .max(0.0),
                previous_week_volume,
            );
            // Rows without a position fall back to grouping by name.
            let slot = exercises
                .iter_mut()
                .find(|(i, e)| *i == ex_index && e.name == name);
            match slot {
                Some((_, e)) => e.sets.push(set),
                None => exercises.push((
                    ex_index,
                    ExerciseRecord {
                        name: name.to_string(),
                        sets: vec![set],
                    },
                )),
            }
        }
        if !exercises.is_empty() {
            let exercises = exercises.into_iter().map(|(_, e)| e).collect();
            plan.days[idx] = DayPlan::training(*day, exercises);
        }
    }
    log::info!(
        "Loaded week {week_number} for {client_id}: {} training days",
        plan.training_days()
    );
    Ok(Some(plan))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryStore;
    use serde_json::Value;

    /// Ignores the requested sort and returns rows back to front.
    #[derive(Default)]
    struct ReversingStore(MemoryStore);

    impl DataAccess for ReversingStore {
        fn fetch(&self, table: &str, query: &Query) -> Result<Vec<Value>, BackendError> {
            let mut rows = self.0.fetch(table, query)?;
            rows.reverse();
            Ok(rows)
        }
        fn insert(&self, table: &str, rows: &Value) -> Result<Vec<Value>, BackendError> {
            self.0.insert(table, rows)
        }
        fn upsert(
            &self,
            table: &str,
            rows: &Value,
            on_conflict: &[&str],
        ) -> Result<Vec<Value>, BackendError> {
            self.0.upsert(table, rows, on_conflict)
        }
        fn update(&self, table: &str, filter: &Query, patch: &Value) -> Result<(), BackendError> {
            self.0.update(table, filter, patch)
        }
        fn delete(&self, table: &str, filter: &Query) -> Result<(), BackendError> {
            self.0.delete(table, filter)
        }
    }

    /// Accepts reads and deletes but fails every write.
    struct FailingWrites<'a>(&'a MemoryStore);

    impl DataAccess for FailingWrites<'_> {
        fn fetch(&self, table: &str, query: &Query) -> Result<Vec<Value>, BackendError> {
            self.0.fetch(table, query)
        }
        fn insert(&self, _: &str, _: &Value) -> Result<Vec<Value>, BackendError> {
            Err(BackendError::Status(503, "unavailable".into()))
        }
        fn upsert(&self, _: &str, _: &Value, _: &[&str]) -> Result<Vec<Value>, BackendError> {
            Err(BackendError::Status(503, "unavailable".into()))
        }
        fn update(&self, _: &str, _: &Query, _: &Value) -> Result<(), BackendError> {
            Err(BackendError::Status(503, "unavailable".into()))
        }
        fn delete(&self, table: &str, filter: &Query) -> Result<(), BackendError> {
            self.0.delete(table, filter)
        }
    }

    fn squat_week() -> WeeklyPlan {
        let mut plan = WeeklyPlan::new(1, "Strength");
        plan.set_day(
            Weekday::Monday,
            vec![
                ExerciseRecord::new(
                    "Squat",
                    vec![
                        SetRecord::new(12, 12, 80.0, Some(900.0)),
                        SetRecord::new(12, 10, 80.0, Some(960.0)),
                    ],
                )
                .unwrap(),
            ],
        );
        plan
    }

    #[test]
    fn volume_follows_reps_and_weight() {
        let mut editor = WeeklyPlanEditor::new(squat_week());
        editor.update_set(0, 0, 0, SetEdit::ActualReps(8)).unwrap();
        editor.update_set(0, 0, 0, SetEdit::WeightKg(60.0)).unwrap();
        let set = &editor.plan().days[0].exercises[0].sets()[0];
        assert_eq!(set.volume(), 480.0);
        assert!(editor.is_dirty());

        editor.update_set(0, 0, 0, SetEdit::WeightKg(62.5)).unwrap();
        let set = &editor.plan().days[0].exercises[0].sets()[0];
        assert_eq!(set.volume(), 8.0 * 62.5);
    }

    #[test]
    fn squat_week_compares_against_previous() {
        let plan = squat_week();
        assert_eq!(plan.week_number, 1);
        let sets = plan.days[0].exercises[0].sets();
        assert_eq!(sets[0].volume(), 960.0);
        assert_eq!(sets[0].trend(), VolumeTrend::Up);
        assert_eq!(sets[1].volume(), 800.0);
        assert_eq!(sets[1].trend(), VolumeTrend::Down);
    }

    #[test]
    fn out_of_range_edits_are_rejected() {
        let mut editor = WeeklyPlanEditor::new(squat_week());
        assert_eq!(
            editor.update_set(7, 0, 0, SetEdit::ActualReps(1)),
            Err(PlanError::DayOutOfRange(7))
        );
        assert_eq!(
            editor.update_set(0, 3, 0, SetEdit::ActualReps(1)),
            Err(PlanError::ExerciseOutOfRange { day: 0, exercise: 3 })
        );
        assert_eq!(
            editor.update_set(0, 0, 2, SetEdit::ActualReps(1)),
            Err(PlanError::SetOutOfRange {
                day: 0,
                exercise: 0,
                set: 2
            })
        );
        assert_eq!(
            editor.update_set(1, 0, 0, SetEdit::ActualReps(1)),
            Err(PlanError::OffDay(Weekday::Tuesday))
        );
        assert_eq!(
            editor.update_set(0, 0, 0, SetEdit::WeightKg(-5.0)),
            Err(PlanError::InvalidWeight(-5.0))
        );
        assert!(!editor.is_dirty());
        assert_eq!(editor.plan(), &squat_week());
    }

    #[test]
    fn off_day_never_counts() {
        let mut plan = squat_week();
        let before = plan.total_volume();
        plan.days[2] = DayPlan {
            day: Weekday::Wednesday,
            is_off_day: true,
            exercises: vec![
                ExerciseRecord::new("Deadlift", vec![SetRecord::new(5, 5, 140.0, Some(100.0))])
                    .unwrap(),
            ],
        };
        assert_eq!(plan.days[2].total_volume(), 0.0);
        assert_eq!(plan.days[2].previous_total_volume(), None);
        assert_eq!(plan.days[2].set_count(), 0);
        assert_eq!(plan.total_volume(), before);
        assert_eq!(plan.training_days(), 1);
    }

    #[test]
    fn week_always_has_seven_ordered_days() {
        let plan = WeeklyPlan::new(0, "Empty");
        assert_eq!(plan.week_number, 1);
        let days: Vec<Weekday> = plan.days.iter().map(|d| d.day).collect();
        assert_eq!(days, ALL_WEEKDAYS.to_vec());
        assert!(plan.days.iter().all(|d| d.is_off_day));
    }

    #[test]
    fn exercise_requires_name_and_sets() {
        assert_eq!(
            ExerciseRecord::new("  ", vec![SetRecord::planned(5, 20.0)]),
            Err(PlanError::EmptyExerciseName)
        );
        assert_eq!(
            ExerciseRecord::new("Row", vec![]),
            Err(PlanError::NoSets("Row".into()))
        );
    }

    #[test]
    fn deserialized_volume_is_recomputed() {
        let json = r#"{"planned_reps":8,"actual_reps":5,"weight_kg":40.0,"volume":9999.0}"#;
        let set: SetRecord = serde_json::from_str(json).unwrap();
        assert_eq!(set.volume(), 200.0);
        assert_eq!(set.previous_week_volume(), None);
    }

    #[test]
    fn sample_week_totals() {
        let plan = WeeklyPlan::sample();
        assert_eq!(plan.training_days(), 2);
        assert_eq!(plan.day(Weekday::Monday).total_volume(), 480.0 + 420.0 + 480.0 + 250.0 + 225.0);
        assert_eq!(plan.day(Weekday::Wednesday).total_volume(), 1760.0);
        assert_eq!(plan.volume_trend(), VolumeTrend::Down);
    }

    #[test]
    fn save_writes_one_row_per_tracked_set() {
        let store = MemoryStore::default();
        let mut editor = WeeklyPlanEditor::new(WeeklyPlan::sample());
        editor.update_set(0, 0, 1, SetEdit::ActualReps(8)).unwrap();
        assert!(editor.is_dirty());

        let saved = editor.save(&store, "client-1").unwrap();
        assert_eq!(saved, 7);
        assert!(!editor.is_dirty());

        let rows = store
            .fetch(SET_LOG_TABLE, &Query::new().eq("day_of_week", "wednesday"))
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["exercise_name"], "Squat");
        assert_eq!(rows[0]["client_id"], "client-1");
        assert_eq!(rows[1]["volume"], 800.0);
    }

    #[test]
    fn saved_week_loads_back() {
        let store = MemoryStore::default();
        let mut editor = WeeklyPlanEditor::new(WeeklyPlan::sample());
        editor.update_set(0, 1, 1, SetEdit::WeightKg(27.5)).unwrap();
        editor.save(&store, "client-1").unwrap();

        let loaded = load_week(&store, "client-1", 1).unwrap().unwrap();
        assert_eq!(&loaded, editor.plan());

        editor.update_set(2, 0, 0, SetEdit::ActualReps(11)).unwrap();
        editor.save(&store, "client-1").unwrap();
        let reloaded = load_week(&store, "client-1", 1).unwrap().unwrap();
        assert_eq!(&reloaded, editor.plan());
        assert_eq!(reloaded.day(Weekday::Wednesday).set_count(), 2);
        assert!(load_week(&store, "client-1", 2).unwrap().is_none());
        assert!(load_week(&store, "client-2", 1).unwrap().is_none());
    }

    #[test]
    fn previous_week_fills_missing_comparisons() {
        let store = MemoryStore::default();
        let mut week1 = WeeklyPlan::new(1, "Strength");
        week1.set_day(
            Weekday::Friday,
            vec![ExerciseRecord::new("Row", vec![SetRecord::new(10, 10, 50.0, None)]).unwrap()],
        );
        WeeklyPlanEditor::new(week1).save(&store, "c").unwrap();

        let mut week2 = WeeklyPlan::new(2, "Strength");
        week2.set_day(
            Weekday::Friday,
            vec![ExerciseRecord::new("Row", vec![SetRecord::new(10, 10, 55.0, None)]).unwrap()],
        );
        WeeklyPlanEditor::new(week2).save(&store, "c").unwrap();

        let loaded = load_week(&store, "c", 2).unwrap().unwrap();
        let set = &loaded.day(Weekday::Friday).exercises[0].sets()[0];
        assert_eq!(set.previous_week_volume(), Some(500.0));
        assert_eq!(set.trend(), VolumeTrend::Up);
    }

    #[test]
    fn exercise_order_survives_unordered_backend() {
        let store = ReversingStore::default();
        let mut editor = WeeklyPlanEditor::new(WeeklyPlan::sample());
        editor.save(&store, "client-1").unwrap();

        let loaded = load_week(&store, "client-1", 1).unwrap().unwrap();
        let names: Vec<&str> = loaded
            .day(Weekday::Monday)
            .exercises
            .iter()
            .map(ExerciseRecord::name)
            .collect();
        assert_eq!(names, ["Bench Press", "Incline Dumbbell Press"]);
        assert_eq!(&loaded, editor.plan());
    }

    #[test]
    fn repeated_exercise_on_one_day_stays_separate() {
        let store = MemoryStore::default();
        let mut plan = WeeklyPlan::new(1, "Legs");
        plan.set_day(
            Weekday::Thursday,
            vec![
                ExerciseRecord::new("Squat", vec![SetRecord::new(5, 5, 100.0, None)]).unwrap(),
                ExerciseRecord::new(
                    "Lunge",
                    vec![
                        SetRecord::new(10, 10, 20.0, None),
                        SetRecord::new(10, 8, 20.0, None),
                    ],
                )
                .unwrap(),
                ExerciseRecord::new("Squat", vec![SetRecord::new(12, 12, 60.0, None)]).unwrap(),
            ],
        );
        let mut editor = WeeklyPlanEditor::new(plan.clone());
        editor.save(&store, "c").unwrap();

        let loaded = load_week(&store, "c", 1).unwrap().unwrap();
        assert_eq!(loaded, plan);
        assert_eq!(loaded.day(Weekday::Thursday).exercises.len(), 3);
    }

    #[test]
    fn failed_save_keeps_stored_week() {
        let store = MemoryStore::default();
        let mut editor = WeeklyPlanEditor::new(WeeklyPlan::sample());
        editor.save(&store, "client-1").unwrap();
        let stored = load_week(&store, "client-1", 1).unwrap().unwrap();

        editor.update_set(0, 0, 0, SetEdit::ActualReps(12)).unwrap();
        let err = editor.save(&FailingWrites(&store), "client-1");
        assert!(matches!(err, Err(BackendError::Status(503, _))));
        assert!(editor.is_dirty());
        assert_eq!(load_week(&store, "client-1", 1).unwrap().unwrap(), stored);
    }

    #[test]
    fn resave_drops_removed_sets() {
        let store = MemoryStore::default();
        let mut editor = WeeklyPlanEditor::new(WeeklyPlan::sample());
        editor.save(&store, "client-1").unwrap();

        let mut shorter = WeeklyPlan::sample();
        shorter.set_day(
            Weekday::Monday,
            vec![ExerciseRecord::new("Bench Press", vec![SetRecord::new(8, 8, 60.0, None)]).unwrap()],
        );
        editor.replace(shorter.clone());
        assert_eq!(editor.save(&store, "client-1").unwrap(), 3);

        let rows = store
            .fetch(SET_LOG_TABLE, &Query::new().eq("client_id", "client-1"))
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(load_week(&store, "client-1", 1).unwrap().unwrap(), shorter);
    }

    #[test]
    fn deserializing_checks_plan_invariants() {
        let good = serde_json::to_value(WeeklyPlan::sample()).unwrap();
        let parsed: WeeklyPlan = serde_json::from_value(good.clone()).unwrap();
        assert_eq!(parsed, WeeklyPlan::sample());

        let mut swapped = good.clone();
        swapped["days"].as_array_mut().unwrap().swap(0, 1);
        let err = serde_json::from_value::<WeeklyPlan>(swapped).unwrap_err();
        assert!(err.to_string().contains("day 0 should be Monday"));

        let mut week_zero = good.clone();
        week_zero["week_number"] = 0.into();
        assert!(serde_json::from_value::<WeeklyPlan>(week_zero).is_err());

        let mut nameless = good.clone();
        nameless["days"][0]["exercises"][0]["name"] = "".into();
        assert!(serde_json::from_value::<WeeklyPlan>(nameless).is_err());

        let mut no_sets = good;
        no_sets["days"][2]["exercises"][0]["sets"] = serde_json::json!([]);
        let err = serde_json::from_value::<WeeklyPlan>(no_sets).unwrap_err();
        assert!(err.to_string().contains("has no sets"));
    }
}
