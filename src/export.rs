use crate::plan::WeeklyPlan;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

pub fn write_json<T: Serialize + ?Sized, P: AsRef<Path>>(
    value: &T,
    path: P,
) -> std::io::Result<()> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, value)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
}

pub fn write_csv<T: Serialize>(writer: impl Write, records: &[T]) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for r in records {
        wtr.serialize(r)?;
    }
    wtr.flush().map_err(Into::into)
}

/// One logged set, flattened for spreadsheets.
#[derive(Debug, Serialize)]
pub struct SetRow<'a> {
    pub week: u32,
    pub day: &'static str,
    pub exercise: &'a str,
    pub set: usize,
    pub planned_reps: u32,
    pub actual_reps: u32,
    pub weight_kg: f64,
    pub volume: f64,
    pub previous_week_volume: Option<f64>,
    pub trend: &'static str,
}

/// Flatten the training days of a plan. Off-days produce no rows.
pub fn set_rows(plan: &WeeklyPlan) -> Vec<SetRow<'_>> {
    let mut rows = Vec::new();
    for day in &plan.days {
        for exercise in day.active_exercises() {
            for (i, set) in exercise.sets().iter().enumerate() {
                rows.push(SetRow {
                    week: plan.week_number,
                    day: day.day.label(),
                    exercise: exercise.name(),
                    set: i + 1,
                    planned_reps: set.planned_reps(),
                    actual_reps: set.actual_reps(),
                    weight_kg: set.weight_kg(),
                    volume: set.volume(),
                    previous_week_volume: set.previous_week_volume(),
                    trend: set.trend().label(),
                });
            }
        }
    }
    rows
}

pub fn save_plan_csv<P: AsRef<Path>>(path: P, plan: &WeeklyPlan) -> csv::Result<()> {
    write_csv(std::fs::File::create(path)?, &set_rows(plan))
}

pub fn save_plan_json<P: AsRef<Path>>(path: P, plan: &WeeklyPlan) -> std::io::Result<()> {
    write_json(plan, path)
}

pub fn load_plan_json<P: AsRef<Path>>(path: P) -> std::io::Result<WeeklyPlan> {
    let data = std::fs::read_to_string(path)?;
    serde_json::from_str(&data)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{SetEdit, WeeklyPlanEditor};

    #[test]
    fn csv_has_one_row_per_training_set() {
        let plan = WeeklyPlan::sample();
        let mut buf = Vec::new();
        write_csv(&mut buf, &set_rows(&plan)).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some(
                "week,day,exercise,set,planned_reps,actual_reps,weight_kg,volume,previous_week_volume,trend"
            )
        );
        let rows: Vec<&str> = lines.collect();
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[0], "1,Monday,Bench Press,1,8,8,60.0,480.0,450.0,up");
        assert!(rows.iter().all(|r| !r.contains("Tuesday")));
    }

    #[test]
    fn json_file_round_trip_keeps_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("week.json");
        let mut editor = WeeklyPlanEditor::new(WeeklyPlan::sample());
        editor.update_set(2, 0, 1, SetEdit::ActualReps(12)).unwrap();

        save_plan_json(&path, editor.plan()).unwrap();
        let loaded = load_plan_json(&path).unwrap();
        assert_eq!(&loaded, editor.plan());
        assert_eq!(loaded.days[2].exercises[0].sets()[1].volume(), 960.0);
    }

    #[test]
    fn csv_file_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("week.csv");
        save_plan_csv(&path, &WeeklyPlan::sample()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("Squat"));
    }

    #[test]
    fn json_with_broken_week_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("week.json");
        let mut value = serde_json::to_value(WeeklyPlan::sample()).unwrap();
        value["days"].as_array_mut().unwrap().swap(0, 6);
        std::fs::write(&path, value.to_string()).unwrap();

        let err = load_plan_json(&path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
        assert!(err.to_string().contains("should be Monday"));
    }
}
