// Module for summarizing a client's progress
use crate::records::{MealPlan, WeightEntry};
use crate::volume::{VolumeTrend, classify};
use serde::{Deserialize, Serialize};

/// Meal groups in the order they are shown during the day.
pub const MEAL_ORDER: [&str; 5] = ["breakfast", "lunch", "afternoon", "dinner", "snack"];

/// Unit used when showing body weight. Values are always stored in kilograms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WeightUnit {
    #[default]
    Kg,
    Lbs,
}

impl WeightUnit {
    fn factor(self) -> f64 {
        match self {
            WeightUnit::Kg => 1.0,
            WeightUnit::Lbs => 2.204_62,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            WeightUnit::Kg => "kg",
            WeightUnit::Lbs => "lbs",
        }
    }

    pub fn from_kg(self, kg: f64) -> f64 {
        kg * self.factor()
    }

    pub fn to_kg(self, value: f64) -> f64 {
        value / self.factor()
    }

    pub fn format(self, kg: f64) -> String {
        format!("{:.1} {}", self.from_kg(kg), self.suffix())
    }
}

/// Summary of a client's weight history.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightSummary {
    pub entries: usize,
    pub start_weight: Option<f64>,
    pub current_weight: Option<f64>,
    pub change: Option<f64>,
}

impl WeightSummary {
    /// Direction of the latest weight relative to the first entry.
    pub fn trend(&self) -> VolumeTrend {
        match self.current_weight {
            Some(current) if self.entries > 1 => classify(current, self.start_weight),
            _ => VolumeTrend::None,
        }
    }
}

/// Summarize weight entries. The slice does not need to be sorted.
pub fn weight_summary(history: &[WeightEntry]) -> WeightSummary {
    if history.is_empty() {
        return WeightSummary::default();
    }
    let first = history.iter().min_by_key(|e| e.recorded_date);
    let last = history.iter().max_by_key(|e| e.recorded_date);
    let start_weight = first.map(|e| e.weight_kg);
    let current_weight = last.map(|e| e.weight_kg);
    WeightSummary {
        entries: history.len(),
        start_weight,
        current_weight,
        change: start_weight.zip(current_weight).map(|(s, c)| c - s),
    }
}

/// Percentage of the way from `start` to `target`, clamped to 0–100.
///
/// Works for both losing and gaining goals. Returns 100 when the start is
/// already the target.
pub fn goal_progress(start: f64, current: f64, target: f64) -> f64 {
    let total = target - start;
    if total.abs() < f64::EPSILON {
        return 100.0;
    }
    ((current - start) / total * 100.0).clamp(0.0, 100.0)
}

/// Share of the calorie target eaten so far, clamped to 0–100.
pub fn calorie_progress(consumed: f64, target: f64) -> f64 {
    if target <= 0.0 {
        return 0.0;
    }
    (consumed / target * 100.0).clamp(0.0, 100.0)
}

/// Calories of one meal group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealGroup {
    pub meal_type: String,
    pub calories: f64,
    pub foods: Vec<String>,
}

/// Group the plan's meals by type, known types first in daily order.
pub fn group_meals(plan: &MealPlan) -> Vec<MealGroup> {
    let mut groups: Vec<MealGroup> = Vec::new();
    for meal in &plan.meals {
        let key = meal.meal_type.to_lowercase();
        match groups.iter_mut().find(|g| g.meal_type == key) {
            Some(g) => {
                g.calories += meal.calories.unwrap_or(0.0);
                g.foods.push(meal.food_name.clone());
            }
            None => groups.push(MealGroup {
                meal_type: key,
                calories: meal.calories.unwrap_or(0.0),
                foods: vec![meal.food_name.clone()],
            }),
        }
    }
    groups.sort_by_key(|g| {
        MEAL_ORDER
            .iter()
            .position(|m| *m == g.meal_type)
            .unwrap_or(MEAL_ORDER.len())
    });
    groups
}

/// Calorie target of a plan: the stored total, or the sum of its meals.
pub fn plan_calories(plan: &MealPlan) -> f64 {
    plan.total_calories
        .unwrap_or_else(|| plan.meals.iter().filter_map(|m| m.calories).sum())
}
