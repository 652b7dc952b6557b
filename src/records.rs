// Typed reads and writes over the hosted tables
use crate::backend::{BackendError, DataAccess, Query};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;

/// A client as listed on the admin dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub email: String,
    pub workout_plan: String,
    pub start_date: String,
    pub total_sessions: u32,
    pub sessions_per_week: u32,
    pub sessions_completed: u32,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub target_weight: Option<f64>,
    pub activity_level: String,
}

impl Client {
    pub fn sessions_remaining(&self) -> u32 {
        self.total_sessions.saturating_sub(self.sessions_completed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: Option<String>,
    pub created_at: String,
    pub author_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightEntry {
    pub recorded_date: NaiveDate,
    pub weight_kg: f64,
    pub body_fat_percentage: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    pub meal_type: String,
    pub food_name: String,
    pub calories: Option<f64>,
    pub quantity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPlan {
    pub id: String,
    pub date: NaiveDate,
    pub total_calories: Option<f64>,
    pub protein_grams: Option<f64>,
    pub carbs_grams: Option<f64>,
    pub fat_grams: Option<f64>,
    pub notes: Option<String>,
    pub meals: Vec<Meal>,
}

fn str_field(row: &Value, key: &str) -> Option<String> {
    row.get(key).and_then(Value::as_str).map(str::to_string)
}

fn f64_field(row: &Value, key: &str) -> Option<f64> {
    row.get(key).and_then(Value::as_f64)
}

fn u32_field(row: &Value, key: &str) -> Option<u32> {
    row.get(key)
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
}

fn date_field(row: &Value, key: &str) -> Option<NaiveDate> {
    row.get(key)
        .and_then(Value::as_str)
        .and_then(|s| NaiveDate::parse_from_str(s.get(..10).unwrap_or(s), "%Y-%m-%d").ok())
}

/// Build a [`Client`] from a profile row and its optional client profile.
///
/// Missing client-profile fields fall back to the defaults new accounts get.
fn client_from_rows(profile: &Value, details: Option<&Value>, today: NaiveDate) -> Client {
    let detail = |key: &str| details.and_then(|d| d.get(key));
    let name = str_field(profile, "full_name")
        .or_else(|| str_field(profile, "name"))
        .unwrap_or_default();
    Client {
        id: str_field(profile, "id").unwrap_or_default(),
        name,
        email: str_field(profile, "email").unwrap_or_default(),
        workout_plan: detail("workout_plan")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or("No program yet")
            .to_string(),
        start_date: detail("start_date")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| today.format("%Y-%m-%d").to_string()),
        total_sessions: details.and_then(|d| u32_field(d, "total_sessions")).unwrap_or(0),
        sessions_per_week: details
            .and_then(|d| u32_field(d, "sessions_per_week"))
            .filter(|v| *v > 0)
            .unwrap_or(3),
        sessions_completed: details
            .and_then(|d| u32_field(d, "sessions_completed"))
            .unwrap_or(0),
        height: details.and_then(|d| f64_field(d, "height")),
        weight: details.and_then(|d| f64_field(d, "weight")),
        target_weight: details.and_then(|d| f64_field(d, "target_weight")),
        activity_level: detail("activity_level")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or("moderate")
            .to_string(),
    }
}

/// All client accounts with their training details.
pub fn list_clients(store: &dyn DataAccess) -> Result<Vec<Client>, BackendError> {
    let profiles = store.fetch("profiles", &Query::new().eq("role", "client"))?;
    let details = store.fetch("client_profiles", &Query::new())?;
    let by_user: HashMap<String, &Value> = details
        .iter()
        .filter_map(|d| str_field(d, "user_id").map(|id| (id, d)))
        .collect();
    let today = Local::now().date_naive();
    let clients: Vec<Client> = profiles
        .iter()
        .map(|p| {
            let id = str_field(p, "id").unwrap_or_default();
            client_from_rows(p, by_user.get(&id).copied(), today)
        })
        .collect();
    log::info!("Loaded {} clients", clients.len());
    Ok(clients)
}

pub fn update_client_sessions(
    store: &dyn DataAccess,
    client_id: &str,
    total_sessions: u32,
) -> Result<(), BackendError> {
    store.update(
        "client_profiles",
        &Query::new().eq("user_id", client_id),
        &json!({ "total_sessions": total_sessions }),
    )
}

/// Posts, newest first, with the author's display name.
pub fn list_posts(store: &dyn DataAccess) -> Result<Vec<Post>, BackendError> {
    let rows = store.fetch("posts", &Query::new().order("created_at", false))?;
    let mut author_ids: Vec<String> = rows
        .iter()
        .filter_map(|r| str_field(r, "author_id"))
        .collect();
    author_ids.sort();
    author_ids.dedup();
    let authors: HashMap<String, String> = if author_ids.is_empty() {
        HashMap::new()
    } else {
        store
            .fetch("profiles", &Query::new().in_list("id", &author_ids))?
            .iter()
            .filter_map(|p| {
                let name = str_field(p, "full_name").or_else(|| str_field(p, "name"))?;
                Some((str_field(p, "id")?, name))
            })
            .collect()
    };
    Ok(rows
        .iter()
        .map(|r| Post {
            id: str_field(r, "id").unwrap_or_default(),
            title: str_field(r, "title").unwrap_or_default(),
            content: str_field(r, "content"),
            created_at: str_field(r, "created_at").unwrap_or_default(),
            author_name: str_field(r, "author_id").and_then(|a| authors.get(&a).cloned()),
        })
        .collect())
}

/// Weight history for a client in date order. Rows without a date are skipped.
pub fn list_weight_history(
    store: &dyn DataAccess,
    client_id: &str,
) -> Result<Vec<WeightEntry>, BackendError> {
    let rows = store.fetch(
        "weight_tracking",
        &Query::new()
            .eq("client_id", client_id)
            .order("recorded_date", true),
    )?;
    Ok(rows
        .iter()
        .filter_map(|r| {
            Some(WeightEntry {
                recorded_date: date_field(r, "recorded_date")?,
                weight_kg: f64_field(r, "weight_kg")?,
                body_fat_percentage: f64_field(r, "body_fat_percentage"),
                notes: str_field(r, "notes"),
            })
        })
        .collect())
}

pub fn record_weight(
    store: &dyn DataAccess,
    client_id: &str,
    entry: &WeightEntry,
) -> Result<(), BackendError> {
    store.insert(
        "weight_tracking",
        &json!({
            "client_id": client_id,
            "recorded_date": entry.recorded_date.format("%Y-%m-%d").to_string(),
            "weight_kg": entry.weight_kg,
            "body_fat_percentage": entry.body_fat_percentage,
            "notes": entry.notes,
        }),
    )?;
    log::info!("Recorded {:.1} kg for {client_id}", entry.weight_kg);
    Ok(())
}

/// The meal plan assigned to a client for `date`, if any.
pub fn meal_plan_for(
    store: &dyn DataAccess,
    client_id: &str,
    date: NaiveDate,
) -> Result<Option<MealPlan>, BackendError> {
    let date_str = date.format("%Y-%m-%d").to_string();
    let plans = store.fetch(
        "meal_plans",
        &Query::new()
            .eq("client_id", client_id)
            .eq("date", &date_str)
            .limit(1),
    )?;
    let Some(row) = plans.first() else {
        return Ok(None);
    };
    let id = str_field(row, "id").unwrap_or_default();
    let meals = store
        .fetch("meals", &Query::new().eq("meal_plan_id", &id))?
        .iter()
        .filter_map(|m| {
            Some(Meal {
                meal_type: str_field(m, "meal_type")?,
                food_name: str_field(m, "food_name")?,
                calories: f64_field(m, "calories"),
                quantity: str_field(m, "quantity"),
            })
        })
        .collect();
    Ok(Some(MealPlan {
        id,
        date: date_field(row, "date").unwrap_or(date),
        total_calories: f64_field(row, "total_calories"),
        protein_grams: f64_field(row, "protein_grams"),
        carbs_grams: f64_field(row, "carbs_grams"),
        fat_grams: f64_field(row, "fat_grams"),
        notes: str_field(row, "notes"),
        meals,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryStore;

    fn clients_store() -> MemoryStore {
        let store = MemoryStore::with_rows(
            "profiles",
            vec![
                json!({"id": "c1", "email": "an@gym.test", "full_name": "An", "role": "client"}),
                json!({"id": "c2", "email": "binh@gym.test", "full_name": "Binh", "role": "client"}),
                json!({"id": "a1", "email": "pt@gym.test", "full_name": "Coach", "role": "admin"}),
            ],
        );
        store.seed(
            "client_profiles",
            vec![json!({
                "user_id": "c1",
                "workout_plan": "Fat Loss Program",
                "start_date": "2024-12-01",
                "total_sessions": 20,
                "sessions_per_week": 4,
                "sessions_completed": 6,
                "weight": 72.0,
                "target_weight": 68.0,
                "activity_level": "active"
            })],
        );
        store
    }

    #[test]
    fn clients_join_profiles_with_defaults() {
        let store = clients_store();
        let clients = list_clients(&store).unwrap();
        assert_eq!(clients.len(), 2);

        let an = clients.iter().find(|c| c.id == "c1").unwrap();
        assert_eq!(an.workout_plan, "Fat Loss Program");
        assert_eq!(an.sessions_per_week, 4);
        assert_eq!(an.sessions_remaining(), 14);
        assert_eq!(an.target_weight, Some(68.0));

        let binh = clients.iter().find(|c| c.id == "c2").unwrap();
        assert_eq!(binh.workout_plan, "No program yet");
        assert_eq!(binh.total_sessions, 0);
        assert_eq!(binh.sessions_per_week, 3);
        assert_eq!(binh.activity_level, "moderate");
        assert_eq!(binh.start_date.len(), 10);
    }

    #[test]
    fn session_update_targets_one_client() {
        let store = clients_store();
        update_client_sessions(&store, "c1", 30).unwrap();
        let clients = list_clients(&store).unwrap();
        let an = clients.iter().find(|c| c.id == "c1").unwrap();
        assert_eq!(an.total_sessions, 30);
    }

    #[test]
    fn posts_are_newest_first_with_author() {
        let store = clients_store();
        store.seed(
            "posts",
            vec![
                json!({"id": "p1", "title": "Warm-ups", "created_at": "2024-11-01T08:00:00Z", "author_id": "a1"}),
                json!({"id": "p2", "title": "Protein", "content": "Eat it", "created_at": "2024-12-01T08:00:00Z", "author_id": "a1"}),
                json!({"id": "p3", "title": "Anonymous", "created_at": "2024-10-01T08:00:00Z"}),
            ],
        );
        let posts = list_posts(&store).unwrap();
        let titles: Vec<&str> = posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Protein", "Warm-ups", "Anonymous"]);
        assert_eq!(posts[0].author_name.as_deref(), Some("Coach"));
        assert_eq!(posts[0].content.as_deref(), Some("Eat it"));
        assert_eq!(posts[2].author_name, None);
    }

    #[test]
    fn weight_history_round_trips_through_store() {
        let store = MemoryStore::default();
        for (d, w) in [("2024-12-15", 70.8), ("2024-12-01", 72.0), ("2024-12-08", 71.5)] {
            record_weight(
                &store,
                "c1",
                &WeightEntry {
                    recorded_date: NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap(),
                    weight_kg: w,
                    body_fat_percentage: None,
                    notes: None,
                },
            )
            .unwrap();
        }
        store.seed("weight_tracking", vec![json!({"client_id": "c1", "weight_kg": 69.0})]);

        let history = list_weight_history(&store, "c1").unwrap();
        let weights: Vec<f64> = history.iter().map(|e| e.weight_kg).collect();
        assert_eq!(weights, vec![72.0, 71.5, 70.8]);
        assert!(list_weight_history(&store, "other").unwrap().is_empty());
    }

    #[test]
    fn meal_plan_collects_meals() {
        let store = MemoryStore::with_rows(
            "meal_plans",
            vec![json!({"id": "m1", "client_id": "c1", "date": "2024-12-20", "total_calories": 1800})],
        );
        store.seed(
            "meals",
            vec![
                json!({"meal_plan_id": "m1", "meal_type": "breakfast", "food_name": "Oatmeal with banana", "calories": 400}),
                json!({"meal_plan_id": "m1", "meal_type": "lunch", "food_name": "Grilled chicken", "calories": 600}),
                json!({"meal_plan_id": "m2", "meal_type": "lunch", "food_name": "Other plan"}),
            ],
        );
        let date = NaiveDate::from_ymd_opt(2024, 12, 20).unwrap();
        let plan = meal_plan_for(&store, "c1", date).unwrap().unwrap();
        assert_eq!(plan.total_calories, Some(1800.0));
        assert_eq!(plan.meals.len(), 2);

        let other_day = NaiveDate::from_ymd_opt(2024, 12, 21).unwrap();
        assert!(meal_plan_for(&store, "c1", other_day).unwrap().is_none());
    }
}
