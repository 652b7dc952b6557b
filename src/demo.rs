// Offline data used when no backend is configured
use crate::auth::{Role, User};
use crate::backend::MemoryStore;
use crate::plan::{WeeklyPlan, WeeklyPlanEditor};
use serde_json::json;

pub const ADMIN_ID: &str = "demo-admin";
pub const CLIENT_ID: &str = "demo-client";

const CREDENTIALS: [(&str, &str, &str); 2] = [
    ("admin@fitness.com", "admin123", ADMIN_ID),
    ("client@fitness.com", "client123", CLIENT_ID),
];

/// A store pre-filled with one trainer, one client and a week of training.
pub fn demo_store() -> MemoryStore {
    let store = MemoryStore::with_rows(
        "profiles",
        vec![
            json!({"id": ADMIN_ID, "email": "admin@fitness.com", "full_name": "Admin PT", "role": "admin"}),
            json!({"id": CLIENT_ID, "email": "client@fitness.com", "full_name": "Demo Client", "role": "client"}),
        ],
    );
    store.seed(
        "client_profiles",
        vec![json!({
            "user_id": CLIENT_ID,
            "workout_plan": "Fat Loss Program",
            "start_date": "2024-12-01",
            "total_sessions": 20,
            "sessions_per_week": 4,
            "sessions_completed": 6,
            "height": 170.0,
            "weight": 70.0,
            "target_weight": 68.0,
            "activity_level": "moderate"
        })],
    );
    store.seed(
        "weight_tracking",
        vec![
            json!({"client_id": CLIENT_ID, "recorded_date": "2024-12-01", "weight_kg": 72.0}),
            json!({"client_id": CLIENT_ID, "recorded_date": "2024-12-08", "weight_kg": 71.5}),
            json!({"client_id": CLIENT_ID, "recorded_date": "2024-12-15", "weight_kg": 70.8}),
            json!({"client_id": CLIENT_ID, "recorded_date": "2024-12-22", "weight_kg": 70.0}),
        ],
    );
    store.seed(
        "posts",
        vec![json!({
            "id": "post-1",
            "title": "Why rest days matter",
            "content": "Recovery is where strength is built.",
            "created_at": "2024-12-01T08:00:00Z",
            "author_id": ADMIN_ID
        })],
    );
    let today = chrono::Local::now().date_naive().format("%Y-%m-%d").to_string();
    store.seed(
        "meal_plans",
        vec![json!({"id": "meal-plan-1", "client_id": CLIENT_ID, "date": today, "total_calories": 1800})],
    );
    store.seed(
        "meals",
        vec![
            json!({"meal_plan_id": "meal-plan-1", "meal_type": "breakfast", "food_name": "Oatmeal with banana", "calories": 250}),
            json!({"meal_plan_id": "meal-plan-1", "meal_type": "breakfast", "food_name": "Boiled eggs", "calories": 150}),
            json!({"meal_plan_id": "meal-plan-1", "meal_type": "lunch", "food_name": "Brown rice and grilled chicken", "calories": 600}),
            json!({"meal_plan_id": "meal-plan-1", "meal_type": "afternoon", "food_name": "Protein shake", "calories": 200}),
            json!({"meal_plan_id": "meal-plan-1", "meal_type": "dinner", "food_name": "Grilled salmon with sweet potato", "calories": 500}),
            json!({"meal_plan_id": "meal-plan-1", "meal_type": "snack", "food_name": "Almonds", "calories": 100}),
        ],
    );
    let mut editor = WeeklyPlanEditor::new(WeeklyPlan::sample());
    if let Err(e) = editor.save(&store, CLIENT_ID) {
        log::error!("Failed to seed demo week: {e}");
    }
    store
}

/// Check demo credentials and return the matching account.
pub fn sign_in(email: &str, password: &str) -> Option<User> {
    let (email, _, id) = CREDENTIALS
        .iter()
        .find(|(e, p, _)| e.eq_ignore_ascii_case(email.trim()) && *p == password)?;
    let (name, role) = if *id == ADMIN_ID {
        ("Admin PT", Role::Admin)
    } else {
        ("Demo Client", Role::Client)
    };
    Some(User {
        id: id.to_string(),
        email: email.to_string(),
        name: name.to_string(),
        role,
    })
}
