use crate::backend::{BackendError, DataAccess, Query, Session};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Client,
}

/// The signed-in person together with their profile role.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

/// Top-level screen, decided once from the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    AdminDashboard,
    ClientDashboard,
}

impl Route {
    pub fn for_user(user: Option<&User>) -> Self {
        match user.map(|u| u.role) {
            None => Route::Login,
            Some(Role::Admin) => Route::AdminDashboard,
            Some(Role::Client) => Route::ClientDashboard,
        }
    }
}

#[derive(Deserialize)]
struct ProfileRow {
    id: String,
    email: String,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default = "default_role")]
    role: Role,
}

fn default_role() -> Role {
    Role::Client
}

/// Look up the profile belonging to `session`.
///
/// A missing profile row is treated as a plain client account.
pub fn load_user(store: &dyn DataAccess, session: &Session) -> Result<User, BackendError> {
    let rows = store.fetch(
        "profiles",
        &Query::new()
            .select("id,email,full_name,role")
            .eq("id", &session.user_id)
            .limit(1),
    )?;
    let profile = rows
        .into_iter()
        .next()
        .and_then(|r| serde_json::from_value::<ProfileRow>(r).ok());
    let user = match profile {
        Some(p) => User {
            name: p.full_name.unwrap_or_else(|| p.email.clone()),
            id: p.id,
            email: p.email,
            role: p.role,
        },
        None => {
            log::warn!("No profile for user {}, defaulting to client", session.user_id);
            User {
                id: session.user_id.clone(),
                email: session.email.clone(),
                name: session.email.clone(),
                role: Role::Client,
            }
        }
    };
    log::debug!("Loaded profile {} ({:?})", user.email, user.role);
    Ok(user)
}
