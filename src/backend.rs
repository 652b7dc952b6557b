// Access to the hosted tables and password auth
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// Connection details for the hosted backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub url: String,
    pub anon_key: String,
}

/// Determine which backend to talk to.
///
/// `SUPABASE_URL` and `SUPABASE_ANON_KEY` take precedence over the values
/// stored in the application settings. Both a URL and a key are required.
pub fn resolve_backend(
    settings_url: Option<&str>,
    settings_key: Option<&str>,
) -> Option<BackendConfig> {
    let url = std::env::var("SUPABASE_URL")
        .ok()
        .or_else(|| settings_url.map(|s| s.to_string()))
        .filter(|s| !s.trim().is_empty())?;
    let anon_key = std::env::var("SUPABASE_ANON_KEY")
        .ok()
        .or_else(|| settings_key.map(|s| s.to_string()))
        .filter(|s| !s.trim().is_empty())?;
    Some(BackendConfig { url, anon_key })
}

#[derive(Debug)]
pub enum BackendError {
    Unauthorized(String),
    Forbidden(String),
    Status(u16, String),
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl BackendError {
    fn other<E: std::error::Error + Send + Sync + 'static>(e: E) -> Self {
        BackendError::Other(Box::new(e))
    }
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::Unauthorized(body) => write!(f, "Unauthorized: {body}"),
            BackendError::Forbidden(body) => write!(f, "Forbidden: {body}"),
            BackendError::Status(code, body) => write!(f, "HTTP {code}: {body}"),
            BackendError::Other(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for BackendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BackendError::Other(e) => Some(&**e),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Filter {
    Eq(String, String),
    Neq(String, String),
    In(String, Vec<String>),
}

/// Row selection for [`DataAccess`] calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    select: Option<String>,
    filters: Vec<Filter>,
    order: Vec<(String, bool)>,
    limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.select = Some(columns.to_string());
        self
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters
            .push(Filter::Eq(column.to_string(), value.to_string()));
        self
    }

    pub fn neq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters
            .push(Filter::Neq(column.to_string(), value.to_string()));
        self
    }

    pub fn in_list(mut self, column: &str, values: &[String]) -> Self {
        self.filters
            .push(Filter::In(column.to_string(), values.to_vec()));
        self
    }

    /// Add a sort key. Later calls break ties left by earlier ones.
    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order.push((column.to_string(), ascending));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Filter parameters only, as used by updates.
    fn filter_params(&self) -> Vec<(String, String)> {
        self.filters
            .iter()
            .map(|f| match f {
                Filter::Eq(c, v) => (c.clone(), format!("eq.{v}")),
                Filter::Neq(c, v) => (c.clone(), format!("neq.{v}")),
                Filter::In(c, vs) => (c.clone(), format!("in.({})", vs.join(","))),
            })
            .collect()
    }

    /// Encode as PostgREST query parameters.
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        params.push((
            "select".to_string(),
            self.select.clone().unwrap_or_else(|| "*".to_string()),
        ));
        params.extend(self.filter_params());
        if !self.order.is_empty() {
            let keys: Vec<String> = self
                .order
                .iter()
                .map(|(col, asc)| format!("{col}.{}", if *asc { "asc" } else { "desc" }))
                .collect();
            params.push(("order".to_string(), keys.join(",")));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }

    fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|f| match f {
            Filter::Eq(c, v) => row.get(c).map(cell_text).as_deref() == Some(v.as_str()),
            Filter::Neq(c, v) => row.get(c).map(cell_text).as_deref() != Some(v.as_str()),
            Filter::In(c, vs) => row
                .get(c)
                .map(cell_text)
                .map_or(false, |t| vs.iter().any(|v| *v == t)),
        })
    }
}

fn cell_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Table operations the views depend on.
pub trait DataAccess {
    fn fetch(&self, table: &str, query: &Query) -> Result<Vec<Value>, BackendError>;

    /// Insert a row object or an array of rows; returns the stored rows.
    fn insert(&self, table: &str, rows: &Value) -> Result<Vec<Value>, BackendError>;

    /// Insert rows, overwriting any stored row that matches on every
    /// `on_conflict` column.
    fn upsert(
        &self,
        table: &str,
        rows: &Value,
        on_conflict: &[&str],
    ) -> Result<Vec<Value>, BackendError>;

    fn update(&self, table: &str, filter: &Query, patch: &Value) -> Result<(), BackendError>;

    fn delete(&self, table: &str, filter: &Query) -> Result<(), BackendError>;
}

/// Serializes tests that touch process environment variables.
#[cfg(test)]
pub(crate) static ENV_MUTEX: once_cell::sync::Lazy<Mutex<()>> =
    once_cell::sync::Lazy::new(|| Mutex::new(()));

/// Authenticated identity returned by the auth endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub user_id: String,
    pub email: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    user: TokenUser,
}

#[derive(Deserialize)]
struct TokenUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// HTTP implementation over the hosted REST and auth endpoints.
#[derive(Debug, Clone)]
pub struct RestClient {
    config: BackendConfig,
    access_token: Option<String>,
}

impl RestClient {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            access_token: None,
        }
    }

    pub fn with_session(mut self, session: &Session) -> Self {
        self.access_token = Some(session.access_token.clone());
        self
    }

    fn base(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base(), table)
    }

    fn authorize(&self, req: ureq::Request) -> ureq::Request {
        let token = self
            .access_token
            .as_deref()
            .unwrap_or(self.config.anon_key.as_str());
        req.set("apikey", &self.config.anon_key)
            .set("Authorization", &format!("Bearer {token}"))
            .set("Accept", "application/json")
    }

    /// Exchange email and password for a session.
    pub fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        log::info!("Signing in {email}");
        let url = format!("{}/auth/v1/token", self.base());
        let req = ureq::post(&url)
            .query("grant_type", "password")
            .set("apikey", &self.config.anon_key);
        let body = read_response(req.send_json(serde_json::json!({
            "email": email,
            "password": password,
        })))?;
        let token: TokenResponse = serde_json::from_str(&body).map_err(BackendError::other)?;
        Ok(Session {
            access_token: token.access_token,
            user_id: token.user.id,
            email: token.user.email.unwrap_or_else(|| email.to_string()),
        })
    }
}

fn read_response(response: Result<ureq::Response, ureq::Error>) -> Result<String, BackendError> {
    match response {
        Ok(r) => r.into_string().map_err(BackendError::other),
        Err(ureq::Error::Status(401, r)) => {
            Err(BackendError::Unauthorized(r.into_string().unwrap_or_default()))
        }
        Err(ureq::Error::Status(403, r)) => {
            Err(BackendError::Forbidden(r.into_string().unwrap_or_default()))
        }
        Err(ureq::Error::Status(code, r)) => {
            Err(BackendError::Status(code, r.into_string().unwrap_or_default()))
        }
        Err(e) => Err(BackendError::other(e)),
    }
}

fn parse_rows(body: &str) -> Result<Vec<Value>, BackendError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str::<Value>(body).map_err(BackendError::other)? {
        Value::Array(rows) => Ok(rows),
        Value::Null => Ok(Vec::new()),
        row => Ok(vec![row]),
    }
}

impl DataAccess for RestClient {
    fn fetch(&self, table: &str, query: &Query) -> Result<Vec<Value>, BackendError> {
        let mut req = self.authorize(ureq::get(&self.table_url(table)));
        for (k, v) in query.params() {
            req = req.query(&k, &v);
        }
        let rows = parse_rows(&read_response(req.call())?)?;
        log::info!("Fetched {} rows from {table}", rows.len());
        Ok(rows)
    }

    fn insert(&self, table: &str, rows: &Value) -> Result<Vec<Value>, BackendError> {
        let req = self
            .authorize(ureq::post(&self.table_url(table)))
            .set("Prefer", "return=representation");
        let stored = parse_rows(&read_response(req.send_json(rows))?)?;
        log::info!("Inserted {} rows into {table}", stored.len());
        Ok(stored)
    }

    fn upsert(
        &self,
        table: &str,
        rows: &Value,
        on_conflict: &[&str],
    ) -> Result<Vec<Value>, BackendError> {
        let req = self
            .authorize(ureq::post(&self.table_url(table)))
            .query("on_conflict", &on_conflict.join(","))
            .set("Prefer", "resolution=merge-duplicates,return=representation");
        let stored = parse_rows(&read_response(req.send_json(rows))?)?;
        log::info!("Upserted {} rows into {table}", stored.len());
        Ok(stored)
    }

    fn update(&self, table: &str, filter: &Query, patch: &Value) -> Result<(), BackendError> {
        let mut req = self
            .authorize(ureq::request("PATCH", &self.table_url(table)))
            .set("Prefer", "return=minimal");
        for (k, v) in filter.filter_params() {
            req = req.query(&k, &v);
        }
        read_response(req.send_json(patch))?;
        log::info!("Updated {table}");
        Ok(())
    }

    fn delete(&self, table: &str, filter: &Query) -> Result<(), BackendError> {
        let mut req = self.authorize(ureq::delete(&self.table_url(table)));
        for (k, v) in filter.filter_params() {
            req = req.query(&k, &v);
        }
        read_response(req.call())?;
        log::info!("Deleted matching rows from {table}");
        Ok(())
    }
}

/// In-memory tables, used offline and as a test double.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    next_id: Mutex<u64>,
}

impl MemoryStore {
    pub fn with_rows(table: &str, rows: Vec<Value>) -> Self {
        let store = Self::default();
        store.seed(table, rows);
        store
    }

    pub fn seed(&self, table: &str, rows: Vec<Value>) {
        if let Ok(mut tables) = self.tables.lock() {
            tables.entry(table.to_string()).or_default().extend(rows);
        }
    }

    fn lock_error() -> BackendError {
        BackendError::Other("memory store lock poisoned".into())
    }

    fn assign_id(&self, row: &mut Value) -> Result<(), BackendError> {
        if let Value::Object(map) = row {
            if !map.contains_key("id") {
                let mut next = self.next_id.lock().map_err(|_| Self::lock_error())?;
                *next += 1;
                map.insert("id".to_string(), Value::String(format!("mem-{}", *next)));
            }
        }
        Ok(())
    }
}

fn compare_cells(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a.and_then(Value::as_f64), b.and_then(Value::as_f64)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.map(cell_text).cmp(&b.map(cell_text)),
    }
}

impl DataAccess for MemoryStore {
    fn fetch(&self, table: &str, query: &Query) -> Result<Vec<Value>, BackendError> {
        let tables = self.tables.lock().map_err(|_| Self::lock_error())?;
        let mut rows: Vec<Value> = tables
            .get(table)
            .map(|rows| rows.iter().filter(|r| query.matches(r)).cloned().collect())
            .unwrap_or_default();
        if !query.order.is_empty() {
            rows.sort_by(|a, b| {
                query
                    .order
                    .iter()
                    .map(|(col, asc)| {
                        let ord = compare_cells(a.get(col), b.get(col));
                        if *asc { ord } else { ord.reverse() }
                    })
                    .find(|ord| ord.is_ne())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    fn insert(&self, table: &str, rows: &Value) -> Result<Vec<Value>, BackendError> {
        let mut new_rows = match rows {
            Value::Array(rows) => rows.clone(),
            row => vec![row.clone()],
        };
        for row in &mut new_rows {
            self.assign_id(row)?;
        }
        let mut tables = self.tables.lock().map_err(|_| Self::lock_error())?;
        tables
            .entry(table.to_string())
            .or_default()
            .extend(new_rows.iter().cloned());
        Ok(new_rows)
    }

    fn upsert(
        &self,
        table: &str,
        rows: &Value,
        on_conflict: &[&str],
    ) -> Result<Vec<Value>, BackendError> {
        let mut new_rows = match rows {
            Value::Array(rows) => rows.clone(),
            row => vec![row.clone()],
        };
        let same_key = |a: &Value, b: &Value| {
            on_conflict
                .iter()
                .all(|c| a.get(*c).map(cell_text) == b.get(*c).map(cell_text))
        };
        let mut tables = self.tables.lock().map_err(|_| Self::lock_error())?;
        let stored = tables.entry(table.to_string()).or_default();
        for row in &mut new_rows {
            match stored.iter_mut().find(|r| same_key(r, row)) {
                Some(existing) => {
                    if let (Value::Object(old), Value::Object(new)) = (&mut *existing, &*row) {
                        for (k, v) in new {
                            old.insert(k.clone(), v.clone());
                        }
                    }
                    *row = existing.clone();
                }
                None => {
                    self.assign_id(row)?;
                    stored.push(row.clone());
                }
            }
        }
        Ok(new_rows)
    }

    fn update(&self, table: &str, filter: &Query, patch: &Value) -> Result<(), BackendError> {
        let mut tables = self.tables.lock().map_err(|_| Self::lock_error())?;
        if let (Some(rows), Value::Object(fields)) = (tables.get_mut(table), patch) {
            for row in rows.iter_mut().filter(|r| filter.matches(r)) {
                if let Value::Object(map) = row {
                    for (k, v) in fields {
                        map.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        Ok(())
    }

    fn delete(&self, table: &str, filter: &Query) -> Result<(), BackendError> {
        let mut tables = self.tables.lock().map_err(|_| Self::lock_error())?;
        if let Some(rows) = tables.get_mut(table) {
            rows.retain(|r| !filter.matches(r));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer) -> RestClient {
        RestClient::new(BackendConfig {
            url: server.base_url(),
            anon_key: "anon".into(),
        })
    }

    #[test]
    fn query_encodes_postgrest_params() {
        let q = Query::new()
            .eq("role", "client")
            .in_list("id", &["a".into(), "b".into()])
            .order("created_at", false)
            .limit(10);
        assert_eq!(
            q.params(),
            vec![
                ("select".to_string(), "*".to_string()),
                ("role".to_string(), "eq.client".to_string()),
                ("id".to_string(), "in.(a,b)".to_string()),
                ("order".to_string(), "created_at.desc".to_string()),
                ("limit".to_string(), "10".to_string()),
            ]
        );
    }

    #[test]
    fn fetch_sends_key_and_filters() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/profiles")
                .query_param("role", "eq.client")
                .query_param("select", "*")
                .header("apikey", "anon")
                .header("Authorization", "Bearer anon");
            then.status(200)
                .json_body(json!([{"id": "1", "role": "client"}]));
        });

        let rows = client(&server)
            .fetch("profiles", &Query::new().eq("role", "client"))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], "1");
        m.assert();
    }

    #[test]
    fn session_token_replaces_anon_bearer() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/posts")
                .header("Authorization", "Bearer user-token");
            then.status(200).body("[]");
        });
        let session = Session {
            access_token: "user-token".into(),
            user_id: "u1".into(),
            email: "a@b.c".into(),
        };
        let rows = client(&server)
            .with_session(&session)
            .fetch("posts", &Query::new())
            .unwrap();
        assert!(rows.is_empty());
        m.assert();
    }

    #[test]
    fn maps_401_and_403() {
        let server = MockServer::start();
        let unauthorized = server.mock(|when, then| {
            when.method(GET).path("/rest/v1/profiles");
            then.status(401).body("no token");
        });
        let forbidden = server.mock(|when, then| {
            when.method(GET).path("/rest/v1/posts");
            then.status(403).body("rls");
        });

        match client(&server).fetch("profiles", &Query::new()).unwrap_err() {
            BackendError::Unauthorized(body) => assert_eq!(body, "no token"),
            e => panic!("unexpected error: {e:?}"),
        }
        match client(&server).fetch("posts", &Query::new()).unwrap_err() {
            BackendError::Forbidden(body) => assert_eq!(body, "rls"),
            e => panic!("unexpected error: {e:?}"),
        }
        unauthorized.assert();
        forbidden.assert();
    }

    #[test]
    fn other_statuses_keep_code() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/rest/v1/posts");
            then.status(409).body("duplicate");
        });
        match client(&server)
            .insert("posts", &json!({"title": "x"}))
            .unwrap_err()
        {
            BackendError::Status(code, body) => {
                assert_eq!(code, 409);
                assert_eq!(body, "duplicate");
            }
            e => panic!("unexpected error: {e:?}"),
        }
    }

    #[test]
    fn insert_asks_for_representation() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(POST)
                .path("/rest/v1/weight_tracking")
                .header("Prefer", "return=representation")
                .json_body(json!({"weight_kg": 70.5}));
            then.status(201)
                .json_body(json!([{"id": "w1", "weight_kg": 70.5}]));
        });
        let rows = client(&server)
            .insert("weight_tracking", &json!({"weight_kg": 70.5}))
            .unwrap();
        assert_eq!(rows[0]["id"], "w1");
        m.assert();
    }

    #[test]
    fn update_patches_filtered_rows() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(httpmock::Method::PATCH)
                .path("/rest/v1/client_profiles")
                .query_param("user_id", "eq.c1")
                .json_body(json!({"total_sessions": 12}));
            then.status(204);
        });
        client(&server)
            .update(
                "client_profiles",
                &Query::new().eq("user_id", "c1"),
                &json!({"total_sessions": 12}),
            )
            .unwrap();
        m.assert();
    }

    #[test]
    fn multiple_sort_keys_share_one_order_param() {
        let q = Query::new()
            .neq("save_token", "t1")
            .order("exercise_index", true)
            .order("set_index", true);
        assert_eq!(
            q.params(),
            vec![
                ("select".to_string(), "*".to_string()),
                ("save_token".to_string(), "neq.t1".to_string()),
                (
                    "order".to_string(),
                    "exercise_index.asc,set_index.asc".to_string()
                ),
            ]
        );
    }

    #[test]
    fn upsert_merges_duplicates_on_conflict_columns() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(POST)
                .path("/rest/v1/workout_set_logs")
                .query_param("on_conflict", "client_id,set_index")
                .header("Prefer", "resolution=merge-duplicates,return=representation");
            then.status(201)
                .json_body(json!([{"client_id": "c1", "set_index": 0}]));
        });
        let rows = client(&server)
            .upsert(
                "workout_set_logs",
                &json!([{"client_id": "c1", "set_index": 0}]),
                &["client_id", "set_index"],
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        m.assert();
    }

    #[test]
    fn memory_upsert_replaces_matching_rows() {
        let store = MemoryStore::with_rows(
            "logs",
            vec![
                json!({"id": "a", "day": "monday", "set": 0, "reps": 5}),
                json!({"id": "b", "day": "monday", "set": 1, "reps": 5}),
            ],
        );
        let stored = store
            .upsert(
                "logs",
                &json!([
                    {"day": "monday", "set": 1, "reps": 8},
                    {"day": "friday", "set": 0, "reps": 3}
                ]),
                &["day", "set"],
            )
            .unwrap();
        assert_eq!(stored[0]["id"], "b");
        assert_eq!(stored[0]["reps"], 8);

        let rows = store
            .fetch("logs", &Query::new().order("day", true).order("set", true))
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["day"], "friday");
        assert_eq!(rows[1]["reps"], 5);
        assert_eq!(rows[2]["reps"], 8);

        store.delete("logs", &Query::new().neq("day", "monday")).unwrap();
        assert_eq!(store.fetch("logs", &Query::new()).unwrap().len(), 2);
    }

    #[test]
    fn delete_sends_filters() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(DELETE)
                .path("/rest/v1/workout_set_logs")
                .query_param("client_id", "eq.c1")
                .query_param("week_number", "eq.2");
            then.status(204);
        });
        client(&server)
            .delete(
                "workout_set_logs",
                &Query::new().eq("client_id", "c1").eq("week_number", 2),
            )
            .unwrap();
        m.assert();
    }

    #[test]
    fn sign_in_returns_session() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(POST)
                .path("/auth/v1/token")
                .query_param("grant_type", "password")
                .header("apikey", "anon")
                .json_body(json!({"email": "pt@gym.test", "password": "secret"}));
            then.status(200).json_body(json!({
                "access_token": "tok",
                "user": {"id": "u-1", "email": "pt@gym.test"}
            }));
        });
        let session = client(&server).sign_in("pt@gym.test", "secret").unwrap();
        assert_eq!(session.access_token, "tok");
        assert_eq!(session.user_id, "u-1");
        assert_eq!(session.email, "pt@gym.test");
        m.assert();
    }

    #[test]
    fn sign_in_rejects_bad_password() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/auth/v1/token");
            then.status(400).body("invalid_grant");
        });
        let err = client(&server).sign_in("pt@gym.test", "nope").unwrap_err();
        assert!(matches!(err, BackendError::Status(400, _)));
    }

    #[test]
    fn memory_store_filters_orders_and_updates() {
        let store = MemoryStore::with_rows(
            "posts",
            vec![
                json!({"id": "1", "title": "old", "created_at": "2024-01-01"}),
                json!({"id": "2", "title": "new", "created_at": "2024-02-01"}),
            ],
        );
        let rows = store
            .fetch("posts", &Query::new().order("created_at", false).limit(1))
            .unwrap();
        assert_eq!(rows[0]["title"], "new");

        store
            .update("posts", &Query::new().eq("id", "1"), &json!({"title": "edited"}))
            .unwrap();
        let rows = store.fetch("posts", &Query::new().eq("id", 1)).unwrap();
        assert_eq!(rows[0]["title"], "edited");

        let inserted = store.insert("posts", &json!({"title": "third"})).unwrap();
        assert!(inserted[0]["id"].as_str().unwrap().starts_with("mem-"));
        assert_eq!(store.fetch("posts", &Query::new()).unwrap().len(), 3);

        store.delete("posts", &Query::new().eq("title", "edited")).unwrap();
        assert_eq!(store.fetch("posts", &Query::new()).unwrap().len(), 2);
    }

    #[test]
    fn env_overrides_settings_backend() {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let prev = std::env::var_os("SUPABASE_URL");
        let prev_key = std::env::var_os("SUPABASE_ANON_KEY");
        unsafe {
            std::env::set_var("SUPABASE_URL", "https://forced.example");
            std::env::remove_var("SUPABASE_ANON_KEY");
        }
        let cfg = resolve_backend(Some("https://settings.example"), Some("key")).unwrap();
        assert_eq!(cfg.url, "https://forced.example");
        assert_eq!(cfg.anon_key, "key");

        unsafe {
            std::env::remove_var("SUPABASE_URL");
        }
        assert_eq!(resolve_backend(None, Some("key")), None);
        assert_eq!(resolve_backend(Some("https://x"), Some("  ")), None);

        unsafe {
            if let Some(v) = prev {
                std::env::set_var("SUPABASE_URL", v);
            }
            if let Some(v) = prev_key {
                std::env::set_var("SUPABASE_ANON_KEY", v);
            }
        }
    }
}
