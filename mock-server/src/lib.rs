//! In-memory stand-in for the GameJolt Game API.
//!
//! Serves the v1_2 endpoints under `/api/game/v1_2` with the same quirks as
//! the real service: every answer is HTTP 200 wrapped in `{"response": ..}`,
//! booleans and numbers are strings, and failures carry
//! `success: "false"` plus a `message`. Every request must be signed with
//! `md5(url + private_key)`.

mod state;

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Query, Request, State},
    http::{header, HeaderMap, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::{Datelike, Timelike, Utc};
use md5::{Digest, Md5};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, warn};

pub use state::{
    apply_operation, matches_pattern, MockScore, MockState, MockTable, MockTrophy, MockUser, Store,
    GAME_ID, PRIVATE_KEY,
};

pub const API_ROOT: &str = "/api/game/v1_2";

pub type Db = Arc<RwLock<MockState>>;
type Params = HashMap<String, String>;
type ApiResult = Result<Json<Value>, MockError>;

/// Failures reported to the client as `success: "false"`.
#[derive(Debug, thiserror::Error)]
pub enum MockError {
    #[error("The signature you entered for the request is invalid.")]
    InvalidSignature,
    #[error("The game ID you passed in does not point to a valid game.")]
    NoSuchGame,
    #[error("You must enter the {0} parameter.")]
    MissingParam(&'static str),
    #[error("The {0} parameter is not valid.")]
    InvalidParam(&'static str),
    #[error("No such user could be found.")]
    NoSuchUser,
    #[error("Incorrect trophy ID: {0}.")]
    NoSuchTrophy(u64),
    #[error("The user already has this trophy.")]
    AlreadyAchieved,
    #[error("The user does not have this trophy.")]
    NotAchieved,
    #[error("No open session for this user.")]
    NoSession,
    #[error("The table ID you passed in is not valid.")]
    NoSuchTable,
    #[error("You must pass in either a user or a guest.")]
    NoUserOrGuest,
    #[error("There is no item with the key passed in.")]
    NoSuchKey,
    #[error("The stored value and the operand must both be integers.")]
    NotNumeric,
    #[error("Invalid operation: {0}.")]
    InvalidOperation(String),
}

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        debug!("rejecting request: {self}");
        Json(json!({
            "response": {
                "success": "false",
                "message": self.to_string(),
            }
        }))
        .into_response()
    }
}

/// Router over the default fixtures (see `MockState::with_fixtures`).
pub fn app() -> Router {
    app_with(MockState::with_fixtures())
}

pub fn app_with(state: MockState) -> Router {
    let db: Db = Arc::new(RwLock::new(state));
    let api = Router::new()
        .route("/users/", post(users).get(users))
        .route("/users/auth/", post(auth).get(auth))
        .route("/friends/", post(friends).get(friends))
        .route("/sessions/open/", post(open_session).get(open_session))
        .route("/sessions/ping/", post(ping_session).get(ping_session))
        .route("/sessions/close/", post(close_session).get(close_session))
        .route("/sessions/check/", post(check_session).get(check_session))
        .route("/time/", post(time).get(time))
        .route("/trophies/", post(trophies).get(trophies))
        .route("/trophies/add-achieved/", post(add_achieved).get(add_achieved))
        .route("/trophies/remove-achieved/", post(remove_achieved).get(remove_achieved))
        .route("/scores/", post(scores).get(scores))
        .route("/scores/add/", post(add_score).get(add_score))
        .route("/scores/tables/", post(tables).get(tables))
        .route("/scores/get-rank/", post(rank).get(rank))
        .route("/data-store/", post(fetch_data).get(fetch_data))
        .route("/data-store/set/", post(set_data).get(set_data))
        .route("/data-store/update/", post(update_data).get(update_data))
        .route("/data-store/remove/", post(remove_data).get(remove_data))
        .route("/data-store/get-keys/", post(get_keys).get(get_keys));

    Router::new()
        .nest(API_ROOT, api)
        .layer(middleware::from_fn_with_state(db.clone(), verify_signature))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Lowercase hex `md5(url + private_key)`.
pub fn signature(url: &str, private_key: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(url.as_bytes());
    hasher.update(private_key.as_bytes());
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// Signature check
// ---------------------------------------------------------------------------

async fn verify_signature(State(db): State<Db>, request: Request, next: Next) -> Response {
    let verdict = check_signature(&*db.read().await, request.uri(), request.headers());
    match verdict {
        Ok(()) => next.run(request).await,
        Err(e) => {
            warn!(uri = %request.uri(), "{e}");
            e.into_response()
        }
    }
}

fn check_signature(state: &MockState, uri: &Uri, headers: &HeaderMap) -> Result<(), MockError> {
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let (unsigned, given) = path_and_query
        .rsplit_once("&signature=")
        .ok_or(MockError::MissingParam("signature"))?;
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| uri.authority().map(|a| a.as_str()))
        .unwrap_or_default();
    let valid = ["http", "https"].iter().any(|scheme| {
        signature(&format!("{scheme}://{host}{unsigned}"), &state.private_key) == given
    });
    if !valid {
        return Err(MockError::InvalidSignature);
    }

    let Query(params) =
        Query::<Params>::try_from_uri(uri).map_err(|_| MockError::InvalidParam("query"))?;
    match params.get("game_id").map(|id| id.parse::<u32>()) {
        Some(Ok(id)) if id == state.game_id => Ok(()),
        Some(_) => Err(MockError::NoSuchGame),
        None => Err(MockError::MissingParam("game_id")),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Wrap `fields` as a successful response.
fn respond(mut fields: Value) -> Json<Value> {
    if let Value::Object(map) = &mut fields {
        map.insert("success".to_string(), json!("true"));
    }
    Json(json!({ "response": fields }))
}

fn success() -> Json<Value> {
    respond(json!({}))
}

fn param<'a>(params: &'a Params, key: &'static str) -> Result<&'a str, MockError> {
    params
        .get(key)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .ok_or(MockError::MissingParam(key))
}

fn number<T: std::str::FromStr>(params: &Params, key: &'static str) -> Result<Option<T>, MockError> {
    params
        .get(key)
        .filter(|v| !v.is_empty())
        .map(|v| v.parse().map_err(|_| MockError::InvalidParam(key)))
        .transpose()
}

fn id_list(params: &Params, key: &'static str) -> Result<Vec<u64>, MockError> {
    param(params, key)?
        .split(',')
        .map(|id| id.trim().parse().map_err(|_| MockError::InvalidParam(key)))
        .collect()
}

fn authenticate(state: &MockState, params: &Params) -> Result<u64, MockError> {
    state.authenticate(param(params, "username")?, param(params, "user_token")?)
}

/// User store when credentials are present, otherwise the global store.
fn data_store(state: &MockState, params: &Params) -> Result<Store, MockError> {
    if params.contains_key("username") {
        Ok(Store::User(authenticate(state, params)?))
    } else {
        Ok(Store::Global)
    }
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

async fn auth(State(db): State<Db>, Query(p): Query<Params>) -> ApiResult {
    authenticate(&*db.read().await, &p)?;
    Ok(success())
}

async fn users(State(db): State<Db>, Query(p): Query<Params>) -> ApiResult {
    let state = db.read().await;
    let users: Vec<&MockUser> = if p.contains_key("user_id") {
        id_list(&p, "user_id")?
            .into_iter()
            .filter_map(|id| state.user(id))
            .collect()
    } else {
        let name = param(&p, "username")?;
        state.user_by_name(name).into_iter().collect()
    };
    if users.is_empty() {
        return Err(MockError::NoSuchUser);
    }
    let users: Vec<Value> = users
        .iter()
        .map(|u| {
            let mut v = json!(u);
            v["id"] = json!(u.id.to_string());
            v
        })
        .collect();
    Ok(respond(json!({ "users": users })))
}

async fn friends(State(db): State<Db>, Query(p): Query<Params>) -> ApiResult {
    let state = db.read().await;
    let id = authenticate(&state, &p)?;
    let friends: Vec<Value> = state
        .user(id)
        .map(|u| u.friends.clone())
        .unwrap_or_default()
        .into_iter()
        .map(|f| json!({ "friend_id": f.to_string() }))
        .collect();
    Ok(respond(json!({ "friends": friends })))
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

async fn open_session(State(db): State<Db>, Query(p): Query<Params>) -> ApiResult {
    let mut state = db.write().await;
    let id = authenticate(&state, &p)?;
    state.sessions.insert(id);
    Ok(success())
}

async fn ping_session(State(db): State<Db>, Query(p): Query<Params>) -> ApiResult {
    let state = db.read().await;
    let id = authenticate(&state, &p)?;
    if let Some(status) = p.get("status") {
        if status != "active" && status != "idle" {
            return Err(MockError::InvalidParam("status"));
        }
    }
    if !state.sessions.contains(&id) {
        return Err(MockError::NoSession);
    }
    Ok(success())
}

async fn close_session(State(db): State<Db>, Query(p): Query<Params>) -> ApiResult {
    let mut state = db.write().await;
    let id = authenticate(&state, &p)?;
    if !state.sessions.remove(&id) {
        return Err(MockError::NoSession);
    }
    Ok(success())
}

/// Answers `success: "false"` with no message when the session is closed.
async fn check_session(State(db): State<Db>, Query(p): Query<Params>) -> ApiResult {
    let state = db.read().await;
    let id = authenticate(&state, &p)?;
    let open = state.sessions.contains(&id);
    Ok(Json(json!({ "response": { "success": bool_str(open) } })))
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

async fn time() -> ApiResult {
    let now = Utc::now();
    Ok(respond(json!({
        "timestamp": now.timestamp(),
        "timezone": "UTC",
        "year": now.year(),
        "month": now.month(),
        "day": now.day(),
        "hour": now.hour(),
        "minute": now.minute(),
        "second": now.second(),
    })))
}

// ---------------------------------------------------------------------------
// Trophies
// ---------------------------------------------------------------------------

async fn trophies(State(db): State<Db>, Query(p): Query<Params>) -> ApiResult {
    let state = db.read().await;
    let user = authenticate(&state, &p)?;
    let achieved_filter = match p.get("achieved").map(String::as_str) {
        None | Some("") => None,
        Some("true") => Some(true),
        Some("false") => Some(false),
        Some(_) => return Err(MockError::InvalidParam("achieved")),
    };
    let ids = if p.contains_key("trophy_id") {
        Some(id_list(&p, "trophy_id")?)
    } else {
        None
    };
    let trophies: Vec<Value> = state
        .trophies
        .iter()
        .filter(|t| ids.as_ref().map_or(true, |ids| ids.contains(&t.id)))
        .map(|t| (t, state.achieved.contains(&(user, t.id))))
        .filter(|(_, achieved)| achieved_filter.map_or(true, |want| want == *achieved))
        .map(|(t, achieved)| {
            json!({
                "id": t.id.to_string(),
                "title": t.title,
                "description": t.description,
                "difficulty": t.difficulty,
                "image_url": format!("https://m.gjcdn.net/trophy-thumbnail/{}.png", t.id),
                "achieved": if achieved { "Just now" } else { "false" },
            })
        })
        .collect();
    Ok(respond(json!({ "trophies": trophies })))
}

async fn add_achieved(State(db): State<Db>, Query(p): Query<Params>) -> ApiResult {
    let mut state = db.write().await;
    let user = authenticate(&state, &p)?;
    let trophy = number(&p, "trophy_id")?.ok_or(MockError::MissingParam("trophy_id"))?;
    state.trophy(trophy)?;
    if !state.achieved.insert((user, trophy)) {
        return Err(MockError::AlreadyAchieved);
    }
    Ok(success())
}

async fn remove_achieved(State(db): State<Db>, Query(p): Query<Params>) -> ApiResult {
    let mut state = db.write().await;
    let user = authenticate(&state, &p)?;
    let trophy = number(&p, "trophy_id")?.ok_or(MockError::MissingParam("trophy_id"))?;
    state.trophy(trophy)?;
    if !state.achieved.remove(&(user, trophy)) {
        return Err(MockError::NotAchieved);
    }
    Ok(success())
}

// ---------------------------------------------------------------------------
// Scores
// ---------------------------------------------------------------------------

async fn scores(State(db): State<Db>, Query(p): Query<Params>) -> ApiResult {
    let state = db.read().await;
    let table = state.table(number(&p, "table_id")?)?;
    let only_user = if p.contains_key("username") {
        Some(authenticate(&state, &p)?)
    } else {
        None
    };
    let limit = number::<usize>(&p, "limit")?.unwrap_or(10).clamp(1, 100);
    let better_than: Option<i64> = number(&p, "better_than")?;
    let worse_than: Option<i64> = number(&p, "worse_than")?;

    let scores: Vec<Value> = state
        .ranked(table.id)
        .into_iter()
        .filter(|s| only_user.is_none() || s.user_id == only_user)
        .filter(|s| better_than.map_or(true, |b| s.sort > b))
        .filter(|s| worse_than.map_or(true, |w| s.sort < w))
        .take(limit)
        .map(|s| {
            let user = s.user_id.and_then(|id| state.user(id));
            json!({
                "score": s.score,
                "sort": s.sort.to_string(),
                "extra_data": s.extra_data,
                "user": user.map(|u| u.username.clone()).unwrap_or_default(),
                "user_id": s.user_id.map(|id| id.to_string()).unwrap_or_default(),
                "guest": s.guest,
                "stored": "Just now",
                "stored_timestamp": s.stored_timestamp,
            })
        })
        .collect();
    Ok(respond(json!({ "scores": scores })))
}

async fn add_score(State(db): State<Db>, Query(p): Query<Params>) -> ApiResult {
    let mut state = db.write().await;
    let score = param(&p, "score")?.to_string();
    let sort = number(&p, "sort")?.ok_or(MockError::MissingParam("sort"))?;
    let (user_id, guest) = if p.contains_key("username") {
        (Some(authenticate(&state, &p)?), String::new())
    } else {
        let guest = param(&p, "guest").map_err(|_| MockError::NoUserOrGuest)?;
        (None, guest.to_string())
    };
    let table_id = state.table(number(&p, "table_id")?)?.id;
    state.scores.push(MockScore {
        table_id,
        score,
        sort,
        extra_data: p.get("extra_data").cloned().unwrap_or_default(),
        user_id,
        guest,
        stored_timestamp: Utc::now().timestamp(),
    });
    Ok(success())
}

async fn tables(State(db): State<Db>) -> ApiResult {
    let state = db.read().await;
    let tables: Vec<Value> = state
        .tables
        .iter()
        .map(|t| {
            json!({
                "id": t.id.to_string(),
                "name": t.name,
                "description": t.description,
                "primary": if t.primary { "1" } else { "" },
            })
        })
        .collect();
    Ok(respond(json!({ "tables": tables })))
}

async fn rank(State(db): State<Db>, Query(p): Query<Params>) -> ApiResult {
    let state = db.read().await;
    let sort = number(&p, "sort")?.ok_or(MockError::MissingParam("sort"))?;
    let table = state.table(number(&p, "table_id")?)?;
    Ok(respond(json!({ "rank": state.rank(table.id, sort) })))
}

// ---------------------------------------------------------------------------
// Data store
// ---------------------------------------------------------------------------

async fn fetch_data(State(db): State<Db>, Query(p): Query<Params>) -> ApiResult {
    let state = db.read().await;
    let store = data_store(&state, &p)?;
    let data = state.get_data(store, param(&p, "key")?)?;
    Ok(respond(json!({ "data": data })))
}

async fn set_data(State(db): State<Db>, Query(p): Query<Params>) -> ApiResult {
    let mut state = db.write().await;
    let store = data_store(&state, &p)?;
    let key = param(&p, "key")?.to_string();
    let data = p.get("data").cloned().ok_or(MockError::MissingParam("data"))?;
    state.store(store).insert(key, data);
    Ok(success())
}

async fn update_data(State(db): State<Db>, Query(p): Query<Params>) -> ApiResult {
    let mut state = db.write().await;
    let store = data_store(&state, &p)?;
    let key = param(&p, "key")?;
    let operation = param(&p, "operation")?;
    let value = param(&p, "value")?;
    let updated = apply_operation(state.get_data(store, key)?, operation, value)?;
    state.store(store).insert(key.to_string(), updated.clone());
    Ok(respond(json!({ "data": updated })))
}

async fn remove_data(State(db): State<Db>, Query(p): Query<Params>) -> ApiResult {
    let mut state = db.write().await;
    let store = data_store(&state, &p)?;
    let key = param(&p, "key")?;
    state.store(store).remove(key).ok_or(MockError::NoSuchKey)?;
    Ok(success())
}

async fn get_keys(State(db): State<Db>, Query(p): Query<Params>) -> ApiResult {
    let state = db.read().await;
    let store = data_store(&state, &p)?;
    let pattern = p.get("pattern").map(String::as_str).filter(|p| !p.is_empty());
    let keys: Vec<Value> = state
        .data
        .get(&store)
        .into_iter()
        .flat_map(|s| s.keys())
        .filter(|k| pattern.map_or(true, |pat| matches_pattern(pat, k)))
        .map(|k| json!({ "key": k }))
        .collect();
    Ok(respond(json!({ "keys": keys })))
}
