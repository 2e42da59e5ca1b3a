//! Domain records and request selectors for the Game API.
//!
//! # Design
//! Records are built from a `Payload` rather than derived with serde, because
//! the API sends most numbers and booleans as strings and omits fields
//! freely. Each `from_payload` reads through the lenient accessors, so a
//! missing field becomes the documented default instead of a parse failure.
//! Records still derive `Serialize` so the FFI layer can hand them to hosts
//! as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::payload::Payload;

/// Every request kind the client can issue. Each `ApiRequest` carries one so
/// the response is routed to the right event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Action {
    UserAuth = 0,
    AutoLogin = 1,
    UserFetch = 2,
    UsersFetch = 3,
    UserFriendlist = 4,
    SessionOpen = 5,
    SessionPing = 6,
    SessionClose = 7,
    SessionCheck = 8,
    TrophiesFetch = 9,
    TrophiesAdd = 10,
    TrophiesRemove = 11,
    ScoresFetch = 12,
    ScoresAdd = 13,
    ScoresTable = 14,
    ScoresRank = 15,
    DataStoreFetch = 16,
    DataStoreSet = 17,
    DataStoreUpdate = 18,
    DataStoreRemove = 19,
    DataStoreKeys = 20,
    Time = 21,
    Other = 22,
}

impl Action {
    /// Human-readable label, used in log lines and error messages.
    pub fn label(self) -> &'static str {
        match self {
            Action::UserAuth => "authorize user",
            Action::AutoLogin => "automatic login",
            Action::UserFetch => "fetch current user",
            Action::UsersFetch => "fetch users",
            Action::UserFriendlist => "fetch friendlist",
            Action::SessionOpen => "open session",
            Action::SessionPing => "ping session",
            Action::SessionClose => "close session",
            Action::SessionCheck => "check session",
            Action::TrophiesFetch => "fetch trophies",
            Action::TrophiesAdd => "reward trophy",
            Action::TrophiesRemove => "remove rewarded trophy",
            Action::ScoresFetch => "fetch scores",
            Action::ScoresAdd => "add score",
            Action::ScoresTable => "fetch score tables",
            Action::ScoresRank => "fetch rank",
            Action::DataStoreFetch => "fetch data",
            Action::DataStoreSet => "set data",
            Action::DataStoreUpdate => "update data",
            Action::DataStoreRemove => "remove data",
            Action::DataStoreKeys => "fetch keys",
            Action::Time => "fetch server time",
            Action::Other => "other",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Which trophies to fetch for the current user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrophyFilter {
    #[default]
    All,
    Achieved,
    Unachieved,
}

/// Status reported when pinging a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Active,
    Idle,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Idle => "idle",
        }
    }
}

/// Scope of a data-store key: shared by the whole game or private to the
/// logged-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataStore {
    #[default]
    Global,
    User,
}

/// Server-side operation applied by `data-store/update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOperation {
    Add,
    Subtract,
    Multiply,
    Divide,
    Append,
    Prepend,
}

impl DataOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            DataOperation::Add => "add",
            DataOperation::Subtract => "subtract",
            DataOperation::Multiply => "multiply",
            DataOperation::Divide => "divide",
            DataOperation::Append => "append",
            DataOperation::Prepend => "prepend",
        }
    }
}

/// A GameJolt user profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    pub id: i64,
    pub user_type: String,
    pub username: String,
    pub avatar_url: String,
    pub signed_up: String,
    pub signed_up_timestamp: i64,
    pub last_logged_in: String,
    pub last_logged_in_timestamp: i64,
    pub status: String,
    pub developer_name: String,
    pub developer_website: String,
    pub developer_description: String,
}

impl UserInfo {
    pub fn from_payload(p: &Payload) -> Self {
        Self {
            id: p.get_int("id"),
            user_type: p.get_string("type"),
            username: p.get_string("username"),
            avatar_url: p.get_string("avatar_url"),
            signed_up: p.get_string("signed_up"),
            signed_up_timestamp: p.get_int("signed_up_timestamp"),
            last_logged_in: p.get_string("last_logged_in"),
            last_logged_in_timestamp: p.get_int("last_logged_in_timestamp"),
            status: p.get_string("status"),
            developer_name: p.get_string_or_default("developer_name"),
            developer_website: p.get_string_or_default("developer_website"),
            developer_description: p.get_string_or_default("developer_description"),
        }
    }
}

/// A trophy and whether the current user has achieved it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrophyInfo {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub difficulty: String,
    pub image_url: String,
    /// `"false"` when not achieved, otherwise a relative time such as
    /// `"3 days ago"`.
    pub achieved: String,
}

impl TrophyInfo {
    pub fn from_payload(p: &Payload) -> Self {
        Self {
            id: p.get_int("id"),
            title: p.get_string("title"),
            description: p.get_string("description"),
            difficulty: p.get_string("difficulty"),
            image_url: p.get_string("image_url"),
            achieved: p.get_string("achieved"),
        }
    }

    pub fn is_achieved(&self) -> bool {
        !self.achieved.is_empty() && !self.achieved.eq_ignore_ascii_case("false")
    }
}

/// One entry of a scoreboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScoreInfo {
    pub score: String,
    pub sort: i64,
    pub extra_data: String,
    pub user: String,
    pub user_id: i64,
    pub guest: String,
    pub stored: String,
    pub stored_timestamp: i64,
    pub timestamp: Option<DateTime<Utc>>,
}

impl ScoreInfo {
    pub fn from_payload(p: &Payload) -> Self {
        let stored_timestamp = p.get_int_or_default("stored_timestamp");
        Self {
            score: p.get_string("score"),
            sort: p.get_int("sort"),
            extra_data: p.get_string_or_default("extra_data"),
            user: p.get_string_or_default("user"),
            user_id: p.get_int_or_default("user_id"),
            guest: p.get_string_or_default("guest"),
            stored: p.get_string("stored"),
            stored_timestamp,
            timestamp: DateTime::from_timestamp(stored_timestamp, 0).filter(|_| stored_timestamp > 0),
        }
    }

    /// Display name of whoever posted the score.
    pub fn display_name(&self) -> &str {
        if self.user.is_empty() {
            &self.guest
        } else {
            &self.user
        }
    }
}

/// A scoreboard table of the game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScoreTableInfo {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub primary: bool,
}

impl ScoreTableInfo {
    pub fn from_payload(p: &Payload) -> Self {
        Self {
            id: p.get_int("id"),
            name: p.get_string("name"),
            description: p.get_string("description"),
            primary: p.get_bool("primary"),
        }
    }
}

/// A value read from the data store. `as_int` is set when the stored string
/// parses as an integer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DataValue {
    pub key: String,
    pub data: String,
    pub as_int: Option<i64>,
}

impl DataValue {
    pub fn new(key: impl Into<String>, data: impl Into<String>) -> Self {
        let data = data.into();
        let as_int = data.trim().parse().ok();
        Self {
            key: key.into(),
            data,
            as_int,
        }
    }
}

/// Filters for `GameJoltClient::build_fetch_scoreboard`. Zero or `None`
/// leaves the parameter out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreQuery {
    /// Number of scores to return. The API defaults to 10 and caps at 100.
    pub limit: u32,
    pub table_id: u32,
    pub better_than: Option<i64>,
    pub worse_than: Option<i64>,
    /// Restrict results to the logged-in user.
    pub only_user: bool,
}

/// A score to submit with `GameJoltClient::build_add_score`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewScore {
    /// Display string, e.g. `"234 Jumps"`.
    pub score: String,
    /// Sort value all ordering works off, e.g. `234`.
    pub sort: i64,
    /// Guest name, used only when no user is logged in.
    pub guest: String,
    /// Hidden data stored with the score.
    pub extra_data: String,
    /// Target table, `0` for the primary table.
    pub table_id: u32,
}
