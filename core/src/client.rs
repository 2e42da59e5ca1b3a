//! Signed request builder and response interpreter for the Game API.
//!
//! # Design
//! `GameJoltClient` owns the session (game credentials plus the current
//! user) and the outgoing payload tree, but never touches the network. Each
//! operation is split into a `build_*` method that produces an `ApiRequest`
//! and a single `handle` method that turns the matching `HttpResponse` into
//! an `Event`. The caller executes the round trip in between.
//!
//! Every `ApiRequest` carries the `Action` it was built for, so responses
//! are routed by the request they answer rather than by whichever request
//! was sent last. Several requests may be in flight at once.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, error, warn};

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::event::Event;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::payload::Payload;
use crate::session::{Credentials, Session, CREDENTIALS_FILE};
use crate::signing::{sign_url, Query};
use crate::types::{
    Action, DataOperation, DataStore, DataValue, NewScore, ScoreInfo, ScoreQuery, ScoreTableInfo,
    SessionStatus, TrophyFilter, TrophyInfo, UserInfo,
};

/// A signed HTTP request together with what it asks for.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub action: Action,
    pub http: HttpRequest,
    /// Data-store key the request targets, echoed into `DataValue`.
    pub data_key: Option<String>,
}

/// Client for one game. See the module docs for the build/handle split.
#[derive(Debug, Clone)]
pub struct GameJoltClient {
    api_url: String,
    session: Session,
    payload: Payload,
    last_response: Option<Payload>,
    auto_login: bool,
    credentials_path: PathBuf,
}

impl GameJoltClient {
    /// Client against the public API.
    pub fn new(game_id: u32, private_key: &str) -> Self {
        Self::from_config(&ClientConfig::new(game_id, private_key))
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            api_url: config.api_url(),
            session: Session::new(config.game_id, config.private_key.clone()),
            payload: Payload::new(),
            last_response: None,
            auto_login: config.auto_login,
            credentials_path: config
                .credentials_path
                .clone()
                .unwrap_or_else(|| PathBuf::from(CREDENTIALS_FILE)),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn username(&self) -> &str {
        self.session.username()
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_logged_in()
    }

    /// The kind of the most recently built request.
    pub fn last_action(&self) -> Option<Action> {
        self.session.last_action()
    }

    /// The most recently handled response body, replaced on every `handle`.
    pub fn last_response(&self) -> Option<&Payload> {
        self.last_response.as_ref()
    }

    /// Outgoing JSON body sent with every request. Empty by default.
    pub fn payload_mut(&mut self) -> &mut Payload {
        &mut self.payload
    }

    /// Forget the current user.
    pub fn log_off(&mut self) {
        debug!(username = %self.session.username, "logging off");
        self.session.log_off();
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    /// Authenticate `username` with `token`. The login flag is set once the
    /// response confirms it.
    ///
    /// Building replaces the stored user and clears the login flag right
    /// away, so a previously logged-in user counts as logged out until this
    /// request is handled, even if it is never sent.
    pub fn build_login(&mut self, username: &str, token: &str) -> Result<ApiRequest, ApiError> {
        self.login_request(Action::UserAuth, username, token)
    }

    pub fn build_auto_login(&mut self, credentials: &Credentials) -> Result<ApiRequest, ApiError> {
        self.login_request(Action::AutoLogin, &credentials.username, &credentials.token)
    }

    /// When auto-login is configured, read the credentials file and build the
    /// matching login request. `Ok(None)` means there is nothing to do.
    pub fn auto_login_request(&mut self) -> Result<Option<ApiRequest>, ApiError> {
        if !self.auto_login {
            return Ok(None);
        }
        match Credentials::load(&self.credentials_path)? {
            Some(credentials) => self.build_auto_login(&credentials).map(Some),
            None => Ok(None),
        }
    }

    fn login_request(
        &mut self,
        action: Action,
        username: &str,
        token: &str,
    ) -> Result<ApiRequest, ApiError> {
        if username.is_empty() || token.is_empty() {
            return Err(invalid(action, "username and token are required"));
        }
        self.session.set_user(username, token);
        let mut query = Query::new();
        query.push("username", username).push("user_token", token);
        self.request(action, "/users/auth/", query)
    }

    /// Fetch the profile of the current user.
    pub fn build_fetch_user(&mut self) -> Result<ApiRequest, ApiError> {
        if self.session.username.is_empty() {
            return Err(invalid(Action::UserFetch, "no username set"));
        }
        let mut query = Query::new();
        query.push("username", &self.session.username);
        self.request(Action::UserFetch, "/users/", query)
    }

    /// Fetch the profiles of the given user ids.
    pub fn build_fetch_users(&mut self, user_ids: &[u64]) -> Result<ApiRequest, ApiError> {
        if user_ids.is_empty() {
            return Err(invalid(Action::UsersFetch, "at least one user id is required"));
        }
        let mut query = Query::new();
        query.push("user_id", join_ids(user_ids));
        self.request(Action::UsersFetch, "/users/", query)
    }

    pub fn build_fetch_friendlist(&mut self) -> Result<ApiRequest, ApiError> {
        let query = self.user_query(Action::UserFriendlist)?;
        self.request(Action::UserFriendlist, "/friends/", query)
    }

    // -----------------------------------------------------------------------
    // Sessions
    // -----------------------------------------------------------------------

    /// Open a session. The caller pings it every 30-60 seconds.
    pub fn build_open_session(&mut self) -> Result<ApiRequest, ApiError> {
        let query = self.user_query(Action::SessionOpen)?;
        self.request(Action::SessionOpen, "/sessions/open/", query)
    }

    pub fn build_ping_session(&mut self, status: SessionStatus) -> Result<ApiRequest, ApiError> {
        let mut query = self.user_query(Action::SessionPing)?;
        query.push("status", status.as_str());
        self.request(Action::SessionPing, "/sessions/ping/", query)
    }

    pub fn build_close_session(&mut self) -> Result<ApiRequest, ApiError> {
        let query = self.user_query(Action::SessionClose)?;
        self.request(Action::SessionClose, "/sessions/close/", query)
    }

    /// Ask whether a session is open. An unsuccessful answer is a valid
    /// "closed" result, not a failure.
    pub fn build_check_session(&mut self) -> Result<ApiRequest, ApiError> {
        let query = self.user_query(Action::SessionCheck)?;
        self.request(Action::SessionCheck, "/sessions/check/", query)
    }

    // -----------------------------------------------------------------------
    // Misc
    // -----------------------------------------------------------------------

    pub fn build_fetch_server_time(&mut self) -> Result<ApiRequest, ApiError> {
        self.request(Action::Time, "/time/", Query::new())
    }

    /// Sign an arbitrary endpoint `path` (e.g. `/trophies/`) with extra
    /// parameters. The response is delivered as `Event::Other`.
    pub fn build_raw(
        &mut self,
        path: &str,
        params: &[(&str, &str)],
        append_user: bool,
    ) -> Result<ApiRequest, ApiError> {
        if !path.starts_with('/') {
            return Err(invalid(Action::Other, "path must start with '/'"));
        }
        let mut query = if append_user {
            self.user_query(Action::Other)?
        } else {
            Query::new()
        };
        for (key, value) in params {
            query.push(*key, value);
        }
        self.request(Action::Other, path, query)
    }

    // -----------------------------------------------------------------------
    // Trophies
    // -----------------------------------------------------------------------

    /// Fetch trophies for the current user. An empty id list means all.
    pub fn build_fetch_trophies(
        &mut self,
        filter: TrophyFilter,
        trophy_ids: &[u64],
    ) -> Result<ApiRequest, ApiError> {
        let mut query = self.user_query(Action::TrophiesFetch)?;
        match filter {
            TrophyFilter::All => {}
            TrophyFilter::Achieved => {
                query.push("achieved", "true");
            }
            TrophyFilter::Unachieved => {
                query.push("achieved", "false");
            }
        }
        if !trophy_ids.is_empty() {
            query.push("trophy_id", join_ids(trophy_ids));
        }
        self.request(Action::TrophiesFetch, "/trophies/", query)
    }

    pub fn build_fetch_all_trophies(&mut self, filter: TrophyFilter) -> Result<ApiRequest, ApiError> {
        self.build_fetch_trophies(filter, &[])
    }

    pub fn build_reward_trophy(&mut self, trophy_id: u64) -> Result<ApiRequest, ApiError> {
        let mut query = self.user_query(Action::TrophiesAdd)?;
        query.push("trophy_id", trophy_id);
        self.request(Action::TrophiesAdd, "/trophies/add-achieved/", query)
    }

    pub fn build_remove_trophy(&mut self, trophy_id: u64) -> Result<ApiRequest, ApiError> {
        let mut query = self.user_query(Action::TrophiesRemove)?;
        query.push("trophy_id", trophy_id);
        self.request(Action::TrophiesRemove, "/trophies/remove-achieved/", query)
    }

    // -----------------------------------------------------------------------
    // Scores
    // -----------------------------------------------------------------------

    /// Fetch scores. A logged-in user only sees their own scores; `only_user`
    /// makes that a precondition.
    pub fn build_fetch_scoreboard(&mut self, filter: &ScoreQuery) -> Result<ApiRequest, ApiError> {
        let mut query = Query::new();
        if filter.limit > 0 {
            query.push("limit", filter.limit);
        }
        if filter.table_id > 0 {
            query.push("table_id", filter.table_id);
        }
        if filter.only_user || self.session.logged_in {
            let user = self.user_query(Action::ScoresFetch)?;
            query.extend(user);
        }
        if let Some(better_than) = filter.better_than {
            query.push("better_than", better_than);
        }
        if let Some(worse_than) = filter.worse_than {
            query.push("worse_than", worse_than);
        }
        self.request(Action::ScoresFetch, "/scores/", query)
    }

    /// Submit a score for the logged-in user, or for `score.guest` when no
    /// user is logged in.
    pub fn build_add_score(&mut self, score: &NewScore) -> Result<ApiRequest, ApiError> {
        if score.score.is_empty() {
            return Err(invalid(Action::ScoresAdd, "score string is required"));
        }
        let mut query = Query::new();
        query.push("score", &score.score).push("sort", score.sort);
        if self.session.logged_in {
            query
                .push("username", &self.session.username)
                .push("user_token", &self.session.user_token);
        } else if score.guest.is_empty() {
            return Err(invalid(Action::ScoresAdd, "guest name is required without a logged-in user"));
        } else {
            query.push("guest", &score.guest);
        }
        query.push_non_empty("extra_data", &score.extra_data);
        if score.table_id > 0 {
            query.push("table_id", score.table_id);
        }
        self.request(Action::ScoresAdd, "/scores/add/", query)
    }

    pub fn build_fetch_tables(&mut self) -> Result<ApiRequest, ApiError> {
        self.request(Action::ScoresTable, "/scores/tables/", Query::new())
    }

    /// Rank `sort` would have on a table (`0` for the primary table).
    pub fn build_fetch_rank(&mut self, sort: i64, table_id: u32) -> Result<ApiRequest, ApiError> {
        let mut query = Query::new();
        query.push("sort", sort);
        if table_id > 0 {
            query.push("table_id", table_id);
        }
        self.request(Action::ScoresRank, "/scores/get-rank/", query)
    }

    // -----------------------------------------------------------------------
    // Data store
    // -----------------------------------------------------------------------

    pub fn build_fetch_data(&mut self, store: DataStore, key: &str) -> Result<ApiRequest, ApiError> {
        let query = self.data_query(Action::DataStoreFetch, store, key)?;
        self.data_request(Action::DataStoreFetch, "/data-store/", query, key)
    }

    pub fn build_set_data(
        &mut self,
        store: DataStore,
        key: &str,
        data: &str,
    ) -> Result<ApiRequest, ApiError> {
        let mut query = self.data_query(Action::DataStoreSet, store, key)?;
        query.push("data", data);
        self.data_request(Action::DataStoreSet, "/data-store/set/", query, key)
    }

    pub fn build_update_data(
        &mut self,
        store: DataStore,
        key: &str,
        operation: DataOperation,
        value: &str,
    ) -> Result<ApiRequest, ApiError> {
        let mut query = self.data_query(Action::DataStoreUpdate, store, key)?;
        query.push("operation", operation.as_str()).push("value", value);
        self.data_request(Action::DataStoreUpdate, "/data-store/update/", query, key)
    }

    pub fn build_remove_data(&mut self, store: DataStore, key: &str) -> Result<ApiRequest, ApiError> {
        let query = self.data_query(Action::DataStoreRemove, store, key)?;
        self.data_request(Action::DataStoreRemove, "/data-store/remove/", query, key)
    }

    /// List keys of a store, optionally filtered by a `*` wildcard pattern.
    pub fn build_fetch_keys(
        &mut self,
        store: DataStore,
        pattern: Option<&str>,
    ) -> Result<ApiRequest, ApiError> {
        let mut query = match store {
            DataStore::Global => Query::new(),
            DataStore::User => self.user_query(Action::DataStoreKeys)?,
        };
        if let Some(pattern) = pattern {
            query.push_non_empty("pattern", pattern);
        }
        self.request(Action::DataStoreKeys, "/data-store/get-keys/", query)
    }

    fn data_query(&self, action: Action, store: DataStore, key: &str) -> Result<Query, ApiError> {
        if key.is_empty() {
            return Err(invalid(action, "data key is required"));
        }
        let mut query = match store {
            DataStore::Global => Query::new(),
            DataStore::User => self.user_query(action)?,
        };
        query.push("key", key);
        Ok(query)
    }

    fn data_request(
        &mut self,
        action: Action,
        path: &str,
        query: Query,
        key: &str,
    ) -> Result<ApiRequest, ApiError> {
        let mut request = self.request(action, path, query)?;
        request.data_key = Some(key.to_string());
        Ok(request)
    }

    // -----------------------------------------------------------------------
    // Request assembly
    // -----------------------------------------------------------------------

    /// `username` + `user_token` for endpoints that need a logged-in user.
    fn user_query(&self, action: Action) -> Result<Query, ApiError> {
        if !self.session.logged_in {
            error!(%action, "user is not logged in");
            return Err(ApiError::NotLoggedIn);
        }
        let mut query = Query::new();
        query
            .push("username", &self.session.username)
            .push("user_token", &self.session.user_token);
        Ok(query)
    }

    fn request(&mut self, action: Action, path: &str, query: Query) -> Result<ApiRequest, ApiError> {
        if let Err(e) = self.session.ensure_configured() {
            error!(%action, "you must set your game's id and private key before using the API: {e}");
            return Err(e);
        }
        let mut url = format!(
            "{}{path}?format=json&game_id={}",
            self.api_url, self.session.game_id
        );
        if !query.is_empty() {
            url.push('&');
            url.push_str(&query.encode());
        }
        debug!(%action, url = %url, "signing request");
        let signed = sign_url(&url, &self.session.private_key);
        self.session.last_action = Some(action);
        Ok(ApiRequest {
            action,
            http: HttpRequest {
                method: HttpMethod::Post,
                url: signed,
                headers: vec![("content-type".to_string(), "application/json".to_string())],
                body: Some(self.payload.to_json_string()),
            },
            data_key: None,
        })
    }

    // -----------------------------------------------------------------------
    // Response handling
    // -----------------------------------------------------------------------

    /// Interpret the response to `request`. Updates the login flag for
    /// login requests and replaces `last_response`.
    pub fn handle(&mut self, request: &ApiRequest, response: HttpResponse) -> Result<Event, ApiError> {
        let result = self.interpret(request, response);
        if let Err(e) = &result {
            warn!(action = %request.action, "request failed: {e}");
        }
        result
    }

    fn interpret(&mut self, request: &ApiRequest, response: HttpResponse) -> Result<Event, ApiError> {
        let action = request.action;
        if !response.is_success() {
            self.last_response = Some(Payload::parse_lenient(&response.body));
            return Err(ApiError::HttpError {
                status: response.status,
                body: response.body,
            });
        }
        let payload = match Payload::parse(&response.body) {
            Ok(payload) => payload,
            Err(e) => {
                self.last_response = Some(Payload::unparsed(&response.body));
                return Err(e);
            }
        };
        let body = payload.get_object("response");
        self.last_response = Some(payload);
        let body = body.ok_or(ApiError::MissingField("response"))?;

        let success = body.get_bool("success");
        if !success && action != Action::SessionCheck {
            if matches!(action, Action::UserAuth | Action::AutoLogin) {
                self.session.logged_in = false;
            }
            let message = body.get_string_or_default("message");
            return Err(ApiError::Rejected { action, message });
        }

        let event = match action {
            Action::UserAuth => {
                self.session.logged_in = true;
                Event::UserAuthorized(true)
            }
            Action::AutoLogin => {
                self.session.logged_in = true;
                Event::AutoLogin(true)
            }
            Action::UserFetch => {
                let user = users(&body)
                    .into_iter()
                    .next()
                    .ok_or(ApiError::MissingField("users"))?;
                Event::UserFetched(user)
            }
            Action::UsersFetch => Event::UsersFetched(users(&body)),
            Action::UserFriendlist => Event::FriendlistFetched(
                body.get_object_array("friends")
                    .iter()
                    .filter_map(|f| u64::try_from(f.get_int("friend_id")).ok())
                    .collect(),
            ),
            Action::SessionOpen => Event::SessionOpened(success),
            Action::SessionPing => Event::SessionPinged(success),
            Action::SessionClose => Event::SessionClosed(success),
            Action::SessionCheck => Event::SessionChecked(success),
            Action::TrophiesFetch => Event::TrophiesFetched(
                body.get_object_array("trophies")
                    .iter()
                    .map(TrophyInfo::from_payload)
                    .collect(),
            ),
            Action::TrophiesAdd => Event::TrophyRewarded(success),
            Action::TrophiesRemove => Event::TrophyRemoved(success),
            Action::ScoresFetch => Event::ScoreboardFetched(
                body.get_object_array("scores")
                    .iter()
                    .map(ScoreInfo::from_payload)
                    .collect(),
            ),
            Action::ScoresAdd => Event::ScoreAdded(success),
            Action::ScoresTable => Event::ScoreboardTablesFetched(
                body.get_object_array("tables")
                    .iter()
                    .map(ScoreTableInfo::from_payload)
                    .collect(),
            ),
            Action::ScoresRank => Event::RankFetched(body.get_int("rank")),
            Action::Time => Event::TimeFetched(server_time(&body)?),
            Action::DataStoreFetch => Event::DataFetched(data_value(request, &body)),
            Action::DataStoreSet => Event::DataSet(success),
            Action::DataStoreUpdate => Event::DataUpdated(data_value(request, &body)),
            Action::DataStoreRemove => Event::DataRemoved(success),
            Action::DataStoreKeys => Event::KeysFetched(
                body.get_object_array("keys")
                    .iter()
                    .map(|k| k.get_string("key"))
                    .collect(),
            ),
            Action::Other => Event::Other(body),
        };
        debug!(%action, "request succeeded");
        Ok(event)
    }
}

fn invalid(action: Action, reason: &str) -> ApiError {
    error!(%action, "{reason}");
    ApiError::InvalidArgument(format!("{action}: {reason}"))
}

fn join_ids(ids: &[u64]) -> String {
    ids.iter().map(u64::to_string).collect::<Vec<_>>().join(",")
}

fn users(body: &Payload) -> Vec<UserInfo> {
    body.get_object_array("users")
        .iter()
        .map(UserInfo::from_payload)
        .collect()
}

fn data_value(request: &ApiRequest, body: &Payload) -> DataValue {
    DataValue::new(request.data_key.clone().unwrap_or_default(), body.get_string("data"))
}

fn server_time(body: &Payload) -> Result<NaiveDateTime, ApiError> {
    let part = |key: &str| u32::try_from(body.get_int(key)).ok();
    let year = i32::try_from(body.get_int("year")).ok();
    year.zip(part("month"))
        .zip(part("day"))
        .and_then(|((y, m), d)| NaiveDate::from_ymd_opt(y, m, d))
        .and_then(|date| date.and_hms_opt(part("hour")?, part("minute")?, part("second")?))
        .ok_or_else(|| ApiError::DeserializationError("server time is not a valid date".to_string()))
}
