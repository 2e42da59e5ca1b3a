//! Typed results of handled responses and the callback surface that
//! receives them.
//!
//! # Design
//! `Event` has one variant per response kind. `EventHandler` has one method
//! per variant, each with an empty default body, so a host implements only
//! what it listens to. `dispatch` fires the specific method first, then the
//! generic `on_result`; failures go to `on_failed` alone.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::ApiError;
use crate::payload::Payload;
use crate::types::{Action, DataValue, ScoreInfo, ScoreTableInfo, TrophyInfo, UserInfo};

/// The typed outcome of one successful round trip.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum Event {
    UserAuthorized(bool),
    AutoLogin(bool),
    UserFetched(UserInfo),
    UsersFetched(Vec<UserInfo>),
    FriendlistFetched(Vec<u64>),
    SessionOpened(bool),
    SessionPinged(bool),
    SessionClosed(bool),
    SessionChecked(bool),
    TrophiesFetched(Vec<TrophyInfo>),
    TrophyRewarded(bool),
    TrophyRemoved(bool),
    ScoreAdded(bool),
    ScoreboardFetched(Vec<ScoreInfo>),
    ScoreboardTablesFetched(Vec<ScoreTableInfo>),
    RankFetched(i64),
    TimeFetched(NaiveDateTime),
    DataFetched(DataValue),
    DataSet(bool),
    DataUpdated(DataValue),
    DataRemoved(bool),
    KeysFetched(Vec<String>),
    Other(Payload),
}

impl Event {
    /// The request kind that produces this event.
    pub fn action(&self) -> Action {
        match self {
            Event::UserAuthorized(_) => Action::UserAuth,
            Event::AutoLogin(_) => Action::AutoLogin,
            Event::UserFetched(_) => Action::UserFetch,
            Event::UsersFetched(_) => Action::UsersFetch,
            Event::FriendlistFetched(_) => Action::UserFriendlist,
            Event::SessionOpened(_) => Action::SessionOpen,
            Event::SessionPinged(_) => Action::SessionPing,
            Event::SessionClosed(_) => Action::SessionClose,
            Event::SessionChecked(_) => Action::SessionCheck,
            Event::TrophiesFetched(_) => Action::TrophiesFetch,
            Event::TrophyRewarded(_) => Action::TrophiesAdd,
            Event::TrophyRemoved(_) => Action::TrophiesRemove,
            Event::ScoreAdded(_) => Action::ScoresAdd,
            Event::ScoreboardFetched(_) => Action::ScoresFetch,
            Event::ScoreboardTablesFetched(_) => Action::ScoresTable,
            Event::RankFetched(_) => Action::ScoresRank,
            Event::TimeFetched(_) => Action::Time,
            Event::DataFetched(_) => Action::DataStoreFetch,
            Event::DataSet(_) => Action::DataStoreSet,
            Event::DataUpdated(_) => Action::DataStoreUpdate,
            Event::DataRemoved(_) => Action::DataStoreRemove,
            Event::KeysFetched(_) => Action::DataStoreKeys,
            Event::Other(_) => Action::Other,
        }
    }
}

/// Callbacks for handled responses. Every method defaults to a no-op.
#[allow(unused_variables)]
pub trait EventHandler {
    fn on_user_authorized(&mut self, logged_in: bool) {}
    fn on_auto_login(&mut self, logged_in: bool) {}
    fn on_user_fetched(&mut self, user: &UserInfo) {}
    fn on_users_fetched(&mut self, users: &[UserInfo]) {}
    fn on_friendlist_fetched(&mut self, friend_ids: &[u64]) {}
    fn on_session_opened(&mut self, open: bool) {}
    fn on_session_pinged(&mut self, still_open: bool) {}
    fn on_session_closed(&mut self, closed: bool) {}
    fn on_session_checked(&mut self, open: bool) {}
    fn on_trophies_fetched(&mut self, trophies: &[TrophyInfo]) {}
    fn on_trophy_rewarded(&mut self, rewarded: bool) {}
    fn on_trophy_removed(&mut self, removed: bool) {}
    fn on_score_added(&mut self, added: bool) {}
    fn on_scoreboard_fetched(&mut self, scores: &[ScoreInfo]) {}
    fn on_scoreboard_tables_fetched(&mut self, tables: &[ScoreTableInfo]) {}
    fn on_rank_fetched(&mut self, rank: i64) {}
    fn on_time_fetched(&mut self, server_time: NaiveDateTime) {}
    fn on_data_fetched(&mut self, value: &DataValue) {}
    fn on_data_set(&mut self, stored: bool) {}
    fn on_data_updated(&mut self, value: &DataValue) {}
    fn on_data_removed(&mut self, removed: bool) {}
    fn on_keys_fetched(&mut self, keys: &[String]) {}
    fn on_other(&mut self, response: &Payload) {}

    /// Fired after the specific callback of every successful response.
    fn on_result(&mut self, event: &Event) {}

    /// Fired instead of any other callback when the round trip failed.
    fn on_failed(&mut self, error: &ApiError) {}
}

/// Route a handled response to `handler`.
pub fn dispatch<H: EventHandler + ?Sized>(handler: &mut H, result: &Result<Event, ApiError>) {
    let event = match result {
        Ok(event) => event,
        Err(err) => {
            handler.on_failed(err);
            return;
        }
    };
    match event {
        Event::UserAuthorized(v) => handler.on_user_authorized(*v),
        Event::AutoLogin(v) => handler.on_auto_login(*v),
        Event::UserFetched(user) => handler.on_user_fetched(user),
        Event::UsersFetched(users) => handler.on_users_fetched(users),
        Event::FriendlistFetched(ids) => handler.on_friendlist_fetched(ids),
        Event::SessionOpened(v) => handler.on_session_opened(*v),
        Event::SessionPinged(v) => handler.on_session_pinged(*v),
        Event::SessionClosed(v) => handler.on_session_closed(*v),
        Event::SessionChecked(v) => handler.on_session_checked(*v),
        Event::TrophiesFetched(trophies) => handler.on_trophies_fetched(trophies),
        Event::TrophyRewarded(v) => handler.on_trophy_rewarded(*v),
        Event::TrophyRemoved(v) => handler.on_trophy_removed(*v),
        Event::ScoreAdded(v) => handler.on_score_added(*v),
        Event::ScoreboardFetched(scores) => handler.on_scoreboard_fetched(scores),
        Event::ScoreboardTablesFetched(tables) => handler.on_scoreboard_tables_fetched(tables),
        Event::RankFetched(rank) => handler.on_rank_fetched(*rank),
        Event::TimeFetched(time) => handler.on_time_fetched(*time),
        Event::DataFetched(value) => handler.on_data_fetched(value),
        Event::DataSet(v) => handler.on_data_set(*v),
        Event::DataUpdated(value) => handler.on_data_updated(value),
        Event::DataRemoved(v) => handler.on_data_removed(*v),
        Event::KeysFetched(keys) => handler.on_keys_fetched(keys),
        Event::Other(payload) => handler.on_other(payload),
    }
    handler.on_result(event);
}
