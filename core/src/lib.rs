//! Client core for the GameJolt Game API.
//!
//! # Overview
//! Builds signed `HttpRequest` values and interprets `HttpResponse` values
//! without touching the network (host-does-IO pattern). The caller executes
//! the actual HTTP round trip, so the core is deterministic and testable.
//!
//! # Design
//! - `GameJoltClient` holds the game credentials, the current user and the
//!   outgoing payload tree.
//! - Each operation is split into `build_*` (produces an `ApiRequest`) and
//!   one shared `handle` (consumes the response), so the I/O boundary is
//!   explicit.
//! - Responses become typed `Event`s; `dispatch` routes them to an
//!   `EventHandler`.
//! - With the `transport` feature, `UreqTransport` and the tokio `Agent`
//!   perform the round trip for hosts that have no HTTP stack of their own.

pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod http;
pub mod payload;
pub mod session;
pub mod signing;
pub mod types;

#[cfg(feature = "transport")]
pub mod agent;
#[cfg(feature = "transport")]
pub mod transport;

pub use client::{ApiRequest, GameJoltClient};
pub use config::ClientConfig;
pub use error::ApiError;
pub use event::{dispatch, Event, EventHandler};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use payload::Payload;
pub use session::{Credentials, Session};
pub use types::{
    Action, DataOperation, DataStore, DataValue, NewScore, ScoreInfo, ScoreQuery, ScoreTableInfo,
    SessionStatus, TrophyFilter, TrophyInfo, UserInfo,
};

#[cfg(feature = "transport")]
pub use agent::Agent;
#[cfg(feature = "transport")]
pub use transport::{Transport, UreqTransport};
