//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type but uses C-compatible representations:
//! `*mut c_char` instead of `String`, raw pointers instead of `Vec`, and
//! enums with explicit discriminants. Event payloads are too varied for
//! fixed structs, so they cross as JSON strings. Conversion functions live
//! here to keep `lib.rs` focused on the `extern "C"` surface.

use std::ffi::CString;
use std::os::raw::c_char;

use gamejolt_core::{
    Action, ApiError, ApiRequest, Credentials, DataOperation, DataStore, Event, GameJoltClient,
    HttpMethod, SessionStatus, TrophyFilter,
};

/// Opaque handle to a `GameJoltClient`. C callers receive a pointer to this
/// and pass it back into every FFI function.
pub struct FfiClient {
    pub(crate) inner: GameJoltClient,
}

/// Opaque core request kept alive inside an `FfiHttpRequest` until the
/// response is handled.
pub struct FfiApiRequest {
    pub(crate) inner: ApiRequest,
}

/// Copy `s` into a heap C string. Interior NUL bytes are dropped.
pub(crate) fn into_c_string(s: impl Into<String>) -> *mut c_char {
    let mut s: String = s.into();
    s.retain(|c| c != '\0');
    CString::new(s).unwrap_or_default().into_raw()
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Request kind as a C enum. Values match the core `Action` discriminants.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiAction {
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

impl From<Action> for FfiAction {
    fn from(a: Action) -> Self {
        match a {
            Action::UserAuth => FfiAction::UserAuth,
            Action::AutoLogin => FfiAction::AutoLogin,
            Action::UserFetch => FfiAction::UserFetch,
            Action::UsersFetch => FfiAction::UsersFetch,
            Action::UserFriendlist => FfiAction::UserFriendlist,
            Action::SessionOpen => FfiAction::SessionOpen,
            Action::SessionPing => FfiAction::SessionPing,
            Action::SessionClose => FfiAction::SessionClose,
            Action::SessionCheck => FfiAction::SessionCheck,
            Action::TrophiesFetch => FfiAction::TrophiesFetch,
            Action::TrophiesAdd => FfiAction::TrophiesAdd,
            Action::TrophiesRemove => FfiAction::TrophiesRemove,
            Action::ScoresFetch => FfiAction::ScoresFetch,
            Action::ScoresAdd => FfiAction::ScoresAdd,
            Action::ScoresTable => FfiAction::ScoresTable,
            Action::ScoresRank => FfiAction::ScoresRank,
            Action::DataStoreFetch => FfiAction::DataStoreFetch,
            Action::DataStoreSet => FfiAction::DataStoreSet,
            Action::DataStoreUpdate => FfiAction::DataStoreUpdate,
            Action::DataStoreRemove => FfiAction::DataStoreRemove,
            Action::DataStoreKeys => FfiAction::DataStoreKeys,
            Action::Time => FfiAction::Time,
            Action::Other => FfiAction::Other,
        }
    }
}

/// HTTP method as a C enum.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiHttpMethod {
    Get = 0,
    Post = 1,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub enum FfiTrophyFilter {
    All = 0,
    Achieved = 1,
    Unachieved = 2,
}

impl From<FfiTrophyFilter> for TrophyFilter {
    fn from(f: FfiTrophyFilter) -> Self {
        match f {
            FfiTrophyFilter::All => TrophyFilter::All,
            FfiTrophyFilter::Achieved => TrophyFilter::Achieved,
            FfiTrophyFilter::Unachieved => TrophyFilter::Unachieved,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub enum FfiSessionStatus {
    Active = 0,
    Idle = 1,
}

impl From<FfiSessionStatus> for SessionStatus {
    fn from(s: FfiSessionStatus) -> Self {
        match s {
            FfiSessionStatus::Active => SessionStatus::Active,
            FfiSessionStatus::Idle => SessionStatus::Idle,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub enum FfiDataStore {
    Global = 0,
    User = 1,
}

impl From<FfiDataStore> for DataStore {
    fn from(s: FfiDataStore) -> Self {
        match s {
            FfiDataStore::Global => DataStore::Global,
            FfiDataStore::User => DataStore::User,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub enum FfiDataOperation {
    Add = 0,
    Subtract = 1,
    Multiply = 2,
    Divide = 3,
    Append = 4,
    Prepend = 5,
}

impl From<FfiDataOperation> for DataOperation {
    fn from(op: FfiDataOperation) -> Self {
        match op {
            FfiDataOperation::Add => DataOperation::Add,
            FfiDataOperation::Subtract => DataOperation::Subtract,
            FfiDataOperation::Multiply => DataOperation::Multiply,
            FfiDataOperation::Divide => DataOperation::Divide,
            FfiDataOperation::Append => DataOperation::Append,
            FfiDataOperation::Prepend => DataOperation::Prepend,
        }
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// A signed HTTP request described as C-compatible plain data.
///
/// Built by `gj_build_*` functions. The C caller executes the request and
/// passes it back, together with the response, to `gj_handle_response`.
/// `inner` is opaque and must not be touched.
#[repr(C)]
pub struct FfiHttpRequest {
    pub action: FfiAction,
    pub method: FfiHttpMethod,
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut c_char,
    pub inner: *mut FfiApiRequest,
}

impl FfiHttpRequest {
    /// Convert a core `ApiRequest` into a heap-allocated `FfiHttpRequest`.
    pub(crate) fn from_core(req: ApiRequest) -> *mut Self {
        let http = &req.http;
        let url = into_c_string(http.url.as_str());
        let body = match &http.body {
            Some(b) => into_c_string(b.as_str()),
            None => std::ptr::null_mut(),
        };

        let headers_len = http.headers.len() as u32;
        let headers = if http.headers.is_empty() {
            std::ptr::null_mut()
        } else {
            let ffi_headers: Box<[FfiHeader]> = http
                .headers
                .iter()
                .map(|(k, v)| FfiHeader {
                    key: into_c_string(k.as_str()),
                    value: into_c_string(v.as_str()),
                })
                .collect();
            Box::into_raw(ffi_headers) as *mut FfiHeader
        };

        let ffi_req = Box::new(FfiHttpRequest {
            action: req.action.into(),
            method: http.method.into(),
            url,
            headers,
            headers_len,
            body,
            inner: Box::into_raw(Box::new(FfiApiRequest { inner: req })),
        });
        Box::into_raw(ffi_req)
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// An HTTP response described as C-compatible plain data.
///
/// The C caller constructs this on the stack after executing a request, then
/// passes a pointer to `gj_handle_response`. The FFI layer reads but does
/// not free these fields.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const c_char,
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Contents of a `.gj-credentials` file. `version` is null for two-line
/// files.
#[repr(C)]
pub struct FfiCredentials {
    pub version: *mut c_char,
    pub username: *mut c_char,
    pub token: *mut c_char,
}

impl FfiCredentials {
    pub(crate) fn from_core(creds: Credentials) -> *mut Self {
        Box::into_raw(Box::new(FfiCredentials {
            version: creds.version.map_or(std::ptr::null_mut(), into_c_string),
            username: into_c_string(creds.username),
            token: into_c_string(creds.token),
        }))
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiEventResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    MissingCredentials = 1,
    NotLoggedIn = 2,
    InvalidArgument = 3,
    Http = 4,
    Transport = 5,
    Deserialization = 6,
    Serialization = 7,
    MissingField = 8,
    Rejected = 9,
    Credentials = 10,
    Config = 11,
    Io = 12,
    Panic = 13,
    NullArg = 14,
}

impl From<&ApiError> for FfiErrorCode {
    fn from(err: &ApiError) -> Self {
        match err {
            ApiError::MissingCredentials(_) => FfiErrorCode::MissingCredentials,
            ApiError::NotLoggedIn => FfiErrorCode::NotLoggedIn,
            ApiError::InvalidArgument(_) => FfiErrorCode::InvalidArgument,
            ApiError::HttpError { .. } => FfiErrorCode::Http,
            ApiError::Transport(_) => FfiErrorCode::Transport,
            ApiError::DeserializationError(_) => FfiErrorCode::Deserialization,
            ApiError::SerializationError(_) => FfiErrorCode::Serialization,
            ApiError::MissingField(_) => FfiErrorCode::MissingField,
            ApiError::Rejected { .. } => FfiErrorCode::Rejected,
            ApiError::Credentials(_) => FfiErrorCode::Credentials,
            ApiError::Config(_) => FfiErrorCode::Config,
            ApiError::Io(_) => FfiErrorCode::Io,
        }
    }
}

/// Result envelope for `gj_handle_response`.
///
/// On success `error_code` is `Ok`, `error_message` is null and
/// `event_json` holds the event as `{"event": "<kind>", "data": ...}`.
/// On failure `error_code` describes the category, `error_message` is a
/// human-readable C string and `event_json` is null.
#[repr(C)]
pub struct FfiEventResult {
    pub action: FfiAction,
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub event_json: *mut c_char,
}

impl FfiEventResult {
    fn boxed(
        action: FfiAction,
        error_code: FfiErrorCode,
        error_message: *mut c_char,
        http_status: u16,
        event_json: *mut c_char,
    ) -> *mut Self {
        Box::into_raw(Box::new(FfiEventResult {
            action,
            error_code,
            error_message,
            http_status,
            event_json,
        }))
    }

    /// Build a result from the outcome of `GameJoltClient::handle`.
    pub(crate) fn from_core(action: Action, status: u16, result: Result<Event, ApiError>) -> *mut Self {
        let event = match result {
            Ok(event) => event,
            Err(e) => return Self::from_error(action, &e),
        };
        match serde_json::to_string(&event) {
            Ok(json) => Self::boxed(
                action.into(),
                FfiErrorCode::Ok,
                std::ptr::null_mut(),
                status,
                into_c_string(json),
            ),
            Err(e) => Self::from_error(action, &ApiError::SerializationError(e.to_string())),
        }
    }

    /// Build an error result from an `ApiError`.
    pub(crate) fn from_error(action: Action, err: &ApiError) -> *mut Self {
        let http_status = match err {
            ApiError::HttpError { status, .. } => *status,
            _ => 0,
        };
        Self::boxed(
            action.into(),
            err.into(),
            into_c_string(err.to_string()),
            http_status,
            std::ptr::null_mut(),
        )
    }

    /// Build an error result for a null argument.
    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::boxed(
            FfiAction::Other,
            FfiErrorCode::NullArg,
            into_c_string(format!("null argument: {name}")),
            0,
            std::ptr::null_mut(),
        )
    }

    /// Build an error result for a caught panic.
    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::boxed(
            FfiAction::Other,
            FfiErrorCode::Panic,
            into_c_string(msg),
            0,
            std::ptr::null_mut(),
        )
    }
}
