//! C-ABI wrapper around `gamejolt-core`.
//!
//! # Overview
//! Exposes the Game API client through `extern "C"` functions so a game
//! engine with a C FFI can build signed requests and interpret responses
//! without linking an HTTP stack or an async runtime from Rust.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - One `gj_build_*` per core operation, plus a single
//!   `gj_handle_response` that takes back the request it answers.
//! - Events cross as JSON in `FfiEventResult::event_json`; the host
//!   switches on `action` or on the `event` tag.
//! - Build functions return null on any failure; the reason is logged.
//! - The C caller owns all returned pointers and must call the matching
//!   `gj_free_*` function to release them.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::OnceLock;

use gamejolt_core::{
    ApiError, ApiRequest, ClientConfig, Credentials, GameJoltClient, HttpResponse, NewScore,
    Payload, ScoreQuery,
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use types::*;

/// Borrow a C string. Null or non-UTF-8 input reads as `None`.
fn opt_str<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(s) }.to_str().ok()
}

/// Borrow a C string, reading null or non-UTF-8 input as `""`.
fn str_or_empty<'a>(s: *const c_char) -> &'a str {
    opt_str(s).unwrap_or_default()
}

/// Run a builder against the client behind `client`. Null on failure.
fn build_with(
    client: *mut FfiClient,
    build: impl FnOnce(&mut GameJoltClient) -> Result<ApiRequest, ApiError>,
) -> *mut FfiHttpRequest {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &mut *client };
        // Failures are already logged by the core.
        match build(&mut client.inner) {
            Ok(req) => FfiHttpRequest::from_core(req),
            Err(_) => std::ptr::null_mut(),
        }
    }))
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

static LOGGING: OnceLock<()> = OnceLock::new();

/// Install a `tracing` subscriber writing to stderr, filtered by `RUST_LOG`
/// (default `gamejolt_core=info`). Only the first call has an effect.
#[unsafe(no_mangle)]
pub extern "C" fn gj_init_logging() {
    let _ = catch_unwind(|| {
        LOGGING.get_or_init(|| {
            let filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gamejolt_core=info,gamejolt_ffi=info"));
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init();
        });
    });
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a client for the public API.
///
/// Returns null if `private_key` is null or if an internal panic occurs.
/// The caller must free the returned pointer with `gj_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn gj_client_new(game_id: u32, private_key: *const c_char) -> *mut FfiClient {
    catch_unwind(|| {
        let Some(key) = opt_str(private_key) else {
            return std::ptr::null_mut();
        };
        let client = GameJoltClient::new(game_id, key);
        Box::into_raw(Box::new(FfiClient { inner: client }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Create a client from a TOML config file, with `GAMEJOLT_GAME_ID` and
/// `GAMEJOLT_PRIVATE_KEY` overriding the file.
///
/// Returns null if the file cannot be read or parsed.
#[unsafe(no_mangle)]
pub extern "C" fn gj_client_from_config(path: *const c_char) -> *mut FfiClient {
    catch_unwind(|| {
        let Some(path) = opt_str(path) else {
            return std::ptr::null_mut();
        };
        match ClientConfig::from_file(path).and_then(ClientConfig::apply_env) {
            Ok(config) => Box::into_raw(Box::new(FfiClient {
                inner: GameJoltClient::from_config(&config),
            })),
            Err(e) => {
                warn!(path, "cannot load client config: {e}");
                std::ptr::null_mut()
            }
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client created by `gj_client_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn gj_client_free(client: *mut FfiClient) {
    if !client.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(client) });
        });
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn gj_is_logged_in(client: *const FfiClient) -> bool {
    if client.is_null() {
        return false;
    }
    unsafe { &*client }.inner.is_logged_in()
}

/// Name of the current user, or null when none is set. Free with
/// `gj_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn gj_username(client: *const FfiClient) -> *mut c_char {
    if client.is_null() {
        return std::ptr::null_mut();
    }
    let name = unsafe { &*client }.inner.username();
    if name.is_empty() {
        std::ptr::null_mut()
    } else {
        into_c_string(name)
    }
}

/// Forget the current user.
#[unsafe(no_mangle)]
pub extern "C" fn gj_log_off(client: *mut FfiClient) {
    if !client.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| unsafe { &mut *client }.inner.log_off()));
    }
}

/// Replace the JSON body sent with every request. `json` must be an object.
/// Returns false if it is not.
#[unsafe(no_mangle)]
pub extern "C" fn gj_set_payload_json(client: *mut FfiClient, json: *const c_char) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return false;
        }
        let Some(json) = opt_str(json) else {
            return false;
        };
        match Payload::parse(json) {
            Ok(payload) => {
                *unsafe { &mut *client }.inner.payload_mut() = payload;
                true
            }
            Err(_) => false,
        }
    }))
    .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Read a `.gj-credentials` file. Null `path` means the default file in the
/// working directory.
///
/// Returns null if the file is missing or malformed. Free with
/// `gj_free_credentials`.
#[unsafe(no_mangle)]
pub extern "C" fn gj_load_credentials(path: *const c_char) -> *mut FfiCredentials {
    catch_unwind(|| {
        let path = opt_str(path).unwrap_or(gamejolt_core::session::CREDENTIALS_FILE);
        match Credentials::load(path) {
            Ok(Some(creds)) => FfiCredentials::from_core(creds),
            Ok(None) => std::ptr::null_mut(),
            Err(e) => {
                warn!(path, "cannot load credentials: {e}");
                std::ptr::null_mut()
            }
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Build request functions: users
// ---------------------------------------------------------------------------

/// Build a login request. The client counts as logged in once
/// `gj_handle_response` reports success.
#[unsafe(no_mangle)]
pub extern "C" fn gj_build_login(
    client: *mut FfiClient,
    username: *const c_char,
    token: *const c_char,
) -> *mut FfiHttpRequest {
    build_with(client, |c| {
        c.build_login(str_or_empty(username), str_or_empty(token))
    })
}

/// Build a login request from credentials read by `gj_load_credentials`.
#[unsafe(no_mangle)]
pub extern "C" fn gj_build_auto_login(
    client: *mut FfiClient,
    credentials: *const FfiCredentials,
) -> *mut FfiHttpRequest {
    if credentials.is_null() {
        return std::ptr::null_mut();
    }
    let creds = unsafe { &*credentials };
    let creds = Credentials::new(
        str_or_empty(creds.username),
        str_or_empty(creds.token),
    );
    build_with(client, |c| c.build_auto_login(&creds))
}

#[unsafe(no_mangle)]
pub extern "C" fn gj_build_fetch_user(client: *mut FfiClient) -> *mut FfiHttpRequest {
    build_with(client, |c| c.build_fetch_user())
}

/// Fetch the profiles of `len` user ids starting at `ids`.
#[unsafe(no_mangle)]
pub extern "C" fn gj_build_fetch_users(
    client: *mut FfiClient,
    ids: *const u64,
    len: u32,
) -> *mut FfiHttpRequest {
    build_with(client, |c| {
        c.build_fetch_users(id_slice(ids, len))
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn gj_build_fetch_friendlist(client: *mut FfiClient) -> *mut FfiHttpRequest {
    build_with(client, |c| c.build_fetch_friendlist())
}

fn id_slice<'a>(ids: *const u64, len: u32) -> &'a [u64] {
    if ids.is_null() || len == 0 {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(ids, len as usize) }
    }
}

// ---------------------------------------------------------------------------
// Build request functions: sessions and time
// ---------------------------------------------------------------------------

#[unsafe(no_mangle)]
pub extern "C" fn gj_build_open_session(client: *mut FfiClient) -> *mut FfiHttpRequest {
    build_with(client, |c| c.build_open_session())
}

#[unsafe(no_mangle)]
pub extern "C" fn gj_build_ping_session(
    client: *mut FfiClient,
    status: FfiSessionStatus,
) -> *mut FfiHttpRequest {
    build_with(client, |c| {
        c.build_ping_session(status.into())
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn gj_build_close_session(client: *mut FfiClient) -> *mut FfiHttpRequest {
    build_with(client, |c| c.build_close_session())
}

#[unsafe(no_mangle)]
pub extern "C" fn gj_build_check_session(client: *mut FfiClient) -> *mut FfiHttpRequest {
    build_with(client, |c| c.build_check_session())
}

#[unsafe(no_mangle)]
pub extern "C" fn gj_build_fetch_server_time(client: *mut FfiClient) -> *mut FfiHttpRequest {
    build_with(client, |c| c.build_fetch_server_time())
}

// ---------------------------------------------------------------------------
// Build request functions: trophies
// ---------------------------------------------------------------------------

/// Fetch trophies. `len == 0` fetches every trophy of the game.
#[unsafe(no_mangle)]
pub extern "C" fn gj_build_fetch_trophies(
    client: *mut FfiClient,
    filter: FfiTrophyFilter,
    ids: *const u64,
    len: u32,
) -> *mut FfiHttpRequest {
    build_with(client, |c| {
        c.build_fetch_trophies(filter.into(), id_slice(ids, len))
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn gj_build_reward_trophy(client: *mut FfiClient, trophy_id: u64) -> *mut FfiHttpRequest {
    build_with(client, |c| c.build_reward_trophy(trophy_id))
}

#[unsafe(no_mangle)]
pub extern "C" fn gj_build_remove_trophy(client: *mut FfiClient, trophy_id: u64) -> *mut FfiHttpRequest {
    build_with(client, |c| c.build_remove_trophy(trophy_id))
}

// ---------------------------------------------------------------------------
// Build request functions: scores
// ---------------------------------------------------------------------------

/// Fetch a scoreboard. `limit` and `table_id` of 0 use the server defaults;
/// `better_than` / `worse_than` may be null.
#[unsafe(no_mangle)]
pub extern "C" fn gj_build_fetch_scoreboard(
    client: *mut FfiClient,
    limit: u32,
    table_id: u32,
    better_than: *const i64,
    worse_than: *const i64,
    only_user: bool,
) -> *mut FfiHttpRequest {
    let read = |p: *const i64| (!p.is_null()).then(|| unsafe { *p });
    let query = ScoreQuery {
        limit,
        table_id,
        better_than: read(better_than),
        worse_than: read(worse_than),
        only_user,
    };
    build_with(client, |c| c.build_fetch_scoreboard(&query))
}

/// Submit a score. `guest` is used only when no user is logged in;
/// `guest` and `extra_data` may be null.
#[unsafe(no_mangle)]
pub extern "C" fn gj_build_add_score(
    client: *mut FfiClient,
    score: *const c_char,
    sort: i64,
    guest: *const c_char,
    extra_data: *const c_char,
    table_id: u32,
) -> *mut FfiHttpRequest {
    let new_score = NewScore {
        score: str_or_empty(score).to_string(),
        sort,
        guest: str_or_empty(guest).to_string(),
        extra_data: str_or_empty(extra_data).to_string(),
        table_id,
    };
    build_with(client, |c| c.build_add_score(&new_score))
}

#[unsafe(no_mangle)]
pub extern "C" fn gj_build_fetch_tables(client: *mut FfiClient) -> *mut FfiHttpRequest {
    build_with(client, |c| c.build_fetch_tables())
}

#[unsafe(no_mangle)]
pub extern "C" fn gj_build_fetch_rank(
    client: *mut FfiClient,
    sort: i64,
    table_id: u32,
) -> *mut FfiHttpRequest {
    build_with(client, |c| c.build_fetch_rank(sort, table_id))
}

// ---------------------------------------------------------------------------
// Build request functions: data store
// ---------------------------------------------------------------------------

#[unsafe(no_mangle)]
pub extern "C" fn gj_build_fetch_data(
    client: *mut FfiClient,
    store: FfiDataStore,
    key: *const c_char,
) -> *mut FfiHttpRequest {
    build_with(client, |c| {
        c.build_fetch_data(store.into(), str_or_empty(key))
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn gj_build_set_data(
    client: *mut FfiClient,
    store: FfiDataStore,
    key: *const c_char,
    data: *const c_char,
) -> *mut FfiHttpRequest {
    build_with(client, |c| {
        c.build_set_data(store.into(), str_or_empty(key), str_or_empty(data))
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn gj_build_update_data(
    client: *mut FfiClient,
    store: FfiDataStore,
    key: *const c_char,
    operation: FfiDataOperation,
    value: *const c_char,
) -> *mut FfiHttpRequest {
    build_with(client, |c| {
        c.build_update_data(store.into(), str_or_empty(key), operation.into(), str_or_empty(value))
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn gj_build_remove_data(
    client: *mut FfiClient,
    store: FfiDataStore,
    key: *const c_char,
) -> *mut FfiHttpRequest {
    build_with(client, |c| {
        c.build_remove_data(store.into(), str_or_empty(key))
    })
}

/// List data-store keys. `pattern` may be null.
#[unsafe(no_mangle)]
pub extern "C" fn gj_build_fetch_keys(
    client: *mut FfiClient,
    store: FfiDataStore,
    pattern: *const c_char,
) -> *mut FfiHttpRequest {
    build_with(client, |c| {
        c.build_fetch_keys(store.into(), opt_str(pattern))
    })
}

// ---------------------------------------------------------------------------
// Build request functions: raw
// ---------------------------------------------------------------------------

/// Sign a request to any endpoint `path` (e.g. `/trophies/`).
/// `params_json` is a flat JSON object of extra parameters, or null.
#[unsafe(no_mangle)]
pub extern "C" fn gj_build_raw(
    client: *mut FfiClient,
    path: *const c_char,
    params_json: *const c_char,
    append_user: bool,
) -> *mut FfiHttpRequest {
    build_with(client, |c| {
        let params = match opt_str(params_json) {
            Some(json) => Payload::parse(json)?,
            None => Payload::new(),
        };
        let values: Vec<(String, String)> = params
            .keys()
            .into_iter()
            .map(|k| {
                let v = params.get_string(&k);
                (k, v)
            })
            .collect();
        let pairs: Vec<(&str, &str)> = values.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        c.build_raw(str_or_empty(path), &pairs, append_user)
    })
}

// ---------------------------------------------------------------------------
// Response handling
// ---------------------------------------------------------------------------

/// Convert an `FfiHttpResponse` to a core `HttpResponse`.
fn ffi_response_to_core(resp: &FfiHttpResponse) -> HttpResponse {
    HttpResponse::new(resp.status, str_or_empty(resp.body))
}

/// Interpret the response to `request`. The request stays owned by the
/// caller and must still be freed with `gj_free_request`.
#[unsafe(no_mangle)]
pub extern "C" fn gj_handle_response(
    client: *mut FfiClient,
    request: *const FfiHttpRequest,
    response: *const FfiHttpResponse,
) -> *mut FfiEventResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiEventResult::null_arg("client");
        }
        if request.is_null() || unsafe { (*request).inner.is_null() } {
            return FfiEventResult::null_arg("request");
        }
        if response.is_null() {
            return FfiEventResult::null_arg("response");
        }
        let client = unsafe { &mut *client };
        let request = unsafe { &(*(*request).inner).inner };
        let response = ffi_response_to_core(unsafe { &*response });
        let status = response.status;
        let result = client.inner.handle(request, response);
        FfiEventResult::from_core(request.action, status, result)
    }))
    .unwrap_or_else(|_| FfiEventResult::panic("panic in gj_handle_response"))
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free a request returned by a `gj_build_*` function. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn gj_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let req = unsafe { Box::from_raw(req) };
        free_c_string(req.url);
        free_c_string(req.body);
        if !req.headers.is_null() {
            let headers = unsafe {
                Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                    req.headers,
                    req.headers_len as usize,
                ))
            };
            for h in headers.iter() {
                free_c_string(h.key);
                free_c_string(h.value);
            }
        }
        if !req.inner.is_null() {
            drop(unsafe { Box::from_raw(req.inner) });
        }
    });
}

/// Free a result returned by `gj_handle_response`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn gj_free_result(result: *mut FfiEventResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        free_c_string(result.error_message);
        free_c_string(result.event_json);
    });
}

/// Free credentials returned by `gj_load_credentials`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn gj_free_credentials(creds: *mut FfiCredentials) {
    if creds.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let creds = unsafe { Box::from_raw(creds) };
        free_c_string(creds.version);
        free_c_string(creds.username);
        free_c_string(creds.token);
    });
}

/// Free a string returned by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn gj_free_string(s: *mut c_char) {
    let _ = catch_unwind(|| free_c_string(s));
}

fn free_c_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn new_client() -> *mut FfiClient {
        let key = CString::new("test-key").unwrap();
        gj_client_new(1000, key.as_ptr())
    }

    fn c_str<'a>(p: *const c_char) -> &'a str {
        unsafe { CStr::from_ptr(p) }.to_str().unwrap()
    }

    /// Handle `body` as the 200 response to `req` and return the event JSON.
    fn handle_ok(client: *mut FfiClient, req: *mut FfiHttpRequest, body: &str) -> serde_json::Value {
        let body = CString::new(body).unwrap();
        let resp = FfiHttpResponse {
            status: 200,
            body: body.as_ptr(),
        };
        let result = gj_handle_response(client, req, &resp);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok, "{}", {
            if r.error_message.is_null() { "" } else { c_str(r.error_message) }
        });
        let json = serde_json::from_str(c_str(r.event_json)).unwrap();
        gj_free_result(result);
        json
    }

    fn login(client: *mut FfiClient) {
        let user = CString::new("alice").unwrap();
        let token = CString::new("tok").unwrap();
        let req = gj_build_login(client, user.as_ptr(), token.as_ptr());
        handle_ok(client, req, r#"{"response":{"success":"true"}}"#);
        gj_free_request(req);
    }

    #[test]
    fn client_new_and_free() {
        let client = new_client();
        assert!(!client.is_null());
        assert!(!gj_is_logged_in(client));
        gj_client_free(client);
    }

    #[test]
    fn client_new_null_key_returns_null() {
        assert!(gj_client_new(1000, std::ptr::null()).is_null());
    }

    #[test]
    fn client_free_null_is_safe() {
        gj_client_free(std::ptr::null_mut());
    }

    #[test]
    fn init_logging_twice_is_harmless() {
        gj_init_logging();
        gj_init_logging();
    }

    #[test]
    fn build_login_produces_signed_post() {
        let client = new_client();
        let user = CString::new("alice").unwrap();
        let token = CString::new("tok").unwrap();
        let req = gj_build_login(client, user.as_ptr(), token.as_ptr());
        assert!(!req.is_null());
        let r = unsafe { &*req };
        assert_eq!(r.action, FfiAction::UserAuth);
        assert_eq!(r.method, FfiHttpMethod::Post);
        let url = c_str(r.url);
        assert!(url.starts_with(
            "https://api.gamejolt.com/api/game/v1_2/users/auth/?format=json&game_id=1000&username=alice&user_token=tok&signature="
        ));
        assert_eq!(r.headers_len, 1);
        let header = unsafe { &*r.headers };
        assert_eq!(c_str(header.key), "content-type");
        assert_eq!(c_str(r.body), "{}");
        gj_free_request(req);
        gj_client_free(client);
    }

    #[test]
    fn build_without_login_returns_null() {
        let client = new_client();
        assert!(gj_build_open_session(client).is_null());
        assert!(gj_build_reward_trophy(client, 1).is_null());
        gj_client_free(client);
    }

    /// Collects formatted log output from a scoped subscriber.
    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn logs_of(f: impl FnOnce()) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn failed_build_is_logged_once() {
        let client = new_client();
        let logs = logs_of(|| {
            assert!(gj_build_open_session(client).is_null());
        });
        assert_eq!(logs.lines().count(), 1, "{logs}");
        assert!(logs.contains("user is not logged in"));

        let bad = CString::new("{not json").unwrap();
        let logs = logs_of(|| {
            assert!(!gj_set_payload_json(client, bad.as_ptr()));
        });
        assert!(logs.contains("JSON data is invalid"), "{logs}");
        gj_client_free(client);
    }

    #[test]
    fn build_null_client_returns_null() {
        assert!(gj_build_fetch_server_time(std::ptr::null_mut()).is_null());
    }

    #[test]
    fn login_then_session() {
        let client = new_client();
        login(client);
        assert!(gj_is_logged_in(client));
        let name = gj_username(client);
        assert_eq!(c_str(name), "alice");
        gj_free_string(name);

        let req = gj_build_check_session(client);
        assert!(!req.is_null());
        let event = handle_ok(client, req, r#"{"response":{"success":"false"}}"#);
        assert_eq!(event, serde_json::json!({"event": "session_checked", "data": false}));
        gj_free_request(req);

        gj_log_off(client);
        assert!(!gj_is_logged_in(client));
        assert!(gj_username(client).is_null());
        gj_client_free(client);
    }

    #[test]
    fn rejected_response_reports_message() {
        let client = new_client();
        let user = CString::new("alice").unwrap();
        let token = CString::new("bad").unwrap();
        let req = gj_build_login(client, user.as_ptr(), token.as_ptr());
        let body = CString::new(r#"{"response":{"success":"false","message":"No such user"}}"#).unwrap();
        let resp = FfiHttpResponse {
            status: 200,
            body: body.as_ptr(),
        };
        let result = gj_handle_response(client, req, &resp);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Rejected);
        assert_eq!(r.action, FfiAction::UserAuth);
        assert!(c_str(r.error_message).contains("No such user"));
        assert!(r.event_json.is_null());
        gj_free_result(result);
        gj_free_request(req);
        gj_client_free(client);
    }

    #[test]
    fn http_error_carries_status() {
        let client = new_client();
        let req = gj_build_fetch_tables(client);
        let body = CString::new("down").unwrap();
        let resp = FfiHttpResponse {
            status: 503,
            body: body.as_ptr(),
        };
        let result = gj_handle_response(client, req, &resp);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Http);
        assert_eq!(r.http_status, 503);
        gj_free_result(result);
        gj_free_request(req);
        gj_client_free(client);
    }

    #[test]
    fn handle_null_args() {
        let client = new_client();
        let result = gj_handle_response(client, std::ptr::null(), std::ptr::null());
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::NullArg);
        gj_free_result(result);
        gj_client_free(client);
    }

    #[test]
    fn fetch_users_from_id_array() {
        let client = new_client();
        let ids = [3u64, 5];
        let req = gj_build_fetch_users(client, ids.as_ptr(), ids.len() as u32);
        assert!(c_str(unsafe { &*req }.url).contains("user_id=3%2C5"));
        let event = handle_ok(
            client,
            req,
            r#"{"response":{"success":"true","users":[{"id":"3","username":"c"},{"id":"5","username":"e"}]}}"#,
        );
        assert_eq!(event["event"], "users_fetched");
        assert_eq!(event["data"][1]["id"], 5);
        gj_free_request(req);

        assert!(gj_build_fetch_users(client, std::ptr::null(), 0).is_null());
        gj_client_free(client);
    }

    #[test]
    fn scoreboard_optional_bounds() {
        let client = new_client();
        let better = 100i64;
        let req = gj_build_fetch_scoreboard(client, 5, 0, &better, std::ptr::null(), false);
        let url = c_str(unsafe { &*req }.url);
        assert!(url.contains("limit=5&better_than=100&signature="));
        gj_free_request(req);
        gj_client_free(client);
    }

    #[test]
    fn data_update_event_carries_key() {
        let client = new_client();
        login(client);
        let key = CString::new("coins").unwrap();
        let value = CString::new("2").unwrap();
        let req = gj_build_update_data(
            client,
            FfiDataStore::User,
            key.as_ptr(),
            FfiDataOperation::Multiply,
            value.as_ptr(),
        );
        assert!(!req.is_null());
        assert_eq!(unsafe { &*req }.action, FfiAction::DataStoreUpdate);
        let event = handle_ok(client, req, r#"{"response":{"success":"true","data":"20"}}"#);
        assert_eq!(
            event,
            serde_json::json!({"event": "data_updated", "data": {"key": "coins", "data": "20", "as_int": 20}})
        );
        gj_free_request(req);
        gj_client_free(client);
    }

    #[test]
    fn raw_request_with_params() {
        let client = new_client();
        let path = CString::new("/scores/").unwrap();
        let params = CString::new(r#"{"limit":"3"}"#).unwrap();
        let req = gj_build_raw(client, path.as_ptr(), params.as_ptr(), false);
        assert!(!req.is_null());
        assert!(c_str(unsafe { &*req }.url).contains("/scores/?format=json&game_id=1000&limit=3&"));
        gj_free_request(req);

        let bad = CString::new("[1]").unwrap();
        assert!(gj_build_raw(client, path.as_ptr(), bad.as_ptr(), false).is_null());
        gj_client_free(client);
    }

    #[test]
    fn payload_json_becomes_body() {
        let client = new_client();
        let json = CString::new(r#"{"build":"1.2"}"#).unwrap();
        assert!(gj_set_payload_json(client, json.as_ptr()));
        let not_object = CString::new("42").unwrap();
        assert!(!gj_set_payload_json(client, not_object.as_ptr()));

        let req = gj_build_fetch_server_time(client);
        assert_eq!(c_str(unsafe { &*req }.body), r#"{"build":"1.2"}"#);
        gj_free_request(req);
        gj_client_free(client);
    }

    #[test]
    fn credentials_file_drives_auto_login() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0.2.1\nalice\ntok").unwrap();
        let path = CString::new(file.path().to_str().unwrap()).unwrap();

        let creds = gj_load_credentials(path.as_ptr());
        assert!(!creds.is_null());
        let c = unsafe { &*creds };
        assert_eq!(c_str(c.version), "0.2.1");
        assert_eq!(c_str(c.username), "alice");

        let client = new_client();
        let req = gj_build_auto_login(client, creds);
        assert_eq!(unsafe { &*req }.action, FfiAction::AutoLogin);
        let event = handle_ok(client, req, r#"{"response":{"success":"true"}}"#);
        assert_eq!(event, serde_json::json!({"event": "auto_login", "data": true}));
        assert!(gj_is_logged_in(client));

        gj_free_request(req);
        gj_free_credentials(creds);
        gj_client_free(client);
    }

    #[test]
    fn missing_credentials_file_is_null() {
        let dir = tempfile::tempdir().unwrap();
        let path = CString::new(dir.path().join("absent").to_str().unwrap()).unwrap();
        assert!(gj_load_credentials(path.as_ptr()).is_null());
    }

    #[test]
    fn client_from_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "game_id = 7\nprivate_key = \"k\"\nbase_url = \"http://127.0.0.1:3000\"").unwrap();
        let path = CString::new(file.path().to_str().unwrap()).unwrap();
        let client = gj_client_from_config(path.as_ptr());
        assert!(!client.is_null());
        let req = gj_build_fetch_tables(client);
        let url = c_str(unsafe { &*req }.url);
        assert!(url.starts_with("http://127.0.0.1:3000/api/game/v1_2/scores/tables/?format=json&game_id="));
        gj_free_request(req);
        gj_client_free(client);

        let bogus = CString::new("/definitely/not/here.toml").unwrap();
        assert!(gj_client_from_config(bogus.as_ptr()).is_null());
    }

    #[test]
    fn free_functions_accept_null() {
        gj_free_request(std::ptr::null_mut());
        gj_free_result(std::ptr::null_mut());
        gj_free_credentials(std::ptr::null_mut());
        gj_free_string(std::ptr::null_mut());
    }
}
