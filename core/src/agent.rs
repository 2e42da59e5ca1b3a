//! Async driver that runs round trips on the tokio blocking pool.
//!
//! # Design
//! The client stays sans-IO; `Agent` pairs it with a `Transport` and owns
//! both behind `Arc`s so requests can be issued from any task. The client
//! lock is held only while building or handling, never across the network
//! call, so several requests may be in flight together.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::client::{ApiRequest, GameJoltClient};
use crate::error::ApiError;
use crate::event::{dispatch, Event, EventHandler};
use crate::transport::{Transport, UreqTransport};

#[derive(Clone)]
pub struct Agent {
    client: Arc<Mutex<GameJoltClient>>,
    transport: Arc<dyn Transport>,
}

impl Agent {
    /// Agent using the default ureq transport.
    pub fn new(client: GameJoltClient) -> Self {
        Self::with_transport(client, UreqTransport::new())
    }

    pub fn with_transport(client: GameJoltClient, transport: impl Transport + 'static) -> Self {
        Self {
            client: Arc::new(Mutex::new(client)),
            transport: Arc::new(transport),
        }
    }

    /// Run `f` against the client, e.g. to build a request.
    pub fn with_client<R>(&self, f: impl FnOnce(&mut GameJoltClient) -> R) -> R {
        f(&mut self.client.lock())
    }

    /// Execute `request` and interpret the response.
    pub async fn send(&self, request: ApiRequest) -> Result<Event, ApiError> {
        let client = Arc::clone(&self.client);
        let transport = Arc::clone(&self.transport);
        tokio::task::spawn_blocking(move || {
            debug!(action = %request.action, "sending request");
            let response = transport.execute(&request.http)?;
            client.lock().handle(&request, response)
        })
        .await
        .map_err(|e| ApiError::Transport(format!("request task failed: {e}")))?
    }

    /// Execute `request` in the background and deliver the result to
    /// `handler` through `dispatch`.
    pub fn submit<H>(&self, request: ApiRequest, mut handler: H) -> JoinHandle<H>
    where
        H: EventHandler + Send + 'static,
    {
        let agent = self.clone();
        tokio::spawn(async move {
            let result = agent.send(request).await;
            dispatch(&mut handler, &result);
            handler
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpRequest, HttpResponse};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers every request with the same body and counts calls.
    struct Canned {
        body: &'static str,
        calls: Arc<AtomicUsize>,
    }

    impl Transport for Canned {
        fn execute(&self, _request: &HttpRequest) -> Result<HttpResponse, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse::new(200, self.body))
        }
    }

    struct Down;

    impl Transport for Down {
        fn execute(&self, _request: &HttpRequest) -> Result<HttpResponse, ApiError> {
            Err(ApiError::Transport("connection refused".to_string()))
        }
    }

    #[derive(Default)]
    struct Seen {
        logged_in: Option<bool>,
        failures: usize,
        results: usize,
    }

    impl EventHandler for Seen {
        fn on_user_authorized(&mut self, logged_in: bool) {
            self.logged_in = Some(logged_in);
        }
        fn on_result(&mut self, _event: &Event) {
            self.results += 1;
        }
        fn on_failed(&mut self, _error: &ApiError) {
            self.failures += 1;
        }
    }

    #[tokio::test]
    async fn send_updates_shared_client() {
        let calls = Arc::new(AtomicUsize::new(0));
        let agent = Agent::with_transport(
            GameJoltClient::new(1, "key"),
            Canned {
                body: r#"{"response":{"success":"true"}}"#,
                calls: Arc::clone(&calls),
            },
        );
        let request = agent.with_client(|c| c.build_login("alice", "tok")).unwrap();
        let event = agent.send(request).await.unwrap();
        assert_eq!(event, Event::UserAuthorized(true));
        assert!(agent.with_client(|c| c.is_logged_in()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn submit_fires_callbacks() {
        let agent = Agent::with_transport(
            GameJoltClient::new(1, "key"),
            Canned {
                body: r#"{"response":{"success":"true"}}"#,
                calls: Arc::new(AtomicUsize::new(0)),
            },
        );
        let request = agent.with_client(|c| c.build_login("alice", "tok")).unwrap();
        let seen = agent.submit(request, Seen::default()).await.unwrap();
        assert_eq!(seen.logged_in, Some(true));
        assert_eq!(seen.results, 1);
        assert_eq!(seen.failures, 0);
    }

    #[tokio::test]
    async fn transport_failure_reaches_on_failed() {
        let agent = Agent::with_transport(GameJoltClient::new(1, "key"), Down);
        let request = agent.with_client(|c| c.build_fetch_server_time()).unwrap();
        let seen = agent.submit(request, Seen::default()).await.unwrap();
        assert_eq!(seen.failures, 1);
        assert_eq!(seen.results, 0);
    }
}
