//! Scripted in-process transport for store tests.

use async_trait::async_trait;
use sc_core::{Error, Method, RequestOptions, Result, Transport};
use sc_storage::MemoryStorage;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use crate::SessionStore;

#[derive(Debug)]
enum Reply {
    Payload(Value),
    Failure { status: u16, message: Option<String> },
    Offline,
    Gated(oneshot::Receiver<Result<Value>>),
}

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub options: RequestOptions,
}

#[derive(Debug, Default)]
pub(crate) struct StubTransport {
    replies: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl StubTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, method: Method, path: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
    }

    pub fn reply(&self, method: Method, path: &str, payload: Value) {
        self.push(method, path, Reply::Payload(payload));
    }

    pub fn fail(&self, method: Method, path: &str, status: u16, message: Option<&str>) {
        self.push(
            method,
            path,
            Reply::Failure {
                status,
                message: message.map(str::to_string),
            },
        );
    }

    pub fn offline(&self, method: Method, path: &str) {
        self.push(method, path, Reply::Offline);
    }

    /// The matching call stays pending until the returned sender fires.
    pub fn gate(&self, method: Method, path: &str) -> oneshot::Sender<Result<Value>> {
        let (tx, rx) = oneshot::channel();
        self.push(method, path, Reply::Gated(rx));
        tx
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> Option<RecordedCall> {
        self.calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn request(&self, method: Method, path: &str, options: RequestOptions) -> Result<Value> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: method.clone(),
            path: path.to_string(),
            options,
        });

        let reply = self
            .replies
            .lock()
            .unwrap()
            .get_mut(&(method.clone(), path.to_string()))
            .and_then(VecDeque::pop_front);

        match reply {
            Some(Reply::Payload(payload)) => Ok(payload),
            Some(Reply::Failure { status, message }) => Err(Error::Api { status, message }),
            Some(Reply::Offline) => Err(Error::Transport("connection refused".to_string())),
            Some(Reply::Gated(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(Error::Transport("gate dropped".to_string()))),
            None => Err(Error::Api {
                status: 404,
                message: Some(format!("no stub for {} {}", method, path)),
            }),
        }
    }
}

/// A session store over `stub`, optionally already holding `token`.
pub(crate) async fn session_with(
    stub: &Arc<StubTransport>,
    token: Option<&str>,
) -> (Arc<SessionStore>, MemoryStorage) {
    let storage = MemoryStorage::new();
    if let Some(token) = token {
        use sc_core::KeyValueStorage;
        storage.set(sc_core::TOKEN_KEY, token).await.unwrap();
    }
    let session = SessionStore::restore(stub.clone(), Arc::new(storage.clone()))
        .await
        .unwrap();
    (Arc::new(session), storage)
}

/// Lets spawned tasks run until `stub` has seen `count` calls.
pub(crate) async fn wait_for_calls(stub: &StubTransport, count: usize) {
    while stub.call_count() < count {
        tokio::task::yield_now().await;
    }
}
