//! Async driver running adapter requests against a [`PartApi`].
//!
//! Requests run concurrently on a [`JoinSet`], each bounded by the
//! configured timeout. Completions are applied one at a time by the owner
//! of the model, in arrival order.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use folium_core::{AppEvent, EventBus, RemoteError, SyncEvent};
use folium_editor::EditorCommand;
use tokio::task::{self, JoinSet};

use crate::adapter::{Completion, SyncAdapter, SyncTarget};
use crate::api::{PartApi, RemoteRequest, RemoteResponse, RequestId};

type Outcome = (RequestId, Result<RemoteResponse, RemoteError>);

pub struct SyncDriver<A: PartApi + 'static> {
    api: Arc<A>,
    adapter: SyncAdapter,
    tasks: JoinSet<Outcome>,
    /// Request each running task carries, for tasks that die without an outcome.
    task_requests: HashMap<task::Id, RequestId>,
    timeout: Duration,
    bus: Arc<EventBus>,
}

impl<A: PartApi + 'static> SyncDriver<A> {
    pub fn new(api: Arc<A>, timeout: Duration, bus: Arc<EventBus>) -> Self {
        Self {
            api,
            adapter: SyncAdapter::new(),
            tasks: JoinSet::new(),
            task_requests: HashMap::new(),
            timeout,
            bus,
        }
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    pub fn adapter(&self) -> &SyncAdapter {
        &self.adapter
    }

    /// Number of requests still running.
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Hands a command to the adapter and starts the requests it produces.
    pub fn dispatch(&mut self, command: EditorCommand, target: &mut dyn SyncTarget) {
        let requests = self.adapter.handle(command, target);
        for request in requests {
            self.spawn(request);
        }
    }

    /// Waits for the next request to finish and applies it. Returns `None`
    /// when nothing is running.
    pub async fn next_completion(&mut self, target: &mut dyn SyncTarget) -> Option<RequestId> {
        let joined = self.tasks.join_next_with_id().await?;
        let (request, result) = match joined {
            Ok((task_id, outcome)) => {
                self.task_requests.remove(&task_id);
                outcome
            }
            Err(e) => {
                let request = self.task_requests.remove(&e.id())?;
                tracing::error!("Sync task for request {} aborted: {}", request, e);
                let error = RemoteError::Network {
                    reason: format!("request task aborted: {e}"),
                };
                (request, Err(error))
            }
        };
        let completion = self.adapter.complete(request, result, target);
        self.publish(completion);
        Some(request)
    }

    /// Applies completions until no request is running.
    pub async fn settle(&mut self, target: &mut dyn SyncTarget) -> usize {
        let mut completed = 0;
        while !self.tasks.is_empty() {
            if self.next_completion(target).await.is_some() {
                completed += 1;
            }
        }
        completed
    }

    fn spawn(&mut self, request: RemoteRequest) {
        let key = self.adapter.request_key(request.id);
        self.bus.publish(AppEvent::Sync(SyncEvent::RequestIssued {
            request: request.id,
            key,
            operation: request.operation.name().to_string(),
        }));
        let api = Arc::clone(&self.api);
        let timeout = self.timeout;
        let request_id = request.id;
        let handle = self.tasks.spawn(async move {
            let result = match tokio::time::timeout(timeout, api.send(&request)).await {
                Ok(result) => result,
                Err(_) => Err(RemoteError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                }),
            };
            (request.id, result)
        });
        self.task_requests.insert(handle.id(), request_id);
    }

    fn publish(&mut self, completion: Completion) {
        for event in completion.events {
            self.bus.publish(AppEvent::Sync(event));
        }
        if let Some(alert) = completion.alert {
            self.bus.publish(AppEvent::Alert(alert));
        }
        for request in completion.requests {
            self.spawn(request);
        }
    }
}
