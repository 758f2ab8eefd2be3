use std::future::Future;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use research_service::{
    ExportPayload, MessageReply, RegisterReply, ServiceError, TokenStatus,
};
use serde_json::Value;
use tokio::runtime::Runtime;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Result of one backend call, delivered back to the UI thread.
#[derive(Debug)]
pub enum Outcome {
    AuthChecked(Result<TokenStatus, ServiceError>),
    EmailChecked {
        email: String,
        result: Result<bool, ServiceError>,
    },
    Registered(Result<RegisterReply, ServiceError>),
    OtpVerified(Result<MessageReply, ServiceError>),
    SignedIn(Result<MessageReply, ServiceError>),
    QueryAnswered(Result<Value, ServiceError>),
    HistoryLoaded(Result<Value, ServiceError>),
    Exported {
        id: String,
        result: Result<ExportPayload, ServiceError>,
    },
}

/// Lifetime of a screen's background work. Dropping the scope cancels every
/// task spawned under it, and their completions are discarded.
pub struct Scope {
    token: CancellationToken,
    _guard: DropGuard,
}

impl Scope {
    fn new(token: CancellationToken) -> Self {
        Self {
            _guard: token.clone().drop_guard(),
            token,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

struct Completion {
    token: CancellationToken,
    outcome: Option<Outcome>,
}

/// Runs backend calls on an internal tokio runtime and hands their results
/// back over a channel, so the UI thread never blocks on the network.
pub struct TaskRunner {
    rt: Runtime,
    root: CancellationToken,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
    in_flight: usize,
}

impl TaskRunner {
    pub fn new() -> std::io::Result<Self> {
        let (tx, rx) = channel();
        Ok(Self {
            rt: Runtime::new()?,
            root: CancellationToken::new(),
            tx,
            rx,
            in_flight: 0,
        })
    }

    /// A fresh scope tied to this runner.
    pub fn scope(&self) -> Scope {
        Scope::new(self.root.child_token())
    }

    pub fn spawn<F>(&mut self, scope: &Scope, fut: F)
    where
        F: Future<Output = Outcome> + Send + 'static,
    {
        let token = scope.token.clone();
        let tx = self.tx.clone();
        self.in_flight += 1;
        self.rt.spawn(async move {
            let outcome = tokio::select! {
                _ = token.cancelled() => None,
                outcome = fut => Some(outcome),
            };
            let _ = tx.send(Completion { token, outcome });
        });
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Completed outcomes that are still wanted, without blocking.
    pub fn drain(&mut self) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        while let Ok(completion) = self.rx.try_recv() {
            self.accept(completion, &mut outcomes);
        }
        outcomes
    }

    /// Block until at least one task completes or `timeout` elapses, then
    /// drain whatever else is ready.
    pub fn wait(&mut self, timeout: Duration) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        if self.in_flight == 0 {
            return outcomes;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(completion) => self.accept(completion, &mut outcomes),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => {
                return outcomes
            }
        }
        outcomes.extend(self.drain());
        outcomes
    }

    fn accept(&mut self, completion: Completion, outcomes: &mut Vec<Outcome>) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if completion.token.is_cancelled() {
            return;
        }
        if let Some(outcome) = completion.outcome {
            outcomes.push(outcome);
        }
    }
}

impl Drop for TaskRunner {
    fn drop(&mut self) {
        self.root.cancel();
    }
}
