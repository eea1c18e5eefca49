//! Background execution of a find or replace run.
//!
//! The engine runs on its own thread and pushes `RunEvent`s into an
//! unbounded channel, so it never waits on the consumer. The consumer drains
//! the channel from whatever context it lives in (a UI loop, the CLI main
//! thread) through the `EventReceiver` returned by `RunController::start`.

use crate::config::RunConfig;
use crate::errors::{Error, Result};
use crate::replacer::Replacer;
use crate::scanner::{CancelToken, RunEvent, RunState, Scanner};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};
use tracing::{error, info};

/// Which engine a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Read-only search.
    Find,
    /// Search and rewrite; requires `RunConfig::replace_text`.
    Replace,
}

enum Engine {
    Find(Scanner),
    Replace(Replacer),
}

impl Engine {
    fn build(config: RunConfig, mode: RunMode) -> Result<Self> {
        Ok(match mode {
            RunMode::Find => Engine::Find(Scanner::new(config)?),
            RunMode::Replace => Engine::Replace(Replacer::new(config)?),
        })
    }

    fn run<F: FnMut(RunEvent)>(&mut self, on_event: F, cancel: &CancelToken) -> RunState {
        match self {
            Engine::Find(scanner) => scanner.run(on_event, cancel),
            Engine::Replace(replacer) => replacer.run(on_event, cancel),
        }
    }
}

/// Owns at most one active run. Dropping the controller cancels it.
pub struct RunController {
    worker: Option<JoinHandle<RunState>>,
    cancel: CancelToken,
    last_state: RunState,
}

impl Default for RunController {
    fn default() -> Self {
        Self::new()
    }
}

impl RunController {
    pub fn new() -> Self {
        Self {
            worker: None,
            cancel: CancelToken::new(),
            last_state: RunState::Idle,
        }
    }

    /// Validates `config` and starts a run on a background thread.
    ///
    /// Returns immediately. Configuration problems are reported here, before
    /// any file is touched; starting while a run is active fails with
    /// `Error::AlreadyRunning`.
    pub fn start(&mut self, config: RunConfig, mode: RunMode) -> Result<EventReceiver> {
        if self.is_running() {
            return Err(Error::AlreadyRunning);
        }
        self.reap();

        let mut engine = Engine::build(config, mode)?;
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();
        let (tx, rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("fnr-run".to_string())
            .spawn(move || {
                engine.run(
                    |event| {
                        // Nobody is listening any more; stop at the next file.
                        if tx.send(event).is_err() {
                            worker_cancel.cancel();
                        }
                    },
                    &worker_cancel,
                )
            })?;

        info!(?mode, "run started");
        self.worker = Some(handle);
        self.cancel = cancel.clone();
        self.last_state = RunState::Running;

        Ok(EventReceiver { rx, cancel })
    }

    /// Requests cancellation of the active run. Safe to call repeatedly or
    /// after the run has finished.
    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            info!("cancellation requested");
        }
        self.cancel.cancel();
    }

    /// A handle that cancels the current run from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// `true` while the worker thread is still alive.
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// The state of the most recent run, as far as it is known.
    pub fn state(&mut self) -> RunState {
        if !self.is_running() {
            self.reap();
        }
        self.last_state
    }

    /// Blocks until the worker exits and returns its final state.
    pub fn join(&mut self) -> RunState {
        if let Some(handle) = self.worker.take() {
            self.last_state = Self::collect(handle);
        }
        self.last_state
    }

    fn reap(&mut self) {
        if self.worker.as_ref().is_some_and(|w| w.is_finished()) {
            self.join();
        }
    }

    fn collect(handle: JoinHandle<RunState>) -> RunState {
        handle.join().unwrap_or_else(|_| {
            error!("run worker panicked");
            RunState::Cancelled
        })
    }
}

impl Drop for RunController {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// The consumer end of a run.
///
/// Events arrive in processing order. Once the run is cancelled nothing more
/// is handed out, even if the worker had already queued events.
#[derive(Debug)]
pub struct EventReceiver {
    rx: Receiver<RunEvent>,
    cancel: CancelToken,
}

impl EventReceiver {
    /// Delivers every event queued so far without blocking.
    ///
    /// Meant to be called from a consumer's own loop (e.g. once per UI
    /// frame). Returns the number of events delivered.
    pub fn pump<F: FnMut(RunEvent)>(&self, mut on_event: F) -> usize {
        let mut delivered = 0;
        while !self.cancel.is_cancelled() {
            match self.rx.try_recv() {
                Ok(event) => {
                    on_event(event);
                    delivered += 1;
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        delivered
    }

    /// Waits for the next event. `None` once the run has ended or was cancelled.
    pub fn recv(&self) -> Option<RunEvent> {
        if self.cancel.is_cancelled() {
            return None;
        }
        let event = self.rx.recv().ok()?;
        (!self.cancel.is_cancelled()).then_some(event)
    }

    /// `true` if the run has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Iterator for EventReceiver {
    type Item = RunEvent;

    fn next(&mut self) -> Option<RunEvent> {
        self.recv()
    }
}
