//! Background save worker.
//!
//! Saves are fire-and-forget for the caller. One worker thread sends them in
//! the order they were initiated, so the remote store converges on the
//! latest initiated save. Each buffer's saves are debounced over a trailing
//! window and coalesced to the newest revision; a revision not newer than
//! the last one sent for that buffer is dropped.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::buffer::BufferId;
use crate::error::RemoteError;
use crate::remote::{RemoteFiles, SaveContent};

/// One scheduled save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub buffer: BufferId,
    pub path: String,
    pub content: String,
    pub revision: u64,
}

/// Result of a save the worker actually sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub buffer: BufferId,
    pub path: String,
    pub revision: u64,
    pub result: Result<(), RemoteError>,
}

enum SaveCommand {
    Save(SaveRequest),
    Cancel(BufferId, Sender<()>),
    Flush(Sender<()>),
}

/// Handle to the save worker; dropping it sends what is pending and joins.
#[derive(Debug)]
pub struct SaveQueue {
    commands: Option<Sender<SaveCommand>>,
    outcomes: Receiver<SaveOutcome>,
    worker: Option<thread::JoinHandle<()>>,
}

impl SaveQueue {
    /// Spawns the worker.
    pub fn spawn(remote: Arc<dyn RemoteFiles>, debounce: Duration) -> std::io::Result<Self> {
        let (commands_tx, commands_rx) = unbounded();
        let (outcomes_tx, outcomes_rx) = unbounded();
        let worker = thread::Builder::new()
            .name("atlas-save".to_string())
            .spawn(move || {
                SaveWorker {
                    remote,
                    debounce,
                    outcomes: outcomes_tx,
                    pending: IndexMap::new(),
                    last_sent: FxHashMap::default(),
                }
                .run(&commands_rx);
            })?;
        Ok(Self {
            commands: Some(commands_tx),
            outcomes: outcomes_rx,
            worker: Some(worker),
        })
    }

    /// Queues a save; never blocks on the network.
    pub fn schedule(&self, request: SaveRequest) {
        self.send(SaveCommand::Save(request));
    }

    /// Drops saves still waiting for `buffer` and forgets what was sent for it.
    ///
    /// Returns once the worker has processed the cancellation, so no save for
    /// `buffer` is sent afterwards unless a new one is scheduled.
    pub fn cancel(&self, buffer: BufferId) {
        let (tx, rx) = unbounded();
        self.send(SaveCommand::Cancel(buffer, tx));
        let _ = rx.recv();
    }

    /// Sends everything pending and waits until the worker is idle.
    pub fn flush(&self) {
        let (tx, rx) = unbounded();
        self.send(SaveCommand::Flush(tx));
        let _ = rx.recv();
    }

    /// Outcomes received since the last call.
    pub fn drain_outcomes(&self) -> Vec<SaveOutcome> {
        self.outcomes.try_iter().collect()
    }

    fn send(&self, command: SaveCommand) {
        let Some(commands) = &self.commands else {
            return;
        };
        if commands.send(command).is_err() {
            warn!("save worker is gone, dropping command");
        }
    }
}

impl Drop for SaveQueue {
    fn drop(&mut self) {
        self.commands.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

struct SaveWorker {
    remote: Arc<dyn RemoteFiles>,
    debounce: Duration,
    outcomes: Sender<SaveOutcome>,
    pending: IndexMap<BufferId, (Instant, SaveRequest)>,
    last_sent: FxHashMap<BufferId, u64>,
}

impl SaveWorker {
    fn run(mut self, commands: &Receiver<SaveCommand>) {
        loop {
            let command = match self.next_deadline() {
                None => match commands.recv() {
                    Ok(command) => command,
                    Err(_) => break,
                },
                Some(deadline) => {
                    match commands.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                        Ok(command) => command,
                        Err(RecvTimeoutError::Timeout) => {
                            self.send_due(Instant::now());
                            continue;
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            };
            match command {
                SaveCommand::Save(request) => self.queue(request),
                SaveCommand::Cancel(buffer, done) => {
                    if self.pending.shift_remove(&buffer).is_some() {
                        debug!("cancelled pending save for buffer {buffer}");
                    }
                    self.last_sent.remove(&buffer);
                    let _ = done.send(());
                }
                SaveCommand::Flush(done) => {
                    self.send_all();
                    let _ = done.send(());
                }
            }
        }
        self.send_all();
    }

    fn queue(&mut self, request: SaveRequest) {
        let due = Instant::now() + self.debounce;
        match self.pending.get_mut(&request.buffer) {
            Some((at, queued)) if request.revision > queued.revision => {
                *at = due;
                *queued = request;
            }
            Some(_) => debug!(
                "ignoring stale save r{} for '{}'",
                request.revision, request.path
            ),
            None => {
                self.pending.insert(request.buffer, (due, request));
            }
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|(at, _)| *at).min()
    }

    fn send_due(&mut self, now: Instant) {
        let due: Vec<BufferId> = self
            .pending
            .iter()
            .filter(|(_, (at, _))| *at <= now)
            .map(|(buffer, _)| *buffer)
            .collect();
        for buffer in due {
            if let Some((_, request)) = self.pending.shift_remove(&buffer) {
                self.send(request);
            }
        }
    }

    fn send_all(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        for (_, (_, request)) in pending {
            self.send(request);
        }
    }

    fn send(&mut self, request: SaveRequest) {
        if let Some(last) = self.last_sent.get(&request.buffer) {
            if request.revision <= *last {
                debug!(
                    "dropping save r{} for '{}', r{last} already sent",
                    request.revision, request.path
                );
                return;
            }
        }
        let result = self.remote.save(&SaveContent {
            filename: &request.path,
            content: &request.content,
            revision: request.revision,
        });
        if let Err(err) = &result {
            warn!("saving '{}' (r{}) failed: {err}", request.path, request.revision);
        }
        self.last_sent.insert(request.buffer, request.revision);
        let _ = self.outcomes.send(SaveOutcome {
            buffer: request.buffer,
            path: request.path,
            revision: request.revision,
            result,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferRegistry;
    use crate::test_support::FakeRemote;

    fn buffers() -> (BufferId, BufferId) {
        let mut registry = BufferRegistry::new();
        let a = registry.open("a.js", "").expect("open");
        let b = registry.open("b.js", "").expect("open");
        (a, b)
    }

    fn request(buffer: BufferId, path: &str, content: &str, revision: u64) -> SaveRequest {
        SaveRequest {
            buffer,
            path: path.to_string(),
            content: content.to_string(),
            revision,
        }
    }

    #[test]
    fn coalesces_to_newest_revision_per_buffer() {
        let remote = Arc::new(FakeRemote::default());
        let queue = SaveQueue::spawn(remote.clone(), Duration::from_secs(60)).expect("spawn");
        let (a, b) = buffers();
        queue.schedule(request(a, "a.js", "1", 1));
        queue.schedule(request(b, "b.js", "x", 1));
        queue.schedule(request(a, "a.js", "12", 2));
        queue.schedule(request(a, "a.js", "stale", 1));
        queue.flush();

        assert_eq!(
            remote.saves(),
            vec![
                ("a.js".to_string(), "12".to_string(), 2),
                ("b.js".to_string(), "x".to_string(), 1),
            ]
        );
        let outcomes = queue.drain_outcomes();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|outcome| outcome.result.is_ok()));
    }

    #[test]
    fn revisions_already_sent_are_dropped() {
        let remote = Arc::new(FakeRemote::default());
        let queue = SaveQueue::spawn(remote.clone(), Duration::ZERO).expect("spawn");
        let (a, _) = buffers();
        queue.schedule(request(a, "a.js", "v3", 3));
        queue.flush();
        queue.schedule(request(a, "a.js", "v2", 2));
        queue.flush();
        assert_eq!(remote.saves().len(), 1);
    }

    #[test]
    fn cancel_drops_pending_save() {
        let remote = Arc::new(FakeRemote::default());
        let queue = SaveQueue::spawn(remote.clone(), Duration::from_secs(60)).expect("spawn");
        let (a, b) = buffers();
        queue.schedule(request(a, "a.js", "gone", 1));
        queue.schedule(request(b, "b.js", "kept", 1));
        queue.cancel(a);
        queue.flush();
        assert_eq!(
            remote.saves(),
            vec![("b.js".to_string(), "kept".to_string(), 1)]
        );
    }

    #[test]
    fn cancel_forgets_sent_revisions() {
        let remote = Arc::new(FakeRemote::default());
        let queue = SaveQueue::spawn(remote.clone(), Duration::from_secs(60)).expect("spawn");
        let (a, _) = buffers();
        queue.schedule(request(a, "a.js", "v1", 1));
        queue.flush();
        queue.cancel(a);
        queue.schedule(request(a, "a.js", "v1", 1));
        queue.flush();
        assert_eq!(remote.saves().len(), 2);
    }

    #[test]
    fn failures_are_reported_not_raised() {
        let remote = Arc::new(FakeRemote::default());
        remote.fail_saves(true);
        let queue = SaveQueue::spawn(remote.clone(), Duration::ZERO).expect("spawn");
        let (a, _) = buffers();
        queue.schedule(request(a, "a.js", "text", 1));
        queue.flush();
        let outcomes = queue.drain_outcomes();
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].result.is_err());
    }

    #[test]
    fn debounce_window_sends_without_flush() {
        let remote = Arc::new(FakeRemote::default());
        let queue = SaveQueue::spawn(remote.clone(), Duration::from_millis(5)).expect("spawn");
        let (a, _) = buffers();
        queue.schedule(request(a, "a.js", "late", 1));
        let started = Instant::now();
        while remote.saves().is_empty() && started.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(remote.saves().len(), 1);
    }

    #[test]
    fn drop_sends_pending_saves() {
        let remote = Arc::new(FakeRemote::default());
        let (a, _) = buffers();
        {
            let queue = SaveQueue::spawn(remote.clone(), Duration::from_secs(60)).expect("spawn");
            queue.schedule(request(a, "a.js", "final", 1));
        }
        assert_eq!(remote.saves().len(), 1);
    }
}
