//! Runs a session's auto-save timer on tokio.

use super::{PageCache, SaveRequest, SaveState, StudioSession};
use crate::services::PageStore;
use anyhow::{anyhow, bail, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

/// Shared handle to a session.
///
/// Mutations go through [`Self::update`], which wakes the driver so it
/// re-reads the save deadline. The lock is never held across an await.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    session: Arc<Mutex<StudioSession>>,
    notify: Arc<Notify>,
    settled: Arc<Notify>,
    closed: Arc<AtomicBool>,
}

impl SessionHandle {
    /// Wraps `session`.
    #[must_use]
    pub fn new(session: StudioSession) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            notify: Arc::new(Notify::new()),
            settled: Arc::new(Notify::new()),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StudioSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reads the session.
    pub fn with<R>(&self, f: impl FnOnce(&StudioSession) -> R) -> R {
        f(&self.lock())
    }

    /// Mutates the session and wakes the driver.
    pub fn update<R>(&self, f: impl FnOnce(&mut StudioSession) -> R) -> R {
        let result = f(&mut self.lock());
        self.notify.notify_one();
        result
    }

    /// Mutates without waking the driver.
    fn with_mut_quiet<R>(&self, f: impl FnOnce(&mut StudioSession) -> R) -> R {
        f(&mut self.lock())
    }

    /// Stops the driver after its current step.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    /// Whether [`Self::close`] was called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Saves a session through a [`PageStore`] when its debounce timer fires.
#[derive(Clone)]
pub struct AutoSaveDriver {
    handle: SessionHandle,
    store: Arc<dyn PageStore>,
    cache: PageCache,
}

impl AutoSaveDriver {
    /// Creates a driver for `handle`.
    #[must_use]
    pub fn new(handle: SessionHandle, store: Arc<dyn PageStore>, cache: PageCache) -> Self {
        Self { handle, store, cache }
    }

    /// Runs [`Self::run`] on a new task.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Waits for due saves and performs them until the handle is closed,
    /// then flushes whatever is still pending.
    pub async fn run(self) {
        while !self.handle.is_closed() {
            let deadline = self.handle.with(StudioSession::next_deadline);
            match deadline {
                Some(deadline) => {
                    tokio::select! {
                        () = sleep_until(deadline) => {
                            self.tick().await;
                        }
                        () = self.handle.notify.notified() => {}
                    }
                }
                None => self.handle.notify.notified().await,
            }
        }
        if let Err(e) = self.flush().await {
            warn!(error = %e, "final save after close failed");
        }
        debug!("auto-save driver stopped");
    }

    /// Performs the scheduled save if it is due. Returns whether one ran.
    pub async fn tick(&self) -> bool {
        let request = self.handle.with_mut_quiet(|s| s.poll(Instant::now()));
        match request {
            Some(request) => {
                self.save(request).await;
                true
            }
            None => false,
        }
    }

    /// Saves immediately, skipping the debounce delay.
    ///
    /// A save already in flight is awaited first, and edits made while it
    /// ran are saved after it. Returns once the session is `Clean`, or
    /// `SaveFailed` after one attempt of its own.
    ///
    /// # Errors
    ///
    /// Returns the save error if the session ends up in `SaveFailed`.
    pub async fn flush(&self) -> Result<()> {
        let mut attempted = false;
        loop {
            // Registered before reading the state so a completion in between
            // still wakes us.
            let settled = self.handle.settled.notified();
            tokio::pin!(settled);
            settled.as_mut().enable();

            let (state, request) = self.handle.with_mut_quiet(|s| {
                let state = s.state();
                let request = match state {
                    SaveState::SaveFailed if attempted => None,
                    _ => s.flush(),
                };
                (state, request)
            });

            match (state, request) {
                (_, Some(request)) => {
                    attempted = true;
                    self.save(request).await;
                }
                (SaveState::Saving, None) => settled.await,
                _ => break,
            }
        }
        self.outcome()
    }

    /// Retries a failed save.
    ///
    /// # Errors
    ///
    /// Returns the save error if the retry fails as well.
    pub async fn retry(&self) -> Result<()> {
        if let Some(request) = self.handle.with_mut_quiet(StudioSession::retry) {
            self.save(request).await;
        }
        self.outcome()
    }

    fn outcome(&self) -> Result<()> {
        self.handle.with(|s| match s.state() {
            SaveState::SaveFailed => {
                let message = s.status().last_error.unwrap_or_default();
                bail!("Failed to save page '{}': {message}", s.page_id())
            }
            _ => Ok(()),
        })
    }

    async fn save(&self, request: SaveRequest) {
        let store = Arc::clone(&self.store);
        let SaveRequest {
            page_id,
            revision,
            content,
        } = request;

        let result = tokio::task::spawn_blocking(move || store.update_page(&page_id, &content).map(|_| ()))
            .await
            .unwrap_or_else(|e| Err(anyhow!("Save task failed: {e}")));

        self.handle
            .update(|s| s.complete_save(revision, result, Some(&self.cache)));
        self.handle.settled.notify_waiters();
    }
}
