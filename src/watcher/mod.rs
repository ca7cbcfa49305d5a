//! Live reload of the behavior document.
//!
//! ```text
//! notify callback (OS thread)
//!   -> try_send(()) on a bounded channel, dropped when full
//!        -> reload task: wait for `debounce` of quiet
//!             -> spawn_blocking(read + parse + install)
//!                  ok        : info!, report
//!                  I/O error : warn!, retry every `io_retry_interval`
//!                  otherwise : error!, active behaviors stay in force
//! ```
//!
//! Only one reload runs at a time; `force_reload` shares the same lock as
//! the background task.

#[cfg(test)]
mod watcher_test;

use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use notify::Event;
use notify::EventKind;
use notify::RecommendedWatcher;
use notify::RecursiveMode;
use notify::Watcher;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep_until;
use tokio::time::timeout;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;
use tracing::Instrument;
use tracing::Span;

use crate::DocumentError;
use crate::DocumentSource;
use crate::DynamicConfigLoader;
use crate::EngineConfig;
use crate::Error;
use crate::FileSource;
use crate::Registry;
use crate::ReloadReport;
use crate::Result;
use crate::WatchError;

/// State shared by the reload task and the owning [`ConfigWatcher`]
struct ReloadContext {
    registry: Registry,
    loader: DynamicConfigLoader,
    source: Arc<dyn DocumentSource>,
    /// Held for the duration of one reload
    lock: Mutex<()>,
    reloads: AtomicU64,
}

impl ReloadContext {
    fn reload(&self) -> Result<ReloadReport> {
        let _guard = self.lock.lock();
        let report = self.loader.reload(self.source.as_ref(), &self.registry)?;
        self.reloads.fetch_add(1, Ordering::SeqCst);
        Ok(report)
    }
}

/// Reloads that can succeed later without the document changing
fn is_transient(err: &Error) -> bool {
    matches!(err, Error::Io(_) | Error::Document(DocumentError::Read { .. }))
}

/// Keeps a registry in sync with a behavior document.
///
/// The OS watch handle and the reload task live as long as this value;
/// [`stop`](ConfigWatcher::stop) releases both deterministically, dropping
/// the watcher cancels the task without waiting for it.
pub struct ConfigWatcher {
    ctx: Arc<ReloadContext>,
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
    watcher: Option<RecommendedWatcher>,
    signal_tx: mpsc::Sender<()>,
}

impl std::fmt::Debug for ConfigWatcher {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ConfigWatcher")
            .field("location", &self.ctx.source.location())
            .field("active", &self.is_active())
            .field("reloads", &self.reload_count())
            .finish()
    }
}

impl ConfigWatcher {
    /// Loads the file at `location` into `registry` and starts watching it.
    ///
    /// Fails if the initial load fails. Must be called within a Tokio runtime.
    pub fn start(
        registry: Registry,
        location: impl Into<PathBuf>,
        config: &EngineConfig,
    ) -> Result<Self> {
        Self::start_with_source(registry, Arc::new(FileSource::new(location)), config)
    }

    /// Same as [`start`](Self::start) for any source whose `location` is a
    /// file path the OS can watch.
    pub fn start_with_source(
        registry: Registry,
        source: Arc<dyn DocumentSource>,
        config: &EngineConfig,
    ) -> Result<Self> {
        config.watcher.validate()?;

        let location = source.location().to_path_buf();
        let (dir, file_name) = split_location(&location)?;

        let ctx = Arc::new(ReloadContext {
            registry,
            loader: DynamicConfigLoader::new(config.loader.clone()),
            source,
            lock: Mutex::new(()),
            reloads: AtomicU64::new(0),
        });
        let report = ctx.reload()?;
        info!(path = ?location, installed = ?report.installed, "initial behavior load");

        let (signal_tx, signal_rx) = mpsc::channel(config.watcher.event_channel_capacity);

        let tx = signal_tx.clone();
        let mut watcher = notify::recommended_watcher(move |res: std::result::Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    let relevant = matches!(
                        event.kind,
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                    ) && event.paths.iter().any(|p| p.file_name() == Some(file_name.as_os_str()));
                    if relevant {
                        // A full channel already holds a pending reload
                        let _ = tx.try_send(());
                    }
                }
                Err(e) => warn!("behavior document watch error: {:?}", e),
            }
        })
        .map_err(WatchError::from)?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(WatchError::from)?;
        debug!(dir = ?dir, "watching directory");

        let token = CancellationToken::new();
        let handle = tokio::spawn(
            run(
                ctx.clone(),
                signal_rx,
                token.clone(),
                config.watcher.debounce(),
                config.watcher.io_retry_interval(),
            )
            .in_current_span(),
        );

        Ok(Self {
            ctx,
            token,
            handle: Some(handle),
            watcher: Some(watcher),
            signal_tx,
        })
    }

    pub fn location(&self) -> &Path {
        self.ctx.source.location()
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled() && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Successful reloads so far, the initial load included
    pub fn reload_count(&self) -> u64 {
        self.ctx.reloads.load(Ordering::SeqCst)
    }

    /// Reloads right away, bypassing the debounce window
    pub async fn force_reload(&self) -> Result<ReloadReport> {
        if self.token.is_cancelled() {
            return Err(WatchError::Stopped.into());
        }
        let ctx = self.ctx.clone();
        let span = Span::current();
        tokio::task::spawn_blocking(move || span.in_scope(|| ctx.reload()))
            .await
            .map_err(WatchError::from)?
    }

    /// Releases the OS watch handle and waits for the reload task to exit.
    /// Calling it again is a no-op.
    pub async fn stop(&mut self) -> Result<()> {
        self.token.cancel();
        self.watcher.take();
        if let Some(handle) = self.handle.take() {
            handle.await.map_err(WatchError::from)?;
            info!(path = ?self.ctx.source.location(), "stopped watching behavior document");
        }
        Ok(())
    }

    /// Schedules a debounced reload as if the OS had reported a change
    pub fn notify_changed(&self) {
        let _ = self.signal_tx.try_send(());
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Directory to watch and file name to filter events on
fn split_location(location: &Path) -> Result<(PathBuf, std::ffi::OsString)> {
    let invalid = || WatchError::InvalidLocation(location.to_path_buf());
    let file_name = location.file_name().ok_or_else(invalid)?.to_os_string();
    let dir = match location.parent() {
        Some(dir) if dir.as_os_str().is_empty() => PathBuf::from("."),
        Some(dir) => dir.to_path_buf(),
        None => return Err(invalid().into()),
    };
    Ok((dir, file_name))
}

async fn run(
    ctx: Arc<ReloadContext>,
    mut rx: mpsc::Receiver<()>,
    token: CancellationToken,
    debounce: Duration,
    io_retry_interval: Duration,
) {
    let mut retry_at: Option<Instant> = None;

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            signal = rx.recv() => {
                if signal.is_none() || !settle(&mut rx, &token, debounce).await {
                    break;
                }
                retry_at = None;
            }
            _ = retry_due(retry_at) => {
                retry_at = None;
                debug!("retrying behavior reload");
            }
        }

        let task_ctx = ctx.clone();
        let span = Span::current();
        let outcome = match tokio::task::spawn_blocking(move || span.in_scope(|| task_ctx.reload())).await {
            Ok(outcome) => outcome,
            Err(e) => Err(WatchError::from(e).into()),
        };
        match outcome {
            // Warnings were already logged by the loader
            Ok(report) => {
                info!(
                    installed = ?report.installed,
                    removed = ?report.removed,
                    warnings = report.warnings.len(),
                    "behavior document reloaded"
                );
            }
            Err(e) if is_transient(&e) => {
                warn!("behavior reload failed, retrying in {:?}: {}", io_retry_interval, e);
                retry_at = Some(Instant::now() + io_retry_interval);
            }
            Err(e) => {
                error!("behavior reload failed, keeping active behaviors: {}", e);
            }
        }
    }
    debug!("behavior reload task exited");
}

/// Waits until no signal arrived for `debounce`. Returns false when the
/// watcher is shutting down.
async fn settle(
    rx: &mut mpsc::Receiver<()>,
    token: &CancellationToken,
    debounce: Duration,
) -> bool {
    loop {
        tokio::select! {
            _ = token.cancelled() => return false,
            next = timeout(debounce, rx.recv()) => match next {
                Err(_) => return true,
                Ok(Some(())) => continue,
                Ok(None) => return false,
            },
        }
    }
}

async fn retry_due(at: Option<Instant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

impl Registry {
    /// Starts a [`ConfigWatcher`] on `location` with default engine
    /// settings, optionally overriding the debounce window.
    pub fn start_watching(
        &self,
        location: impl Into<PathBuf>,
        debounce: Option<Duration>,
    ) -> Result<ConfigWatcher> {
        let mut config = EngineConfig::default();
        if let Some(debounce) = debounce {
            config.watcher.debounce_in_ms = debounce.as_millis().max(1) as u64;
        }
        ConfigWatcher::start(self.clone(), location, &config)
    }
}
