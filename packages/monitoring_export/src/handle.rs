use std::thread::JoinHandle;

use tokio::sync::oneshot;
use tracing::error;

/// Controls an exporter running on its own thread, as started by
/// [`Exporter::start()`][crate::Exporter::start].
///
/// Dropping the handle shuts the exporter down and waits for its thread to exit.
#[derive(Debug)]
pub struct ExportHandle {
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl ExportHandle {
    pub(crate) fn new(shutdown: oneshot::Sender<()>, thread: JoinHandle<()>) -> Self {
        Self {
            shutdown: Some(shutdown),
            thread: Some(thread),
        }
    }

    /// Whether the exporter thread is still running.
    ///
    /// An exporter that disabled itself during initialization stops right away.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .is_some_and(|thread| !thread.is_finished())
    }

    /// Stops the exporter and waits for its thread to exit.
    ///
    /// A flush in progress is completed, followed by a final flush if any flush has succeeded
    /// before. Calling this again has no effect.
    pub fn shutdown(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            // The exporter may have stopped on its own already.
            _ = shutdown.send(());
        }

        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("metrics exporter thread panicked");
            }
        }
    }
}

impl Drop for ExportHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
