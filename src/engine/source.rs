//! Reader actor: dedicated thread turning a byte stream into lines.
//!
//! The producer's output is read in chunks on its own thread, split on
//! `\n` and forwarded over a channel, so the session loop never blocks on
//! the pipe and can keep serving buffer deadlines.

use crate::event::LineSplitter;
use crossbeam_channel::Sender;
use std::io::{self, ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Messages from the reader thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceMessage {
    /// One complete line, without its terminator.
    Line(String),
    /// The reader hit end of input. No more messages follow.
    Eof,
    /// Reading failed. No more messages follow.
    Error(String),
}

/// Reader actor that owns the input stream.
pub struct LineReader {
    /// Handle to the reader thread.
    handle: Option<JoinHandle<()>>,
    /// Flag to signal shutdown.
    shutdown: Arc<AtomicBool>,
}

impl LineReader {
    /// Spawn the reader thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS fails to spawn the thread.
    pub fn spawn<R>(reader: R, sender: Sender<SourceMessage>) -> io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();

        let handle = thread::Builder::new()
            .name("ralph-reader".to_string())
            .spawn(move || {
                Self::run_loop(reader, &sender, &shutdown_clone);
            })?;

        Ok(Self {
            handle: Some(handle),
            shutdown,
        })
    }

    /// Signal the reader to stop after its current read.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Wait for the reader thread to finish.
    ///
    /// A read blocked on an open pipe only returns once the producer writes
    /// or closes it.
    pub fn join(mut self) {
        self.shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    /// Main read loop.
    fn run_loop<R: Read>(mut reader: R, sender: &Sender<SourceMessage>, shutdown: &AtomicBool) {
        let mut splitter = LineSplitter::new();
        let mut chunk = [0u8; 8192];

        loop {
            if shutdown.load(Ordering::Relaxed) {
                return;
            }

            match reader.read(&mut chunk) {
                Ok(0) => {
                    if let Some(rest) = splitter.finish() {
                        let _ = sender.send(SourceMessage::Line(rest));
                    }
                    let _ = sender.send(SourceMessage::Eof);
                    tracing::debug!("reader reached end of input");
                    return;
                }
                Ok(n) => {
                    for line in splitter.push(&chunk[..n]) {
                        if sender.send(SourceMessage::Line(line)).is_err() {
                            // Receiver dropped, exit
                            return;
                        }
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::warn!(error = %e, "reader failed");
                    let _ = sender.send(SourceMessage::Error(e.to_string()));
                    return;
                }
            }
        }
    }
}

impl Drop for LineReader {
    fn drop(&mut self) {
        self.shutdown();
    }
}
