//! Fixed four-thread pipeline between the server connection and the screen.
//!
//! ```text
//! server ─▶ inbound ─▶ [inbound queue] ─▶ render ─▶ display
//!   ▲          │               ▲
//!   │          ▼               │ (echo)
//!   └── outbound ◀─ [outbound queue] ◀─ input ◀─ operator
//! ```
//!
//! Every worker watches the same [`Shutdown`] token. Whichever worker ends
//! the session triggers it; the outbound worker then drains its queue and
//! interrupts the transport so the inbound worker's blocking read returns.

mod shutdown;
mod workers;

pub use shutdown::Shutdown;

use std::io::{self, Read, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::unbounded;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::client::Display;
use crate::protocol::DecodeError;
use crate::session::handshake::Handshake;
use crate::telemetry;
use crate::terminal::config::SessionConfig;
use crate::transport::{Connection, TransportError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("connection lost: {0}")]
    Transport(#[from] TransportError),
    #[error("display failed: {0}")]
    Display(#[from] io::Error),
    #[error("failed to decode {line:?}: {source}")]
    Decode { line: String, source: DecodeError },
    #[error("failed to start {worker} worker: {source}")]
    Spawn {
        worker: &'static str,
        source: io::Error,
    },
    #[error("{worker} worker panicked")]
    Panicked { worker: &'static str },
}

/// Owns the worker topology for one session.
pub struct Supervisor<D> {
    display: Arc<D>,
    config: SessionConfig,
    shutdown: Shutdown,
}

impl<D: Display + 'static> Supervisor<D> {
    pub fn new(display: Arc<D>, config: SessionConfig) -> Self {
        Self {
            display,
            config,
            shutdown: Shutdown::new(),
        }
    }

    /// A handle that stops the session from outside the pipeline.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Runs the session to completion and returns the first worker error.
    pub fn run<R, W>(self, connection: Connection<R, W>) -> Result<(), PipelineError>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let Connection {
            reader,
            writer,
            interrupt,
        } = connection;
        let (outbound_tx, outbound_rx) = unbounded::<String>();
        let (inbound_tx, inbound_rx) = unbounded::<String>();
        let geometry = self.display.log_geometry();
        let shutdown = self.shutdown;

        info!(
            target: "castle::pipeline",
            rows = geometry.rows,
            cols = geometry.cols,
            login_line = self.config.login.login_line,
            "starting session"
        );

        let mut handles: Vec<(&'static str, Worker)> = Vec::with_capacity(4);

        let spawned = (|| {
            let outbound = workers::Outbound {
                queue: outbound_rx,
                writer,
                interrupt,
                shutdown: shutdown.clone(),
            };
            handles.push(("outbound", spawn("castle-outbound", &shutdown, move || outbound.run())?));

            let inbound = workers::Inbound {
                reader,
                handshake: Handshake::new(self.config.login.clone()),
                geometry,
                outbound: outbound_tx.clone(),
                inbound: inbound_tx.clone(),
                shutdown: shutdown.clone(),
            };
            handles.push(("inbound", spawn("castle-inbound", &shutdown, move || inbound.run())?));

            let render = workers::Render::new(
                inbound_rx,
                Arc::clone(&self.display),
                self.config.decode_errors,
                shutdown.clone(),
            );
            handles.push(("render", spawn("castle-render", &shutdown, move || render.run())?));

            let input = workers::Input {
                display: Arc::clone(&self.display),
                outbound: outbound_tx,
                inbound: inbound_tx,
                shutdown: shutdown.clone(),
            };
            handles.push(("input", spawn("castle-input", &shutdown, move || input.run())?));
            Ok::<(), PipelineError>(())
        })();

        if spawned.is_err() {
            shutdown.trigger();
        }

        let mut first_error = spawned.err();
        for (worker, handle) in handles {
            let outcome = handle
                .join()
                .unwrap_or(Err(PipelineError::Panicked { worker }));
            match outcome {
                Ok(()) => debug!(target: "castle::pipeline", worker, "worker finished"),
                Err(err) => {
                    error!(target: "castle::pipeline", worker, error = %err, "worker failed");
                    first_error.get_or_insert(err);
                }
            }
        }

        telemetry::log_summary();
        match first_error {
            Some(err) => Err(err),
            None => {
                info!(target: "castle::pipeline", "session ended");
                Ok(())
            }
        }
    }
}

type Worker = JoinHandle<Result<(), PipelineError>>;

/// Spawns a named worker that triggers shutdown when it exits, including by
/// panic, so its peers never wait on a dead thread.
fn spawn<F>(name: &'static str, shutdown: &Shutdown, body: F) -> Result<Worker, PipelineError>
where
    F: FnOnce() -> Result<(), PipelineError> + Send + 'static,
{
    let stop = StopOnExit(shutdown.clone());
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            let _stop = stop;
            body()
        })
        .map_err(|source| PipelineError::Spawn {
            worker: name,
            source,
        })
}

struct StopOnExit(Shutdown);

impl Drop for StopOnExit {
    fn drop(&mut self) {
        self.0.trigger();
    }
}
