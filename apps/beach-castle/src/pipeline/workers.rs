use std::io::{Read, Write};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, select};
use tracing::{debug, info, trace, warn};

use super::{PipelineError, Shutdown};
use crate::client::Display;
use crate::protocol::{self, Record};
use crate::session::SessionState;
use crate::session::handshake::{Geometry, Handshake};
use crate::telemetry::PerfGuard;
use crate::terminal::config::{DecodePolicy, is_exit_command};
use crate::transport::{Interrupt, LineReader, LineWriter};

pub(super) struct Outbound<W> {
    pub queue: Receiver<String>,
    pub writer: LineWriter<W>,
    pub interrupt: Box<dyn Interrupt>,
    pub shutdown: Shutdown,
}

impl<W: Write> Outbound<W> {
    pub fn run(mut self) -> Result<(), PipelineError> {
        let result = self.pump().and_then(|()| self.drain());
        // Always release the reader, even when the write side failed.
        self.interrupt.interrupt();
        debug!(target: "castle::outbound", "outbound worker exiting");
        result
    }

    fn pump(&mut self) -> Result<(), PipelineError> {
        loop {
            let message = select! {
                recv(self.queue) -> message => message.ok(),
                recv(self.shutdown.signal()) -> _ => None,
            };
            match message {
                Some(message) => self.send(&message)?,
                None => return Ok(()),
            }
        }
    }

    /// Writes whatever was queued before shutdown, such as the exit command.
    fn drain(&mut self) -> Result<(), PipelineError> {
        while let Ok(message) = self.queue.try_recv() {
            self.send(&message)?;
        }
        Ok(())
    }

    fn send(&mut self, message: &str) -> Result<(), PipelineError> {
        trace!(target: "castle::outbound", message = message.trim_end(), "send");
        self.writer.write_line(message).map_err(|err| {
            self.shutdown.trigger();
            PipelineError::Transport(err)
        })
    }
}

pub(super) struct Inbound<R> {
    pub reader: LineReader<R>,
    pub handshake: Handshake,
    pub geometry: Geometry,
    pub outbound: Sender<String>,
    pub inbound: Sender<String>,
    pub shutdown: Shutdown,
}

impl<R: Read> Inbound<R> {
    pub fn run(mut self) -> Result<(), PipelineError> {
        while !self.shutdown.is_triggered() {
            let line = match self.reader.read_line() {
                Ok(Some(line)) => line,
                Ok(None) => {
                    info!(target: "castle::inbound", "server closed the connection");
                    self.shutdown.trigger();
                    break;
                }
                // The outbound worker interrupts the socket on shutdown.
                Err(err) if self.shutdown.is_triggered() => {
                    debug!(target: "castle::inbound", error = %err, "read interrupted");
                    break;
                }
                Err(err) => {
                    self.shutdown.trigger();
                    return Err(err.into());
                }
            };

            let step = self.handshake.observe(&line, self.geometry);
            for reply in step.replies {
                if self.outbound.send(reply).is_err() {
                    return Ok(());
                }
            }
            if step.forward && self.inbound.send(line).is_err() {
                return Ok(());
            }
        }
        debug!(
            target: "castle::inbound",
            lines = self.handshake.lines_seen(),
            "inbound worker exiting"
        );
        Ok(())
    }
}

pub(super) struct Render<D> {
    queue: Receiver<String>,
    display: Arc<D>,
    policy: DecodePolicy,
    shutdown: Shutdown,
    session: SessionState,
}

impl<D: Display> Render<D> {
    pub fn new(
        queue: Receiver<String>,
        display: Arc<D>,
        policy: DecodePolicy,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            queue,
            display,
            policy,
            shutdown,
            session: SessionState::new(),
        }
    }

    pub fn run(mut self) -> Result<(), PipelineError> {
        let result = self.pump().and_then(|()| self.drain());
        if result.is_err() {
            self.shutdown.trigger();
        }
        debug!(
            target: "castle::render",
            boards = self.session.boards_seen(),
            "render worker exiting"
        );
        result
    }

    fn pump(&mut self) -> Result<(), PipelineError> {
        loop {
            let line = select! {
                recv(self.queue) -> line => line.ok(),
                recv(self.shutdown.signal()) -> _ => None,
            };
            match line {
                Some(line) => self.render(&line)?,
                None => return Ok(()),
            }
        }
    }

    fn drain(&mut self) -> Result<(), PipelineError> {
        while let Ok(line) = self.queue.try_recv() {
            self.render(&line)?;
        }
        Ok(())
    }

    fn render(&mut self, line: &str) -> Result<(), PipelineError> {
        let decoded = {
            let _perf = PerfGuard::new("decode");
            protocol::decode(line)
        };
        let _perf = PerfGuard::new("render");

        match decoded {
            Ok(Record::Text(text)) => {
                for part in text.split('\n') {
                    self.display.append_log(part.trim_end_matches('\r'))?;
                }
            }
            Ok(record @ Record::GameInfo(_)) => self.session.apply(&record),
            Ok(record @ Record::Style12(_)) => {
                self.session.apply(&record);
                if self.session.has_metadata() {
                    self.display.draw_board(self.session.view())?;
                } else {
                    trace!(target: "castle::render", "board before gameinfo; not drawn");
                }
            }
            Err(source) => match self.policy {
                DecodePolicy::Skip => {
                    let raw = protocol::trim_line(line);
                    warn!(target: "castle::render", error = %source, line = raw, "skipping undecodable line");
                    self.display.append_log(raw)?;
                }
                DecodePolicy::Fatal => {
                    return Err(PipelineError::Decode {
                        line: protocol::trim_line(line).to_string(),
                        source,
                    });
                }
            },
        }

        self.display.park_cursor()?;
        Ok(())
    }
}

pub(super) struct Input<D> {
    pub display: Arc<D>,
    pub outbound: Sender<String>,
    pub inbound: Sender<String>,
    pub shutdown: Shutdown,
}

impl<D: Display> Input<D> {
    pub fn run(self) -> Result<(), PipelineError> {
        loop {
            let command = match self.display.read_command(&self.shutdown) {
                Ok(Some(command)) => command,
                Ok(None) => break,
                Err(err) => {
                    self.shutdown.trigger();
                    return Err(PipelineError::Display(err));
                }
            };
            if command.is_empty() {
                continue;
            }

            debug!(target: "castle::input", command = command.as_str(), "operator command");
            let message = format!("{command}\n");
            let sent = self.outbound.send(message.clone()).is_ok();
            let echoed = self.inbound.send(message).is_ok();
            if is_exit_command(&command) {
                info!(target: "castle::input", "exit requested");
                self.shutdown.trigger();
                break;
            }
            if !sent || !echoed {
                break;
            }
        }
        debug!(target: "castle::input", "input worker exiting");
        Ok(())
    }
}
