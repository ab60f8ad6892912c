use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::time::Duration;

use beach_castle::client::Display;
use beach_castle::model::Color;
use beach_castle::pipeline::{PipelineError, Shutdown, Supervisor};
use beach_castle::session::GameView;
use beach_castle::session::handshake::{Geometry, LoginConfig};
use beach_castle::terminal::config::{DecodePolicy, SessionConfig};
use beach_castle::transport::{Connection, Interrupt, TransportError};
use crossbeam_channel::{Receiver, Sender, select, unbounded};
use parking_lot::Mutex;

const GAMEINFO: &str =
    "<g1> 12 p=0 t=blitz r=1 u=1,1 it=180,180 i=0,0 pt=0 rt=1880,1789 ts=1,0\n\r";
const STYLE12: &str = "<12> rnbqkbnr pppppppp -------- -------- ----P--- -------- PPPP-PPP RNBQKBNR B 4 1 1 1 1 0 12 alice bob 0 3 0 39 39 180000 180000 1 P/e2-e4 (0:00) e4 1\n\r";

struct ChannelReader {
    data: Receiver<Vec<u8>>,
    closed: Receiver<()>,
    pending: Vec<u8>,
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            let chunk = select! {
                recv(self.data) -> chunk => chunk.ok(),
                recv(self.closed) -> _ => None,
            };
            match chunk {
                Some(chunk) => self.pending = chunk,
                None => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

struct ChannelWriter {
    sent: Sender<String>,
    buffer: Vec<u8>,
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.buffer.is_empty() {
            let message = String::from_utf8_lossy(&self.buffer).into_owned();
            self.buffer.clear();
            let _ = self.sent.send(message);
        }
        Ok(())
    }
}

struct BrokenWriter;

impl Write for BrokenWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer went away"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct CloseOnInterrupt(Mutex<Option<Sender<()>>>);

impl Interrupt for CloseOnInterrupt {
    fn interrupt(&self) {
        self.0.lock().take();
    }
}

/// The far end of an in-memory connection.
struct Server {
    lines: Option<Sender<Vec<u8>>>,
    written: Receiver<String>,
}

impl Server {
    fn send(&self, line: &str) {
        if let Some(lines) = &self.lines {
            lines.send(line.as_bytes().to_vec()).expect("client reader alive");
        }
    }

    fn banner(&self, lines: u64) {
        for n in 1..=lines {
            self.send(&format!("banner line {n}\n\r"));
        }
    }

    fn hang_up(&mut self) {
        self.lines = None;
    }

    fn written(&self) -> Vec<String> {
        self.written.try_iter().collect()
    }
}

fn reader() -> (ChannelReader, Sender<Vec<u8>>, CloseOnInterrupt) {
    let (lines_tx, lines_rx) = unbounded();
    let (closed_tx, closed_rx) = unbounded();
    let reader = ChannelReader {
        data: lines_rx,
        closed: closed_rx,
        pending: Vec::new(),
    };
    (reader, lines_tx, CloseOnInterrupt(Mutex::new(Some(closed_tx))))
}

fn connection() -> (Connection<ChannelReader, ChannelWriter>, Server) {
    let (reader, lines, interrupt) = reader();
    let (sent_tx, sent_rx) = unbounded();
    let writer = ChannelWriter {
        sent: sent_tx,
        buffer: Vec::new(),
    };
    let server = Server {
        lines: Some(lines),
        written: sent_rx,
    };
    (Connection::new(reader, writer, Box::new(interrupt)), server)
}

#[derive(Default)]
struct Recorded {
    log: Vec<String>,
    boards: Vec<GameView>,
    parks: usize,
}

/// Records what the pipeline renders and types each scripted command once
/// the log shows the line it waits for.
#[derive(Default)]
struct ScriptedDisplay {
    recorded: Mutex<Recorded>,
    script: Mutex<VecDeque<(String, String)>>,
}

impl ScriptedDisplay {
    fn with_script(steps: &[(&str, &str)]) -> Arc<Self> {
        let display = ScriptedDisplay::default();
        display.script.lock().extend(
            steps
                .iter()
                .map(|(awaited, command)| (awaited.to_string(), command.to_string())),
        );
        Arc::new(display)
    }

    fn has_logged(&self, needle: &str) -> bool {
        self.recorded.lock().log.iter().any(|line| line == needle)
    }

    fn log(&self) -> Vec<String> {
        self.recorded.lock().log.clone()
    }

    fn boards(&self) -> Vec<GameView> {
        self.recorded.lock().boards.clone()
    }
}

impl Display for ScriptedDisplay {
    fn log_geometry(&self) -> Geometry {
        Geometry { rows: 20, cols: 100 }
    }

    fn draw_board(&self, view: &GameView) -> io::Result<()> {
        self.recorded.lock().boards.push(view.clone());
        Ok(())
    }

    fn append_log(&self, line: &str) -> io::Result<()> {
        self.recorded.lock().log.push(line.to_string());
        Ok(())
    }

    fn read_command(&self, shutdown: &Shutdown) -> io::Result<Option<String>> {
        while !shutdown.is_triggered() {
            {
                let mut script = self.script.lock();
                let ready = matches!(script.front(), Some((awaited, _)) if self.has_logged(awaited));
                if ready {
                    return Ok(script.pop_front().map(|(_, command)| command));
                }
            }
            shutdown.wait_timeout(Duration::from_millis(5));
        }
        Ok(None)
    }

    fn park_cursor(&self) -> io::Result<()> {
        self.recorded.lock().parks += 1;
        Ok(())
    }
}

fn config(policy: DecodePolicy) -> SessionConfig {
    SessionConfig {
        login: LoginConfig {
            interface: "beach-castle-test".into(),
            ..LoginConfig::default()
        },
        decode_errors: policy,
    }
}

#[test_timeout::timeout]
fn handshake_configures_once_and_quit_ends_every_worker() {
    let (connection, server) = connection();
    server.banner(28);
    server.send(GAMEINFO);
    server.send(STYLE12);
    server.send("You are now observing game 12.\n\r");

    let display = ScriptedDisplay::with_script(&[("You are now observing game 12.", "quit")]);
    Supervisor::new(Arc::clone(&display), config(DecodePolicy::Skip))
        .run(connection)
        .expect("session ends cleanly");

    let written = server.written();
    let expected: Vec<String> = [
        "guest\n",
        "\n\n",
        "set height 20\n",
        "set width 100\n",
        "iset nowrap 1\n",
        "iset gameinfo 1\n",
        "iset ms 1\n",
        "-channel 53\n",
        "set prompt %\n",
        "set style 12\n",
        "set seek 0\n",
        "set bell off\n",
        "set provshow 1\n",
        "set interface beach-castle-test\n",
        "quit\n",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    assert_eq!(written, expected);

    let log = display.log();
    assert_eq!(log.first().map(String::as_str), Some("banner line 1"));
    assert!(log.iter().any(|line| line == "banner line 28"));
    assert_eq!(log.last().map(String::as_str), Some("quit"));

    let boards = display.boards();
    assert_eq!(boards.len(), 1);
    let view = &boards[0];
    assert_eq!(view.me.name, "bob");
    assert_eq!(view.my_color, Color::Black);
    assert_eq!(view.me.rating.as_deref(), Some("1789"));
    assert_eq!(view.opponent.rating.as_deref(), Some("1880"));
    assert!(view.changed.is_clear());
}

#[test_timeout::timeout]
fn server_hang_up_ends_the_session() {
    let (connection, mut server) = connection();
    server.send("Welcome\n\r");
    server.hang_up();

    let display = ScriptedDisplay::with_script(&[]);
    Supervisor::new(Arc::clone(&display), config(DecodePolicy::Skip))
        .run(connection)
        .expect("hang up is a normal end");

    assert_eq!(display.log(), vec!["Welcome".to_string()]);
    assert!(server.written().is_empty());
}

#[test_timeout::timeout]
fn boards_wait_for_gameinfo() {
    let (connection, mut server) = connection();
    server.send(STYLE12);
    server.send(GAMEINFO);
    server.send(&STYLE12.replace("-------- PPPP-PPP", "-------- PPP--PPP"));
    server.hang_up();

    let display = ScriptedDisplay::with_script(&[]);
    Supervisor::new(Arc::clone(&display), config(DecodePolicy::Skip))
        .run(connection)
        .expect("session");

    let boards = display.boards();
    assert_eq!(boards.len(), 1);
    // Black sits at the bottom, so the d2 pawn lands mirrored at (1, 4).
    let changed: Vec<_> = boards[0].changed.changed().collect();
    assert_eq!(changed, vec![(1, 4)]);
    assert!(display.recorded.lock().parks >= 3);
}

#[test_timeout::timeout]
fn commands_are_sent_and_echoed_while_noise_is_dropped() {
    let (connection, server) = connection();
    server.send("\u{7}\n\r");
    server.send("fics% \r");
    server.send("ready\n\r");

    let display = ScriptedDisplay::with_script(&[
        ("ready", "observe 12"),
        ("observe 12", "quit now"),
    ]);
    Supervisor::new(Arc::clone(&display), config(DecodePolicy::Skip))
        .run(connection)
        .expect("session");

    assert_eq!(
        server.written(),
        vec!["observe 12\n".to_string(), "quit now\n".to_string()]
    );
    assert_eq!(
        display.log(),
        vec![
            "ready".to_string(),
            "observe 12".to_string(),
            "quit now".to_string()
        ]
    );
}

#[test_timeout::timeout]
fn undecodable_lines_are_logged_raw_by_default() {
    let (connection, mut server) = connection();
    server.send("<12> rnbqkbnr pppppppp\n\r");
    server.send("after\n\r");
    server.hang_up();

    let display = ScriptedDisplay::with_script(&[]);
    Supervisor::new(Arc::clone(&display), config(DecodePolicy::Skip))
        .run(connection)
        .expect("skip keeps the session alive");

    assert_eq!(
        display.log(),
        vec!["<12> rnbqkbnr pppppppp".to_string(), "after".to_string()]
    );
}

#[test_timeout::timeout]
fn fatal_policy_stops_the_session_on_bad_records() {
    let (connection, server) = connection();
    server.send("<g1> 12 p=0\n\r");

    let display = ScriptedDisplay::with_script(&[]);
    let err = Supervisor::new(Arc::clone(&display), config(DecodePolicy::Fatal))
        .run(connection)
        .expect_err("decode failure is fatal");

    match err {
        PipelineError::Decode { line, .. } => assert_eq!(line, "<g1> 12 p=0"),
        other => panic!("unexpected error: {other}"),
    }
    // The server never closed its side; the interrupt released the reader.
    drop(server);
}

#[test_timeout::timeout]
fn write_failures_surface_as_transport_errors() {
    let (reader, lines, interrupt) = reader();
    let connection = Connection::new(reader, BrokenWriter, Box::new(interrupt));
    lines
        .send(b"banner\r".to_vec())
        .expect("client reader alive");

    let mut session = config(DecodePolicy::Skip);
    session.login.login_line = 1;
    let display = ScriptedDisplay::with_script(&[]);
    let err = Supervisor::new(display, session)
        .run(connection)
        .expect_err("write failure");

    assert!(matches!(
        err,
        PipelineError::Transport(TransportError::Write(_))
    ));
    drop(lines);
}
