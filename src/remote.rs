//! Remote Control Channel
//!
//! Loopback TCP listener accepting length-prefixed JSON commands from a
//! companion controller app. Each message is a 4-byte big-endian length
//! followed by `{"comando": <name>, "dados": {..}}`. Responses are
//! log-only; a malformed message is logged and skipped, it never tears
//! the connection down.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{CantaraError, Result};

/// Upper bound on one message body; anything larger is a protocol error.
const MAX_FRAME_LEN: u32 = 1 << 20;

/// Accept-loop poll interval for the shutdown flag.
const ACCEPT_POLL: Duration = Duration::from_millis(100);

/// Wire form of one remote message.
#[derive(Debug, Serialize, Deserialize)]
pub struct RemoteMessage {
    /// Command name: `load`, `play`, `pause`, `stop`, `pitch`, `seek`, `quit`.
    pub comando: String,
    /// Command arguments, keyed by name.
    #[serde(default)]
    pub dados: serde_json::Map<String, Value>,
}

/// Decoded remote command, ready for the control loop.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCommand {
    /// Load a media file.
    Load {
        /// File to load.
        path: PathBuf,
    },
    /// Start or resume playback.
    Play,
    /// Pause playback.
    Pause,
    /// Stop playback.
    Stop,
    /// Request a pitch shift in semitones.
    Pitch {
        /// Shift amount.
        semitones: i32,
    },
    /// Seek to an absolute position.
    Seek {
        /// Position in seconds.
        seconds: f64,
    },
    /// Shut the player down.
    Quit,
}

impl RemoteCommand {
    /// Decode a wire message into a command.
    pub fn from_message(msg: &RemoteMessage) -> Result<Self> {
        match msg.comando.as_str() {
            "load" => {
                let path = msg
                    .dados
                    .get("arquivo")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        CantaraError::ProtocolError("load without arquivo".to_string())
                    })?;
                Ok(RemoteCommand::Load {
                    path: PathBuf::from(path),
                })
            }
            "play" => Ok(RemoteCommand::Play),
            "pause" => Ok(RemoteCommand::Pause),
            "stop" => Ok(RemoteCommand::Stop),
            "pitch" => {
                let semitones = msg
                    .dados
                    .get("semitons")
                    .and_then(Value::as_i64)
                    .ok_or_else(|| {
                        CantaraError::ProtocolError("pitch without semitons".to_string())
                    })?;
                let semitones = i32::try_from(semitones).map_err(|_| {
                    CantaraError::ProtocolError(format!("semitons {} out of range", semitones))
                })?;
                Ok(RemoteCommand::Pitch { semitones })
            }
            "seek" => {
                let seconds = msg
                    .dados
                    .get("segundos")
                    .and_then(Value::as_f64)
                    .ok_or_else(|| {
                        CantaraError::ProtocolError("seek without segundos".to_string())
                    })?;
                Ok(RemoteCommand::Seek { seconds })
            }
            "quit" => Ok(RemoteCommand::Quit),
            other => Err(CantaraError::ProtocolError(format!(
                "unknown command {:?}",
                other
            ))),
        }
    }
}

/// Read one length-prefixed frame.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut header = [0u8; 4];
    reader.read_exact(&mut header)?;
    let len = u32::from_be_bytes(header);
    if len > MAX_FRAME_LEN {
        return Err(CantaraError::ProtocolError(format!(
            "frame of {} bytes exceeds limit",
            len
        )));
    }
    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body)?;
    Ok(body)
}

/// Write one length-prefixed frame.
pub fn write_frame<W: Write>(writer: &mut W, body: &[u8]) -> Result<()> {
    writer.write_all(&(body.len() as u32).to_be_bytes())?;
    writer.write_all(body)?;
    Ok(())
}

/// Background listener feeding decoded commands into a channel.
pub struct RemoteListener {
    port: u16,
    shutdown: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl RemoteListener {
    /// Bind the loopback interface on `port` (0 picks a free port) and
    /// start accepting controller connections.
    pub fn bind(port: u16, commands: mpsc::Sender<RemoteCommand>) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port)).map_err(CantaraError::Io)?;
        let port = listener.local_addr().map_err(CantaraError::Io)?.port();
        listener.set_nonblocking(true).map_err(CantaraError::Io)?;
        info!("remote control listening on 127.0.0.1:{}", port);

        let shutdown = Arc::new(AtomicBool::new(false));
        let worker = {
            let shutdown = Arc::clone(&shutdown);
            thread::spawn(move || accept_loop(listener, commands, shutdown))
        };
        Ok(RemoteListener {
            port,
            shutdown,
            worker: Some(worker),
        })
    }

    /// Port the listener is bound to.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Stop accepting connections. Connections already open drain on
    /// their own when the peer closes.
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for RemoteListener {
    fn drop(&mut self) {
        self.stop();
    }
}

fn accept_loop(
    listener: TcpListener,
    commands: mpsc::Sender<RemoteCommand>,
    shutdown: Arc<AtomicBool>,
) {
    while !shutdown.load(Ordering::Acquire) {
        match listener.accept() {
            Ok((stream, peer)) => {
                debug!("remote controller connected from {}", peer);
                let commands = commands.clone();
                thread::spawn(move || serve_connection(stream, commands));
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL);
            }
            Err(e) => {
                warn!("remote accept failed: {}", e);
                thread::sleep(ACCEPT_POLL);
            }
        }
    }
}

fn serve_connection(mut stream: TcpStream, commands: mpsc::Sender<RemoteCommand>) {
    loop {
        let body = match read_frame(&mut stream) {
            Ok(body) => body,
            Err(CantaraError::Io(e)) => {
                debug!("remote controller disconnected: {}", e);
                return;
            }
            Err(e) => {
                warn!("remote frame error: {}", e);
                return;
            }
        };

        let command = serde_json::from_slice::<RemoteMessage>(&body)
            .map_err(|e| CantaraError::ProtocolError(format!("bad message: {}", e)))
            .and_then(|msg| RemoteCommand::from_message(&msg));
        match command {
            Ok(command) => {
                let quit = command == RemoteCommand::Quit;
                debug!("remote command: {:?}", command);
                if commands.send(command).is_err() {
                    return;
                }
                if quit {
                    return;
                }
            }
            // Bad messages are logged, never answered.
            Err(e) => warn!("ignoring remote message: {}", e),
        }
    }
}
