//! Client for a running bridge.
//!
//! Sends commands over TCP and waits for each acknowledgment, e.g. to poll a
//! battery management system sitting on the far side of the UART.
//!
//! The bridge acknowledges every socket read separately, so one command may
//! come back as several `"Received your command: "` segments whose echoes
//! add up to the command. `send` accepts any such split and stops reading
//! exactly at the end of the last segment, which keeps the connection in
//! step for the next command.

use crate::bridge::ACK_PREFIX;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::timeout;
use tracing::debug;

/// Default time to wait for connect and for each acknowledgment.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// How long an ambiguous acknowledgment waits for further segments.
const SETTLE: Duration = Duration::from_millis(50);

/// Errors raised by `BridgeClient`.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No acknowledgment within {0:?}")]
    Timeout(Duration),

    #[error("Bridge closed the connection")]
    Closed,

    #[error("Refusing to send an empty command")]
    EmptyCommand,

    #[error("Unexpected acknowledgment: {0:?}")]
    UnexpectedResponse(String),

    #[error("An I/O error occurred: {0}")]
    Io(#[from] std::io::Error),
}

/// Position within an acknowledgment stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AckState {
    /// `matched` bytes of the prefix seen; `echoed` command bytes before it.
    Prefix { echoed: usize, matched: usize },
    /// Inside an echo segment holding at least one byte.
    Echo { echoed: usize },
}

/// Incremental matcher for the acknowledgment of one command.
///
/// Tracks every parse still consistent with the bytes seen, since an echo
/// byte and the start of a new prefix can look alike.
#[derive(Debug)]
struct AckMatcher<'a> {
    command: &'a [u8],
    states: Vec<AckState>,
}

impl<'a> AckMatcher<'a> {
    fn new(command: &'a [u8]) -> Self {
        Self {
            command,
            states: vec![AckState::Prefix {
                echoed: 0,
                matched: 0,
            }],
        }
    }

    /// Feed one byte. Returns `false` once no parse can match any more.
    fn push(&mut self, byte: u8) -> bool {
        let command = self.command;
        let echoes = |echoed: usize| command.get(echoed) == Some(&byte);

        let mut next = Vec::with_capacity(self.states.len() + 1);
        let mut add = |state: AckState| {
            if !next.contains(&state) {
                next.push(state);
            }
        };
        for state in &self.states {
            match *state {
                AckState::Prefix { echoed, matched } if matched < ACK_PREFIX.len() => {
                    if ACK_PREFIX[matched] == byte {
                        add(AckState::Prefix {
                            echoed,
                            matched: matched + 1,
                        });
                    }
                }
                AckState::Prefix { echoed, .. } => {
                    if echoes(echoed) {
                        add(AckState::Echo { echoed: echoed + 1 });
                    }
                }
                AckState::Echo { echoed } => {
                    if echoes(echoed) {
                        add(AckState::Echo { echoed: echoed + 1 });
                    }
                    if ACK_PREFIX[0] == byte && echoed < command.len() {
                        add(AckState::Prefix { echoed, matched: 1 });
                    }
                }
            }
        }
        self.states = next;
        !self.states.is_empty()
    }

    /// Whether the whole command has been echoed back.
    fn is_complete(&self) -> bool {
        let done = AckState::Echo {
            echoed: self.command.len(),
        };
        self.states.contains(&done)
    }

    /// Complete, but the last bytes could also be the start of another
    /// segment. Happens when the command ends like the prefix begins.
    fn is_ambiguous(&self) -> bool {
        self.is_complete() && self.states.len() > 1
    }
}

/// A connection to a bridge.
#[derive(Debug)]
pub struct BridgeClient {
    stream: BufReader<TcpStream>,
    timeout: Duration,
}

impl BridgeClient {
    /// Connect to the bridge at `addr`, waiting at most `wait`.
    pub async fn connect<A>(addr: A, wait: Duration) -> Result<Self, ClientError>
    where
        A: ToSocketAddrs + std::fmt::Display,
    {
        let label = addr.to_string();
        let stream = match timeout(wait, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(ClientError::Connect { addr: label, source }),
            Err(_) => return Err(ClientError::Timeout(wait)),
        };
        stream.set_nodelay(true)?;
        debug!(addr = %label, "connected to bridge");
        Ok(Self {
            stream: BufReader::new(stream),
            timeout: wait,
        })
    }

    /// Send one command and return the acknowledgment bytes the bridge wrote
    /// back.
    ///
    /// Usually that is the prefix followed by the command. If the bridge read
    /// the command in pieces, it is one prefixed segment per piece.
    pub async fn send(&mut self, command: &[u8]) -> Result<Vec<u8>, ClientError> {
        if command.is_empty() {
            return Err(ClientError::EmptyCommand);
        }
        self.stream.write_all(command).await?;

        let wait = self.timeout;
        match timeout(wait, self.read_ack(command)).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::Timeout(wait)),
        }
    }

    async fn read_ack(&mut self, command: &[u8]) -> Result<Vec<u8>, ClientError> {
        let mut matcher = AckMatcher::new(command);
        let mut received = Vec::with_capacity(ACK_PREFIX.len() + command.len());
        loop {
            let byte = if matcher.is_complete() {
                if !matcher.is_ambiguous() {
                    break;
                }
                match timeout(SETTLE, self.stream.read_u8()).await {
                    Ok(Ok(byte)) => byte,
                    // Nothing more is coming: the echo ended with the command.
                    Ok(Err(_)) | Err(_) => break,
                }
            } else {
                match self.stream.read_u8().await {
                    Ok(byte) => byte,
                    Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                        return Err(ClientError::Closed)
                    }
                    Err(e) => return Err(ClientError::Io(e)),
                }
            };
            received.push(byte);
            if !matcher.push(byte) {
                return Err(ClientError::UnexpectedResponse(
                    String::from_utf8_lossy(&received).into_owned(),
                ));
            }
        }
        Ok(received)
    }

    /// Send each command in order, collecting every acknowledgment.
    pub async fn send_commands<C>(&mut self, commands: &[C]) -> Result<Vec<Vec<u8>>, ClientError>
    where
        C: AsRef<[u8]>,
    {
        let mut responses = Vec::with_capacity(commands.len());
        for command in commands {
            responses.push(self.send(command.as_ref()).await?);
        }
        Ok(responses)
    }

    /// Close the write side, telling the bridge we are done.
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.stream.shutdown().await?;
        Ok(())
    }
}
