//! Opcode channel client
//!
//! Speaks the display's external control protocol over any byte stream.
//! Real displays are reached over TCP or a serial port; tests use an
//! in-memory duplex stream.
//!
//! The client owns one connection for its lifetime. After a transport
//! failure (or an abandoned request) the connection is dropped and
//! re-established on the next call, so one bad exchange cannot leave stale
//! reply bytes in front of the next request.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};
use tv_protocol::{Address, FrameCodec, MessageType, Opcode, Reply, Request, OPCODE_POWER_MODE};

use crate::channel::{OpcodeChannel, ParameterValue};
use crate::error::ChannelError;

/// Byte stream usable as a display connection
pub trait DisplayIo: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> DisplayIo for T {}

/// Opens a connection to the display
pub trait Connector: Send + Sync {
    /// Connection type
    type Io: DisplayIo;

    /// Open a new connection
    fn connect(&self) -> impl std::future::Future<Output = Result<Self::Io, ChannelError>> + Send;

    /// Human-readable endpoint for logs
    fn describe(&self) -> String;
}

/// LAN connection (`host:port`)
#[derive(Debug, Clone)]
pub struct TcpConnector {
    /// Display host name or address
    pub host: String,
    /// TCP port (usually 7142)
    pub port: u16,
}

impl Connector for TcpConnector {
    type Io = TcpStream;

    async fn connect(&self) -> Result<TcpStream, ChannelError> {
        let stream = TcpStream::connect((self.host.as_str(), self.port)).await?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    fn describe(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// RS-232C connection
#[derive(Debug, Clone)]
pub struct SerialConnector {
    /// Serial device path
    pub path: String,
    /// Baud rate
    pub baud_rate: u32,
}

impl Connector for SerialConnector {
    type Io = tokio_serial::SerialStream;

    async fn connect(&self) -> Result<tokio_serial::SerialStream, ChannelError> {
        let stream = tokio_serial::new(&self.path, self.baud_rate)
            .timeout(Duration::from_millis(100))
            .open_native_async()?;
        Ok(stream)
    }

    fn describe(&self) -> String {
        format!("{} @ {} baud", self.path, self.baud_rate)
    }
}

/// Either transport, chosen at runtime from configuration
#[derive(Debug, Clone)]
pub enum TransportConnector {
    /// LAN
    Tcp(TcpConnector),
    /// RS-232C
    Serial(SerialConnector),
}

impl Connector for TransportConnector {
    type Io = Box<dyn DisplayIo>;

    async fn connect(&self) -> Result<Box<dyn DisplayIo>, ChannelError> {
        match self {
            Self::Tcp(c) => {
                let io: Box<dyn DisplayIo> = Box::new(c.connect().await?);
                Ok(io)
            }
            Self::Serial(c) => {
                let io: Box<dyn DisplayIo> = Box::new(c.connect().await?);
                Ok(io)
            }
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Tcp(c) => c.describe(),
            Self::Serial(c) => c.describe(),
        }
    }
}

/// Client for one display on an opcode link
pub struct NecClient<C: Connector> {
    connector: C,
    destination: Address,
    io: Option<C::Io>,
    codec: FrameCodec,
    buffer: Vec<u8>,
    /// Set while a request awaits its reply; still set on entry means the
    /// previous call was cancelled mid-exchange
    in_flight: bool,
}

impl<C: Connector> NecClient<C> {
    /// Create a client for the monitor with ID `monitor_id` (1-100)
    ///
    /// No connection is made until [`open`](Self::open) or the first call.
    pub fn new(connector: C, monitor_id: u8) -> Result<Self, ChannelError> {
        Ok(Self {
            connector,
            destination: Address::monitor(monitor_id)?,
            io: None,
            codec: FrameCodec::new(),
            buffer: vec![0u8; 256],
            in_flight: false,
        })
    }

    /// Connect now instead of on first use
    pub async fn open(&mut self) -> Result<(), ChannelError> {
        self.ensure_connected().await
    }

    /// Whether a connection is currently held
    pub fn is_connected(&self) -> bool {
        self.io.is_some()
    }

    async fn ensure_connected(&mut self) -> Result<(), ChannelError> {
        if self.in_flight {
            debug!(
                "Previous request to {} was abandoned, reconnecting",
                self.connector.describe()
            );
            self.io = None;
            self.in_flight = false;
        }
        if self.io.is_none() {
            let io = self.connector.connect().await?;
            info!("Connected to display at {}", self.connector.describe());
            self.io = Some(io);
        }
        Ok(())
    }

    /// Send one request and wait for its reply
    pub async fn transact(&mut self, request: Request) -> Result<Reply, ChannelError> {
        let request = request.normalized()?;
        self.ensure_connected().await?;

        self.in_flight = true;
        let result = self.exchange(&request).await;
        self.in_flight = false;

        if let Err(e) = &result {
            if matches!(
                e,
                ChannelError::Io(_) | ChannelError::Closed | ChannelError::Protocol(_)
            ) {
                warn!(
                    "Dropping connection to {} after error: {}",
                    self.connector.describe(),
                    e
                );
                self.io = None;
            }
        }
        result
    }

    async fn exchange(&mut self, request: &Request) -> Result<Reply, ChannelError> {
        let Self {
            io,
            codec,
            buffer,
            destination,
            ..
        } = self;
        let io = io.as_mut().ok_or(ChannelError::Closed)?;

        let frame = request.to_frame(*destination).encode();
        debug!("Sending {:?}: {:02X?}", request, frame);
        codec.clear();
        io.write_all(&frame).await?;
        io.flush().await?;

        let sent = request.message_type();
        let expected = sent.reply_type().unwrap_or(MessageType::CommandReply);

        loop {
            let n = io.read(&mut buffer[..]).await?;
            if n == 0 {
                return Err(ChannelError::Closed);
            }
            debug!("Read {} bytes: {:02X?}", n, &buffer[..n]);
            codec.push_bytes(&buffer[..n]);

            while let Some(parsed) = codec.next_frame() {
                let frame = parsed?;
                if frame.source != *destination {
                    debug!("Ignoring reply from {:?}", frame.source);
                    continue;
                }
                if frame.message_type != expected {
                    return Err(ChannelError::UnexpectedReply(format!(
                        "{:?} in answer to {:?}",
                        frame.message_type, sent
                    )));
                }
                let reply = Reply::from_frame(&frame)?;
                if let (Reply::Parameter(p), Request::GetParameter(op) | Request::SetParameter(op, _)) =
                    (&reply, request)
                {
                    if p.opcode != *op {
                        debug!("Ignoring stale reply for {}", p.opcode);
                        continue;
                    }
                }
                return Ok(reply);
            }
        }
    }

    fn check_parameter(opcode: Opcode, reply: Reply) -> Result<ParameterValue, ChannelError> {
        match reply {
            Reply::Parameter(p) if p.is_ok() => Ok(ParameterValue {
                current: p.current,
                max: p.max,
            }),
            Reply::Parameter(p) => Err(ChannelError::Rejected {
                opcode,
                result: p.result,
            }),
            other => Err(ChannelError::UnexpectedReply(format!("{:?}", other))),
        }
    }
}

impl<C: Connector> OpcodeChannel for NecClient<C> {
    async fn query(&mut self, opcode: Opcode) -> Result<ParameterValue, ChannelError> {
        let reply = self.transact(Request::GetParameter(opcode)).await?;
        Self::check_parameter(opcode, reply)
    }

    async fn apply(&mut self, opcode: Opcode, value: u16) -> Result<(), ChannelError> {
        match self.transact(Request::SetParameter(opcode, value)).await? {
            Reply::PowerControl { result, .. } if opcode == OPCODE_POWER_MODE => {
                if result == 0 {
                    Ok(())
                } else {
                    Err(ChannelError::Rejected { opcode, result })
                }
            }
            reply => Self::check_parameter(opcode, reply).map(|_| ()),
        }
    }

    async fn send_command(&mut self, code: u8) -> Result<(), ChannelError> {
        match self.transact(Request::RemoteKey(code)).await? {
            Reply::RemoteKey { code: echoed } if echoed == code => Ok(()),
            other => Err(ChannelError::UnexpectedReply(format!("{:?}", other))),
        }
    }

    async fn close(&mut self) {
        if let Some(mut io) = self.io.take() {
            if let Err(e) = io.shutdown().await {
                debug!("Error closing {}: {}", self.connector.describe(), e);
            }
            info!("Closed connection to {}", self.connector.describe());
        }
        self.in_flight = false;
    }
}
