//! Tuning protocol channels
//!
//! Every protocol channel runs the same task body: build the transport the
//! configuration asks for, start it once at the configured baud rate, then
//! hand the live channel to the protocol engine for the rest of the task's
//! life. Channels differ only in their [`ProtocolChannel`] value and in the
//! builder closure that turns a [`TransportKind`] into a concrete transport.
//!
//! A transport that cannot start ends its task with a [`ChannelError`]; a
//! channel that never came up has nothing useful left to do.

use core::convert::Infallible;
use core::fmt;

use embassy_futures::yield_now;
use embedded_io_async::{Error as _, ErrorKind, ErrorType, Read, Write};

use crate::config::{
    ChannelTransportConfig, SerialPortId, TransportKind, PRIMARY_TASK_NAME, SECONDARY_TASK_NAME,
};

/// Which of the (at most two) protocol channels this is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rp2040", derive(defmt::Format))]
pub enum ChannelSlot {
    Primary,
    Secondary,
}

impl ChannelSlot {
    /// Task name reported in diagnostics
    pub fn task_name(self) -> &'static str {
        match self {
            ChannelSlot::Primary => PRIMARY_TASK_NAME,
            ChannelSlot::Secondary => SECONDARY_TASK_NAME,
        }
    }
}

/// One configured protocol channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rp2040", derive(defmt::Format))]
pub struct ProtocolChannel {
    pub slot: ChannelSlot,
    pub transport: ChannelTransportConfig,
}

impl ProtocolChannel {
    pub fn primary(transport: ChannelTransportConfig) -> Self {
        Self {
            slot: ChannelSlot::Primary,
            transport,
        }
    }

    pub fn secondary(transport: ChannelTransportConfig) -> Self {
        Self {
            slot: ChannelSlot::Secondary,
            transport,
        }
    }

    pub fn name(&self) -> &'static str {
        self.slot.task_name()
    }
}

/// Why a channel could not be brought up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rp2040", derive(defmt::Format))]
pub enum ChannelError {
    /// Baud rate the UART cannot run at
    InvalidBaudRate(u32),
    /// The requested transport kind is not wired up on this port
    TransportUnavailable,
    /// Port already owned by another task
    PortInUse(SerialPortId),
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::InvalidBaudRate(baud) => write!(f, "invalid baud rate {}", baud),
            ChannelError::TransportUnavailable => f.write_str("transport unavailable"),
            ChannelError::PortInUse(port) => write!(f, "{} already in use", port),
        }
    }
}

/// A serial transport that has not been started yet
///
/// `start` consumes the transport, so it runs at most once.
pub trait ChannelTransport {
    /// The live byte stream
    type Channel: Read + Write;

    fn start(self, baud: u32) -> Result<Self::Channel, ChannelError>;
}

/// Raw UART or buffered serial, picked from [`TransportKind`]
pub enum SerialTransport<R, B> {
    RawUart(R),
    BufferedSerial(B),
}

impl<R, B> SerialTransport<R, B> {
    pub fn kind(&self) -> TransportKind {
        match self {
            SerialTransport::RawUart(_) => TransportKind::RawUart,
            SerialTransport::BufferedSerial(_) => TransportKind::BufferedSerial,
        }
    }
}

impl<R, B> ChannelTransport for SerialTransport<R, B>
where
    R: ChannelTransport,
    B: ChannelTransport,
{
    type Channel = SerialChannel<R::Channel, B::Channel>;

    fn start(self, baud: u32) -> Result<Self::Channel, ChannelError> {
        match self {
            SerialTransport::RawUart(t) => t.start(baud).map(SerialChannel::RawUart),
            SerialTransport::BufferedSerial(t) => t.start(baud).map(SerialChannel::BufferedSerial),
        }
    }
}

/// Live channel of either transport kind
pub enum SerialChannel<R, B> {
    RawUart(R),
    BufferedSerial(B),
}

impl<R: ErrorType, B: ErrorType> ErrorType for SerialChannel<R, B> {
    type Error = ErrorKind;
}

impl<R: Read, B: Read> Read for SerialChannel<R, B> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        match self {
            SerialChannel::RawUart(c) => c.read(buf).await.map_err(|e| e.kind()),
            SerialChannel::BufferedSerial(c) => c.read(buf).await.map_err(|e| e.kind()),
        }
    }
}

impl<R: Write, B: Write> Write for SerialChannel<R, B> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        match self {
            SerialChannel::RawUart(c) => c.write(buf).await.map_err(|e| e.kind()),
            SerialChannel::BufferedSerial(c) => c.write(buf).await.map_err(|e| e.kind()),
        }
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        match self {
            SerialChannel::RawUart(c) => c.flush().await.map_err(|e| e.kind()),
            SerialChannel::BufferedSerial(c) => c.flush().await.map_err(|e| e.kind()),
        }
    }
}

/// The tuning protocol spoken over a live channel
///
/// `serve` handles one exchange (typically one request) and returns; the
/// channel run-loop calls it again forever.
#[allow(async_fn_in_trait)]
pub trait ProtocolEngine<C: ErrorType> {
    async fn serve(&mut self, channel: &mut C) -> Result<(), C::Error>;
}

/// Engine that reads and discards input
///
/// Keeps a channel's receive side drained while no protocol is attached.
#[derive(Debug, Default)]
pub struct DrainEngine {
    received: u32,
}

impl DrainEngine {
    pub const fn new() -> Self {
        Self { received: 0 }
    }

    /// Bytes discarded so far (wrapping)
    pub fn received(&self) -> u32 {
        self.received
    }
}

impl<C: Read + Write> ProtocolEngine<C> for DrainEngine {
    async fn serve(&mut self, channel: &mut C) -> Result<(), C::Error> {
        let mut buf = [0u8; 64];
        let n = channel.read(&mut buf).await?;
        if n == 0 {
            yield_now().await;
        }
        self.received = self.received.wrapping_add(n as u32);
        Ok(())
    }
}

/// Build the configured transport and start it once
pub fn setup_channel<F, T>(channel: &ProtocolChannel, build: F) -> Result<T::Channel, ChannelError>
where
    F: FnOnce(TransportKind) -> T,
    T: ChannelTransport,
{
    let config = channel.transport;
    if config.baud == 0 {
        return Err(ChannelError::InvalidBaudRate(config.baud));
    }

    log_info!(
        "{}: starting {} on {} at {} baud",
        channel.name(),
        config.kind.name(),
        config.port.name(),
        config.baud
    );

    build(config.kind).start(config.baud)
}

/// Shared body of every protocol channel task
///
/// Only returns if the transport fails to start.
pub async fn run_protocol_channel<F, T, E>(
    channel: &ProtocolChannel,
    build: F,
    engine: &mut E,
) -> Result<Infallible, ChannelError>
where
    F: FnOnce(TransportKind) -> T,
    T: ChannelTransport,
    E: ProtocolEngine<T::Channel>,
{
    let mut live = match setup_channel(channel, build) {
        Ok(live) => live,
        Err(e) => {
            log_error!("{}: transport start failed: {}", channel.name(), e);
            return Err(e);
        }
    };

    log_info!("{}: channel up", channel.name());

    loop {
        if engine.serve(&mut live).await.is_err() {
            log_warn!("{}: protocol exchange failed", channel.name());
            yield_now().await;
        }
    }
}
