//! RP2040 board wiring
//!
//! Pin and peripheral assignments, the concrete serial transports, and the
//! executor tasks the bootstrap supervisor launches.
//!
//! | Port  | Pins          | Used by                                   |
//! |-------|---------------|-------------------------------------------|
//! | UART0 | GPIO0 / GPIO1 | debug telemetry or secondary channel      |
//! | UART1 | GPIO4 / GPIO5 | primary channel (DMA CH0/CH1 when raw)    |
//!
//! UART1 is bound either to the buffered or to the DMA interrupt handler,
//! depending on `ts-primary-uart`; the other transport kind is unavailable
//! on that port.

use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::peripherals::{DMA_CH0, DMA_CH1, PIN_0, PIN_1, PIN_4, PIN_5, UART0, UART1};
use embassy_rp::uart::{self, Async, BufferedInterruptHandler, BufferedUart, Uart};
use embassy_rp::Peri;
use embassy_time::Duration;
use embedded_io_async::{ErrorKind, ErrorType, Read, Write};
use static_cell::StaticCell;

use crate::channel::{
    run_protocol_channel, ChannelError, ChannelTransport, DrainEngine, ProtocolChannel,
    SerialChannel, SerialTransport,
};
use crate::config::{
    DebugSerialConfig, SerialPortId, TransportKind, SERIAL_RX_BUFFER_SIZE, SERIAL_TX_BUFFER_SIZE,
};
use crate::reporter::TelemetryReporter;
use crate::supervisor::{LaunchError, TaskLauncher};
use crate::telemetry::BoardTelemetry;

// ===================================================================
// Interrupt Binding
// ===================================================================

#[cfg(feature = "ts-primary-uart")]
bind_interrupts!(pub struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
    UART1_IRQ => uart::InterruptHandler<UART1>;
});

#[cfg(not(feature = "ts-primary-uart"))]
bind_interrupts!(pub struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
    UART1_IRQ => BufferedInterruptHandler<UART1>;
});

/// Whether `port` can run a raw DMA UART in this build
pub const fn raw_uart_available(port: SerialPortId) -> bool {
    cfg!(feature = "ts-primary-uart") && matches!(port, SerialPortId::Uart1)
}

// ===================================================================
// Port Resources
// ===================================================================

pub struct Uart0Resources {
    pub uart: Peri<'static, UART0>,
    pub tx: Peri<'static, PIN_0>,
    pub rx: Peri<'static, PIN_1>,
}

pub struct Uart1Resources {
    pub uart: Peri<'static, UART1>,
    pub tx: Peri<'static, PIN_4>,
    pub rx: Peri<'static, PIN_5>,
    pub tx_dma: Peri<'static, DMA_CH0>,
    pub rx_dma: Peri<'static, DMA_CH1>,
}

/// Everything needed to bring up one serial port, owned by one task
pub enum PortResources {
    Uart0(Uart0Resources),
    Uart1(Uart1Resources),
}

impl PortResources {
    pub fn id(&self) -> SerialPortId {
        match self {
            PortResources::Uart0(_) => SerialPortId::Uart0,
            PortResources::Uart1(_) => SerialPortId::Uart1,
        }
    }
}

// Each port is handed out once, so each buffer pair is initialised once.
static UART0_BUFFERS: StaticCell<([u8; SERIAL_TX_BUFFER_SIZE], [u8; SERIAL_RX_BUFFER_SIZE])> =
    StaticCell::new();
#[cfg(not(feature = "ts-primary-uart"))]
static UART1_BUFFERS: StaticCell<([u8; SERIAL_TX_BUFFER_SIZE], [u8; SERIAL_RX_BUFFER_SIZE])> =
    StaticCell::new();

fn uart_config(baud: u32) -> uart::Config {
    let mut config = uart::Config::default();
    config.baudrate = baud;
    config
}

// ===================================================================
// Transports
// ===================================================================

/// Interrupt-driven UART with ring buffers
pub struct BufferedPort {
    resources: PortResources,
}

impl BufferedPort {
    pub fn new(resources: PortResources) -> Self {
        Self { resources }
    }
}

impl ChannelTransport for BufferedPort {
    type Channel = BufferedUart;

    fn start(self, baud: u32) -> Result<BufferedUart, ChannelError> {
        match self.resources {
            PortResources::Uart0(r) => {
                let (tx_buf, rx_buf) = UART0_BUFFERS
                    .init(([0; SERIAL_TX_BUFFER_SIZE], [0; SERIAL_RX_BUFFER_SIZE]));
                Ok(BufferedUart::new(
                    r.uart,
                    r.tx,
                    r.rx,
                    Irqs,
                    tx_buf,
                    rx_buf,
                    uart_config(baud),
                ))
            }
            #[cfg(not(feature = "ts-primary-uart"))]
            PortResources::Uart1(r) => {
                let (tx_buf, rx_buf) = UART1_BUFFERS
                    .init(([0; SERIAL_TX_BUFFER_SIZE], [0; SERIAL_RX_BUFFER_SIZE]));
                Ok(BufferedUart::new(
                    r.uart,
                    r.tx,
                    r.rx,
                    Irqs,
                    tx_buf,
                    rx_buf,
                    uart_config(baud),
                ))
            }
            #[cfg(feature = "ts-primary-uart")]
            PortResources::Uart1(_) => Err(ChannelError::TransportUnavailable),
        }
    }
}

/// DMA UART without a software FIFO
pub struct RawUartPort {
    resources: PortResources,
}

impl RawUartPort {
    pub fn new(resources: PortResources) -> Self {
        Self { resources }
    }
}

impl ChannelTransport for RawUartPort {
    type Channel = DmaUart;

    fn start(self, baud: u32) -> Result<DmaUart, ChannelError> {
        match self.resources {
            #[cfg(feature = "ts-primary-uart")]
            PortResources::Uart1(r) => Ok(DmaUart(Uart::new(
                r.uart,
                r.tx,
                r.rx,
                Irqs,
                r.tx_dma,
                r.rx_dma,
                uart_config(baud),
            ))),
            _ => {
                let _ = baud;
                Err(ChannelError::TransportUnavailable)
            }
        }
    }
}

/// Byte-stream view of an async DMA UART
///
/// A DMA read completes only when the whole buffer is filled, so reads are
/// issued one byte at a time.
pub struct DmaUart(Uart<'static, Async>);

impl ErrorType for DmaUart {
    type Error = ErrorKind;
}

impl Read for DmaUart {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.0
            .read(&mut buf[..1])
            .await
            .map_err(|_| ErrorKind::Other)?;
        Ok(1)
    }
}

impl Write for DmaUart {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.0.write(buf).await.map_err(|_| ErrorKind::Other)?;
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

pub type BoardTransport = SerialTransport<RawUartPort, BufferedPort>;
pub type BoardChannel = SerialChannel<DmaUart, BufferedUart>;

/// Transport builder for protocol channels on this board
pub fn board_transport(kind: TransportKind, resources: PortResources) -> BoardTransport {
    match kind {
        TransportKind::RawUart => SerialTransport::RawUart(RawUartPort::new(resources)),
        TransportKind::BufferedSerial => {
            SerialTransport::BufferedSerial(BufferedPort::new(resources))
        }
    }
}

// ===================================================================
// Tasks
// ===================================================================

/// Debug telemetry task
#[embassy_executor::task]
pub async fn telemetry_task(
    source: &'static BoardTelemetry,
    port: PortResources,
    config: DebugSerialConfig,
) {
    let output = match BufferedPort::new(port).start(config.baud) {
        Ok(uart) => uart,
        Err(e) => {
            log_error!("{}: debug serial start failed: {}", crate::config::DEBUG_TASK_NAME, e);
            return;
        }
    };

    TelemetryReporter::new(source, output, Duration::from_millis(config.period_ms))
        .run()
        .await
}

/// Protocol channel task, one instance per configured channel
#[embassy_executor::task(pool_size = 2)]
pub async fn protocol_channel_task(channel: ProtocolChannel, port: PortResources) {
    let mut engine = DrainEngine::new();
    let build = move |kind| board_transport(kind, port);

    match run_protocol_channel(&channel, build, &mut engine).await {
        Ok(never) => match never {},
        Err(_) => log_warn!("{}: task exiting", channel.name()),
    }
}

// ===================================================================
// Launcher
// ===================================================================

/// Spawns the board tasks and hands each serial port out at most once
pub struct BoardLauncher {
    spawner: Spawner,
    telemetry: &'static BoardTelemetry,
    uart0: Option<Uart0Resources>,
    uart1: Option<Uart1Resources>,
}

impl BoardLauncher {
    pub fn new(
        spawner: Spawner,
        telemetry: &'static BoardTelemetry,
        uart0: Uart0Resources,
        uart1: Uart1Resources,
    ) -> Self {
        Self {
            spawner,
            telemetry,
            uart0: Some(uart0),
            uart1: Some(uart1),
        }
    }

    fn take_port(&mut self, port: SerialPortId) -> Result<PortResources, LaunchError> {
        let resources = match port {
            SerialPortId::Uart0 => self.uart0.take().map(PortResources::Uart0),
            SerialPortId::Uart1 => self.uart1.take().map(PortResources::Uart1),
        };
        resources.ok_or(LaunchError::PortInUse(port))
    }
}

impl TaskLauncher for BoardLauncher {
    fn launch_telemetry(&mut self, config: &DebugSerialConfig) -> Result<(), LaunchError> {
        let port = self.take_port(config.port)?;
        self.spawner
            .spawn(telemetry_task(self.telemetry, port, *config))
            .map_err(|_| LaunchError::Spawn)
    }

    fn launch_protocol_channel(&mut self, channel: ProtocolChannel) -> Result<(), LaunchError> {
        let transport = channel.transport;
        if transport.kind == TransportKind::RawUart && !raw_uart_available(transport.port) {
            return Err(LaunchError::TransportUnavailable);
        }

        let port = self.take_port(transport.port)?;
        self.spawner
            .spawn(protocol_channel_task(channel, port))
            .map_err(|_| LaunchError::Spawn)
    }
}
