//! Supervisor, channel run-loop and reporter wired together with mock
//! transports in place of the RP2040 UARTs.

use core::pin::pin;
use std::cell::RefCell;
use std::rc::Rc;

use embassy_futures::{block_on, poll_once};
use embassy_time::Duration;
use embedded_io_async::{ErrorKind, ErrorType, Read, Write};

use wideband_comms::channel::{
    run_protocol_channel, ChannelError, ChannelSlot, ChannelTransport, DrainEngine,
    ProtocolChannel, SerialTransport,
};
use wideband_comms::config::{
    BootConfig, ChannelTransportConfig, DebugSerialConfig, ProtocolConfig, SerialPortId,
    TransportKind,
};
use wideband_comms::reporter::TelemetryReporter;
use wideband_comms::supervisor::{BootstrapSupervisor, LaunchError, LaunchStatus, TaskLauncher};
use wideband_comms::telemetry::SharedTelemetry;
use wideband_comms::types::{HeaterState, SensorSnapshot};

/// Shared wire: bytes the host sent and bytes the device wrote
#[derive(Default)]
struct Wire {
    to_device: Vec<u8>,
    from_device: Vec<u8>,
    baud: Option<u32>,
}

type WireRef = Rc<RefCell<Wire>>;

struct MockPort {
    wire: WireRef,
    available: bool,
}

impl ChannelTransport for MockPort {
    type Channel = MockStream;

    fn start(self, baud: u32) -> Result<MockStream, ChannelError> {
        if !self.available {
            return Err(ChannelError::TransportUnavailable);
        }
        let mut wire = self.wire.borrow_mut();
        assert!(wire.baud.is_none(), "port started twice");
        wire.baud = Some(baud);
        Ok(MockStream {
            wire: self.wire.clone(),
        })
    }
}

struct MockStream {
    wire: WireRef,
}

impl ErrorType for MockStream {
    type Error = ErrorKind;
}

impl Read for MockStream {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut wire = self.wire.borrow_mut();
        let n = buf.len().min(wire.to_device.len());
        buf[..n].copy_from_slice(&wire.to_device[..n]);
        wire.to_device.drain(..n);
        Ok(n)
    }
}

impl Write for MockStream {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.wire.borrow_mut().from_device.extend_from_slice(buf);
        Ok(buf.len())
    }
}

fn mock_transport(
    kind: TransportKind,
    wire: &WireRef,
    raw_available: bool,
) -> SerialTransport<MockPort, MockPort> {
    match kind {
        TransportKind::RawUart => SerialTransport::RawUart(MockPort {
            wire: wire.clone(),
            available: raw_available,
        }),
        TransportKind::BufferedSerial => SerialTransport::BufferedSerial(MockPort {
            wire: wire.clone(),
            available: true,
        }),
    }
}

/// Claims ports and records what would have been spawned
#[derive(Default)]
struct MockLauncher {
    uart0: WireRef,
    uart1: WireRef,
    claimed: Vec<SerialPortId>,
    telemetry: Option<DebugSerialConfig>,
    channels: Vec<ProtocolChannel>,
}

impl MockLauncher {
    fn claim(&mut self, port: SerialPortId) -> Result<(), LaunchError> {
        if self.claimed.contains(&port) {
            return Err(LaunchError::PortInUse(port));
        }
        self.claimed.push(port);
        Ok(())
    }

    fn wire(&self, port: SerialPortId) -> WireRef {
        match port {
            SerialPortId::Uart0 => self.uart0.clone(),
            SerialPortId::Uart1 => self.uart1.clone(),
        }
    }
}

impl TaskLauncher for MockLauncher {
    fn launch_telemetry(&mut self, config: &DebugSerialConfig) -> Result<(), LaunchError> {
        self.claim(config.port)?;
        self.telemetry = Some(*config);
        Ok(())
    }

    fn launch_protocol_channel(&mut self, channel: ProtocolChannel) -> Result<(), LaunchError> {
        self.claim(channel.transport.port)?;
        self.channels.push(channel);
        Ok(())
    }
}

fn buffered(port: SerialPortId, baud: u32) -> ChannelTransportConfig {
    ChannelTransportConfig {
        port,
        kind: TransportKind::BufferedSerial,
        baud,
    }
}

#[test]
fn telemetry_and_primary_channel_come_up() {
    let supervisor = BootstrapSupervisor::new(BootConfig {
        debug: Some(DebugSerialConfig::DEFAULT),
        protocol: Some(ProtocolConfig {
            primary: ChannelTransportConfig {
                port: SerialPortId::Uart1,
                kind: TransportKind::RawUart,
                baud: 115_200,
            },
            secondary: None,
        }),
    });
    let mut launcher = MockLauncher::default();
    let report = supervisor.start(&mut launcher);
    assert_eq!(report.telemetry, LaunchStatus::Started);
    assert_eq!(report.protocol_channels_started(), 1);

    // Reporter on UART0
    let store: SharedTelemetry<2, 0> = SharedTelemetry::new();
    store.publish_sensor(
        1,
        SensorSnapshot {
            lambda: 1.0,
            heater_state: HeaterState::WarmupRamp as u8,
            ..SensorSnapshot::IDLE
        },
    );
    let debug = launcher.telemetry.unwrap();
    let output = mock_transport(TransportKind::BufferedSerial, &launcher.wire(debug.port), true)
        .start(debug.baud)
        .unwrap();
    let mut reporter =
        TelemetryReporter::new(&store, output, Duration::from_millis(debug.period_ms));
    block_on(reporter.report_pass());

    let uart0 = launcher.uart0.borrow();
    let text = std::str::from_utf8(&uart0.from_device).unwrap();
    let lines: Vec<&str> = text.split_inclusive("\r\n").collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("[AFR0]: 0.000 "));
    assert!(lines[1].starts_with("[AFR1]: 1.000 "));
    assert!(lines[1].contains("heater: WarmupRamp (0)"));
    assert_eq!(uart0.baud, Some(115_200));
    drop(uart0);

    // Primary channel on UART1 drains host traffic
    let channel = launcher.channels[0];
    assert_eq!(channel.slot, ChannelSlot::Primary);
    let wire = launcher.wire(channel.transport.port);
    wire.borrow_mut().to_device.extend_from_slice(&[0x51; 100]);

    let mut engine = DrainEngine::new();
    {
        let fut = pin!(run_protocol_channel(
            &channel,
            |kind| mock_transport(kind, &wire, true),
            &mut engine,
        ));
        assert!(poll_once(fut).is_pending());
    }
    assert_eq!(engine.received(), 100);
    assert!(wire.borrow().to_device.is_empty());
    assert_eq!(wire.borrow().baud, Some(115_200));
}

#[test]
fn secondary_channel_runs_alongside_primary() {
    let supervisor = BootstrapSupervisor::new(BootConfig {
        debug: None,
        protocol: Some(ProtocolConfig {
            primary: buffered(SerialPortId::Uart1, 115_200),
            secondary: Some(buffered(SerialPortId::Uart0, 57_600)),
        }),
    });
    let mut launcher = MockLauncher::default();
    let report = supervisor.start(&mut launcher);
    assert_eq!(report.protocol_channels_started(), 2);
    assert_eq!(launcher.channels.len(), 2);

    let primary = launcher.channels[0];
    let secondary = launcher.channels[1];
    let primary_wire = launcher.wire(primary.transport.port);
    let secondary_wire = launcher.wire(secondary.transport.port);
    primary_wire.borrow_mut().to_device.extend_from_slice(b"Q");
    secondary_wire.borrow_mut().to_device.extend_from_slice(b"HS");

    let mut primary_engine = DrainEngine::new();
    let mut secondary_engine = DrainEngine::new();
    {
        let mut a = pin!(run_protocol_channel(
            &primary,
            |kind| mock_transport(kind, &primary_wire, false),
            &mut primary_engine,
        ));
        let mut b = pin!(run_protocol_channel(
            &secondary,
            |kind| mock_transport(kind, &secondary_wire, false),
            &mut secondary_engine,
        ));
        // Interleave the two tasks the way the executor would.
        for _ in 0..3 {
            assert!(poll_once(a.as_mut()).is_pending());
            assert!(poll_once(b.as_mut()).is_pending());
        }
    }

    assert_eq!(primary_engine.received(), 1);
    assert_eq!(secondary_engine.received(), 2);
    assert_eq!(primary_wire.borrow().baud, Some(115_200));
    assert_eq!(secondary_wire.borrow().baud, Some(57_600));
}

#[test]
fn raw_transport_missing_ends_only_that_channel() {
    let wire = WireRef::default();
    let channel = ProtocolChannel::primary(ChannelTransportConfig {
        port: SerialPortId::Uart1,
        kind: TransportKind::RawUart,
        baud: 115_200,
    });
    let mut engine = DrainEngine::new();

    let result = block_on(run_protocol_channel(
        &channel,
        |kind| mock_transport(kind, &wire, false),
        &mut engine,
    ));
    assert_eq!(result.unwrap_err(), ChannelError::TransportUnavailable);
    assert_eq!(engine.received(), 0);
    assert!(wire.borrow().baud.is_none());
}

#[test]
fn debug_and_secondary_cannot_share_a_port() {
    let supervisor = BootstrapSupervisor::new(BootConfig {
        debug: Some(DebugSerialConfig::DEFAULT),
        protocol: Some(ProtocolConfig {
            primary: buffered(SerialPortId::Uart1, 115_200),
            secondary: Some(buffered(SerialPortId::Uart0, 115_200)),
        }),
    });
    assert_eq!(supervisor.config().port_conflict(), Some(SerialPortId::Uart0));

    let mut launcher = MockLauncher::default();
    let report = supervisor.start(&mut launcher);
    assert_eq!(report.telemetry, LaunchStatus::Started);
    assert_eq!(report.primary, LaunchStatus::Started);
    assert_eq!(
        report.secondary,
        LaunchStatus::Failed(LaunchError::PortInUse(SerialPortId::Uart0))
    );
    assert_eq!(launcher.claimed, vec![SerialPortId::Uart0, SerialPortId::Uart1]);
    assert_eq!(launcher.channels.len(), 1);
}
