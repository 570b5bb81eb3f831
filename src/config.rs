//! Build-time configuration for the wideband comms layer
//! RP2040 board: debug serial on UART0, tuning channel on UART1

// ===================================================================
// Channel Counts
// ===================================================================

pub const AFR_CHANNELS: usize = 2; // Wideband sensor channels
pub const EGT_CHANNELS: usize = 2; // Thermocouple channels (0 disables EGT lines)

// ===================================================================
// Serial Configuration
// ===================================================================

pub const DEBUG_SERIAL_BAUDRATE: u32 = 115_200;
pub const TS_PRIMARY_BAUDRATE: u32 = 115_200;
pub const TS_SECONDARY_BAUDRATE: u32 = 115_200;

pub const REPORT_PERIOD_MS: u64 = 100; // One full status pass per period

pub const SERIAL_TX_BUFFER_SIZE: usize = 256; // Per buffered port
pub const SERIAL_RX_BUFFER_SIZE: usize = 256;

// Task pools
pub const PROTOCOL_CHANNEL_TASKS: usize = 2; // Primary + secondary

// ===================================================================
// Diagnostic Task Names
// ===================================================================

pub const DEBUG_TASK_NAME: &str = "UART debug";
pub const PRIMARY_TASK_NAME: &str = "Primary TS Channel";
pub const SECONDARY_TASK_NAME: &str = "Secondary TS Channel";

// ===================================================================
// Transport Selection
// ===================================================================

/// Hardware serial port a consumer is wired to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rp2040", derive(defmt::Format))]
pub enum SerialPortId {
    Uart0,
    Uart1,
}

impl SerialPortId {
    pub fn name(self) -> &'static str {
        match self {
            SerialPortId::Uart0 => "UART0",
            SerialPortId::Uart1 => "UART1",
        }
    }
}

impl core::fmt::Display for SerialPortId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// How a protocol channel drives its serial port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rp2040", derive(defmt::Format))]
pub enum TransportKind {
    /// DMA UART, no software FIFO
    RawUart,
    /// Interrupt-driven UART with ring buffers
    BufferedSerial,
}

impl TransportKind {
    pub fn name(self) -> &'static str {
        match self {
            TransportKind::RawUart => "raw UART",
            TransportKind::BufferedSerial => "buffered serial",
        }
    }
}

/// Transport of one protocol channel: exactly one kind on one port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rp2040", derive(defmt::Format))]
pub struct ChannelTransportConfig {
    pub port: SerialPortId,
    pub kind: TransportKind,
    pub baud: u32,
}

/// Debug telemetry output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rp2040", derive(defmt::Format))]
pub struct DebugSerialConfig {
    pub port: SerialPortId,
    pub baud: u32,
    /// Time between the start of two report passes
    pub period_ms: u64,
}

impl DebugSerialConfig {
    pub const DEFAULT: Self = Self {
        port: SerialPortId::Uart0,
        baud: DEBUG_SERIAL_BAUDRATE,
        period_ms: REPORT_PERIOD_MS,
    };
}

impl Default for DebugSerialConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Tuning protocol channels; a secondary only exists next to a primary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rp2040", derive(defmt::Format))]
pub struct ProtocolConfig {
    pub primary: ChannelTransportConfig,
    pub secondary: Option<ChannelTransportConfig>,
}

/// Everything the bootstrap supervisor needs to decide what to start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rp2040", derive(defmt::Format))]
pub struct BootConfig {
    pub debug: Option<DebugSerialConfig>,
    pub protocol: Option<ProtocolConfig>,
}

impl BootConfig {
    /// Nothing enabled
    pub const fn disabled() -> Self {
        Self {
            debug: None,
            protocol: None,
        }
    }

    /// Number of protocol channels this configuration starts (0, 1 or 2)
    pub fn protocol_channel_count(&self) -> usize {
        match &self.protocol {
            None => 0,
            Some(ProtocolConfig {
                secondary: None, ..
            }) => 1,
            Some(_) => 2,
        }
    }

    /// First serial port claimed by more than one consumer
    pub fn port_conflict(&self) -> Option<SerialPortId> {
        let mut claimed: heapless::Vec<SerialPortId, 3> = heapless::Vec::new();

        let debug = self.debug.map(|d| d.port);
        let primary = self.protocol.map(|p| p.primary.port);
        let secondary = self.protocol.and_then(|p| p.secondary).map(|s| s.port);

        for port in [debug, primary, secondary].into_iter().flatten() {
            if claimed.contains(&port) {
                return Some(port);
            }
            let _ = claimed.push(port);
        }
        None
    }
}

// ===================================================================
// Board Selection (Cargo features)
// ===================================================================

// The RP2040 has two UARTs: the secondary channel takes UART0, which is
// also the debug port.
#[cfg(all(feature = "debug-serial", feature = "ts-secondary"))]
compile_error!(
    "`ts-secondary` needs UART0, which `debug-serial` already owns; \
     build with `--no-default-features --features ts-secondary`"
);

/// Feature selection as a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardFeatures {
    pub debug_serial: bool,
    pub tunerstudio: bool,
    pub ts_secondary: bool,
    pub ts_primary_uart: bool,
}

impl BoardFeatures {
    /// Features this crate was built with
    pub const ENABLED: Self = Self {
        debug_serial: cfg!(feature = "debug-serial"),
        tunerstudio: cfg!(feature = "tunerstudio"),
        ts_secondary: cfg!(feature = "ts-secondary"),
        ts_primary_uart: cfg!(feature = "ts-primary-uart"),
    };

    /// Every consumer gets a port of its own
    pub const fn is_supported(self) -> bool {
        !(self.debug_serial && self.tunerstudio && self.ts_secondary)
    }
}

/// Configuration for a given feature selection
///
/// A secondary channel is only built next to a primary one.
pub const fn board_config_for(features: BoardFeatures) -> BootConfig {
    let debug = if features.debug_serial {
        Some(DebugSerialConfig::DEFAULT)
    } else {
        None
    };

    let secondary = if features.ts_secondary {
        Some(ChannelTransportConfig {
            port: SerialPortId::Uart0,
            kind: TransportKind::BufferedSerial,
            baud: TS_SECONDARY_BAUDRATE,
        })
    } else {
        None
    };

    let primary_kind = if features.ts_primary_uart {
        TransportKind::RawUart
    } else {
        TransportKind::BufferedSerial
    };

    let protocol = if features.tunerstudio {
        Some(ProtocolConfig {
            primary: ChannelTransportConfig {
                port: SerialPortId::Uart1,
                kind: primary_kind,
                baud: TS_PRIMARY_BAUDRATE,
            },
            secondary,
        })
    } else {
        None
    };

    BootConfig { debug, protocol }
}

/// Configuration selected by the enabled Cargo features
pub const fn board_config() -> BootConfig {
    board_config_for(BoardFeatures::ENABLED)
}
