//! Bootstrap supervisor
//!
//! Decides, from the boot configuration, which long-lived tasks exist and
//! starts them in a fixed order: debug telemetry, primary protocol channel,
//! secondary protocol channel. Each step stands alone; a failed or disabled
//! step does not stop the ones after it.
//!
//! How a task is actually started is left to a [`TaskLauncher`], so the
//! RP2040 spawner and the host test doubles share the same sequencing.

use core::fmt;

use crate::channel::ProtocolChannel;
use crate::config::{BootConfig, DebugSerialConfig, SerialPortId, AFR_CHANNELS, EGT_CHANNELS};
use crate::types::APP_VERSION;

/// Why a task could not be launched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rp2040", derive(defmt::Format))]
pub enum LaunchError {
    /// Serial port already handed to another task
    PortInUse(SerialPortId),
    /// The transport kind is not available on the requested port
    TransportUnavailable,
    /// Executor task pool exhausted
    Spawn,
}

impl fmt::Display for LaunchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchError::PortInUse(port) => write!(f, "{} already in use", port),
            LaunchError::TransportUnavailable => f.write_str("transport unavailable"),
            LaunchError::Spawn => f.write_str("task spawn failed"),
        }
    }
}

/// Starts the concrete tasks on behalf of the supervisor
pub trait TaskLauncher {
    fn launch_telemetry(&mut self, config: &DebugSerialConfig) -> Result<(), LaunchError>;

    fn launch_protocol_channel(&mut self, channel: ProtocolChannel) -> Result<(), LaunchError>;
}

/// Outcome of one bootstrap step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rp2040", derive(defmt::Format))]
pub enum LaunchStatus {
    /// Not enabled in this build
    Disabled,
    Started,
    Failed(LaunchError),
}

impl LaunchStatus {
    fn from_result(result: Result<(), LaunchError>) -> Self {
        match result {
            Ok(()) => LaunchStatus::Started,
            Err(e) => LaunchStatus::Failed(e),
        }
    }

    pub fn is_started(self) -> bool {
        self == LaunchStatus::Started
    }
}

/// What [`BootstrapSupervisor::start`] did, step by step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rp2040", derive(defmt::Format))]
pub struct BootReport {
    pub telemetry: LaunchStatus,
    pub primary: LaunchStatus,
    pub secondary: LaunchStatus,
}

impl BootReport {
    /// Protocol channel tasks actually running
    pub fn protocol_channels_started(&self) -> usize {
        [self.primary, self.secondary]
            .iter()
            .filter(|s| s.is_started())
            .count()
    }

    /// Every enabled step started
    pub fn all_started(&self) -> bool {
        [self.telemetry, self.primary, self.secondary]
            .iter()
            .all(|s| !matches!(s, LaunchStatus::Failed(_)))
    }
}

/// Bootstrap supervisor responsible for bringing up the comms tasks
pub struct BootstrapSupervisor {
    config: BootConfig,
}

impl BootstrapSupervisor {
    pub fn new(config: BootConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BootConfig {
        &self.config
    }

    /// Print firmware banner and the selected configuration
    pub fn print_startup_banner(&self) {
        log_info!("========================================");
        log_info!("Wideband comms v{}", APP_VERSION);
        log_info!("========================================");
        log_info!("Channels: {} AFR, {} EGT", AFR_CHANNELS, EGT_CHANNELS);

        match &self.config.debug {
            Some(debug) => log_info!(
                "Debug serial: {} @ {} baud, every {} ms",
                debug.port.name(),
                debug.baud,
                debug.period_ms
            ),
            None => log_info!("Debug serial: disabled"),
        }

        match &self.config.protocol {
            Some(protocol) => {
                log_info!(
                    "Primary channel: {} on {} @ {} baud",
                    protocol.primary.kind.name(),
                    protocol.primary.port.name(),
                    protocol.primary.baud
                );
                if let Some(secondary) = &protocol.secondary {
                    log_info!(
                        "Secondary channel: {} on {} @ {} baud",
                        secondary.kind.name(),
                        secondary.port.name(),
                        secondary.baud
                    );
                }
            }
            None => log_info!("Protocol channels: disabled"),
        }
        log_info!("========================================");
    }

    /// Start every enabled task, in order. Call once.
    pub fn start<L: TaskLauncher>(&self, launcher: &mut L) -> BootReport {
        if let Some(port) = self.config.port_conflict() {
            log_warn!("{} is claimed by more than one task; later claims will fail", port.name());
        }

        let telemetry = match &self.config.debug {
            Some(debug) => LaunchStatus::from_result(launcher.launch_telemetry(debug)),
            None => LaunchStatus::Disabled,
        };
        Self::log_step(crate::config::DEBUG_TASK_NAME, telemetry);

        let (primary, secondary) = match &self.config.protocol {
            Some(protocol) => {
                let primary = LaunchStatus::from_result(
                    launcher.launch_protocol_channel(ProtocolChannel::primary(protocol.primary)),
                );
                let secondary = match protocol.secondary {
                    Some(transport) => LaunchStatus::from_result(
                        launcher.launch_protocol_channel(ProtocolChannel::secondary(transport)),
                    ),
                    None => LaunchStatus::Disabled,
                };
                (primary, secondary)
            }
            None => (LaunchStatus::Disabled, LaunchStatus::Disabled),
        };
        Self::log_step(crate::config::PRIMARY_TASK_NAME, primary);
        Self::log_step(crate::config::SECONDARY_TASK_NAME, secondary);

        BootReport {
            telemetry,
            primary,
            secondary,
        }
    }

    fn log_step(name: &str, status: LaunchStatus) {
        match status {
            LaunchStatus::Disabled => log_debug!("{}: disabled", name),
            LaunchStatus::Started => log_info!("{}: started", name),
            LaunchStatus::Failed(e) => log_error!("{}: failed to start: {}", name, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelSlot;
    use crate::config::{
        board_config_for, BoardFeatures, ChannelTransportConfig, ProtocolConfig, TransportKind,
        TS_PRIMARY_BAUDRATE, TS_SECONDARY_BAUDRATE,
    };

    #[derive(Debug, PartialEq)]
    enum Launched {
        Telemetry(u32),
        Channel(ChannelSlot, u32),
    }

    /// Records launches and hands out each serial port once
    #[derive(Default)]
    struct RecordingLauncher {
        launched: Vec<Launched>,
        taken: Vec<SerialPortId>,
        refuse_telemetry: bool,
    }

    impl RecordingLauncher {
        fn take(&mut self, port: SerialPortId) -> Result<(), LaunchError> {
            if self.taken.contains(&port) {
                return Err(LaunchError::PortInUse(port));
            }
            self.taken.push(port);
            Ok(())
        }
    }

    impl TaskLauncher for RecordingLauncher {
        fn launch_telemetry(&mut self, config: &DebugSerialConfig) -> Result<(), LaunchError> {
            if self.refuse_telemetry {
                return Err(LaunchError::Spawn);
            }
            self.take(config.port)?;
            self.launched.push(Launched::Telemetry(config.baud));
            Ok(())
        }

        fn launch_protocol_channel(&mut self, channel: ProtocolChannel) -> Result<(), LaunchError> {
            self.take(channel.transport.port)?;
            self.launched
                .push(Launched::Channel(channel.slot, channel.transport.baud));
            Ok(())
        }
    }

    fn transport(port: SerialPortId, baud: u32) -> ChannelTransportConfig {
        ChannelTransportConfig {
            port,
            kind: TransportKind::BufferedSerial,
            baud,
        }
    }

    fn protocol(secondary: bool) -> Option<ProtocolConfig> {
        Some(ProtocolConfig {
            primary: transport(SerialPortId::Uart1, 115_200),
            secondary: secondary.then(|| transport(SerialPortId::Uart0, 38_400)),
        })
    }

    #[test]
    fn test_protocol_disabled_starts_no_channels() {
        let supervisor = BootstrapSupervisor::new(BootConfig {
            debug: Some(DebugSerialConfig::DEFAULT),
            protocol: None,
        });
        let mut launcher = RecordingLauncher::default();
        let report = supervisor.start(&mut launcher);

        assert_eq!(report.protocol_channels_started(), 0);
        assert_eq!(report.telemetry, LaunchStatus::Started);
        assert_eq!(report.primary, LaunchStatus::Disabled);
        assert_eq!(report.secondary, LaunchStatus::Disabled);
        assert_eq!(launcher.launched, vec![Launched::Telemetry(115_200)]);
    }

    #[test]
    fn test_primary_only() {
        let supervisor = BootstrapSupervisor::new(BootConfig {
            debug: None,
            protocol: protocol(false),
        });
        let mut launcher = RecordingLauncher::default();
        let report = supervisor.start(&mut launcher);

        assert_eq!(report.protocol_channels_started(), 1);
        assert_eq!(report.telemetry, LaunchStatus::Disabled);
        assert_eq!(
            launcher.launched,
            vec![Launched::Channel(ChannelSlot::Primary, 115_200)]
        );
    }

    #[test]
    fn test_primary_and_secondary_in_order_with_own_baud() {
        let supervisor = BootstrapSupervisor::new(BootConfig {
            debug: None,
            protocol: protocol(true),
        });
        let mut launcher = RecordingLauncher::default();
        let report = supervisor.start(&mut launcher);

        assert_eq!(report.protocol_channels_started(), 2);
        assert!(report.all_started());
        assert_eq!(
            launcher.launched,
            vec![
                Launched::Channel(ChannelSlot::Primary, 115_200),
                Launched::Channel(ChannelSlot::Secondary, 38_400),
            ]
        );
    }

    #[test]
    fn test_full_config_order() {
        let supervisor = BootstrapSupervisor::new(BootConfig {
            debug: Some(DebugSerialConfig {
                port: SerialPortId::Uart0,
                baud: 230_400,
                period_ms: 100,
            }),
            protocol: Some(ProtocolConfig {
                primary: transport(SerialPortId::Uart1, 115_200),
                secondary: None,
            }),
        });
        let mut launcher = RecordingLauncher::default();
        supervisor.print_startup_banner();
        let report = supervisor.start(&mut launcher);

        assert!(report.all_started());
        assert_eq!(
            launcher.launched,
            vec![
                Launched::Telemetry(230_400),
                Launched::Channel(ChannelSlot::Primary, 115_200),
            ]
        );
    }

    #[test]
    fn test_failed_step_does_not_block_later_steps() {
        let supervisor = BootstrapSupervisor::new(BootConfig {
            debug: Some(DebugSerialConfig::DEFAULT),
            protocol: protocol(false),
        });
        let mut launcher = RecordingLauncher {
            refuse_telemetry: true,
            ..Default::default()
        };
        let report = supervisor.start(&mut launcher);

        assert_eq!(report.telemetry, LaunchStatus::Failed(LaunchError::Spawn));
        assert_eq!(report.primary, LaunchStatus::Started);
        assert!(!report.all_started());
    }

    #[test]
    fn test_shared_port_refused_for_later_claim() {
        // Debug serial and the secondary channel both want UART0.
        let supervisor = BootstrapSupervisor::new(BootConfig {
            debug: Some(DebugSerialConfig::DEFAULT),
            protocol: protocol(true),
        });
        let mut launcher = RecordingLauncher::default();
        let report = supervisor.start(&mut launcher);

        assert_eq!(report.telemetry, LaunchStatus::Started);
        assert_eq!(report.primary, LaunchStatus::Started);
        assert_eq!(
            report.secondary,
            LaunchStatus::Failed(LaunchError::PortInUse(SerialPortId::Uart0))
        );
        assert_eq!(report.protocol_channels_started(), 1);
    }

    #[test]
    fn test_secondary_board_build_starts_both_channels() {
        let supervisor = BootstrapSupervisor::new(board_config_for(BoardFeatures {
            debug_serial: false,
            tunerstudio: true,
            ts_secondary: true,
            ts_primary_uart: false,
        }));
        let mut launcher = RecordingLauncher::default();
        let report = supervisor.start(&mut launcher);

        assert!(report.all_started());
        assert_eq!(report.protocol_channels_started(), 2);
        assert_eq!(
            launcher.launched,
            vec![
                Launched::Channel(ChannelSlot::Primary, TS_PRIMARY_BAUDRATE),
                Launched::Channel(ChannelSlot::Secondary, TS_SECONDARY_BAUDRATE),
            ]
        );
    }

    #[test]
    fn test_every_supported_board_build_starts_cleanly() {
        for bits in 0u8..16 {
            let features = BoardFeatures {
                debug_serial: bits & 1 != 0,
                tunerstudio: bits & 2 != 0,
                ts_secondary: bits & 4 != 0,
                ts_primary_uart: bits & 8 != 0,
            };
            if !features.is_supported() {
                continue;
            }
            let config = board_config_for(features);
            let supervisor = BootstrapSupervisor::new(config);
            let mut launcher = RecordingLauncher::default();
            let report = supervisor.start(&mut launcher);

            assert!(report.all_started(), "{:?}", features);
            assert_eq!(
                report.protocol_channels_started(),
                config.protocol_channel_count()
            );
        }
    }

    #[test]
    fn test_nothing_enabled() {
        let supervisor = BootstrapSupervisor::new(BootConfig::disabled());
        let mut launcher = RecordingLauncher::default();
        let report = supervisor.start(&mut launcher);

        assert_eq!(
            report,
            BootReport {
                telemetry: LaunchStatus::Disabled,
                primary: LaunchStatus::Disabled,
                secondary: LaunchStatus::Disabled,
            }
        );
        assert!(launcher.launched.is_empty());
    }
}
