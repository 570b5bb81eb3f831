//! Common types and data structures used across the wideband firmware
//!
//! This module contains the per-channel sensor records read by the telemetry
//! reporter, the heater and fault tags they carry, and version information.

/// Sensor or auxiliary channel number, `0..AFR_CHANNELS` or `0..EGT_CHANNELS`
pub type ChannelIndex = u8;

/// One report's worth of state for a single AFR channel
///
/// Values are taken as-is from the control code. Nothing here is validated:
/// the formatter must cope with NaN, infinities and physically impossible
/// readings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SensorSnapshot {
    /// Normalized air-fuel ratio (1.0 = stoichiometric)
    pub lambda: f32,
    /// Nernst cell DC voltage, volts
    pub nernst_dc: f32,
    /// Nernst cell AC voltage, volts
    pub nernst_ac: f32,
    /// Sensor internal resistance, ohms
    pub internal_resistance: f32,
    /// Sensor temperature, °C
    pub sensor_temperature: f32,
    /// Nominal pump current, milliamps
    pub pump_current: f32,
    /// Heater supply voltage, volts
    pub heater_voltage: f32,
    /// Raw heater state tag, see [`HeaterState`]
    pub heater_state: u8,
    /// Heater duty cycle, 0.0..=1.0
    pub heater_duty: f32,
    /// Raw fault tag, see [`Fault`]
    pub fault: u8,
}

impl SensorSnapshot {
    /// Snapshot reported before the control code has published anything
    pub const IDLE: Self = Self {
        lambda: 0.0,
        nernst_dc: 0.0,
        nernst_ac: 0.0,
        internal_resistance: 0.0,
        sensor_temperature: 0.0,
        pump_current: 0.0,
        heater_voltage: 0.0,
        heater_state: HeaterState::Preheat as u8,
        heater_duty: 0.0,
        fault: Fault::None as u8,
    };
}

impl Default for SensorSnapshot {
    fn default() -> Self {
        Self::IDLE
    }
}

/// Thermocouple reading for one EGT channel
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AuxTemperatureSnapshot {
    /// Exhaust gas temperature, °C
    pub temperature: f32,
    /// Cold-junction (chip) temperature, °C
    pub cold_junction_temperature: f32,
}

impl AuxTemperatureSnapshot {
    pub const IDLE: Self = Self {
        temperature: 0.0,
        cold_junction_temperature: 0.0,
    };
}

/// Heater controller state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "rp2040", derive(defmt::Format))]
#[repr(u8)]
pub enum HeaterState {
    Preheat = 0,
    WarmupRamp = 1,
    ClosedLoop = 2,
    Stopped = 3,
    NoHeaterSupply = 4,
}

impl HeaterState {
    /// Decode a raw tag; `None` for tags this firmware doesn't know
    pub fn from_raw(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Preheat),
            1 => Some(Self::WarmupRamp),
            2 => Some(Self::ClosedLoop),
            3 => Some(Self::Stopped),
            4 => Some(Self::NoHeaterSupply),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Preheat => "Preheat",
            Self::WarmupRamp => "WarmupRamp",
            Self::ClosedLoop => "ClosedLoop",
            Self::Stopped => "Stopped",
            Self::NoHeaterSupply => "NoHeaterSupply",
        }
    }
}

/// Sensor fault reported by the fault detector
///
/// Tags 1 and 2 are reserved by the fault detector and have no name here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "rp2040", derive(defmt::Format))]
#[repr(u8)]
pub enum Fault {
    None = 0,
    SensorDidntHeat = 3,
    SensorOverheat = 4,
    SensorUnderheat = 5,
}

impl Fault {
    /// Decode a raw tag; `None` for tags this firmware doesn't know
    pub fn from_raw(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::None),
            3 => Some(Self::SensorDidntHeat),
            4 => Some(Self::SensorOverheat),
            5 => Some(Self::SensorUnderheat),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "OK",
            Self::SensorDidntHeat => "Sensor failed to heat",
            Self::SensorOverheat => "Sensor overheat",
            Self::SensorUnderheat => "Sensor underheat",
        }
    }
}

/// Firmware version printed in the startup banner
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
