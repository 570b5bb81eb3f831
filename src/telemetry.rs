//! Read-only access to sensor, heater and fault state
//!
//! The lambda, heater and fault subsystems own this state; the comms layer
//! only reads it. [`TelemetrySource`] is the accessor contract and
//! [`SharedTelemetry`] is the store the control tasks publish into.

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::config::{AFR_CHANNELS, EGT_CHANNELS};
use crate::types::{AuxTemperatureSnapshot, ChannelIndex, SensorSnapshot};

/// Per-channel getters consumed by the telemetry reporter
pub trait TelemetrySource {
    /// Number of AFR channels
    fn sensor_channel_count(&self) -> u8;

    fn lambda(&self, ch: ChannelIndex) -> f32;
    fn nernst_dc(&self, ch: ChannelIndex) -> f32;
    fn nernst_ac(&self, ch: ChannelIndex) -> f32;
    fn internal_resistance(&self, ch: ChannelIndex) -> f32;
    fn sensor_temperature(&self, ch: ChannelIndex) -> f32;
    fn pump_current(&self, ch: ChannelIndex) -> f32;
    fn heater_voltage(&self, ch: ChannelIndex) -> f32;
    fn heater_state(&self, ch: ChannelIndex) -> u8;
    fn heater_duty(&self, ch: ChannelIndex) -> f32;
    fn fault(&self, ch: ChannelIndex) -> u8;

    /// Collect every getter for one channel
    ///
    /// Sources that can hand out a consistent copy in one go should
    /// override this.
    fn sensor_snapshot(&self, ch: ChannelIndex) -> SensorSnapshot {
        SensorSnapshot {
            lambda: self.lambda(ch),
            nernst_dc: self.nernst_dc(ch),
            nernst_ac: self.nernst_ac(ch),
            internal_resistance: self.internal_resistance(ch),
            sensor_temperature: self.sensor_temperature(ch),
            pump_current: self.pump_current(ch),
            heater_voltage: self.heater_voltage(ch),
            heater_state: self.heater_state(ch),
            heater_duty: self.heater_duty(ch),
            fault: self.fault(ch),
        }
    }

    /// Number of EGT channels, zero when the board has none
    fn aux_channel_count(&self) -> u8 {
        0
    }

    fn aux_temperature(&self, _ch: ChannelIndex) -> AuxTemperatureSnapshot {
        AuxTemperatureSnapshot::IDLE
    }
}

impl<T: TelemetrySource + ?Sized> TelemetrySource for &T {
    fn sensor_channel_count(&self) -> u8 {
        (**self).sensor_channel_count()
    }
    fn lambda(&self, ch: ChannelIndex) -> f32 {
        (**self).lambda(ch)
    }
    fn nernst_dc(&self, ch: ChannelIndex) -> f32 {
        (**self).nernst_dc(ch)
    }
    fn nernst_ac(&self, ch: ChannelIndex) -> f32 {
        (**self).nernst_ac(ch)
    }
    fn internal_resistance(&self, ch: ChannelIndex) -> f32 {
        (**self).internal_resistance(ch)
    }
    fn sensor_temperature(&self, ch: ChannelIndex) -> f32 {
        (**self).sensor_temperature(ch)
    }
    fn pump_current(&self, ch: ChannelIndex) -> f32 {
        (**self).pump_current(ch)
    }
    fn heater_voltage(&self, ch: ChannelIndex) -> f32 {
        (**self).heater_voltage(ch)
    }
    fn heater_state(&self, ch: ChannelIndex) -> u8 {
        (**self).heater_state(ch)
    }
    fn heater_duty(&self, ch: ChannelIndex) -> f32 {
        (**self).heater_duty(ch)
    }
    fn fault(&self, ch: ChannelIndex) -> u8 {
        (**self).fault(ch)
    }
    fn sensor_snapshot(&self, ch: ChannelIndex) -> SensorSnapshot {
        (**self).sensor_snapshot(ch)
    }
    fn aux_channel_count(&self) -> u8 {
        (**self).aux_channel_count()
    }
    fn aux_temperature(&self, ch: ChannelIndex) -> AuxTemperatureSnapshot {
        (**self).aux_temperature(ch)
    }
}

/// Latest published state of every channel
///
/// Writers replace a whole channel record under a critical section, so a
/// reader never sees half of one update.
pub struct SharedTelemetry<const AFR: usize, const EGT: usize> {
    sensors: Mutex<CriticalSectionRawMutex, Cell<[SensorSnapshot; AFR]>>,
    aux: Mutex<CriticalSectionRawMutex, Cell<[AuxTemperatureSnapshot; EGT]>>,
}

/// Store sized for this board
pub type BoardTelemetry = SharedTelemetry<AFR_CHANNELS, EGT_CHANNELS>;

impl<const AFR: usize, const EGT: usize> SharedTelemetry<AFR, EGT> {
    pub const fn new() -> Self {
        Self {
            sensors: Mutex::new(Cell::new([SensorSnapshot::IDLE; AFR])),
            aux: Mutex::new(Cell::new([AuxTemperatureSnapshot::IDLE; EGT])),
        }
    }

    /// Replace the record of one AFR channel; `false` if `ch` is out of range
    pub fn publish_sensor(&self, ch: ChannelIndex, snapshot: SensorSnapshot) -> bool {
        let index = usize::from(ch);
        if index >= AFR {
            return false;
        }
        self.sensors.lock(|cell| {
            let mut all = cell.get();
            all[index] = snapshot;
            cell.set(all);
        });
        true
    }

    /// Replace the record of one EGT channel; `false` if `ch` is out of range
    pub fn publish_aux(&self, ch: ChannelIndex, snapshot: AuxTemperatureSnapshot) -> bool {
        let index = usize::from(ch);
        if index >= EGT {
            return false;
        }
        self.aux.lock(|cell| {
            let mut all = cell.get();
            all[index] = snapshot;
            cell.set(all);
        });
        true
    }
}

impl<const AFR: usize, const EGT: usize> Default for SharedTelemetry<AFR, EGT> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const AFR: usize, const EGT: usize> TelemetrySource for SharedTelemetry<AFR, EGT> {
    fn sensor_channel_count(&self) -> u8 {
        AFR.min(u8::MAX as usize) as u8
    }

    fn lambda(&self, ch: ChannelIndex) -> f32 {
        self.sensor_snapshot(ch).lambda
    }

    fn nernst_dc(&self, ch: ChannelIndex) -> f32 {
        self.sensor_snapshot(ch).nernst_dc
    }

    fn nernst_ac(&self, ch: ChannelIndex) -> f32 {
        self.sensor_snapshot(ch).nernst_ac
    }

    fn internal_resistance(&self, ch: ChannelIndex) -> f32 {
        self.sensor_snapshot(ch).internal_resistance
    }

    fn sensor_temperature(&self, ch: ChannelIndex) -> f32 {
        self.sensor_snapshot(ch).sensor_temperature
    }

    fn pump_current(&self, ch: ChannelIndex) -> f32 {
        self.sensor_snapshot(ch).pump_current
    }

    fn heater_voltage(&self, ch: ChannelIndex) -> f32 {
        self.sensor_snapshot(ch).heater_voltage
    }

    fn heater_state(&self, ch: ChannelIndex) -> u8 {
        self.sensor_snapshot(ch).heater_state
    }

    fn heater_duty(&self, ch: ChannelIndex) -> f32 {
        self.sensor_snapshot(ch).heater_duty
    }

    fn fault(&self, ch: ChannelIndex) -> u8 {
        self.sensor_snapshot(ch).fault
    }

    fn sensor_snapshot(&self, ch: ChannelIndex) -> SensorSnapshot {
        self.sensors.lock(|cell| {
            cell.get()
                .get(usize::from(ch))
                .copied()
                .unwrap_or(SensorSnapshot::IDLE)
        })
    }

    fn aux_channel_count(&self) -> u8 {
        EGT.min(u8::MAX as usize) as u8
    }

    fn aux_temperature(&self, ch: ChannelIndex) -> AuxTemperatureSnapshot {
        self.aux.lock(|cell| {
            cell.get()
                .get(usize::from(ch))
                .copied()
                .unwrap_or(AuxTemperatureSnapshot::IDLE)
        })
    }
}
