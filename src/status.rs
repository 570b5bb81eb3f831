//! Fixed-format status lines for the debug serial port
//!
//! Lines are built in a stack buffer and follow the legacy layout byte for
//! byte, since log capture tools match on it:
//!
//! ```text
//! [AFR0]: 0.852 DC:  450 mV AC:   12 mV ESR:   300 T:  780 C Ipump:    -42 uA Vheater: 13500 heater: ClosedLoop (48)	fault: OK
//! [EGT0]: 812 C (int 31 C)
//! ```
//!
//! All conversions truncate toward zero, never round. For a negative lambda
//! the fractional part keeps its sign (`-1.25` prints as `-1.-250`, `-0.5`
//! as `0.-500`); this is the legacy output and is reproduced as-is.
//!
//! Non-finite values print a sentinel instead of a number: `-.---` for
//! lambda, `----` (right-aligned to the field width) for everything else.
//! Finite values beyond `i32` saturate.

use core::fmt::{self, Write};

use heapless::String;

use crate::types::{AuxTemperatureSnapshot, ChannelIndex, Fault, HeaterState, SensorSnapshot};

/// Longest possible line (every field saturated) is well under this
pub const STATUS_LINE_CAPACITY: usize = 256;

/// One formatted line, including the trailing `\r\n`
pub type StatusLine = String<STATUS_LINE_CAPACITY>;

/// Printed for unknown heater and fault tags
pub const UNKNOWN_TAG: &str = "Unknown";

const INVALID_FIELD: &str = "----";
const INVALID_LAMBDA: &str = "-.---";

// f32 has no fractional bits at or above 2^23
const LAMBDA_FRACTION_LIMIT: f32 = 8_388_608.0;

/// Display text for a raw heater state tag
pub fn describe_heater_state(tag: u8) -> &'static str {
    HeaterState::from_raw(tag).map_or(UNKNOWN_TAG, HeaterState::as_str)
}

/// Display text for a raw fault tag
pub fn describe_fault(tag: u8) -> &'static str {
    Fault::from_raw(tag).map_or(UNKNOWN_TAG, Fault::as_str)
}

/// Integer and thousandths of a lambda value, both truncated toward zero
///
/// Returns `None` for NaN and infinities.
pub fn lambda_parts(lambda: f32) -> Option<(i32, i32)> {
    if !lambda.is_finite() {
        return None;
    }

    let whole = lambda as i32;
    let thousandths = if lambda.abs() < LAMBDA_FRACTION_LIMIT {
        ((lambda - whole as f32) * 1000.0) as i32
    } else {
        0
    };
    Some((whole, thousandths))
}

/// `value * scale` truncated toward zero, `None` for non-finite input
pub fn scaled(value: f32, scale: f32) -> Option<i32> {
    value.is_finite().then(|| (value * scale) as i32)
}

/// Heater duty as a whole percentage, truncated (0.999 → 99)
pub fn duty_percent(duty: f32) -> Option<i32> {
    scaled(duty, 100.0)
}

/// Numeric field that honours the caller's width, or prints the sentinel
struct Whole {
    value: f32,
    scale: f32,
}

impl Whole {
    fn of(value: f32) -> Self {
        Self { value, scale: 1.0 }
    }

    fn milli(value: f32) -> Self {
        Self {
            value,
            scale: 1000.0,
        }
    }

    fn percent(value: f32) -> Self {
        Self {
            value,
            scale: 100.0,
        }
    }
}

impl fmt::Display for Whole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match scaled(self.value, self.scale) {
            Some(v) => fmt::Display::fmt(&v, f),
            None => write!(f, "{:>width$}", INVALID_FIELD, width = f.width().unwrap_or(0)),
        }
    }
}

struct Lambda(f32);

impl fmt::Display for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match lambda_parts(self.0) {
            Some((whole, thousandths)) => write!(f, "{}.{:03}", whole, thousandths),
            None => f.write_str(INVALID_LAMBDA),
        }
    }
}

/// Status line for one AFR channel
pub fn format_sensor_line(ch: ChannelIndex, s: &SensorSnapshot) -> StatusLine {
    let mut line = StatusLine::new();
    // Cannot overflow: STATUS_LINE_CAPACITY covers every field at i32 width.
    let _ = write!(
        line,
        "[AFR{}]: {} DC: {:4} mV AC: {:4} mV ESR: {:5} T: {:4} C Ipump: {:6} uA Vheater: {:5} heater: {} ({})\tfault: {}\r\n",
        ch,
        Lambda(s.lambda),
        Whole::milli(s.nernst_dc),
        Whole::milli(s.nernst_ac),
        Whole::of(s.internal_resistance),
        Whole::of(s.sensor_temperature),
        Whole::milli(s.pump_current),
        Whole::milli(s.heater_voltage),
        describe_heater_state(s.heater_state),
        Whole::percent(s.heater_duty),
        describe_fault(s.fault),
    );
    line
}

/// Status line for one EGT channel
pub fn format_aux_line(ch: ChannelIndex, s: &AuxTemperatureSnapshot) -> StatusLine {
    let mut line = StatusLine::new();
    let _ = write!(
        line,
        "[EGT{}]: {} C (int {} C)\r\n",
        ch,
        Whole::of(s.temperature),
        Whole::of(s.cold_junction_temperature),
    );
    line
}
