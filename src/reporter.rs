//! Debug telemetry reporter
//!
//! Every report period the reporter snapshots each AFR channel in ascending
//! order, then each EGT channel, and writes one status line per channel to
//! the debug serial port. Output is best-effort: a failed write is counted
//! and the pass carries on with the next line.

use embassy_time::{Duration, Ticker};
use embedded_io_async::Write;

use crate::status::{format_aux_line, format_sensor_line, StatusLine};
use crate::telemetry::TelemetrySource;

/// Waits for the next report period boundary
#[allow(async_fn_in_trait)]
pub trait ReportClock {
    async fn tick(&mut self);
}

impl ReportClock for Ticker {
    async fn tick(&mut self) {
        self.next().await
    }
}

/// Reporter counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReporterStats {
    /// Completed report passes
    pub passes: u32,
    /// Lines handed to the transport, failed ones included
    pub lines: u32,
    /// Lines the transport rejected
    pub write_errors: u32,
}

/// Periodic status-line writer for one debug transport
pub struct TelemetryReporter<S, W> {
    source: S,
    output: W,
    period: Duration,
    stats: ReporterStats,
    failing: bool,
}

impl<S, W> TelemetryReporter<S, W>
where
    S: TelemetrySource,
    W: Write,
{
    pub fn new(source: S, output: W, period: Duration) -> Self {
        Self {
            source,
            output,
            period,
            stats: ReporterStats::default(),
            failing: false,
        }
    }

    pub fn stats(&self) -> ReporterStats {
        self.stats
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Transport the reporter writes to
    pub fn output(&self) -> &W {
        &self.output
    }

    /// One full pass: every AFR line, then every EGT line
    pub async fn report_pass(&mut self) {
        for ch in 0..self.source.sensor_channel_count() {
            let snapshot = self.source.sensor_snapshot(ch);
            let line = format_sensor_line(ch, &snapshot);
            self.emit(&line).await;
        }

        for ch in 0..self.source.aux_channel_count() {
            let reading = self.source.aux_temperature(ch);
            let line = format_aux_line(ch, &reading);
            self.emit(&line).await;
        }

        self.stats.passes = self.stats.passes.wrapping_add(1);
    }

    /// Report forever, one pass per period
    pub async fn run(self) -> ! {
        let ticker = Ticker::every(self.period);
        self.run_with(ticker).await
    }

    /// Report forever, one pass per `clock` tick
    pub async fn run_with<C: ReportClock>(mut self, mut clock: C) -> ! {
        log_info!(
            "Telemetry reporter started: {} AFR + {} EGT channels every {} ms",
            self.source.sensor_channel_count(),
            self.source.aux_channel_count(),
            self.period.as_millis()
        );

        loop {
            self.report_pass().await;
            clock.tick().await;
        }
    }

    async fn emit(&mut self, line: &StatusLine) {
        self.stats.lines = self.stats.lines.wrapping_add(1);

        match self.output.write_all(line.as_bytes()).await {
            Ok(()) => {
                if self.failing {
                    log_info!("Debug serial writes recovered");
                    self.failing = false;
                }
            }
            Err(_) => {
                self.stats.write_errors = self.stats.write_errors.wrapping_add(1);
                if !self.failing {
                    log_warn!("Debug serial write failed; dropping status lines");
                    self.failing = true;
                }
            }
        }
    }
}
