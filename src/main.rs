//! Wideband comms firmware entry point
//!
//! Hardware: Raspberry Pi Pico (RP2040)
//! Debug telemetry on UART0, tuning channel on UART1.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};
use panic_halt as _;
use defmt_rtt as _; // global logger
use static_cell::StaticCell;

use wideband_comms::config::board_config;
use wideband_comms::hardware::{BoardLauncher, Uart0Resources, Uart1Resources};
use wideband_comms::supervisor::BootstrapSupervisor;
use wideband_comms::telemetry::BoardTelemetry;

// Published by the lambda, heater and EGT control tasks
static TELEMETRY: StaticCell<BoardTelemetry> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Default::default());
    let telemetry: &'static BoardTelemetry = TELEMETRY.init(BoardTelemetry::new());

    let supervisor = BootstrapSupervisor::new(board_config());
    supervisor.print_startup_banner();

    let mut launcher = BoardLauncher::new(
        spawner,
        telemetry,
        Uart0Resources {
            uart: p.UART0,
            tx: p.PIN_0,
            rx: p.PIN_1,
        },
        Uart1Resources {
            uart: p.UART1,
            tx: p.PIN_4,
            rx: p.PIN_5,
            tx_dma: p.DMA_CH0,
            rx_dma: p.DMA_CH1,
        },
    );

    let report = supervisor.start(&mut launcher);
    info!(
        "Boot complete: {} protocol channel(s) running, report {}",
        report.protocol_channels_started(),
        report
    );

    // Main supervisor loop
    let mut uptime_counter = 0u32;
    loop {
        Timer::after(Duration::from_secs(10)).await;
        uptime_counter += 10;
        debug!("Status: Uptime {} seconds", uptime_counter);
    }
}
