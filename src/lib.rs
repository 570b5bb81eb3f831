//! Wideband comms - debug telemetry and tuning-channel bootstrap for RP2040
//!
//! This library provides the communication layer of a wideband lambda
//! controller using the Embassy async framework.
//!
//! ## Responsibilities
//! - **Debug telemetry**: one fixed-format status line per AFR and EGT channel,
//!   written to the debug serial port every report period
//! - **Tuning channels**: primary and optional secondary protocol channels,
//!   each started on its own serial transport and driven by a shared run-loop
//! - **Bootstrap**: build-time configuration decides which tasks are spawned
//!
//! ## Architecture
//! - **Host-testable core**: formatting, reporter, channel setup and the
//!   supervisor only depend on `embedded-io-async` traits
//! - **RP2040 glue**: UART construction, interrupt bindings and Embassy task
//!   wrappers live in [`hardware`] behind the `rp2040` feature

#![cfg_attr(not(test), no_std)]

#[macro_use]
pub mod logging;

pub mod channel;
pub mod config;
pub mod reporter;
pub mod status;
pub mod supervisor;
pub mod telemetry;
pub mod types;

#[cfg(feature = "rp2040")]
pub mod hardware;
