//! `shtcx-sensor` is a library crate that provides an architecture-agnostic
//! driver for the Sensirion `SHTC1`/`SHTC3` temperature and humidity sensor
//! family, together with a polling monitor that publishes measured values to
//! host-provided sinks.
//!
//! The driver is implemented using only the [`embedded-hal-async`] traits,
//! ensuring compatibility with any platform that supports these
//! abstractions.
//!
//! [`embedded-hal-async`]: https://crates.io/crates/embedded-hal-async

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![no_std]

mod crc;

/// The `SHTC1`/`SHTC3` bus driver.
pub mod driver;

/// The measurement-cycle monitor.
pub mod monitor;
