//! # Measurement-cycle monitor
//!
//! This module drives an SHTC sensor through its periodic measurement
//! cycle on top of the [`crate::driver`]: it resolves the device identity
//! once at setup, then runs exactly one measurement per [`update`] call
//! and publishes the decoded values to host-provided sinks.
//!
//! Bus errors during setup permanently disable the monitor, since the
//! device identity must be known to drive it. Bus errors during a
//! measurement cycle are transient instead: they surface as [`f32::NAN`]
//! published to both sinks and a communication warning that clears on the
//! next successful cycle.
//!
//! [`update`]: ShtcxMonitor::update

use core::fmt::Debug;
use core::result::Result::{self, Err, Ok};

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;

use log::{debug, error, info, warn};

use crate::driver::{ADDRESS, DeviceVariant, Shtcx, ShtcxError};

// Update interval recorded for diagnostics when none is configured.
const DEFAULT_UPDATE_INTERVAL_MS: u32 = 60_000;

/// A downstream consumer of measured values.
///
/// A reading that could not be taken is published as [`f32::NAN`].
pub trait Sink {
    /// Hands a measured value to the consumer.
    fn publish(&mut self, value: f32);
}

/// Periodic monitor for an `SHTC1`/`SHTC3` sensor.
///
/// The host calls [`ShtcxMonitor::setup`] once and then
/// [`ShtcxMonitor::update`] on every scheduled tick. Both run on a single
/// logical task; the wait for the sensor's conversion time suspends
/// cooperatively instead of blocking.
pub struct ShtcxMonitor<I2C, D, S>
where
    D: DelayNs,
    S: Sink,
{
    driver: Shtcx<I2C, D>,
    temperature: Option<S>,
    humidity: Option<S>,
    variant: DeviceVariant,
    sensor_id: u16,
    update_interval_ms: u32,
    warning: bool,
    failed: bool,
}

impl<I2C, E, D, S> ShtcxMonitor<I2C, D, S>
where
    I2C: I2c<u8, Error = E>,
    E: Debug,
    D: DelayNs,
    S: Sink,
{
    /// Creates a monitor for the given driver, with no sinks attached.
    #[must_use]
    pub fn new(driver: Shtcx<I2C, D>) -> Self {
        Self {
            driver,
            temperature: None,
            humidity: None,
            variant: DeviceVariant::Unknown,
            sensor_id: 0,
            update_interval_ms: DEFAULT_UPDATE_INTERVAL_MS,
            warning: false,
            failed: false,
        }
    }

    /// Attaches the sink receiving temperature readings.
    #[must_use]
    pub fn with_temperature_sink(mut self, sink: S) -> Self {
        self.temperature = Some(sink);
        self
    }

    /// Attaches the sink receiving humidity readings.
    #[must_use]
    pub fn with_humidity_sink(mut self, sink: S) -> Self {
        self.humidity = Some(sink);
        self
    }

    /// Records the host's update interval for the configuration dump.
    #[must_use]
    pub fn with_update_interval(mut self, interval_ms: u32) -> Self {
        self.update_interval_ms = interval_ms;
        self
    }

    /// Resolves the device identity. Runs once, before any update.
    ///
    /// The device is woken and reset best-effort first; the identification
    /// read that follows must succeed. A failure there leaves the monitor
    /// permanently disabled and every later [`ShtcxMonitor::update`] call
    /// becomes a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the identification register fails on
    /// the bus or its checksum does not validate.
    pub async fn setup(&mut self) -> Result<(), ShtcxError<E>> {
        let _ = self.driver.wake_up().await;
        let _ = self.driver.soft_reset().await;

        match self.driver.device_id().await {
            Ok(id) => {
                self.sensor_id = id;
                self.variant = DeviceVariant::from_id_register(id);
                info!(
                    "device identified: {} (0x{:04X})",
                    self.variant.name(),
                    id
                );

                Ok(())
            }
            Err(e) => {
                report_failure("reading the device ID failed", &e);
                self.failed = true;

                Err(e)
            }
        }
    }

    /// Runs one measurement cycle and publishes the readings.
    ///
    /// A cycle wakes the device if its variant sleeps, starts a
    /// high-precision measurement, suspends for the sensor's conversion
    /// time, reads the result back and returns the device to sleep. Any
    /// failure along the way publishes [`f32::NAN`] to both sinks and
    /// raises the communication warning; the next cycle then starts with a
    /// best-effort soft reset.
    pub async fn update(&mut self) {
        if self.failed {
            return;
        }

        if self.warning {
            warn!("retrying to reconnect the sensor");
            let _ = self.driver.soft_reset().await;
        }

        if self.variant.has_sleep_mode() {
            let _ = self.driver.wake_up().await;
        }

        if let Err(e) = self.driver.start_measurement().await {
            report_failure("sensor polling failed", &e);
            self.publish_readings(f32::NAN, f32::NAN);
            self.warning = true;
            return;
        }

        self.driver.wait_for_measurement().await;
        self.complete_measurement().await;
    }

    /// Logs the monitor configuration and state.
    pub fn dump_config(&self) {
        info!("SHTCx:");
        info!(
            "  model: {} (0x{:04X})",
            self.variant.name(),
            self.sensor_id
        );
        info!("  address: 0x{:02X}", ADDRESS);
        info!("  update interval: {}ms", self.update_interval_ms);
        if self.failed {
            error!("  communication with the sensor failed");
        }
    }

    /// The variant resolved at setup.
    #[must_use]
    pub fn variant(&self) -> DeviceVariant {
        self.variant
    }

    /// The raw identification register value read at setup.
    #[must_use]
    pub fn sensor_id(&self) -> u16 {
        self.sensor_id
    }

    /// Whether the previous cycle ended in a communication warning.
    #[must_use]
    pub fn has_warning(&self) -> bool {
        self.warning
    }

    /// Whether setup failed and the monitor is permanently disabled.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Destroys the monitor and releases the driver.
    #[must_use]
    pub fn release(self) -> Shtcx<I2C, D> {
        self.driver
    }

    // Second phase of a cycle, entered only after a successful poll
    // command: the device is awake and holds a result.
    async fn complete_measurement(&mut self) {
        match self.driver.read_measurement().await {
            Ok(measurement) => {
                debug!(
                    "got temperature={:.2}°C humidity={:.2}%",
                    measurement.temperature, measurement.humidity
                );
                self.publish_readings(measurement.temperature, measurement.humidity);
                self.warning = false;
            }
            Err(e) => {
                report_failure("sensor read failed", &e);
                self.publish_readings(f32::NAN, f32::NAN);
                self.warning = true;
            }
        }

        if self.variant.has_sleep_mode() {
            let _ = self.driver.sleep().await;
        }
    }

    fn publish_readings(&mut self, temperature: f32, humidity: f32) {
        if let Some(sink) = self.temperature.as_mut() {
            sink.publish(temperature);
        }
        if let Some(sink) = self.humidity.as_mut() {
            sink.publish(humidity);
        }
    }
}

fn report_failure<E>(context: &str, error: &ShtcxError<E>)
where
    E: Debug,
{
    match error {
        ShtcxError::Crc { expected, received } => {
            error!(
                "{}: CRC8 checksum invalid, 0x{:02X} != 0x{:02X}",
                context, received, expected
            );
        }
        ShtcxError::I2c(e) => error!("{}: bus error: {:?}", context, e),
    }
}
