//! # SHTC1/SHTC3 Driver
//!
//! This module provides an asynchronous, architecture-agnostic driver for
//! the Sensirion `SHTC1` and `SHTC3` temperature and humidity sensors,
//! covering the command set shared by the family: sleep, wake-up, soft
//! reset, identification-register read-out and high-precision measurement.
//!
//! Both sensors answer at the same fixed I²C address and frame their data
//! as big-endian 16-bit words, each followed by an 8-bit CRC.
//!
//! For detailed information and specifications, see the
//! [SHTC3 datasheet](https://sensirion.com/media/documents/643F9C8E/63A5A569/Datasheet_SHTC3.pdf)
//! and the [SHTC1 datasheet](https://sensirion.com/media/documents/BD45ECB5/61642783/Sensirion_Humidity_Sensors_SHTC1_Datasheet.pdf).

use core::result::Result::{self, Err, Ok};

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;

use crate::crc::crc8;

/// I²C address shared by the whole SHTC family.
pub const ADDRESS: u8 = 0x70;

// 16-bit command codes, transmitted most significant byte first.
const COMMAND_SLEEP: u16 = 0xB098;
const COMMAND_WAKE_UP: u16 = 0x3517;
const COMMAND_READ_ID_REGISTER: u16 = 0xEFC8;
const COMMAND_SOFT_RESET: u16 = 0x805D;
const COMMAND_MEASURE_HIGH_PRECISION: u16 = 0x7866;

/// Conversion time of a high-precision measurement in milliseconds.
///
/// The interval between starting a measurement and reading out its result;
/// the sensor tolerates an arbitrarily longer wait.
pub const MEASUREMENT_DELAY_MS: u32 = 50;

// Settling time after a wake-up or soft-reset command.
const SETTLE_DELAY_US: u32 = 200;

/// Errors that may occur while interacting with an SHTC sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShtcxError<E> {
    /// I²C bus error.
    I2c(E),
    /// A received data word did not match its checksum byte.
    ///
    /// The whole read is discarded when any word of the frame fails
    /// validation.
    Crc {
        /// Checksum computed over the received word.
        expected: u8,
        /// Checksum byte the sensor transmitted.
        received: u8,
    },
}

impl<E> From<E> for ShtcxError<E> {
    fn from(e: E) -> Self {
        ShtcxError::I2c(e)
    }
}

/// The sensor model, resolved from the on-device identification register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceVariant {
    /// First-generation `SHTC1`; always powered, no sleep/wake commands.
    Shtc1,
    /// `SHTC3` with explicit low-power management.
    Shtc3,
    /// The identification register did not match a known SHTC product code.
    Unknown,
}

impl DeviceVariant {
    /// Decodes the variant from a raw 16-bit identification register value.
    ///
    /// The low 6 bits carry the product code 0x07 shared by the family,
    /// and bit 11 distinguishes the `SHTC3` from the `SHTC1`. Any other
    /// pattern resolves to [`DeviceVariant::Unknown`].
    #[must_use]
    pub const fn from_id_register(id: u16) -> Self {
        if id & 0x3F == 0x07 {
            if id & 0x0800 != 0 {
                Self::Shtc3
            } else {
                Self::Shtc1
            }
        } else {
            Self::Unknown
        }
    }

    /// Whether the device manages a low-power state through the sleep and
    /// wake-up commands.
    ///
    /// The `SHTC1` is always powered. Unidentified devices are assumed to
    /// support sleep mode and are driven like an `SHTC3`.
    #[must_use]
    pub const fn has_sleep_mode(self) -> bool {
        !matches!(self, Self::Shtc1)
    }

    /// The model label used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Shtc1 => "SHTC1",
            Self::Shtc3 => "SHTC3",
            Self::Unknown => "unknown model",
        }
    }
}

/// A single temperature and humidity measurement.
#[derive(Debug, Clone, Copy)]
pub struct Measurement {
    /// Temperature in degrees Celsius (°C).
    pub temperature: f32,
    /// Relative humidity as a percentage (% RH).
    pub humidity: f32,
}

impl Measurement {
    #[inline]
    fn from_raw(raw_temperature: u16, raw_humidity: u16) -> Self {
        Self {
            temperature: decode_temperature(raw_temperature),
            humidity: decode_humidity(raw_humidity),
        }
    }
}

#[inline]
fn decode_temperature(raw: u16) -> f32 {
    // Conversion formula from the datasheet, temperature transmitted first.
    175.0 * f32::from(raw) / 65536.0 - 45.0
}

#[inline]
fn decode_humidity(raw: u16) -> f32 {
    100.0 * f32::from(raw) / 65536.0
}

/// The SHTC driver.
pub struct Shtcx<I2C, D>
where
    D: DelayNs,
{
    i2c: I2C,
    delay: D,
}

impl<I2C, E, D> Shtcx<I2C, D>
where
    I2C: I2c<u8, Error = E>,
    D: DelayNs,
{
    /// Creates a [`Shtcx`] driver with the given I²C bus and delay provider.
    #[must_use]
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self { i2c, delay }
    }

    /// Wakes the device from sleep mode and waits for it to settle.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying I²C bus operation fails.
    pub async fn wake_up(&mut self) -> Result<(), ShtcxError<E>> {
        self.send_command(COMMAND_WAKE_UP).await?;
        self.delay.delay_us(SETTLE_DELAY_US).await;

        Ok(())
    }

    /// Resets the device to its power-up state and waits for it to settle.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying I²C bus operation fails.
    pub async fn soft_reset(&mut self) -> Result<(), ShtcxError<E>> {
        self.send_command(COMMAND_SOFT_RESET).await?;
        self.delay.delay_us(SETTLE_DELAY_US).await;

        Ok(())
    }

    /// Puts the device into low-power sleep mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying I²C bus operation fails.
    pub async fn sleep(&mut self) -> Result<(), ShtcxError<E>> {
        self.send_command(COMMAND_SLEEP).await
    }

    /// Reads the raw 16-bit identification register.
    ///
    /// Decode it with [`DeviceVariant::from_id_register`].
    ///
    /// # Errors
    ///
    /// Returns an error if communication over I²C fails or the received
    /// word fails checksum validation.
    pub async fn device_id(&mut self) -> Result<u16, ShtcxError<E>> {
        self.send_command(COMMAND_READ_ID_REGISTER).await?;

        let mut words = [0u16; 1];
        self.read_words(&mut words).await?;

        Ok(words[0])
    }

    /// Starts a high-precision measurement.
    ///
    /// The result becomes available after [`MEASUREMENT_DELAY_MS`] and is
    /// collected with [`Shtcx::read_measurement`].
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying I²C bus operation fails.
    pub async fn start_measurement(&mut self) -> Result<(), ShtcxError<E>> {
        self.send_command(COMMAND_MEASURE_HIGH_PRECISION).await
    }

    /// Waits out the sensor's measurement conversion time.
    pub async fn wait_for_measurement(&mut self) {
        self.delay.delay_ms(MEASUREMENT_DELAY_MS).await;
    }

    /// Reads out a previously started measurement.
    ///
    /// # Errors
    ///
    /// Returns an error if communication over I²C fails or any received
    /// word fails checksum validation.
    pub async fn read_measurement(&mut self) -> Result<Measurement, ShtcxError<E>> {
        let mut words = [0u16; 2];
        self.read_words(&mut words).await?;

        Ok(Measurement::from_raw(words[0], words[1]))
    }

    /// Performs a complete high-precision measurement, waiting for the
    /// sensor's conversion time in between.
    ///
    /// The device must be awake. Power management around the measurement
    /// is left to the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if communication over I²C fails or any received
    /// word fails checksum validation.
    pub async fn measure(&mut self) -> Result<Measurement, ShtcxError<E>> {
        self.start_measurement().await?;
        self.wait_for_measurement().await;
        self.read_measurement().await
    }

    /// Destroys the driver and releases the I²C bus.
    #[must_use]
    pub fn release(self) -> I2C {
        self.i2c
    }

    async fn send_command(&mut self, command: u16) -> Result<(), ShtcxError<E>> {
        // The high byte addresses the command register, the low byte is
        // its payload.
        self.i2c.write(ADDRESS, &command.to_be_bytes()).await?;

        Ok(())
    }

    async fn read_words(&mut self, words: &mut [u16]) -> Result<(), ShtcxError<E>> {
        // Each word travels as (high, low, crc). Two words is the longest
        // frame the command set produces.
        let mut buf = [0u8; 6];
        let frame = &mut buf[..3 * words.len()];

        self.i2c.read(ADDRESS, frame).await?;

        for (word, chunk) in words.iter_mut().zip(frame.chunks_exact(3)) {
            let expected = crc8(&chunk[..2]);
            if expected != chunk[2] {
                return Err(ShtcxError::Crc {
                    expected,
                    received: chunk[2],
                });
            }
            *word = u16::from_be_bytes([chunk[0], chunk[1]]);
        }

        Ok(())
    }
}
