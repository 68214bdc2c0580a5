//! Asynchronous driver for SCL3300 inclinometer

use embedded_hal_async::{delay::DelayNs, spi::SpiDevice};

use crate::{
    calibration::{AngleAccumulator, CalibrationOffsets, CalibrationProgress, ReadingAccumulator},
    config::Config,
    error::Error,
    filter::ReadingFilter,
    frame,
    measurement::{Acceleration, Angles, Reading, angle_from_raw, temperature_from_raw},
    register::{Bank, Command, Response},
    status::{ErrorFlags, Status, WhoAmI},
};

/// Lifecycle of the device context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceState {
    /// Not initialized yet, or powered down
    NotInitialized,
    /// Start-up handshake in progress
    Initializing,
    /// Handshake accepted, offsets not measured yet
    Calibrating,
    /// Calibrated, readings are available
    Ready,
    /// Last handshake failed
    Fault,
}

/// SCL3300 driver instance (asynchronous)
///
/// Owns the bus, the delay provider and the whole device context: the
/// lifecycle state, the calibration offsets and the output filters.
#[derive(Debug)]
pub struct Scl3300<SPI, D> {
    spi: SPI,
    delay: D,
    config: Config,
    state: DeviceState,
    offsets: CalibrationOffsets,
    filter: Option<ReadingFilter>,
}

impl<SPI, D, E> Scl3300<SPI, D>
where
    SPI: SpiDevice<u8, Error = E>,
    D: DelayNs,
{
    /// Create a new SCL3300 driver instance with the default configuration
    pub fn new(spi: SPI, delay: D) -> Self {
        Self::with_config(spi, delay, Config::default())
    }

    /// Create a new SCL3300 driver instance
    pub fn with_config(spi: SPI, delay: D, config: Config) -> Self {
        Self {
            spi,
            delay,
            config,
            state: DeviceState::NotInitialized,
            offsets: CalibrationOffsets::default(),
            filter: None,
        }
    }

    /// Release the SPI bus and the delay, consuming the driver
    pub fn release(self) -> (SPI, D) {
        (self.spi, self.delay)
    }

    /// Current lifecycle state
    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Offsets of the last successful calibration
    pub fn offsets(&self) -> CalibrationOffsets {
        self.offsets
    }

    /// Output filters, created by the first [`Self::sample_filtered`]
    pub fn filter(&self) -> Option<&ReadingFilter> {
        self.filter.as_ref()
    }

    /// One full-duplex frame exchange followed by the frame settle time
    async fn exchange(&mut self, frame: u32) -> Result<u32, Error<E>> {
        #[cfg(feature = "defmt")]
        defmt::trace!("TX 0x{:08X}", frame);

        let tx = frame.to_be_bytes();
        let mut rx = [0u8; 4];
        self.spi
            .transfer(&mut rx, &tx)
            .await
            .map_err(Error::Communication)?;
        self.delay.delay_us(self.config.frame_delay_us).await;

        let reply = u32::from_be_bytes(rx);

        #[cfg(feature = "defmt")]
        defmt::trace!("RX 0x{:08X}", reply);

        Ok(reply)
    }

    /// Send a command frame, discarding whatever the device clocks out
    ///
    /// This talks to the bus directly and ignores the device state.
    ///
    /// # Errors
    ///
    /// Returns an error if SPI communication fails
    pub async fn write_command(&mut self, command: Command) -> Result<(), Error<E>> {
        #[cfg(feature = "defmt")]
        defmt::debug!("Command {}", command);

        self.exchange(command.frame()).await?;
        Ok(())
    }

    /// Read a register
    ///
    /// The SCL3300 answers one frame late:
    /// - Exchange 1: Send read command, ignore response
    /// - Exchange 2: Send read command again, receive actual data
    ///
    /// A failed read is retried [`Config::read_retries`] times. This talks
    /// to the bus directly and ignores the device state.
    ///
    /// # Errors
    ///
    /// Returns an error if SPI communication fails or the CRC of the reply
    /// does not match
    pub async fn read_register(&mut self, command: Command) -> Result<Response, Error<E>> {
        let mut attempt = 0;
        loop {
            match self.read_register_once(command).await {
                Err(_) if attempt < self.config.read_retries => {
                    attempt += 1;
                    #[cfg(feature = "defmt")]
                    defmt::debug!("Retrying {} (attempt {})", command, attempt);
                }
                result => return result,
            }
        }
    }

    async fn read_register_once(&mut self, command: Command) -> Result<Response, Error<E>> {
        let request = command.frame();

        self.exchange(request).await?;
        let reply = self.exchange(request).await?;

        if let Err(err) = frame::validate(reply) {
            #[cfg(feature = "defmt")]
            defmt::warn!("CRC error in response to {}: 0x{:08X}", command, reply);
            return Err(err.into());
        }

        let response = Response(reply);
        #[cfg(feature = "defmt")]
        defmt::debug!("{} value: 0x{:04X}", command, response.data());

        Ok(response)
    }

    /// Read several registers back to back
    ///
    /// Every register is read even if an earlier reply fails its CRC, so a
    /// sample always costs the same number of frames. A communication error
    /// aborts immediately.
    async fn read_set<const N: usize>(
        &mut self,
        commands: [Command; N],
    ) -> Result<[Response; N], Error<E>> {
        let mut responses = [Response(0); N];
        let mut rejected = None;

        for (command, response) in commands.into_iter().zip(responses.iter_mut()) {
            match self.read_register(command).await {
                Ok(r) => *response = r,
                Err(Error::Checksum(err)) => {
                    rejected.get_or_insert(err);
                }
                Err(e) => return Err(e),
            }
        }

        match rejected {
            Some(err) => Err(Error::Checksum(err)),
            None => Ok(responses),
        }
    }

    async fn read_angles(&mut self) -> Result<Angles, Error<E>> {
        let [x, y, z] = self
            .read_set([Command::ReadAngX, Command::ReadAngY, Command::ReadAngZ])
            .await?;

        Ok(Angles {
            x: angle_from_raw(x.data_signed()),
            y: angle_from_raw(y.data_signed()),
            z: angle_from_raw(z.data_signed()),
        })
    }

    async fn read_reading(&mut self) -> Result<Reading, Error<E>> {
        let [x, y, z, t] = self
            .read_set([
                Command::ReadAngX,
                Command::ReadAngY,
                Command::ReadAngZ,
                Command::ReadTemperature,
            ])
            .await?;

        Ok(Reading {
            x: angle_from_raw(x.data_signed()),
            y: angle_from_raw(y.data_signed()),
            z: angle_from_raw(z.data_signed()),
            temperature: temperature_from_raw(t.data_signed()),
        })
    }

    fn ensure_ready(&self) -> Result<(), Error<E>> {
        match self.state {
            DeviceState::Ready => Ok(()),
            state => Err(Error::InvalidState(state)),
        }
    }

    /// Run the start-up handshake
    ///
    /// Wakes and resets the device, selects the configured mode, enables the
    /// angle outputs and bank 0, then checks the return status and the
    /// component identification. Every step runs once; the first failure
    /// aborts the attempt and leaves the device in [`DeviceState::Fault`].
    /// On success the device waits in [`DeviceState::Calibrating`].
    ///
    /// # Errors
    ///
    /// Returns an error if SPI communication fails, a reply fails its CRC,
    /// or the device is not in normal operation or does not identify as an
    /// SCL3300
    pub async fn init(&mut self) -> Result<(), Error<E>> {
        self.state = DeviceState::Initializing;

        match self.handshake().await {
            Ok(()) => {
                #[cfg(feature = "defmt")]
                defmt::info!("SCL3300 initialized");
                self.state = DeviceState::Calibrating;
                Ok(())
            }
            Err(e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("SCL3300 initialization failed");
                self.state = DeviceState::Fault;
                Err(e)
            }
        }
    }

    /// Run [`Self::init`] up to `tries` times, restarting the whole handshake
    ///
    /// At least one attempt is made, so `0` behaves like `1`.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt
    pub async fn init_with_retry(&mut self, tries: u8) -> Result<(), Error<E>> {
        let tries = tries.max(1);
        let mut attempt = 1;
        loop {
            match self.init().await {
                Err(e) if attempt >= tries => return Err(e),
                Err(_) => attempt += 1,
                Ok(()) => return Ok(()),
            }
        }
    }

    async fn handshake(&mut self) -> Result<(), Error<E>> {
        let Config {
            mode,
            startup_delay_ms,
            wake_delay_ms,
            reset_delay_ms,
            command_delay_ms,
            ..
        } = self.config;

        self.delay.delay_ms(startup_delay_ms).await;

        self.write_command(Command::WAKE_UP).await?;
        self.delay.delay_ms(wake_delay_ms).await;

        self.write_command(Command::SwReset).await?;
        self.delay.delay_ms(reset_delay_ms).await;

        for command in [
            mode.command(),
            Command::EnableAngleOutputs,
            Bank::Bank0.command(),
        ] {
            self.write_command(command).await?;
            self.delay.delay_ms(command_delay_ms).await;
        }

        let status = Status::from(self.read_register(Command::ReadStatusSummary).await?);
        let whoami = WhoAmI::from(self.read_register(Command::ReadWhoAmI).await?);

        #[cfg(feature = "defmt")]
        defmt::debug!("Status: {}, WHOAMI: 0x{:02X}", status, whoami.raw());

        if !status.is_normal() || !whoami.is_expected() {
            #[cfg(feature = "defmt")]
            defmt::warn!("Handshake rejected: {} / 0x{:02X}", status.run_state(), whoami.raw());
            return Err(Error::Handshake {
                run_state: status.run_state(),
                whoami,
            });
        }

        Ok(())
    }

    /// Measure the angle offsets over `samples` samples
    ///
    /// See [`Self::calibrate_with_progress`].
    ///
    /// # Errors
    ///
    /// Returns an error if the device state forbids calibration, SPI
    /// communication fails, or no sample passes its CRC
    pub async fn calibrate(&mut self, samples: usize) -> Result<CalibrationOffsets, Error<E>> {
        self.calibrate_with_progress(samples, |_| {}).await
    }

    /// Measure the angle offsets over `samples` samples
    ///
    /// Allowed after a successful [`Self::init`] or to recalibrate a ready
    /// device. Each sample reads the three angles and waits
    /// [`Config::calibration_interval_ms`]. A read with a CRC error is
    /// skipped and left out of the mean of its axis only. `on_progress` is
    /// called after every sample. On success the device becomes
    /// [`DeviceState::Ready`]; on failure it stays in
    /// [`DeviceState::Calibrating`].
    ///
    /// The first calibration also creates the output filters, seeded with
    /// the last calibration sample and one temperature read.
    ///
    /// # Errors
    ///
    /// Returns an error if the device state forbids calibration, SPI
    /// communication fails, or no sample passes its CRC
    pub async fn calibrate_with_progress<F>(
        &mut self,
        samples: usize,
        mut on_progress: F,
    ) -> Result<CalibrationOffsets, Error<E>>
    where
        F: FnMut(&CalibrationProgress),
    {
        match self.state {
            DeviceState::Calibrating | DeviceState::Ready => {}
            state => return Err(Error::InvalidState(state)),
        }
        self.state = DeviceState::Calibrating;

        let mut accumulator = AngleAccumulator::default();
        for index in 0..samples {
            for (command, axis) in [
                (Command::ReadAngX, &mut accumulator.x),
                (Command::ReadAngY, &mut accumulator.y),
                (Command::ReadAngZ, &mut accumulator.z),
            ] {
                if let Some(response) = skip_invalid(self.read_register(command).await)? {
                    axis.add(angle_from_raw(response.data_signed()));
                }
            }

            on_progress(&CalibrationProgress {
                index,
                total: samples,
                valid: accumulator.count(),
                partial: accumulator.mean(),
            });

            self.delay
                .delay_ms(self.config.calibration_interval_ms)
                .await;
        }

        let offsets = accumulator.mean().ok_or(Error::NoValidSamples)?;

        if self.filter.is_none() {
            if let Some(last) = accumulator.last() {
                self.filter = self.seed_filter(&last, &offsets).await?;
            }
        }

        #[cfg(feature = "defmt")]
        defmt::info!(
            "Offsets X: {} Y: {} Z: {} ({} of {} samples)",
            offsets.x,
            offsets.y,
            offsets.z,
            accumulator.count(),
            samples
        );

        self.offsets = offsets;
        self.state = DeviceState::Ready;
        Ok(offsets)
    }

    /// Create the output filters from the last calibration sample
    ///
    /// Calibration reads no temperature, so one temperature read supplies
    /// that seed. A CRC failure there leaves the filters to
    /// [`Self::sample_filtered`].
    async fn seed_filter(
        &mut self,
        last: &Angles,
        offsets: &CalibrationOffsets,
    ) -> Result<Option<ReadingFilter>, Error<E>> {
        let Some(response) = skip_invalid(self.read_register(Command::ReadTemperature).await)?
        else {
            return Ok(None);
        };

        let seed = offsets.apply(&Reading {
            x: last.x,
            y: last.y,
            z: last.z,
            temperature: temperature_from_raw(response.data_signed()),
        });

        #[cfg(feature = "defmt")]
        defmt::debug!("Filters seeded with {}", seed);

        Ok(Some(ReadingFilter::new(self.config.filter, &seed)))
    }

    /// Install previously measured offsets instead of calibrating
    ///
    /// # Errors
    ///
    /// Returns an error unless the device is calibrating or ready
    pub fn set_offsets(&mut self, offsets: CalibrationOffsets) -> Result<(), Error<E>> {
        match self.state {
            DeviceState::Calibrating | DeviceState::Ready => {
                self.offsets = offsets;
                self.state = DeviceState::Ready;
                Ok(())
            }
            state => Err(Error::InvalidState(state)),
        }
    }

    /// Read the offset corrected angles and the temperature
    ///
    /// # Errors
    ///
    /// Returns an error if the device is not ready, SPI communication fails
    /// or any reply fails its CRC
    pub async fn sample(&mut self) -> Result<Reading, Error<E>> {
        self.ensure_ready()?;
        let reading = self.read_reading().await?;
        Ok(self.offsets.apply(&reading))
    }

    /// Read one sample and pass it through the output filters
    ///
    /// The filters are created by the first calibration. If they do not
    /// exist yet (offsets installed with [`Self::set_offsets`]), the first
    /// successful call creates them seeded with its sample and returns that
    /// sample unchanged. The filters are only updated when all four
    /// registers were read successfully.
    ///
    /// # Errors
    ///
    /// Returns an error if the device is not ready, SPI communication fails
    /// or any reply fails its CRC
    pub async fn sample_filtered(&mut self) -> Result<Reading, Error<E>> {
        let reading = self.sample().await?;

        if let Some(filter) = self.filter.as_mut() {
            return Ok(filter.update(&reading));
        }

        self.filter = Some(ReadingFilter::new(self.config.filter, &reading));
        Ok(reading)
    }

    /// Average `samples` offset corrected samples
    ///
    /// Samples with a CRC error are skipped. Waits
    /// [`Config::average_interval_ms`] after each sample.
    ///
    /// # Errors
    ///
    /// Returns an error if the device is not ready, SPI communication fails
    /// or no sample passes its CRC
    pub async fn read_average(&mut self, samples: usize) -> Result<Reading, Error<E>> {
        self.ensure_ready()?;

        let mut accumulator = ReadingAccumulator::default();
        for _ in 0..samples {
            if let Some(reading) = skip_invalid(self.read_reading().await)? {
                accumulator.add(&self.offsets.apply(&reading));
            }
            self.delay.delay_ms(self.config.average_interval_ms).await;
        }

        accumulator.mean().ok_or(Error::NoValidSamples)
    }

    /// Get the offset corrected angles in degrees
    ///
    /// # Errors
    ///
    /// Returns an error if the device is not ready, SPI communication fails
    /// or any reply fails its CRC
    pub async fn angles(&mut self) -> Result<Angles, Error<E>> {
        self.ensure_ready()?;
        let angles = self.read_angles().await?;
        Ok(Angles {
            x: angles.x - self.offsets.x,
            y: angles.y - self.offsets.y,
            z: angles.z - self.offsets.z,
        })
    }

    /// Get the temperature in °C
    ///
    /// # Errors
    ///
    /// Returns an error if the device is not ready, SPI communication fails
    /// or the reply fails its CRC
    pub async fn temperature(&mut self) -> Result<f32, Error<E>> {
        self.ensure_ready()?;
        let response = self.read_register(Command::ReadTemperature).await?;
        Ok(temperature_from_raw(response.data_signed()))
    }

    /// Get the acceleration in g, scaled for the configured mode
    ///
    /// # Errors
    ///
    /// Returns an error if the device is not ready, SPI communication fails
    /// or any reply fails its CRC
    pub async fn acceleration(&mut self) -> Result<Acceleration, Error<E>> {
        self.ensure_ready()?;
        let [x, y, z] = self
            .read_set([Command::ReadAccX, Command::ReadAccY, Command::ReadAccZ])
            .await?;

        let sensitivity = self.config.mode.sensitivity();
        Ok(Acceleration {
            x: f32::from(x.data_signed()) / sensitivity,
            y: f32::from(y.data_signed()) / sensitivity,
            z: f32::from(z.data_signed()) / sensitivity,
        })
    }

    /// Get the status summary
    ///
    /// # Errors
    ///
    /// Returns an error if the device is not ready, SPI communication fails
    /// or the reply fails its CRC
    pub async fn status(&mut self) -> Result<Status, Error<E>> {
        self.ensure_ready()?;
        self.read_register(Command::ReadStatusSummary)
            .await
            .map(Status::from)
    }

    /// Get the component identification
    ///
    /// # Errors
    ///
    /// Returns an error if the device is not ready, SPI communication fails
    /// or the reply fails its CRC
    pub async fn whoami(&mut self) -> Result<WhoAmI, Error<E>> {
        self.ensure_ready()?;
        self.read_register(Command::ReadWhoAmI).await.map(WhoAmI::from)
    }

    /// Get the active register bank
    ///
    /// # Errors
    ///
    /// Returns an error if the device is not ready, SPI communication fails
    /// or the reply fails its CRC
    pub async fn current_bank(&mut self) -> Result<Bank, Error<E>> {
        self.ensure_ready()?;
        self.read_register(Command::ReadCurrentBank)
            .await
            .map(|r| Bank::from(r.data()))
    }

    /// Get both error flag registers
    ///
    /// # Errors
    ///
    /// Returns an error if the device is not ready, SPI communication fails
    /// or any reply fails its CRC
    pub async fn error_flags(&mut self) -> Result<ErrorFlags, Error<E>> {
        self.ensure_ready()?;
        let [flag1, flag2] = self
            .read_set([Command::ReadErrFlag1, Command::ReadErrFlag2])
            .await?;

        Ok(ErrorFlags {
            flag1: flag1.data(),
            flag2: flag2.data(),
        })
    }

    /// Get the raw self-test output
    ///
    /// # Errors
    ///
    /// Returns an error if the device is not ready, SPI communication fails
    /// or the reply fails its CRC
    pub async fn self_test_output(&mut self) -> Result<i16, Error<E>> {
        self.ensure_ready()?;
        self.read_register(Command::ReadSto)
            .await
            .map(|r| r.data_signed())
    }

    /// Get the serial number
    ///
    /// The serial number lives in bank 1; the driver switches there and
    /// back to bank 0, also when a read fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the device is not ready, SPI communication fails
    /// or any reply fails its CRC
    pub async fn serial_number(&mut self) -> Result<u32, Error<E>> {
        self.ensure_ready()?;

        self.write_command(Bank::Bank1.command()).await?;
        let words = self
            .read_set([Command::ReadSerial1, Command::ReadSerial2])
            .await;
        self.write_command(Bank::Bank0.command()).await?;

        let [low, high] = words?;
        Ok((u32::from(high.data()) << 16) | u32::from(low.data()))
    }

    /// Put the device into power down mode
    ///
    /// The device has to go through [`Self::init`] again afterwards. The
    /// offsets and filters are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if SPI communication fails
    pub async fn power_down(&mut self) -> Result<(), Error<E>> {
        self.write_command(Command::PowerDown).await?;
        self.state = DeviceState::NotInitialized;
        Ok(())
    }
}

/// Turn a CRC failure into a skipped read
fn skip_invalid<T, E>(result: Result<T, Error<E>>) -> Result<Option<T>, Error<E>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(Error::Checksum(_)) => {
            #[cfg(feature = "defmt")]
            defmt::warn!("Skipping read with CRC error");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
