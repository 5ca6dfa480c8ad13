//! # Raspberry Pi Transport
//!
//! [`Transport`] over the Raspberry Pi SPI controller and GPIO header, using rppal.
//! Works on the Pi 4 (BCM2711) and Pi 5 (BCM2712).
//!
//! ## Hardware Setup
//!
//! SPI must be enabled in `/boot/config.txt` (`dtparam=spi=on`).
//!
//! ```text
//! Pi Pin │ BCM GPIO │ SX1280 Pin │ Function
//! ───────┼──────────┼────────────┼─────────────
//! 19     │ GPIO 10  │ MOSI       │ SPI data out
//! 21     │ GPIO 9   │ MISO       │ SPI data in
//! 23     │ GPIO 11  │ SCK        │ SPI clock
//! 24     │ GPIO 8   │ NSS        │ Chip select (CE0)
//! 18     │ GPIO 24  │ BUSY       │ Status (input)
//! 22     │ GPIO 25  │ NRESET     │ Reset (output)
//! 16     │ GPIO 23  │ DIO1       │ Interrupt (input)
//! 15     │ GPIO 22  │ DIO2       │ Interrupt (input, optional)
//! 13     │ GPIO 27  │ DIO3       │ Interrupt (input, optional)
//! ```
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use sx1280_rs::transport::{PinMap, RaspberryPiTransport};
//!
//! let transport = RaspberryPiTransport::builder()
//!     .pins(PinMap { dio: [Some(23), None, None], ..PinMap::default() })
//!     .build()?;
//! # Ok::<(), sx1280_rs::TransportError>(())
//! ```

use super::{Edge, EdgeEvent, EdgeEvents, Line, Segment, Transport, TransportError};
use crate::constants::SPI_CLOCK_HZ;
use rppal::gpio::{Gpio, InputPin, Level, OutputPin, Trigger};
use rppal::spi::{self, Bus, Mode, SlaveSelect, Spi};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

/// BCM GPIO numbers of the control lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinMap {
    pub busy: u8,
    /// `None` when NRESET is not under software control.
    pub reset: Option<u8>,
    /// DIO1..DIO3, `None` for unwired lines.
    pub dio: [Option<u8>; 3],
}

impl Default for PinMap {
    fn default() -> Self {
        Self {
            busy: 24,
            reset: Some(25),
            dio: [Some(23), Some(22), Some(27)],
        }
    }
}

/// Builder for [`RaspberryPiTransport`].
#[derive(Debug, Clone)]
pub struct RaspberryPiTransportBuilder {
    spi_bus: u8,
    chip_select: u8,
    clock_hz: u32,
    pins: PinMap,
}

impl Default for RaspberryPiTransportBuilder {
    fn default() -> Self {
        Self {
            spi_bus: 0,
            chip_select: 0,
            clock_hz: SPI_CLOCK_HZ,
            pins: PinMap::default(),
        }
    }
}

impl RaspberryPiTransportBuilder {
    /// SPI controller, 0 (primary) or 1 (auxiliary).
    pub fn spi_bus(mut self, bus: u8) -> Self {
        self.spi_bus = bus;
        self
    }

    /// Chip-select line, 0..=2.
    pub fn chip_select(mut self, cs: u8) -> Self {
        self.chip_select = cs;
        self
    }

    pub fn clock_hz(mut self, hz: u32) -> Self {
        self.clock_hz = hz;
        self
    }

    pub fn pins(mut self, pins: PinMap) -> Self {
        self.pins = pins;
        self
    }

    /// Open the SPI device and claim the GPIO lines.
    ///
    /// # Returns
    ///
    /// * `Ok(RaspberryPiTransport)` - Ready to use, NRESET driven high
    /// * `Err(TransportError)` - Device missing, pin already claimed, or bad bus number
    pub fn build(self) -> Result<RaspberryPiTransport, TransportError> {
        let bus = match self.spi_bus {
            0 => Bus::Spi0,
            1 => Bus::Spi1,
            other => {
                return Err(TransportError::Spi(format!(
                    "invalid SPI bus {other}, only 0 and 1 are supported"
                )))
            }
        };
        let slave_select = match self.chip_select {
            0 => SlaveSelect::Ss0,
            1 => SlaveSelect::Ss1,
            2 => SlaveSelect::Ss2,
            other => {
                return Err(TransportError::Spi(format!(
                    "invalid chip select {other}"
                )))
            }
        };

        let spi = Spi::new(bus, slave_select, self.clock_hz, Mode::Mode0).map_err(spi_error)?;
        let gpio = Gpio::new().map_err(gpio_error)?;

        let busy = gpio.get(self.pins.busy).map_err(gpio_error)?.into_input();
        let reset = match self.pins.reset {
            Some(pin) => {
                let mut out = gpio.get(pin).map_err(gpio_error)?.into_output();
                // NRESET is active low
                out.set_high();
                Some(out)
            }
            None => None,
        };
        let mut dio: [Option<InputPin>; 3] = [None, None, None];
        for (slot, pin) in dio.iter_mut().zip(self.pins.dio) {
            if let Some(pin) = pin {
                *slot = Some(gpio.get(pin).map_err(gpio_error)?.into_input());
            }
        }

        log::info!("Raspberry Pi transport initialized:");
        log::info!("  SPI{} CE{} at {} Hz", self.spi_bus, self.chip_select, self.clock_hz);
        log::info!("  BUSY: GPIO {}", self.pins.busy);
        if let Some(reset) = self.pins.reset {
            log::info!("  NRESET: GPIO {reset}");
        }
        for (i, pin) in self.pins.dio.iter().enumerate() {
            if let Some(pin) = pin {
                log::info!("  DIO{}: GPIO {pin}", i + 1);
            }
        }

        Ok(RaspberryPiTransport {
            spi,
            busy,
            reset,
            dio,
            pins: self.pins,
        })
    }
}

/// rppal-backed transport.
pub struct RaspberryPiTransport {
    spi: Spi,
    busy: InputPin,
    reset: Option<OutputPin>,
    dio: [Option<InputPin>; 3],
    pins: PinMap,
}

impl RaspberryPiTransport {
    pub fn builder() -> RaspberryPiTransportBuilder {
        RaspberryPiTransportBuilder::default()
    }

    /// SPI0/CE0 at the default clock with the default pin map.
    pub fn new() -> Result<Self, TransportError> {
        Self::builder().build()
    }

    pub fn pins(&self) -> &PinMap {
        &self.pins
    }

    /// DIO lines this transport has a pin for.
    pub fn wired_dio_lines(&self) -> Vec<u8> {
        (1..=3u8)
            .filter(|n| self.pins.dio[usize::from(n - 1)].is_some())
            .collect()
    }

    fn dio_pin(&mut self, line: Line) -> Result<&mut InputPin, TransportError> {
        match line {
            Line::Dio(n @ 1..=3) => self.dio[usize::from(n - 1)]
                .as_mut()
                .ok_or(TransportError::UnsupportedLine(line)),
            _ => Err(TransportError::UnsupportedLine(line)),
        }
    }
}

impl Transport for RaspberryPiTransport {
    fn exchange(
        &mut self,
        segments: &[Segment],
        hold_chip_select: bool,
    ) -> Result<Vec<u8>, TransportError> {
        let writes: Vec<Vec<u8>> = segments.iter().map(Segment::padded_write).collect();
        let mut reads: Vec<Vec<u8>> = writes.iter().map(|w| vec![0u8; w.len()]).collect();

        {
            let mut transfers: Vec<spi::Segment<'_, '_>> = reads
                .iter_mut()
                .zip(&writes)
                .map(|(read, write)| spi::Segment::new(read.as_mut_slice(), write.as_slice()))
                .collect();
            // cs_change on the last segment would leave CS asserted after the ioctl
            if !hold_chip_select {
                let last = transfers.len().saturating_sub(1);
                for transfer in transfers.iter_mut().take(last) {
                    transfer.set_cs_change(true);
                }
            }
            self.spi.transfer_segments(&transfers).map_err(spi_error)?;
        }

        let mut out = Vec::new();
        for (segment, read) in segments.iter().zip(&reads) {
            out.extend_from_slice(&read[..segment.read_len]);
        }
        Ok(out)
    }

    fn gpio_read(&mut self, line: Line) -> Result<bool, TransportError> {
        match line {
            Line::Busy => Ok(self.busy.read() == Level::High),
            Line::Reset => self
                .reset
                .as_ref()
                .map(OutputPin::is_set_high)
                .ok_or(TransportError::UnsupportedLine(line)),
            Line::Dio(_) => Ok(self.dio_pin(line)?.read() == Level::High),
        }
    }

    fn gpio_write(&mut self, line: Line, level: bool) -> Result<(), TransportError> {
        match (line, self.reset.as_mut()) {
            (Line::Reset, Some(pin)) => {
                if level {
                    pin.set_high();
                } else {
                    pin.set_low();
                }
                Ok(())
            }
            _ => Err(TransportError::UnsupportedLine(line)),
        }
    }

    fn delay_us(&mut self, us: u32) {
        thread::sleep(Duration::from_micros(u64::from(us)));
    }

    fn subscribe_edge(&mut self, line: Line, edge: Edge) -> Result<EdgeEvents, TransportError> {
        let trigger = match edge {
            Edge::Rising => Trigger::RisingEdge,
            Edge::Falling => Trigger::FallingEdge,
            Edge::Both => Trigger::Both,
        };
        let (tx, rx) = mpsc::channel();
        self.dio_pin(line)?
            .set_async_interrupt(trigger, move |_level| {
                if tx.send(EdgeEvent { line, at: Instant::now() }).is_err() {
                    log::trace!("Edge on {line} with no subscriber left");
                }
            })
            .map_err(gpio_error)?;
        log::debug!("Subscribed to {edge:?} edges on {line}");
        Ok(rx)
    }
}

fn spi_error(e: rppal::spi::Error) -> TransportError {
    TransportError::Spi(e.to_string())
}

fn gpio_error(e: rppal::gpio::Error) -> TransportError {
    TransportError::Gpio(e.to_string())
}
