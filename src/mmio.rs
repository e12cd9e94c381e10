//! Memory-mapped implementations of the hardware seams.
//!
//! Raw volatile register access with no ownership tokens; this runs
//! before any runtime exists. Unlike [`crate::sim`], nothing here checks
//! the enable-before-configure contract; the sequence is trusted to
//! order its writes.

use crate::pads::{DataLine, Drive, PadConfig, QspiPads, SlewRate};
use crate::ssi::{FrameConfig, SsiBus, SsiStatus};
use crate::xip::XipFrameSpec;

/// Flash-mapped serial controller base on the reference target.
pub const XIP_SSI_BASE: usize = 0x1800_0000;
/// Serial-bus pad bank base on the reference target.
pub const PADS_QSPI_BASE: usize = 0x4002_0000;

const CTRLR0: usize = 0x00;
const CTRLR1: usize = 0x04;
const SSIENR: usize = 0x08;
const BAUDR: usize = 0x14;
const SR: usize = 0x28;
const DR0: usize = 0x60;
const RX_SAMPLE_DLY: usize = 0xf0;
const SPI_CTRLR0: usize = 0xf4;

const SR_BUSY: u32 = 1 << 0;
const SR_TFE: u32 = 1 << 2;

/// The serial controller's register block.
pub struct MmioSsi {
    base: usize,
}

impl MmioSsi {
    /// # Safety
    ///
    /// `base` must be the controller's register block and the caller must
    /// be its only user for the lifetime of this value.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    fn read_reg(&self, offset: usize) -> u32 {
        unsafe { core::ptr::read_volatile((self.base + offset) as *const u32) }
    }

    fn write_reg(&mut self, offset: usize, value: u32) {
        unsafe { core::ptr::write_volatile((self.base + offset) as *mut u32, value) }
    }
}

impl SsiBus for MmioSsi {
    fn set_enabled(&mut self, enabled: bool) {
        self.write_reg(SSIENR, enabled as u32);
    }

    fn enabled(&self) -> bool {
        self.read_reg(SSIENR) & 1 != 0
    }

    fn set_clock_divider(&mut self, divisor: u16) {
        self.write_reg(BAUDR, divisor as u32);
    }

    fn set_rx_sample_delay(&mut self, cycles: u8) {
        self.write_reg(RX_SAMPLE_DLY, cycles as u32);
    }

    fn write_frame_config(&mut self, frame: FrameConfig) {
        self.write_reg(CTRLR0, frame.raw());
    }

    fn set_frames_per_access(&mut self, frames: u16) {
        // The register holds the count minus one.
        self.write_reg(CTRLR1, frames.saturating_sub(1) as u32);
    }

    fn write_xip_frame(&mut self, spec: XipFrameSpec) {
        self.write_reg(SPI_CTRLR0, spec.raw());
    }

    fn write_data(&mut self, frame: u32) {
        self.write_reg(DR0, frame);
    }

    fn read_data(&mut self) -> u32 {
        self.read_reg(DR0)
    }

    fn status(&mut self) -> SsiStatus {
        let raw = self.read_reg(SR);
        SsiStatus {
            busy: raw & SR_BUSY != 0,
            tx_fifo_empty: raw & SR_TFE != 0,
        }
    }
}

const PAD_CLOCK: usize = 0x04;
const PAD_DATA0: usize = 0x08;

const PAD_SLEWFAST: u32 = 1 << 0;
const PAD_SCHMITT: u32 = 1 << 1;
const PAD_DRIVE_SHIFT: u32 = 4;
const PAD_DRIVE_MASK: u32 = 0b11 << PAD_DRIVE_SHIFT;

/// Splits a pad register into the fields the sequence drives.
pub(crate) fn decode_pad(raw: u32) -> PadConfig {
    PadConfig {
        drive: Drive::from_bits(((raw & PAD_DRIVE_MASK) >> PAD_DRIVE_SHIFT) as u8),
        slew: if raw & PAD_SLEWFAST != 0 {
            SlewRate::Fast
        } else {
            SlewRate::Slow
        },
        schmitt: raw & PAD_SCHMITT != 0,
    }
}

/// Merges the modeled fields into a pad register word, leaving the
/// unmodeled bits (pulls, input and output enables) as read.
pub(crate) fn encode_pad(raw: u32, config: PadConfig) -> u32 {
    let mut word = raw & !(PAD_DRIVE_MASK | PAD_SLEWFAST | PAD_SCHMITT);
    word |= (config.drive.bits() as u32) << PAD_DRIVE_SHIFT;
    if config.slew == SlewRate::Fast {
        word |= PAD_SLEWFAST;
    }
    if config.schmitt {
        word |= PAD_SCHMITT;
    }
    word
}

/// The serial-bus pad bank's register block.
pub struct MmioPads {
    base: usize,
}

impl MmioPads {
    /// # Safety
    ///
    /// `base` must be the pad bank's register block and the caller must
    /// be its only user for the lifetime of this value.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    fn read_reg(&self, offset: usize) -> u32 {
        unsafe { core::ptr::read_volatile((self.base + offset) as *const u32) }
    }

    fn write_reg(&mut self, offset: usize, value: u32) {
        unsafe { core::ptr::write_volatile((self.base + offset) as *mut u32, value) }
    }

    const fn data_offset(line: DataLine) -> usize {
        PAD_DATA0 + 4 * line.index()
    }
}

impl QspiPads for MmioPads {
    fn clock_pad(&self) -> PadConfig {
        decode_pad(self.read_reg(PAD_CLOCK))
    }

    fn set_clock_pad(&mut self, config: PadConfig) {
        let raw = self.read_reg(PAD_CLOCK);
        self.write_reg(PAD_CLOCK, encode_pad(raw, config));
    }

    fn data_pad(&self, line: DataLine) -> PadConfig {
        decode_pad(self.read_reg(Self::data_offset(line)))
    }

    fn set_data_pad(&mut self, line: DataLine, config: PadConfig) {
        let offset = Self::data_offset(line);
        let raw = self.read_reg(offset);
        self.write_reg(offset, encode_pad(raw, config));
    }
}
