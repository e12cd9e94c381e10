//! Serial-bus controller register model.
//!
//! [`SsiBus`] is the seam between the bring-up sequence and the hardware.
//! It mirrors the handful of controller registers the sequence touches,
//! with typed values instead of raw words. The memory-mapped
//! implementation lives in [`crate::mmio`], the simulated one in
//! [`crate::sim`].
//!
//! The controller contract behind every implementation: configuration
//! registers only take effect, and are only safe to write, while the
//! controller is disabled. Enabling commits the configuration as a whole.

use crate::xip::XipFrameSpec;

/// Number of wires carrying each data frame.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameFormat {
    Single,
    Dual,
    Quad,
}

impl FrameFormat {
    pub(crate) const fn bits(self) -> u8 {
        match self {
            Self::Single => 0,
            Self::Dual => 1,
            Self::Quad => 2,
        }
    }
}

/// Direction mode of a transaction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferMode {
    /// Transmit and receive simultaneously.
    TxAndRx,
    TxOnly,
    RxOnly,
    /// Instruction and address go out, data comes back. This is the mode
    /// mapped XIP reads run in.
    EepromRead,
}

impl TransferMode {
    pub(crate) const fn bits(self) -> u8 {
        match self {
            Self::TxAndRx => 0,
            Self::TxOnly => 1,
            Self::RxOnly => 2,
            Self::EepromRead => 3,
        }
    }
}

/// Width of the command phase of a framed read.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InstructionLength {
    /// No command phase at all.
    None,
    Bits4,
    Bits8,
    Bits16,
}

impl InstructionLength {
    pub(crate) const fn bits(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Bits4 => 1,
            Self::Bits8 => 2,
            Self::Bits16 => 3,
        }
    }
}

/// Wire placement of the command and address phases.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransType {
    /// Command and address both on the single serial line.
    AllSerial,
    /// Command on the serial line, address across the full frame width.
    SerialCommandWideAddress,
    /// Command and address both across the full frame width.
    AllWide,
}

impl TransType {
    pub(crate) const fn bits(self) -> u8 {
        match self {
            Self::AllSerial => 0,
            Self::SerialCommandWideAddress => 1,
            Self::AllWide => 2,
        }
    }
}

/// General transaction shape: frame width in wires and bits, direction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameConfig {
    pub format: FrameFormat,
    /// Data frame size in bits, 4 to 32.
    pub frame_bits: u8,
    pub mode: TransferMode,
}

impl FrameConfig {
    /// 8-bit single-wire full-duplex frames, the shape command and status
    /// transactions run in.
    pub const fn serial_byte() -> Self {
        Self {
            format: FrameFormat::Single,
            frame_bits: 8,
            mode: TransferMode::TxAndRx,
        }
    }

    /// 32-bit quad frames in instruction-and-address-out, data-in mode,
    /// the shape mapped XIP reads run in.
    pub const fn xip_quad() -> Self {
        Self {
            format: FrameFormat::Quad,
            frame_bits: 32,
            mode: TransferMode::EepromRead,
        }
    }

    /// Packs the shape into the controller's control-register layout.
    /// The frame-size field holds bits minus one; a zero-bit frame has no
    /// register representation and saturates to the zero field.
    pub(crate) const fn raw(self) -> u32 {
        (self.frame_bits.saturating_sub(1) as u32) << 16
            | (self.format.bits() as u32) << 21
            | (self.mode.bits() as u32) << 8
    }
}

/// Controller status snapshot.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SsiStatus {
    /// A transfer is in flight on the serial clock.
    pub busy: bool,
    /// The TX FIFO has fully drained.
    pub tx_fifo_empty: bool,
}

impl SsiStatus {
    /// Everything queued has been clocked out and the bus is quiet.
    pub const fn tx_idle(self) -> bool {
        self.tx_fifo_empty && !self.busy
    }
}

/// The controller registers the bring-up sequence drives.
///
/// All configuration setters require the controller disabled. The
/// memory-mapped implementation trusts its caller to order writes
/// correctly; the simulated one records a violation and drops the write.
pub trait SsiBus {
    /// Controller enable gate. Enabling commits the configured state.
    fn set_enabled(&mut self, enabled: bool);
    fn enabled(&self) -> bool;

    /// Serial clock divisor. Even values only; odd dividers skew the
    /// clock's duty cycle.
    fn set_clock_divider(&mut self, divisor: u16);
    /// Cycles to wait before sampling incoming data, compensating the pad
    /// round-trip latency.
    fn set_rx_sample_delay(&mut self, cycles: u8);
    /// General transaction shape.
    fn write_frame_config(&mut self, frame: FrameConfig);
    /// Data frames clocked per triggered read access.
    fn set_frames_per_access(&mut self, frames: u16);
    /// Fixed command framing applied to every mapped read.
    fn write_xip_frame(&mut self, spec: XipFrameSpec);

    /// Push one frame into the TX FIFO.
    fn write_data(&mut self, frame: u32);
    /// Pop one frame from the RX FIFO. Zero when empty.
    fn read_data(&mut self) -> u32;
    /// Status snapshot. Polling this is the sequence's only wait
    /// primitive.
    fn status(&mut self) -> SsiStatus;
}
