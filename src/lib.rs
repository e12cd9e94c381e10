//! Boot-stage bring-up of memory-mapped (XIP) serial NOR flash.
//!
//! Drives a DesignWare-style SSI/QSPI controller from power-on state to
//! transparent execute-in-place reads, in four ordered phases: pad
//! electrical setup, controller baseline (clock divisor and receive sample
//! delay), optional flash mode negotiation over the status-register
//! write protocol, and XIP command framing. The sequence runs once per
//! boot and is never reverted.
//!
//! Hardware access goes through the [`SsiBus`] and [`QspiPads`] traits, so
//! the same sequence runs against the memory-mapped implementations in
//! [`mmio`] on the target and against the simulated model in [`sim`] on a
//! host.
//!
//! # Example
//! ```ignore
//! use xip_boot::{bringup, mmio, BootConfig};
//!
//! let mut ssi = unsafe { mmio::MmioSsi::new(mmio::XIP_SSI_BASE) };
//! let mut pads = unsafe { mmio::MmioPads::new(mmio::PADS_QSPI_BASE) };
//! let exit = bringup::run(&mut ssi, &mut pads, &BootConfig::winbond_w25q(), 0)?;
//! // Jump to `exit`; the transfer of control is outside this crate.
//! ```
#![no_std]

// This mod MUST go first, so that the others see its macros.
mod fmt;

pub mod bringup;
pub mod config;
pub mod handoff;
pub mod io;
pub mod mmio;
mod negotiate;
pub mod pads;
pub mod sim;
pub mod ssi;
pub mod xip;

/// Bring-up error.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Configuration rejected by [`BootConfig::validate`].
    InvalidConfiguration,
    /// A bounded poll limit expired before the polled condition held.
    Timeout,
}

pub use bringup::run;
pub use config::{BootConfig, CommandSet, PollLimit, StatusWriteForm, XipReadMode};
pub use handoff::{resolve_exit, DEFAULT_EXIT_OFFSET, FLASH_WINDOW_BASE};
pub use pads::{DataLine, Drive, PadConfig, QspiPads, SlewRate};
pub use ssi::{
    FrameConfig, FrameFormat, InstructionLength, SsiBus, SsiStatus, TransType, TransferMode,
};
pub use xip::XipFrameSpec;
