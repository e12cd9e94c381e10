//! Flash interface-mode negotiation.
//!
//! Reads the device's mode status register and, only on mismatch, rewrites
//! it with a write-enable and status-write pair, then polls busy until the
//! device commits. The comparison is full-byte exact equality, so a device
//! already in the required mode produces zero bus writes and the phase is
//! idempotent.
//!
//! Caveat on the write itself: the [`StatusWriteForm::RegisterPair`] form
//! sends a reserved 0x00 first byte and so rewrites the whole primary
//! register, which can clear block-protection bits a single-register
//! write would preserve. Which forms a given part accepts is
//! part-specific and is not detected here.

use crate::config::{BootConfig, StatusWriteForm};
use crate::io::{self, WIP_MASK};
use crate::ssi::{FrameConfig, SsiBus};
use crate::Error;

/// Runs the negotiation phase. The controller must be disabled on entry
/// and is left disabled on exit, ready for XIP reconfiguration.
pub(crate) fn run(ssi: &mut impl SsiBus, cfg: &BootConfig) -> Result<(), Error> {
    ssi.write_frame_config(FrameConfig::serial_byte());
    ssi.set_enabled(true);

    let result = check_and_program(ssi, cfg);

    ssi.set_enabled(false);
    result
}

fn check_and_program(ssi: &mut impl SsiBus, cfg: &BootConfig) -> Result<(), Error> {
    let current = io::read_flash_status(ssi, cfg.commands.read_status_mode, cfg.poll_limit)?;
    if current == cfg.required_status {
        trace!("flash mode status {:#x} already matches", current);
        return Ok(());
    }
    debug!(
        "flash mode status {:#x}, programming {:#x}",
        current, cfg.required_status
    );

    // Write-enable latch first; its response frame carries nothing.
    ssi.write_data(cfg.commands.write_enable as u32);
    io::wait_tx_idle(ssi, cfg.poll_limit)?;
    io::flush_rx(ssi, 1);

    ssi.write_data(cfg.commands.write_status as u32);
    let payload_frames = match cfg.status_write {
        StatusWriteForm::RegisterPair => {
            ssi.write_data(0x00);
            ssi.write_data(cfg.required_status as u32);
            2
        }
        StatusWriteForm::SingleRegister => {
            ssi.write_data(cfg.required_status as u32);
            1
        }
    };
    io::wait_tx_idle(ssi, cfg.poll_limit)?;
    io::flush_rx(ssi, 1 + payload_frames);

    // The write now runs inside the device. Unbounded under the default
    // limit; a device that never clears write-in-progress stalls here.
    let mut polls = 0u32;
    loop {
        let status = io::read_flash_status(ssi, cfg.commands.read_status, cfg.poll_limit)?;
        if status & WIP_MASK == 0 {
            return Ok(());
        }
        polls += 1;
        if !cfg.poll_limit.allows(polls) {
            return Err(Error::Timeout);
        }
    }
}
