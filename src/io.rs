//! Byte-transfer primitives.
//!
//! The collaborator layer under the negotiation phase: push command and
//! data frames, then collect the responses once the controller drains. A
//! transaction is every frame pushed between idle waits; the controller
//! holds chip select for as long as the TX FIFO keeps feeding it.

use core::hint::spin_loop;

use crate::config::PollLimit;
use crate::ssi::SsiBus;
use crate::Error;

/// Write-in-progress mask for the primary flash status register.
pub(crate) const WIP_MASK: u8 = 0x01;

/// Spins until the TX FIFO has drained and the serial clock is quiet.
pub(crate) fn wait_tx_idle(ssi: &mut impl SsiBus, limit: PollLimit) -> Result<(), Error> {
    let mut polls = 0u32;
    loop {
        if ssi.status().tx_idle() {
            return Ok(());
        }
        polls += 1;
        if !limit.allows(polls) {
            return Err(Error::Timeout);
        }
        spin_loop();
    }
}

/// Pops and discards response frames.
pub(crate) fn flush_rx(ssi: &mut impl SsiBus, count: usize) {
    for _ in 0..count {
        let _ = ssi.read_data();
    }
}

/// Status-register read: command out, one status byte back.
///
/// Clocks the opcode plus one extra frame so the device has a slot to
/// answer in, waits for idle, discards the frame received while the
/// opcode went out and returns the one behind it.
pub fn read_flash_status(ssi: &mut impl SsiBus, opcode: u8, limit: PollLimit) -> Result<u8, Error> {
    ssi.write_data(opcode as u32);
    ssi.write_data(opcode as u32);
    wait_tx_idle(ssi, limit)?;
    flush_rx(ssi, 1);
    Ok((ssi.read_data() & 0xff) as u8)
}
