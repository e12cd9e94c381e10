//! XIP command framing.
//!
//! Derives the fixed per-read command framing from the configuration and
//! programs it into the controller. Once this phase re-enables the
//! controller, every read of the mapped window is translated into a full
//! flash read transaction; nothing in software services the reads.

use crate::config::{BootConfig, XipReadMode};
use crate::io;
use crate::ssi::{FrameConfig, InstructionLength, SsiBus, TransType};
use crate::Error;

/// Widest wait-cycle count the framing register holds.
pub(crate) const MAX_WAIT_CYCLES: u8 = 31;
/// Widest address field, in 4-bit units.
pub(crate) const MAX_ADDR_NIBBLES: u8 = 15;

/// Fixed command framing applied uniformly to every mapped read.
///
/// Set once at bring-up; there is no per-read variation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct XipFrameSpec {
    /// Byte planted in the command slot: the read opcode, or the mode
    /// byte once continuous-read is armed.
    pub read_command: u8,
    /// Address phase length in 4-bit units. The address is clocked as
    /// parallel nibbles, one per data line per cycle.
    pub addr_nibbles: u8,
    /// Turnaround clocks between address and data.
    pub wait_cycles: u8,
    /// Command phase width.
    pub inst_len: InstructionLength,
    /// Wire placement of command and address phases.
    pub trans_type: TransType,
}

impl XipFrameSpec {
    /// Framing for reads that send the full opcode prefix: an 8-bit
    /// serial command, then the address across all four lines.
    pub const fn command_prefix(cfg: &BootConfig) -> Self {
        Self {
            read_command: cfg.read_opcode,
            addr_nibbles: cfg.address_bits / 4,
            wait_cycles: cfg.dummy_cycles,
            inst_len: InstructionLength::Bits8,
            trans_type: TransType::SerialCommandWideAddress,
        }
    }

    /// Framing once the device streams in continuous-read mode: no
    /// command phase, mode byte behind the address, so the address field
    /// widens by two nibbles and everything travels on all four lines.
    pub const fn continuous(cfg: &BootConfig, mode_bits: u8) -> Self {
        Self {
            read_command: mode_bits,
            addr_nibbles: (cfg.address_bits + 8) / 4,
            wait_cycles: cfg.dummy_cycles,
            inst_len: InstructionLength::None,
            trans_type: TransType::AllWide,
        }
    }

    /// Framing for the priming read itself: full opcode prefix, but the
    /// widened address field so the mode byte rides in the address word.
    pub(crate) const fn continuous_prime(cfg: &BootConfig) -> Self {
        Self {
            read_command: cfg.read_opcode,
            addr_nibbles: (cfg.address_bits + 8) / 4,
            wait_cycles: cfg.dummy_cycles,
            inst_len: InstructionLength::Bits8,
            trans_type: TransType::SerialCommandWideAddress,
        }
    }

    /// Packs the framing into the controller's XIP register layout.
    pub(crate) const fn raw(self) -> u32 {
        (self.read_command as u32) << 24
            | (self.wait_cycles as u32) << 11
            | (self.inst_len.bits() as u32) << 8
            | (self.addr_nibbles as u32) << 2
            | self.trans_type.bits() as u32
    }
}

/// Programs XIP framing and re-enables the controller.
///
/// The controller must be disabled on entry. On success it is enabled
/// with the steady-state framing in place and one 32-bit frame clocked
/// per mapped access.
pub(crate) fn enter(ssi: &mut impl SsiBus, cfg: &BootConfig) -> Result<(), Error> {
    ssi.write_frame_config(FrameConfig::xip_quad());
    ssi.set_frames_per_access(1);

    match cfg.read_mode {
        XipReadMode::CommandPrefix => {
            ssi.write_xip_frame(XipFrameSpec::command_prefix(cfg));
            ssi.set_enabled(true);
        }
        XipReadMode::Continuous { mode_bits } => {
            ssi.write_xip_frame(XipFrameSpec::continuous_prime(cfg));
            ssi.set_enabled(true);

            // One throwaway read with the mode byte in the address word
            // arms the device's continuous-read mode.
            ssi.write_data(cfg.read_opcode as u32);
            ssi.write_data(mode_bits as u32);
            io::wait_tx_idle(ssi, cfg.poll_limit)?;
            io::flush_rx(ssi, 1);

            ssi.set_enabled(false);
            ssi.write_xip_frame(XipFrameSpec::continuous(cfg, mode_bits));
            ssi.set_enabled(true);
        }
    }

    debug!("xip framing active");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PollLimit;
    use crate::sim::{SimSsi, Transaction};

    #[test]
    fn framing_derivation_matches_reference_values() {
        let mut cfg = BootConfig::default();
        cfg.read_opcode = 0xEB;
        cfg.address_bits = 24;
        cfg.dummy_cycles = 6;

        let spec = XipFrameSpec::command_prefix(&cfg);
        assert_eq!(spec.read_command, 0xEB);
        assert_eq!(spec.addr_nibbles, 6);
        assert_eq!(spec.wait_cycles, 6);
        assert_eq!(spec.inst_len, InstructionLength::Bits8);
        assert_eq!(spec.inst_len.bits(), 2);
        assert_eq!(spec.trans_type, TransType::SerialCommandWideAddress);
    }

    #[test]
    fn raw_words_match_hand_packed_values() {
        let cfg = BootConfig::default();
        assert_eq!(XipFrameSpec::command_prefix(&cfg).raw(), 0xEB00_3219);

        let w25q = BootConfig::winbond_w25q();
        assert_eq!(XipFrameSpec::continuous_prime(&w25q).raw(), 0xEB00_2221);
        assert_eq!(XipFrameSpec::continuous(&w25q, 0xA0).raw(), 0xA000_2022);
    }

    #[test]
    fn continuous_framing_widens_the_address_field() {
        let w25q = BootConfig::winbond_w25q();
        let steady = XipFrameSpec::continuous(&w25q, 0xA0);
        assert_eq!(steady.addr_nibbles, 8);
        assert_eq!(steady.inst_len, InstructionLength::None);
        assert_eq!(steady.trans_type, TransType::AllWide);
        assert_eq!(XipFrameSpec::continuous_prime(&w25q).addr_nibbles, 8);
    }

    #[test]
    fn enter_leaves_controller_enabled_with_prefix_framing() {
        let mut cfg = BootConfig::default();
        cfg.poll_limit = PollLimit::Bounded(1_000);
        let mut ssi = SimSsi::new();
        ssi.device.set_status(0x00, 0x02);

        enter(&mut ssi, &cfg).unwrap();

        assert!(ssi.enabled());
        assert_eq!(ssi.xip_frame(), Some(XipFrameSpec::command_prefix(&cfg)));
        assert_eq!(ssi.frames_per_access(), 1);
        assert!(ssi.violations().is_empty());
    }

    #[test]
    fn continuous_mode_arms_the_device_and_drops_the_command_phase() {
        let mut cfg = BootConfig::winbond_w25q();
        cfg.poll_limit = PollLimit::Bounded(1_000);
        let mut ssi = SimSsi::new();
        ssi.device.set_status(0x00, 0x02);

        enter(&mut ssi, &cfg).unwrap();

        assert!(ssi.device.continuous_armed());
        assert!(ssi
            .device
            .log()
            .iter()
            .any(|t| matches!(t, Transaction::QuadReadPrime { mode: 0xA0, .. })));
        let framing = ssi.xip_frame().unwrap();
        assert_eq!(framing.inst_len, InstructionLength::None);
        assert_eq!(framing.read_command, 0xA0);
        assert!(ssi.enabled());
        assert!(ssi.violations().is_empty());
    }
}
