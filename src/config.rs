//! Bring-up configuration.
//!
//! Everything here is decided before boot and fixed for the run. The
//! struct form, rather than build-time constants, keeps both negotiation
//! paths and both read modes testable in one artifact; on a real target
//! the configuration is a `const` in the boot image.

use crate::xip::{MAX_ADDR_NIBBLES, MAX_WAIT_CYCLES};
use crate::Error;

/// Flash command opcodes used by the negotiation phase.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommandSet {
    /// Sets the device's write-enable latch.
    pub write_enable: u8,
    /// Writes the status register(s).
    pub write_status: u8,
    /// Reads the primary status register. Bit 0 is write-in-progress.
    pub read_status: u8,
    /// Reads the status register holding the interface-mode bits. On
    /// parts with a single status register this equals `read_status`.
    pub read_status_mode: u8,
}

impl CommandSet {
    /// The JEDEC-common opcode values.
    pub const fn common() -> Self {
        Self {
            write_enable: 0x06,
            write_status: 0x01,
            read_status: 0x05,
            read_status_mode: 0x35,
        }
    }
}

impl Default for CommandSet {
    fn default() -> Self {
        Self::common()
    }
}

/// Payload shape of the status-register write during negotiation.
///
/// Caveat carried over from the source protocol's notes: the pair form
/// rewrites the whole primary register and can clear block-protection
/// bits that a single-register write would have preserved, and not every
/// part accepts both forms. Pick the form the target part documents.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatusWriteForm {
    /// One command, two data bytes: a reserved 0x00 into the primary
    /// register, then the required value into the secondary register.
    RegisterPair,
    /// One command, one data byte into the primary register.
    SingleRegister,
}

/// How mapped reads present the command phase once XIP is active.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum XipReadMode {
    /// Every mapped read sends the full read opcode before the address.
    CommandPrefix,
    /// The device's continuous-read mode is primed once during bring-up.
    /// Afterwards the mode byte rides behind each address and the opcode
    /// is omitted entirely.
    Continuous {
        /// Mode byte sent behind the address. The device keeps streaming
        /// as long as its continuation pattern is present in these bits.
        mode_bits: u8,
    },
}

/// Iteration bound for the busy-poll loops.
///
/// The production contract is [`PollLimit::Forever`]: at this boot stage
/// nothing else runs, so a device that never reports completion leaves
/// the system stalled at the poll. [`PollLimit::Bounded`] exists for
/// tests and diagnostics and surfaces [`Error::Timeout`] instead.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PollLimit {
    Forever,
    /// At most this many polls after the first check.
    Bounded(u32),
}

impl PollLimit {
    pub(crate) const fn allows(self, polls_done: u32) -> bool {
        match self {
            Self::Forever => true,
            Self::Bounded(max) => polls_done < max,
        }
    }
}

/// Fixed parameters of one bring-up run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootConfig {
    /// Serial clock divisor. Must be even and nonzero so both clock
    /// phases get the same number of source cycles.
    pub clock_divisor: u16,
    /// Read opcode sent in the XIP command phase.
    pub read_opcode: u8,
    /// Address phase width in bits. Must be a multiple of 4; the address
    /// is clocked as parallel nibbles across the four data lines.
    pub address_bits: u8,
    /// Turnaround clocks between address and data, covering the device's
    /// output-enable delay in place of a mode-bits phase.
    pub dummy_cycles: u8,
    /// Exact status byte the device must report before XIP framing is
    /// safe to enable.
    pub required_status: u8,
    /// Run the mode-negotiation phase. When false the device must
    /// already be in the required interface mode.
    pub negotiate_mode: bool,
    /// Receive sample delay in controller clocks.
    pub rx_sample_delay: u8,
    pub commands: CommandSet,
    pub status_write: StatusWriteForm,
    pub read_mode: XipReadMode,
    pub poll_limit: PollLimit,
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            clock_divisor: 4,
            read_opcode: 0xEB,
            address_bits: 24,
            dummy_cycles: 6,
            required_status: 0x02,
            negotiate_mode: true,
            rx_sample_delay: 1,
            commands: CommandSet::common(),
            status_write: StatusWriteForm::RegisterPair,
            read_mode: XipReadMode::CommandPrefix,
            poll_limit: PollLimit::Forever,
        }
    }
}

impl BootConfig {
    /// Winbond W25Q-class parts: quad-enable is bit 1 of the secondary
    /// status register, written as a register pair; continuous-read is
    /// supported, cutting the command phase from every mapped read.
    pub const fn winbond_w25q() -> Self {
        Self {
            clock_divisor: 4,
            read_opcode: 0xEB,
            address_bits: 24,
            dummy_cycles: 4,
            required_status: 0x02,
            negotiate_mode: true,
            rx_sample_delay: 1,
            commands: CommandSet::common(),
            status_write: StatusWriteForm::RegisterPair,
            read_mode: XipReadMode::Continuous { mode_bits: 0xA0 },
            poll_limit: PollLimit::Forever,
        }
    }

    /// ISSI IS25LP-class parts: a single status register holds the
    /// quad-enable bit (0x40), written with the one-byte form. No
    /// continuous-read priming; every read carries the opcode.
    pub const fn issi_is25lp() -> Self {
        Self {
            clock_divisor: 4,
            read_opcode: 0xEB,
            address_bits: 24,
            dummy_cycles: 6,
            required_status: 0x40,
            negotiate_mode: true,
            rx_sample_delay: 1,
            commands: CommandSet {
                write_enable: 0x06,
                write_status: 0x01,
                read_status: 0x05,
                read_status_mode: 0x05,
            },
            status_write: StatusWriteForm::SingleRegister,
            read_mode: XipReadMode::CommandPrefix,
            poll_limit: PollLimit::Forever,
        }
    }

    /// Checks the configuration against the controller's field widths and
    /// the protocol's structural rules. Run once at sequence entry.
    pub fn validate(&self) -> Result<(), Error> {
        if self.clock_divisor == 0 || self.clock_divisor % 2 != 0 {
            return Err(Error::InvalidConfiguration);
        }
        if self.address_bits == 0 || self.address_bits % 4 != 0 {
            return Err(Error::InvalidConfiguration);
        }
        if self.dummy_cycles > MAX_WAIT_CYCLES {
            return Err(Error::InvalidConfiguration);
        }

        // Continuous-read widens the address phase by the mode byte.
        let mode_bits = match self.read_mode {
            XipReadMode::CommandPrefix => 0u16,
            XipReadMode::Continuous { .. } => 8,
        };
        if (self.address_bits as u16 + mode_bits) / 4 > MAX_ADDR_NIBBLES as u16 {
            return Err(Error::InvalidConfiguration);
        }

        if self.negotiate_mode {
            let commands = self.commands;
            if commands.write_enable == 0
                || commands.write_status == 0
                || commands.read_status == 0
                || commands.read_status_mode == 0
            {
                return Err(Error::InvalidConfiguration);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_contract() {
        let cfg = BootConfig::default();
        assert_eq!(cfg.clock_divisor, 4);
        assert_eq!(cfg.read_opcode, 0xEB);
        assert_eq!(cfg.address_bits, 24);
        assert_eq!(cfg.dummy_cycles, 6);
        assert_eq!(cfg.required_status, 0x02);
        assert!(cfg.negotiate_mode);
        assert_eq!(cfg.rx_sample_delay, 1);
        assert_eq!(cfg.commands, CommandSet::common());
        assert_eq!(cfg.status_write, StatusWriteForm::RegisterPair);
        assert_eq!(cfg.read_mode, XipReadMode::CommandPrefix);
        assert_eq!(cfg.poll_limit, PollLimit::Forever);
    }

    #[test]
    fn common_command_set_uses_jedec_values() {
        let commands = CommandSet::common();
        assert_eq!(commands.write_enable, 0x06);
        assert_eq!(commands.write_status, 0x01);
        assert_eq!(commands.read_status, 0x05);
        assert_eq!(commands.read_status_mode, 0x35);
    }

    #[test]
    fn default_and_presets_validate() {
        assert_eq!(BootConfig::default().validate(), Ok(()));
        assert_eq!(BootConfig::winbond_w25q().validate(), Ok(()));
        assert_eq!(BootConfig::issi_is25lp().validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_odd_or_zero_divisor() {
        let mut odd = BootConfig::default();
        odd.clock_divisor = 5;
        assert_eq!(odd.validate(), Err(Error::InvalidConfiguration));

        let mut zero = BootConfig::default();
        zero.clock_divisor = 0;
        assert_eq!(zero.validate(), Err(Error::InvalidConfiguration));
    }

    #[test]
    fn validate_rejects_unaligned_address_width() {
        let mut cfg = BootConfig::default();
        cfg.address_bits = 26;
        assert_eq!(cfg.validate(), Err(Error::InvalidConfiguration));

        cfg.address_bits = 0;
        assert_eq!(cfg.validate(), Err(Error::InvalidConfiguration));
    }

    #[test]
    fn validate_rejects_oversized_dummy_cycles() {
        let mut cfg = BootConfig::default();
        cfg.dummy_cycles = MAX_WAIT_CYCLES + 1;
        assert_eq!(cfg.validate(), Err(Error::InvalidConfiguration));
    }

    #[test]
    fn validate_accounts_for_the_continuous_mode_byte() {
        // 56 address bits fit the field on their own but not once the
        // mode byte widens the phase.
        let mut cfg = BootConfig::default();
        cfg.address_bits = 56;
        assert_eq!(cfg.validate(), Ok(()));

        cfg.read_mode = XipReadMode::Continuous { mode_bits: 0xA0 };
        assert_eq!(cfg.validate(), Err(Error::InvalidConfiguration));
    }

    #[test]
    fn validate_rejects_zero_opcodes_only_when_negotiating() {
        let mut cfg = BootConfig::default();
        cfg.commands.write_enable = 0;
        assert_eq!(cfg.validate(), Err(Error::InvalidConfiguration));

        cfg.negotiate_mode = false;
        assert_eq!(cfg.validate(), Ok(()));
    }
}
