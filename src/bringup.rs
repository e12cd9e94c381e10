//! The bring-up sequence.
//!
//! Four phases in fixed order: pad electrical setup, controller baseline,
//! optional flash mode negotiation, XIP framing. Pads and controller are
//! written exactly once per boot and never reverted; there is no undo
//! path. On success the mapped flash window serves ordinary reads and the
//! returned address is where the next stage starts.
//!
//! # Example
//! ```ignore
//! use xip_boot::{bringup, mmio, BootConfig};
//!
//! let mut ssi = unsafe { mmio::MmioSsi::new(mmio::XIP_SSI_BASE) };
//! let mut pads = unsafe { mmio::MmioPads::new(mmio::PADS_QSPI_BASE) };
//! let exit = bringup::run(&mut ssi, &mut pads, &BootConfig::default(), 0)?;
//! ```

use crate::config::BootConfig;
use crate::pads::{self, QspiPads};
use crate::ssi::SsiBus;
use crate::{handoff, negotiate, xip, Error};

/// Runs the full sequence and returns the resolved exit address for the
/// caller's jump. A `requested_exit` of zero selects the default window
/// entry point.
pub fn run(
    ssi: &mut impl SsiBus,
    pads: &mut impl QspiPads,
    cfg: &BootConfig,
    requested_exit: u32,
) -> Result<u32, Error> {
    cfg.validate()?;

    pads::configure(pads);
    baseline(ssi, cfg);

    if cfg.negotiate_mode {
        negotiate::run(ssi, cfg)?;
    }

    xip::enter(ssi, cfg)?;

    Ok(handoff::resolve_exit(requested_exit))
}

/// Establishes the known inactive controller state: disabled, clock
/// divisor and receive sample delay set. Later phases re-enable the
/// controller once their transaction shape is in place.
fn baseline(ssi: &mut impl SsiBus, cfg: &BootConfig) {
    ssi.set_enabled(false);
    ssi.set_clock_divider(cfg.clock_divisor);
    ssi.set_rx_sample_delay(cfg.rx_sample_delay);
    debug!(
        "ssi baseline: divisor {}, sample delay {}",
        cfg.clock_divisor, cfg.rx_sample_delay
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PollLimit;
    use crate::pads::{DataLine, PadConfig};
    use crate::sim::{SimFlash, SimPads, SimSsi, Transaction, XipFault};
    use crate::ssi::InstructionLength;

    const IMAGE: [u8; 8] = [0xB5, 0x00, 0x20, 0x47, 0x11, 0x22, 0x33, 0x44];

    fn bounded(mut cfg: BootConfig) -> BootConfig {
        cfg.poll_limit = PollLimit::Bounded(1_000);
        cfg
    }

    fn fresh_target() -> (SimSsi, SimPads) {
        let mut ssi = SimSsi::new();
        ssi.device.fill(&IMAGE);
        (ssi, SimPads::new())
    }

    #[test]
    fn full_sequence_reaches_xip_on_fresh_hardware() {
        let cfg = bounded(BootConfig::default());
        let (mut ssi, mut pads) = fresh_target();

        let exit = run(&mut ssi, &mut pads, &cfg, 0).unwrap();

        assert_eq!(exit, 0x1000_0100);
        assert!(ssi.enabled());
        assert!(ssi.violations().is_empty());
        assert_eq!(ssi.clock_divider(), 4);
        assert_eq!(ssi.rx_sample_delay(), 1);
        assert_eq!(ssi.device.status(), (0x00, 0x02));
        assert_eq!(ssi.xip_read(0), Ok(0x4720_00B5));
        assert_eq!(ssi.xip_read(4), Ok(0x4433_2211));
        assert!(!pads.data_pad(DataLine::D0).schmitt);
    }

    #[test]
    fn explicit_exit_address_is_passed_through() {
        let cfg = bounded(BootConfig::default());
        let (mut ssi, mut pads) = fresh_target();

        let exit = run(&mut ssi, &mut pads, &cfg, 0x1004_0001).unwrap();
        assert_eq!(exit, 0x1004_0001);
    }

    #[test]
    fn continuous_read_sequence_reaches_xip() {
        let cfg = bounded(BootConfig::winbond_w25q());
        let (mut ssi, mut pads) = fresh_target();

        run(&mut ssi, &mut pads, &cfg, 0).unwrap();

        assert!(ssi.device.continuous_armed());
        assert_eq!(ssi.xip_frame().unwrap().inst_len, InstructionLength::None);
        assert_eq!(ssi.xip_read(0), Ok(0x4720_00B5));
        assert!(ssi.violations().is_empty());
    }

    #[test]
    fn negotiation_is_skipped_when_disabled() {
        let mut cfg = bounded(BootConfig::default());
        cfg.negotiate_mode = false;
        let (mut ssi, mut pads) = fresh_target();
        // Device shipped already configured for quad reads.
        ssi.device.set_status(0x00, 0x02);

        run(&mut ssi, &mut pads, &cfg, 0).unwrap();

        assert!(ssi.device.log().iter().all(|t| !matches!(
            t,
            Transaction::ReadStatus { .. }
                | Transaction::WriteEnable
                | Transaction::WriteStatus { .. }
        )));
        assert_eq!(ssi.xip_read(0), Ok(0x4720_00B5));
    }

    #[test]
    fn skipping_negotiation_on_an_unconfigured_device_corrupts_reads_later() {
        let mut cfg = bounded(BootConfig::default());
        cfg.negotiate_mode = false;
        let (mut ssi, mut pads) = fresh_target();

        // The sequence itself cannot detect the mismatch and reports
        // success; the damage shows up at read time.
        run(&mut ssi, &mut pads, &cfg, 0).unwrap();
        assert_eq!(ssi.xip_read(0), Err(XipFault::QuadDisabled));
    }

    #[test]
    fn second_full_run_does_not_rewrite_the_device() {
        let cfg = bounded(BootConfig::default());
        let (mut ssi, mut pads) = fresh_target();

        run(&mut ssi, &mut pads, &cfg, 0).unwrap();
        run(&mut ssi, &mut pads, &cfg, 0).unwrap();

        let status_writes = ssi
            .device
            .log()
            .iter()
            .filter(|t| matches!(t, Transaction::WriteStatus { .. }))
            .count();
        assert_eq!(status_writes, 1);
        assert!(ssi.violations().is_empty());
    }

    #[test]
    fn issi_preset_brings_up_an_issi_style_device() {
        let cfg = bounded(BootConfig::issi_is25lp());
        let mut ssi = SimSsi::with_device(SimFlash::issi_style());
        ssi.device.fill(&IMAGE);
        let mut pads = SimPads::new();

        run(&mut ssi, &mut pads, &cfg, 0).unwrap();

        assert_eq!(ssi.device.status().0, 0x40);
        assert_eq!(ssi.xip_read(4), Ok(0x4433_2211));
    }

    #[test]
    fn invalid_config_is_rejected_before_touching_hardware() {
        let mut cfg = bounded(BootConfig::default());
        cfg.clock_divisor = 3;
        let (mut ssi, mut pads) = fresh_target();

        assert_eq!(
            run(&mut ssi, &mut pads, &cfg, 0),
            Err(Error::InvalidConfiguration)
        );
        assert!(ssi.device.log().is_empty());
        assert_eq!(ssi.clock_divider(), 0);
        assert_eq!(pads.clock_pad(), PadConfig::default());
    }

    #[test]
    fn stuck_device_timeout_propagates_out_of_the_sequence() {
        let mut cfg = bounded(BootConfig::default());
        cfg.poll_limit = PollLimit::Bounded(16);
        let (mut ssi, mut pads) = fresh_target();
        ssi.device.set_write_latency(u32::MAX);

        assert_eq!(run(&mut ssi, &mut pads, &cfg, 0), Err(Error::Timeout));
    }

    #[test]
    fn out_of_window_read_faults() {
        let cfg = bounded(BootConfig::default());
        let (mut ssi, mut pads) = fresh_target();

        run(&mut ssi, &mut pads, &cfg, 0).unwrap();

        assert_eq!(
            ssi.xip_read(crate::sim::SIM_FLASH_BYTES as u32),
            Err(XipFault::AddressOutOfRange)
        );
    }
}
