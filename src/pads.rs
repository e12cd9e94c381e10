//! Serial-bus pad electrical configuration.
//!
//! First phase of the bring-up sequence. Quad-rate transfers need a
//! stronger, faster clock edge and a shorter input path on the four data
//! lines than the pad bank's power-on defaults give, so the clock pad gets
//! its drive and slew raised and the data pads lose their input Schmitt
//! triggers. Pure register writes with no preconditions; must be finished
//! before the controller is first enabled.

/// Pad drive strength.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Drive {
    /// 2 mA, field value 0b00.
    Drive2mA,
    /// 4 mA, field value 0b01. Power-on default.
    Drive4mA,
    /// 8 mA, field value 0b10.
    Drive8mA,
    /// 12 mA, field value 0b11.
    Drive12mA,
}

impl Drive {
    pub(crate) const fn bits(self) -> u8 {
        match self {
            Self::Drive2mA => 0,
            Self::Drive4mA => 1,
            Self::Drive8mA => 2,
            Self::Drive12mA => 3,
        }
    }

    pub(crate) const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => Self::Drive2mA,
            1 => Self::Drive4mA,
            2 => Self::Drive8mA,
            _ => Self::Drive12mA,
        }
    }
}

/// Slew rate of an output.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlewRate {
    /// Slew-limited edge. Power-on default.
    Slow,
    /// Unlimited edge.
    Fast,
}

/// Electrical configuration of one pad.
///
/// Only the fields this sequence changes are modeled. Implementations of
/// [`QspiPads`] must preserve any further per-pad state (pulls, input and
/// output enables) across a write.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PadConfig {
    pub drive: Drive,
    pub slew: SlewRate,
    /// Input Schmitt trigger enable.
    pub schmitt: bool,
}

impl Default for PadConfig {
    /// Power-on state of every pad in the bank.
    fn default() -> Self {
        Self {
            drive: Drive::Drive4mA,
            slew: SlewRate::Slow,
            schmitt: true,
        }
    }
}

/// The four bidirectional data lines of the quad bus.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataLine {
    D0,
    D1,
    D2,
    D3,
}

impl DataLine {
    pub const ALL: [DataLine; 4] = [Self::D0, Self::D1, Self::D2, Self::D3];

    pub(crate) const fn index(self) -> usize {
        match self {
            Self::D0 => 0,
            Self::D1 => 1,
            Self::D2 => 2,
            Self::D3 => 3,
        }
    }
}

/// The pad bank registers the bring-up sequence drives.
pub trait QspiPads {
    fn clock_pad(&self) -> PadConfig;
    fn set_clock_pad(&mut self, config: PadConfig);
    fn data_pad(&self, line: DataLine) -> PadConfig;
    fn set_data_pad(&mut self, line: DataLine, config: PadConfig);
}

/// Drive strength programmed onto the clock pad.
pub const CLOCK_DRIVE: Drive = Drive::Drive8mA;
/// Slew rate programmed onto the clock pad.
pub const CLOCK_SLEW: SlewRate = SlewRate::Fast;

/// Programs the pad bank for quad-rate transfers.
///
/// Clock pad: [`CLOCK_DRIVE`] and [`CLOCK_SLEW`], Schmitt state untouched.
/// Data pads: Schmitt trigger off, drive and slew untouched. All writes
/// are read-modify-write, so unmodeled pad state survives.
pub fn configure(pads: &mut impl QspiPads) {
    let mut clock = pads.clock_pad();
    clock.drive = CLOCK_DRIVE;
    clock.slew = CLOCK_SLEW;
    pads.set_clock_pad(clock);

    for line in DataLine::ALL {
        let mut pad = pads.data_pad(line);
        pad.schmitt = false;
        pads.set_data_pad(line, pad);
    }
    trace!("qspi pads configured");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimPads;

    #[test]
    fn configure_produces_expected_pattern_from_power_on() {
        let mut pads = SimPads::new();
        configure(&mut pads);

        let clock = pads.clock_pad();
        assert_eq!(clock.drive, Drive::Drive8mA);
        assert_eq!(clock.slew, SlewRate::Fast);
        assert!(clock.schmitt);

        for line in DataLine::ALL {
            let pad = pads.data_pad(line);
            assert!(!pad.schmitt);
            assert_eq!(pad.drive, Drive::Drive4mA);
            assert_eq!(pad.slew, SlewRate::Slow);
        }
    }

    #[test]
    fn configure_is_insensitive_to_prior_pad_state() {
        let mut pads = SimPads::new();
        pads.set_clock_pad(PadConfig {
            drive: Drive::Drive2mA,
            slew: SlewRate::Slow,
            schmitt: false,
        });
        pads.set_data_pad(
            DataLine::D2,
            PadConfig {
                drive: Drive::Drive12mA,
                slew: SlewRate::Fast,
                schmitt: true,
            },
        );

        configure(&mut pads);

        let clock = pads.clock_pad();
        assert_eq!(clock.drive, Drive::Drive8mA);
        assert_eq!(clock.slew, SlewRate::Fast);
        // Schmitt is not part of the clock-pad policy and stays as found.
        assert!(!clock.schmitt);

        let d2 = pads.data_pad(DataLine::D2);
        assert!(!d2.schmitt);
        // Drive and slew are not part of the data-pad policy.
        assert_eq!(d2.drive, Drive::Drive12mA);
        assert_eq!(d2.slew, SlewRate::Fast);
    }

    #[test]
    fn configure_twice_is_stable() {
        let mut pads = SimPads::new();
        configure(&mut pads);
        let clock = pads.clock_pad();
        let data = [
            pads.data_pad(DataLine::D0),
            pads.data_pad(DataLine::D1),
            pads.data_pad(DataLine::D2),
            pads.data_pad(DataLine::D3),
        ];

        configure(&mut pads);

        assert_eq!(pads.clock_pad(), clock);
        for (line, before) in DataLine::ALL.iter().zip(data) {
            assert_eq!(pads.data_pad(*line), before);
        }
    }
}
