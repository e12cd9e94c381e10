//! Simulated controller, flash device and pad bank.
//!
//! A host-runnable double of the hardware the bring-up sequence drives.
//! [`SimSsi`] implements [`SsiBus`] over an attached [`SimFlash`] and
//! models the transaction boundary the way the controller does: frames
//! pushed with `write_data` accumulate in the TX FIFO, and the next
//! status or data read clocks them out to the device as one chip-select
//! window. Responses come back one frame per frame clocked.
//!
//! Two guard rails catch sequencing bugs the real part would turn into
//! silent corruption. Configuration writes while the controller is
//! enabled are dropped and recorded as a [`Violation`], and
//! [`SimSsi::xip_read`] walks the whole chain a mapped read depends on,
//! failing with the first [`XipFault`] it hits. The device keeps a
//! [`Transaction`] log so tests can assert exactly what reached the bus.

use heapless::{Deque, Vec};

use crate::config::CommandSet;
use crate::io::WIP_MASK;
use crate::pads::{DataLine, PadConfig, QspiPads};
use crate::ssi::{FrameConfig, InstructionLength, SsiBus, SsiStatus, TransType, TransferMode};
use crate::xip::XipFrameSpec;

/// Simulated flash array size in bytes.
pub const SIM_FLASH_BYTES: usize = 1024;

/// Continuation pattern the device checks in the mode bits.
const CONTINUOUS_MODE_MASK: u8 = 0x30;
const CONTINUOUS_MODE_MATCH: u8 = 0x20;

const FIFO_FRAMES: usize = 16;
const LOG_ENTRIES: usize = 32;

/// A configuration write the controller contract forbids.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Violation {
    /// Clock divisor written while enabled.
    ClockDivider,
    /// Receive sample delay written while enabled.
    RxSampleDelay,
    /// Frame shape written while enabled.
    FrameConfig,
    /// Frames-per-access count written while enabled.
    FramesPerAccess,
    /// XIP command framing written while enabled.
    XipFrame,
    /// Data frame pushed while disabled.
    DataWhileDisabled,
}

/// One decoded command window, as the device saw it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transaction {
    WriteEnable,
    /// Status write with the data bytes that followed the opcode.
    WriteStatus { first: u8, second: Option<u8> },
    ReadStatus { secondary: bool },
    /// Framed quad read issued through the data FIFO.
    QuadReadPrime { addr: u32, mode: u8 },
    /// Opcode the device does not implement.
    Unknown(u8),
}

/// Why a mapped read cannot succeed in the current state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum XipFault {
    ControllerDisabled,
    /// Frame shape or frames-per-access not set for mapped reads.
    FrameShape,
    /// No XIP command framing programmed.
    NoFraming,
    /// Framed command is not the device's quad read opcode.
    UnsupportedReadCommand,
    /// The device's interface-mode bit is clear.
    QuadDisabled,
    /// Command-less framing without the device armed for it.
    ContinuousNotArmed,
    AddressOutOfRange,
}

/// Simulated serial flash device.
///
/// Shaped like a W25Q-class part by default: quad-enable in bit 1 of the
/// secondary status register, JEDEC-common opcodes, 0xEB quad read.
pub struct SimFlash {
    status1: u8,
    status2: u8,
    write_enabled: bool,
    busy_polls_left: u32,
    write_latency: u32,
    qe_mask: u8,
    qe_in_secondary: bool,
    continuous_armed: bool,
    read_opcode: u8,
    commands: CommandSet,
    contents: [u8; SIM_FLASH_BYTES],
    log: Vec<Transaction, LOG_ENTRIES>,
}

impl SimFlash {
    pub fn new() -> Self {
        Self {
            status1: 0,
            status2: 0,
            write_enabled: false,
            busy_polls_left: 0,
            write_latency: 2,
            qe_mask: 0x02,
            qe_in_secondary: true,
            continuous_armed: false,
            read_opcode: 0xEB,
            commands: CommandSet::common(),
            // Erased flash reads all ones.
            contents: [0xff; SIM_FLASH_BYTES],
            log: Vec::new(),
        }
    }

    /// An IS25LP-shaped part: one status register, quad-enable at bit 6,
    /// mode reads on the primary read-status opcode.
    pub fn issi_style() -> Self {
        let mut flash = Self::new();
        flash.qe_mask = 0x40;
        flash.qe_in_secondary = false;
        flash.commands.read_status_mode = 0x05;
        flash
    }

    /// Overwrites both status registers directly.
    pub fn set_status(&mut self, status1: u8, status2: u8) {
        self.status1 = status1;
        self.status2 = status2;
    }

    /// Raw stored status registers, without the live busy bit.
    pub fn status(&self) -> (u8, u8) {
        (self.status1, self.status2)
    }

    /// Number of primary status polls a write stays in progress for.
    pub fn set_write_latency(&mut self, polls: u32) {
        self.write_latency = polls;
    }

    pub fn continuous_armed(&self) -> bool {
        self.continuous_armed
    }

    pub fn log(&self) -> &[Transaction] {
        &self.log
    }

    /// Copies an image into the front of the flash array.
    pub fn fill(&mut self, image: &[u8]) {
        let len = image.len().min(self.contents.len());
        self.contents[..len].copy_from_slice(&image[..len]);
    }

    /// Primary status with the live write-in-progress bit.
    fn status1_live(&self) -> u8 {
        if self.busy_polls_left > 0 {
            self.status1 | WIP_MASK
        } else {
            self.status1 & !WIP_MASK
        }
    }

    fn quad_enabled(&self) -> bool {
        let register = if self.qe_in_secondary {
            self.status2
        } else {
            self.status1
        };
        register & self.qe_mask != 0
    }

    fn read_word(&self, addr: u32) -> Option<u32> {
        let start = addr as usize;
        let end = start.checked_add(4)?;
        let bytes: [u8; 4] = self.contents.get(start..end)?.try_into().ok()?;
        Some(u32::from_le_bytes(bytes))
    }

    /// Decodes one single-wire byte window. Returns one response byte per
    /// frame clocked; the frame carrying the opcode reads back as ones.
    fn byte_transaction(&mut self, frames: &[u8]) -> Vec<u8, FIFO_FRAMES> {
        let mut responses: Vec<u8, FIFO_FRAMES> = Vec::new();
        let Some((&opcode, data)) = frames.split_first() else {
            return responses;
        };
        let _ = responses.push(0xff);

        if opcode == self.commands.read_status {
            let live = self.status1_live();
            for _ in data {
                let _ = responses.push(live);
            }
            let _ = self.log.push(Transaction::ReadStatus { secondary: false });
            // One window is one poll, however many frames it clocks.
            self.busy_polls_left = self.busy_polls_left.saturating_sub(1);
        } else if opcode == self.commands.read_status_mode {
            for _ in data {
                let _ = responses.push(self.status2);
            }
            let _ = self.log.push(Transaction::ReadStatus { secondary: true });
        } else if opcode == self.commands.write_enable {
            self.write_enabled = true;
            let _ = self.log.push(Transaction::WriteEnable);
        } else if opcode == self.commands.write_status {
            self.apply_write_status(data);
        } else {
            let _ = self.log.push(Transaction::Unknown(opcode));
        }

        while responses.len() < frames.len() {
            let _ = responses.push(0xff);
        }
        responses
    }

    /// Status write takes effect only behind a set write-enable latch,
    /// but lands in the log either way.
    fn apply_write_status(&mut self, data: &[u8]) {
        let first = data.first().copied().unwrap_or(0);
        let second = data.get(1).copied();
        if self.write_enabled {
            self.status1 = first & !WIP_MASK;
            if let Some(second) = second {
                self.status2 = second;
            }
            self.busy_polls_left = self.write_latency;
            self.write_enabled = false;
        }
        let _ = self.log.push(Transaction::WriteStatus { first, second });
    }

    /// One framed read issued through the data FIFO. The low byte of the
    /// address word is the mode byte; the continuation pattern arms
    /// continuous-read mode.
    fn quad_read_prime(&mut self, command: u8, addr_word: u32) -> u32 {
        let addr = addr_word >> 8;
        let mode = (addr_word & 0xff) as u8;
        let _ = self.log.push(Transaction::QuadReadPrime { addr, mode });
        if self.quad_enabled()
            && command == self.read_opcode
            && mode & CONTINUOUS_MODE_MASK == CONTINUOUS_MODE_MATCH
        {
            self.continuous_armed = true;
        }
        self.read_word(addr).unwrap_or(0xffff_ffff)
    }

    /// One mapped read, validated against everything the device needs
    /// from the framing.
    fn xip_read(&self, framing: XipFrameSpec, offset: u32) -> Result<u32, XipFault> {
        if !self.quad_enabled() {
            return Err(XipFault::QuadDisabled);
        }
        match framing.inst_len {
            InstructionLength::Bits8 => {
                if framing.trans_type != TransType::SerialCommandWideAddress {
                    return Err(XipFault::FrameShape);
                }
                if framing.read_command != self.read_opcode {
                    return Err(XipFault::UnsupportedReadCommand);
                }
            }
            InstructionLength::None => {
                if framing.trans_type != TransType::AllWide {
                    return Err(XipFault::FrameShape);
                }
                if !self.continuous_armed
                    || framing.read_command & CONTINUOUS_MODE_MASK != CONTINUOUS_MODE_MATCH
                {
                    return Err(XipFault::ContinuousNotArmed);
                }
            }
            _ => return Err(XipFault::UnsupportedReadCommand),
        }
        self.read_word(offset).ok_or(XipFault::AddressOutOfRange)
    }
}

impl Default for SimFlash {
    fn default() -> Self {
        Self::new()
    }
}

/// Simulated controller with an attached flash device.
pub struct SimSsi {
    enabled: bool,
    clock_divider: u16,
    rx_sample_delay: u8,
    frame: FrameConfig,
    frames_per_access: u16,
    xip_frame: Option<XipFrameSpec>,
    tx: Deque<u32, FIFO_FRAMES>,
    rx: Deque<u32, FIFO_FRAMES>,
    violations: Vec<Violation, LOG_ENTRIES>,
    pub device: SimFlash,
}

impl SimSsi {
    pub fn new() -> Self {
        Self::with_device(SimFlash::new())
    }

    pub fn with_device(device: SimFlash) -> Self {
        Self {
            enabled: false,
            clock_divider: 0,
            rx_sample_delay: 0,
            frame: FrameConfig::serial_byte(),
            frames_per_access: 1,
            xip_frame: None,
            tx: Deque::new(),
            rx: Deque::new(),
            violations: Vec::new(),
            device,
        }
    }

    /// Forbidden configuration writes recorded so far.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn clock_divider(&self) -> u16 {
        self.clock_divider
    }

    pub fn rx_sample_delay(&self) -> u8 {
        self.rx_sample_delay
    }

    pub fn frame_config(&self) -> FrameConfig {
        self.frame
    }

    pub fn frames_per_access(&self) -> u16 {
        self.frames_per_access
    }

    pub fn xip_frame(&self) -> Option<XipFrameSpec> {
        self.xip_frame
    }

    /// One read of the mapped window, walking the full chain it depends
    /// on: controller enabled, quad frame shape, framing programmed, and
    /// a device state the framing actually works against.
    pub fn xip_read(&self, offset: u32) -> Result<u32, XipFault> {
        if !self.enabled {
            return Err(XipFault::ControllerDisabled);
        }
        if self.frame != FrameConfig::xip_quad() || self.frames_per_access != 1 {
            return Err(XipFault::FrameShape);
        }
        let framing = self.xip_frame.ok_or(XipFault::NoFraming)?;
        self.device.xip_read(framing, offset)
    }

    /// Records a violation when enabled. Callers drop the write.
    fn reject_if_enabled(&mut self, violation: Violation) -> bool {
        if self.enabled {
            let _ = self.violations.push(violation);
        }
        self.enabled
    }

    /// Clocks every queued TX frame out to the device as one chip-select
    /// window and queues the responses.
    fn flush_tx(&mut self) {
        if self.tx.is_empty() {
            return;
        }
        let mut frames: Vec<u32, FIFO_FRAMES> = Vec::new();
        while let Some(frame) = self.tx.pop_front() {
            let _ = frames.push(frame);
        }
        match self.frame.mode {
            TransferMode::TxAndRx => {
                let mut bytes: Vec<u8, FIFO_FRAMES> = Vec::new();
                for frame in &frames {
                    let _ = bytes.push(*frame as u8);
                }
                for response in self.device.byte_transaction(&bytes) {
                    let _ = self.rx.push_back(response as u32);
                }
            }
            TransferMode::EepromRead => {
                let command = frames.first().copied().unwrap_or(0) as u8;
                let addr_word = frames.get(1).copied().unwrap_or(0);
                let response = self.device.quad_read_prime(command, addr_word);
                let _ = self.rx.push_back(response);
            }
            TransferMode::TxOnly | TransferMode::RxOnly => {}
        }
    }
}

impl Default for SimSsi {
    fn default() -> Self {
        Self::new()
    }
}

impl SsiBus for SimSsi {
    fn set_enabled(&mut self, enabled: bool) {
        // Disabling flushes both FIFOs, as the controller does.
        if !enabled {
            self.tx.clear();
            self.rx.clear();
        }
        self.enabled = enabled;
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn set_clock_divider(&mut self, divisor: u16) {
        if self.reject_if_enabled(Violation::ClockDivider) {
            return;
        }
        self.clock_divider = divisor;
    }

    fn set_rx_sample_delay(&mut self, cycles: u8) {
        if self.reject_if_enabled(Violation::RxSampleDelay) {
            return;
        }
        self.rx_sample_delay = cycles;
    }

    fn write_frame_config(&mut self, frame: FrameConfig) {
        if self.reject_if_enabled(Violation::FrameConfig) {
            return;
        }
        self.frame = frame;
    }

    fn set_frames_per_access(&mut self, frames: u16) {
        if self.reject_if_enabled(Violation::FramesPerAccess) {
            return;
        }
        self.frames_per_access = frames;
    }

    fn write_xip_frame(&mut self, spec: XipFrameSpec) {
        if self.reject_if_enabled(Violation::XipFrame) {
            return;
        }
        self.xip_frame = Some(spec);
    }

    fn write_data(&mut self, frame: u32) {
        if !self.enabled {
            let _ = self.violations.push(Violation::DataWhileDisabled);
            return;
        }
        let _ = self.tx.push_back(frame);
    }

    fn read_data(&mut self) -> u32 {
        self.flush_tx();
        self.rx.pop_front().unwrap_or(0)
    }

    fn status(&mut self) -> SsiStatus {
        self.flush_tx();
        SsiStatus {
            busy: false,
            tx_fifo_empty: self.tx.is_empty(),
        }
    }
}

/// Simulated pad bank, every pad at its power-on state.
pub struct SimPads {
    clock: PadConfig,
    data: [PadConfig; 4],
}

impl SimPads {
    pub fn new() -> Self {
        Self {
            clock: PadConfig::default(),
            data: [PadConfig::default(); 4],
        }
    }
}

impl Default for SimPads {
    fn default() -> Self {
        Self::new()
    }
}

impl QspiPads for SimPads {
    fn clock_pad(&self) -> PadConfig {
        self.clock
    }

    fn set_clock_pad(&mut self, config: PadConfig) {
        self.clock = config;
    }

    fn data_pad(&self, line: DataLine) -> PadConfig {
        self.data[line.index()]
    }

    fn set_data_pad(&mut self, line: DataLine, config: PadConfig) {
        self.data[line.index()] = config;
    }
}
