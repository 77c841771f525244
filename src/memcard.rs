//! PlayStation memory card frame transfers.
//!
//! A card holds 1024 frames of 128 bytes. Reads and writes move one frame,
//! protected by an xor checksum over the address bytes and the data.

use log::debug;
use snafu::{ensure, Snafu};

use crate::bus::{Device, PsxBus};
use crate::hal::{ByteTransfer, DelayUs, SelectLine};
use crate::types::{Sector, Slot};

/// Bytes per memory card frame.
pub const FRAME_SIZE: usize = 128;

pub type Frame = [u8; FRAME_SIZE];

/// Read command.
pub const READ: u8 = b'R';
/// Write command.
pub const WRITE: u8 = b'W';
/// Final status of a successful transfer.
pub const STATUS_GOOD: u8 = b'G';
/// Final status after a write with a bad checksum.
pub const STATUS_BAD_CHECKSUM: u8 = b'N';
/// Final status for a bad sector, also the idle bus level.
pub const STATUS_BAD_SECTOR: u8 = 0xff;
/// First card ID byte.
pub const CARD_ID: u8 = 0x5a;
/// First acknowledge byte after the address during a read.
pub const READ_ACK: u8 = 0x5c;

mod pace {
    use crate::bus::Pace;

    pub const READ_SELECT: Pace = Pace::new(500, 70);
    pub const READ_HEADER: Pace = Pace::new(500, 45);
    pub const READ_ACK: Pace = Pace::new(2800, 45);
    pub const READ_CONFIRM: Pace = Pace::new(2800, 0);
    pub const READ_DATA: Pace = Pace::new(150, 0);
    pub const READ_TRAILER: Pace = Pace::new(500, 0);

    pub const WRITE_HEADER: Pace = Pace::new(300, 45);
    pub const WRITE_DATA: Pace = Pace::new(150, 0);
    pub const WRITE_TRAILER: Pace = Pace::new(200, 0);
    pub const WRITE_STATUS: Pace = Pace::new(0, 0);
}

/// Why a memory card transfer failed.
#[derive(Debug, Snafu, PartialEq, Eq)]
#[non_exhaustive]
pub enum MemoryCardError {
    /// Nothing answered the command byte.
    #[snafu(display("No memory card"))]
    NoCard,
    /// The card didn't acknowledge the address.
    #[snafu(display("Address not acknowledged, got {:#04x}", received))]
    NotAcknowledged { received: u8 },
    /// The frame read didn't match the card's checksum.
    #[snafu(display(
        "Checksum mismatch, computed {:#04x}, card sent {:#04x}",
        computed,
        received
    ))]
    ChecksumMismatch { computed: u8, received: u8 },
    /// The card rejected the checksum of a written frame.
    #[snafu(display("Card reported bad checksum"))]
    BadChecksum,
    /// The card reported a bad sector.
    #[snafu(display("Card reported bad sector"))]
    BadSector,
    #[snafu(display("Unexpected status {:#04x}", status))]
    UnexpectedStatus { status: u8 },
}

fn check_status(status: u8) -> Result<(), MemoryCardError> {
    match status {
        STATUS_GOOD => Ok(()),
        STATUS_BAD_CHECKSUM => BadChecksumSnafu.fail(),
        STATUS_BAD_SECTOR => BadSectorSnafu.fail(),
        status => UnexpectedStatusSnafu { status }.fail(),
    }
}

impl<T, S, D> PsxBus<'_, T, S, D>
where
    T: ByteTransfer,
    S: SelectLine,
    D: DelayUs,
{
    /// Read `sector` from the card in `slot` into `output`.
    ///
    /// Without an output buffer only the card's presence is checked.
    /// Every failure, missing card and bad checksum alike, reads as `false`;
    /// use [`read_memory_card`](Self::read_memory_card) to tell them apart.
    pub fn try_read_memory_card(
        &mut self,
        slot: Slot,
        sector: Sector,
        output: Option<&mut Frame>,
    ) -> bool {
        match output {
            Some(output) => self.read_memory_card(slot, sector, output).is_ok(),
            None => self.is_memory_card_present(slot),
        }
    }

    /// True if a memory card answers in `slot`.
    pub fn is_memory_card_present(&mut self, slot: Slot) -> bool {
        let mut session = self.select(slot);
        session.exchange(Device::MemoryCard as u8, pace::READ_SELECT);
        if session.exchange(READ, pace::READ_HEADER) == 0xff {
            return false;
        }
        let id = session.exchange(0x00, pace::READ_HEADER);
        session.exchange(0x00, pace::READ_HEADER);
        id == CARD_ID
    }

    /// Read `sector` from the card in `slot` into `output`.
    /// # Errors
    /// Returns the first protocol violation seen; `output` may be partially
    /// filled.
    pub fn read_memory_card(
        &mut self,
        slot: Slot,
        sector: Sector,
        output: &mut Frame,
    ) -> Result<(), MemoryCardError> {
        let result = self.read_frame(slot, sector, output);
        if let Err(e) = &result {
            debug!("reading sector {} in slot {}: {}", *sector, slot.index(), e);
        }
        result
    }

    fn read_frame(
        &mut self,
        slot: Slot,
        sector: Sector,
        output: &mut Frame,
    ) -> Result<(), MemoryCardError> {
        let mut session = self.select(slot);

        session.exchange(Device::MemoryCard as u8, pace::READ_SELECT);
        ensure!(
            session.exchange(READ, pace::READ_HEADER) != 0xff,
            NoCardSnafu
        );
        // card ID, not checked when reading
        session.exchange(0x00, pace::READ_HEADER);
        session.exchange(0x00, pace::READ_HEADER);

        session.exchange(sector.high(), pace::READ_HEADER);
        session.exchange(sector.low(), pace::READ_HEADER);
        let received = session.exchange(0x00, pace::READ_ACK);
        ensure!(received == READ_ACK, NotAcknowledgedSnafu { received });
        session.exchange(0x00, pace::READ_CONFIRM);

        let mut computed = session.exchange(0x00, pace::READ_CONFIRM);
        computed ^= session.exchange(0x00, pace::READ_CONFIRM);
        for byte in output.iter_mut() {
            *byte = session.exchange(0x00, pace::READ_DATA);
            computed ^= *byte;
        }
        let received = session.exchange(0x00, pace::READ_TRAILER);
        let status = session.exchange(0x00, pace::READ_TRAILER);

        check_status(status)?;
        ensure!(
            computed == received,
            ChecksumMismatchSnafu { computed, received }
        );
        Ok(())
    }

    /// Write `input` to `sector` of the card in `slot`.
    ///
    /// All failures read as `false`; see [`write_memory_card`](Self::write_memory_card).
    pub fn try_write_memory_card(&mut self, slot: Slot, sector: Sector, input: &Frame) -> bool {
        self.write_memory_card(slot, sector, input).is_ok()
    }

    /// Write `input` to `sector` of the card in `slot`.
    /// # Errors
    /// [`MemoryCardError::NoCard`] if nothing answers, otherwise the status
    /// reported by the card.
    pub fn write_memory_card(
        &mut self,
        slot: Slot,
        sector: Sector,
        input: &Frame,
    ) -> Result<(), MemoryCardError> {
        let result = self.write_frame(slot, sector, input);
        if let Err(e) = &result {
            debug!("writing sector {} in slot {}: {}", *sector, slot.index(), e);
        }
        result
    }

    fn write_frame(
        &mut self,
        slot: Slot,
        sector: Sector,
        input: &Frame,
    ) -> Result<(), MemoryCardError> {
        let mut session = self.select(slot);

        session.exchange(Device::MemoryCard as u8, pace::WRITE_HEADER);
        ensure!(
            session.exchange(WRITE, pace::WRITE_HEADER) != 0xff,
            NoCardSnafu
        );
        session.exchange(0x00, pace::WRITE_HEADER);
        session.exchange(0x00, pace::WRITE_HEADER);

        session.exchange(sector.high(), pace::WRITE_HEADER);
        session.exchange(sector.low(), pace::WRITE_HEADER);
        let mut checksum = sector.high() ^ sector.low();
        for byte in input {
            session.exchange(*byte, pace::WRITE_DATA);
            checksum ^= *byte;
        }
        session.exchange(checksum, pace::WRITE_TRAILER);
        session.exchange(0x00, pace::WRITE_TRAILER);
        session.exchange(0x00, pace::WRITE_TRAILER);

        check_status(session.exchange(0x00, pace::WRITE_STATUS))
    }
}
