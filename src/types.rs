//! This module defines range-checked types for JVS node numbers, PSX slots
//! and memory card sectors, meant to simplify correct usage of the API.

use snafu::{ensure, OptionExt, Snafu};

use core::convert::{TryFrom, TryInto};
use core::ops::Deref;

use crate::wire::BROADCAST;

/// Error type for this module
#[derive(Debug, Snafu, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The value isn't a valid JVS node number.
    #[snafu(display("Invalid node number"))]
    InvalidNode,
    /// The value isn't a valid PSX slot.
    #[snafu(display("Invalid slot"))]
    InvalidSlot,
    /// The value isn't a valid memory card sector.
    #[snafu(display("Invalid sector"))]
    InvalidSector,
}

const fn invalid_node() -> InvalidNodeSnafu {
    InvalidNodeSnafu
}

const fn invalid_slot() -> InvalidSlotSnafu {
    InvalidSlotSnafu
}

const fn invalid_sector() -> InvalidSectorSnafu {
    InvalidSectorSnafu
}

/// Highest node number a JVS chain can assign.
pub const MAX_NODE: u8 = 31;

/// `NodeNo` is a range-checked \[0, 31\] integer or the broadcast value 0xFF.
///
/// Node 0 is the bus master.
///
/// ## Example
/// ```
/// use jvs_psx_proto::NodeNo;
/// let n = NodeNo::new(10).unwrap();
/// assert!(!n.is_broadcast());
/// assert!(NodeNo::BROADCAST.is_broadcast());
/// assert!(NodeNo::new(32).is_err());
/// ```
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Copy, Clone, Hash)]
#[repr(transparent)]
pub struct NodeNo(u8);

/// Create a new [`NodeNo`], panics if it is out of range.
pub const fn node(n: u8) -> NodeNo {
    if n <= MAX_NODE || n == BROADCAST {
        return NodeNo(n);
    }
    panic!("Invalid node number.")
}

impl NodeNo {
    /// Address accepted by every node.
    pub const BROADCAST: NodeNo = NodeNo(BROADCAST);
    /// The bus master.
    pub const MASTER: NodeNo = NodeNo(crate::wire::MASTER);

    /// Create a new node number, checking that it is in \[0, 31\] or 0xFF.
    /// # Errors
    /// Returns [`Error::InvalidNode`] if `n` is out of range.
    pub fn new(n: impl TryInto<u8>) -> Result<Self, Error> {
        let n = n.try_into().ok().with_context(invalid_node)?;
        ensure!(n <= MAX_NODE || n == BROADCAST, invalid_node());
        Ok(Self(n))
    }

    /// True for the broadcast address.
    pub const fn is_broadcast(self) -> bool {
        self.0 == BROADCAST
    }

    /// True if a packet addressed to `self` should be accepted by `local`.
    pub const fn accepted_by(self, local: NodeNo) -> bool {
        self.0 == BROADCAST || self.0 == local.0
    }
}

impl Deref for NodeNo {
    type Target = u8;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<u8> for NodeNo {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NodeNo> for u8 {
    fn from(n: NodeNo) -> Self {
        n.0
    }
}

/// `Slot` selects one of the two PSX ports, each with its own select line.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Copy, Clone, Hash)]
#[repr(transparent)]
pub struct Slot(u8);

/// Create a new [`Slot`], panics unless it is 0 or 1.
pub const fn slot(s: u8) -> Slot {
    if s <= 1 {
        return Slot(s);
    }
    panic!("Invalid slot.")
}

impl Slot {
    /// Port 1.
    pub const ONE: Slot = Slot(0);
    /// Port 2.
    pub const TWO: Slot = Slot(1);

    /// Create a new slot, checking that it is 0 or 1.
    /// # Errors
    /// Returns [`Error::InvalidSlot`] for anything else.
    pub fn new(s: impl TryInto<u8>) -> Result<Self, Error> {
        let s = s.try_into().ok().with_context(invalid_slot)?;
        ensure!(s <= 1, invalid_slot());
        Ok(Self(s))
    }

    /// Index of the slot's select line.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<u8> for Slot {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Number of blocks on a memory card, the first one holds the directory.
pub const BLOCK_COUNT: u16 = 16;
/// Frames per block.
pub const FRAMES_PER_BLOCK: u16 = 64;
/// Highest addressable frame.
pub const MAX_SECTOR: u16 = BLOCK_COUNT * FRAMES_PER_BLOCK - 1;

/// `Sector` is a range-checked \[0, 1023\] memory card frame address.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Copy, Clone, Hash)]
#[repr(transparent)]
pub struct Sector(u16);

/// Create a new [`Sector`], panics if it is out of range.
pub const fn sector(s: u16) -> Sector {
    if s <= MAX_SECTOR {
        return Sector(s);
    }
    panic!("Invalid sector.")
}

impl Sector {
    /// Create a new sector address, checking that it is in \[0, 1023\].
    /// # Errors
    /// Returns [`Error::InvalidSector`] if `s` is out of range.
    pub fn new(s: impl TryInto<u16>) -> Result<Self, Error> {
        let s = s.try_into().ok().with_context(invalid_sector)?;
        ensure!(s <= MAX_SECTOR, invalid_sector());
        Ok(Self(s))
    }

    /// Address of `frame` within `block`.
    /// # Errors
    /// Returns [`Error::InvalidSector`] if either index is out of range.
    pub fn from_block(block: u16, frame: u16) -> Result<Self, Error> {
        ensure!(
            block < BLOCK_COUNT && frame < FRAMES_PER_BLOCK,
            invalid_sector()
        );
        Ok(Self(block * FRAMES_PER_BLOCK + frame))
    }

    /// Address high byte, sent first on the bus.
    pub const fn high(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Address low byte.
    pub const fn low(self) -> u8 {
        self.0 as u8
    }
}

impl Deref for Sector {
    type Target = u16;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<u16> for Sector {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
