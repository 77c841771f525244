//! Sans-io implementation of two serial peripheral protocols: the JVS node
//! transport, and the PSX bus used by PlayStation memory cards and
//! controllers.
//!
//! The transport side is split into the [`Packet`] value type, the wire
//! encoder ([`Packet::encode`]) and the incremental decoder
//! ([`WireFramer`], wrapped by [`Node`] for channel I/O).
//!
//! The peripheral side is driven through [`PsxBus`], which owns the clocked
//! byte transfer, the per-slot select lines and a delay source, and shares an
//! [`AckLine`] with the ACK edge handler. Memory card and controller
//! operations are methods on the bus.
//!
//! # Example
//!
//! ```
//! use jvs_psx_proto::{node, Packet, WireFramer};
//!
//! let mut packet = Packet::new(node(1));
//! packet.push(0x10).unwrap();
//! assert_eq!(packet.encode().as_slice(), &[0xe0, 0x01, 0x01, 0x10, 0x11]);
//!
//! let mut framer = WireFramer::new(node(1));
//! let (_, received) = framer.decode_slice(&packet.encode());
//! assert_eq!(received.unwrap().payload(), &[0x10]);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]

pub mod bus;
pub mod command;
pub mod controller;
pub mod hal;
pub mod memcard;
pub mod node;
mod nom_parser;
pub mod packet;
pub mod types;

pub use bus::{Device, PsxBus, Session};
pub use controller::{Button, Buttons};
pub use hal::{AckLine, ByteTransfer, DelayUs, SelectLine};
pub use memcard::{Frame, MemoryCardError};
pub use node::{Channel, Node, WireFramer};
pub use nom_parser::{parse_frame, FrameToken};
pub use packet::Packet;
pub use types::{node, sector, slot, NodeNo, Sector, Slot};

/// Special bytes of the JVS transport.
pub mod wire {
    /// Start of packet, never escaped.
    pub const SYNC: u8 = 0xe0;
    /// Escape marker, the following byte is the escaped value minus one.
    pub const ESCAPE: u8 = 0xd0;
    /// Node number accepted by every node.
    pub const BROADCAST: u8 = 0xff;
    /// Node number of the bus master, used for replies.
    pub const MASTER: u8 = 0x00;
    /// Largest payload that fits the length byte together with the checksum.
    pub const MAX_PAYLOAD: usize = 254;
    /// Line rate of the transport.
    pub const BAUD_RATE: u32 = 115_200;
}

/// Transport checksum: node number plus every payload byte, modulo 256.
pub fn checksum(node_no: u8, payload: &[u8]) -> u8 {
    payload
        .iter()
        .fold(node_no, |sum, byte| sum.wrapping_add(*byte))
}
