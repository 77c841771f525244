//! The JVS [`Packet`] and its wire encoding.
//!
//! On the wire a packet is `[SYNC][node][length][payload…][checksum]`. Every
//! byte after SYNC is escaped: a literal SYNC or ESCAPE is sent as ESCAPE
//! followed by the value minus one. The length byte counts payload bytes
//! only, the checksum trails as a separate byte.

use arrayvec::ArrayVec;
use snafu::{ensure, OptionExt, Snafu};

use crate::command::AckStatus;
use crate::types::NodeNo;
use crate::wire::{ESCAPE, MAX_PAYLOAD, SYNC};

/// Error type for this module
#[derive(Debug, Snafu, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The payload would not fit the length byte.
    #[snafu(display("Payload exceeds {} bytes", MAX_PAYLOAD))]
    PayloadTooLong,
}

pub type Payload = ArrayVec<u8, MAX_PAYLOAD>;

/// SYNC plus node, length, payload and checksum, all of them escaped.
pub const MAX_WIRE_LEN: usize = 1 + 2 * (MAX_PAYLOAD + 3);

pub type WireBytes = ArrayVec<u8, MAX_WIRE_LEN>;

/// Addressed, checksummed unit of transport data.
///
/// The checksum is kept current while bytes are pushed, so a packet built
/// with [`Packet::new`] is always valid. Packets assembled from received
/// parts may not be, see [`Packet::is_valid`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    node_no: NodeNo,
    payload: Payload,
    checksum: u8,
}

impl Packet {
    /// An empty packet addressed to `node_no`.
    pub fn new(node_no: NodeNo) -> Self {
        Self {
            node_no,
            payload: Payload::new(),
            checksum: *node_no,
        }
    }

    /// Acknowledge packet for the bus master, with `status` as first payload byte.
    pub fn reply(status: AckStatus) -> Self {
        let mut packet = Self::new(NodeNo::MASTER);
        packet.payload.push(status as u8);
        packet.checksum = packet.checksum.wrapping_add(status as u8);
        packet
    }

    /// Assemble a packet from received parts, keeping the given checksum as is.
    /// # Errors
    /// Returns [`Error::PayloadTooLong`] if `payload` exceeds 254 bytes.
    pub fn from_parts(node_no: NodeNo, payload: &[u8], checksum: u8) -> Result<Self, Error> {
        let payload = Payload::try_from(payload).ok().context(PayloadTooLongSnafu)?;
        Ok(Self {
            node_no,
            payload,
            checksum,
        })
    }

    /// Append a byte to the payload and update the checksum.
    /// # Errors
    /// Returns [`Error::PayloadTooLong`] if the payload is full.
    pub fn push(&mut self, byte: u8) -> Result<(), Error> {
        self.payload.try_push(byte).ok().context(PayloadTooLongSnafu)?;
        self.checksum = self.checksum.wrapping_add(byte);
        Ok(())
    }

    /// Append `data` to the payload and update the checksum. Nothing is
    /// appended if `data` doesn't fit.
    /// # Errors
    /// Returns [`Error::PayloadTooLong`] if the payload would overflow.
    pub fn extend_from_slice(&mut self, data: &[u8]) -> Result<(), Error> {
        ensure!(
            data.len() <= self.payload.remaining_capacity(),
            PayloadTooLongSnafu
        );
        for byte in data {
            self.push(*byte)?;
        }
        Ok(())
    }

    pub const fn node_no(&self) -> NodeNo {
        self.node_no
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub const fn checksum(&self) -> u8 {
        self.checksum
    }

    /// True if the checksum matches the node number and payload.
    pub fn is_valid(&self) -> bool {
        self.checksum == crate::checksum(*self.node_no, &self.payload)
    }

    /// Encode the packet into its escaped on-wire form.
    pub fn encode(&self) -> WireBytes {
        let mut out = WireBytes::new();
        out.push(SYNC);
        push_escaped(&mut out, *self.node_no);
        push_escaped(&mut out, self.payload.len() as u8);
        for byte in &self.payload {
            push_escaped(&mut out, *byte);
        }
        push_escaped(&mut out, self.checksum);
        out
    }
}

/// Escaped form of a single byte: one or two wire bytes.
pub(crate) fn escape(byte: u8) -> ArrayVec<u8, 2> {
    let mut out = ArrayVec::new();
    if byte == SYNC || byte == ESCAPE {
        out.push(ESCAPE);
        out.push(byte - 1);
    } else {
        out.push(byte);
    }
    out
}

fn push_escaped(out: &mut WireBytes, byte: u8) {
    // capacity is sized for the worst case, push can't overflow
    for b in escape(byte) {
        out.push(b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::node;

    #[test]
    fn test_encode_simple() {
        let mut packet = Packet::new(node(1));
        packet.push(0x10).unwrap();
        assert_eq!(packet.checksum(), 0x11);
        assert_eq!(packet.encode().as_slice(), &[0xe0, 0x01, 0x01, 0x10, 0x11]);
    }

    #[test]
    fn test_encode_empty() {
        let packet = Packet::new(node(3));
        assert_eq!(packet.encode().as_slice(), &[0xe0, 0x03, 0x00, 0x03]);
    }

    #[test]
    fn test_escaping() {
        assert_eq!(escape(0xe0).as_slice(), &[0xd0, 0xdf]);
        assert_eq!(escape(0xd0).as_slice(), &[0xd0, 0xcf]);
        assert_eq!(escape(0xd1).as_slice(), &[0xd1]);

        let mut packet = Packet::new(node(1));
        packet.extend_from_slice(&[0xe0, 0xd0]).unwrap();
        // checksum 0x01 + 0xe0 + 0xd0 = 0xb1
        assert_eq!(
            packet.encode().as_slice(),
            &[0xe0, 0x01, 0x02, 0xd0, 0xdf, 0xd0, 0xcf, 0xb1]
        );
    }

    #[test]
    fn test_checksum_is_escaped() {
        let mut packet = Packet::new(node(0));
        packet.push(0xe0).unwrap();
        assert_eq!(packet.checksum(), 0xe0);
        assert_eq!(
            packet.encode().as_slice(),
            &[0xe0, 0x00, 0x01, 0xd0, 0xdf, 0xd0, 0xdf]
        );
    }

    #[test]
    fn test_payload_limit() {
        let mut packet = Packet::new(node(1));
        packet.extend_from_slice(&[0u8; MAX_PAYLOAD]).unwrap();
        assert_eq!(packet.push(0), Err(Error::PayloadTooLong));

        let mut packet = Packet::new(node(1));
        packet.push(1).unwrap();
        assert!(packet.extend_from_slice(&[0u8; MAX_PAYLOAD]).is_err());
        assert_eq!(packet.payload(), &[1]);

        assert!(Packet::from_parts(node(1), &[0u8; MAX_PAYLOAD + 1], 0).is_err());
    }

    #[test]
    fn test_worst_case_wire_len() {
        let mut packet = Packet::new(node(0));
        packet.extend_from_slice(&[0xd0; MAX_PAYLOAD]).unwrap();
        assert_eq!(packet.encode().len(), 1 + 1 + 1 + 2 * MAX_PAYLOAD + 1);
    }

    #[test]
    fn test_validity() {
        assert!(Packet::from_parts(node(2), &[1, 2, 3], 8).unwrap().is_valid());
        assert!(!Packet::from_parts(node(2), &[1, 2, 3], 9).unwrap().is_valid());
    }

    #[test]
    fn test_reply() {
        let packet = Packet::reply(AckStatus::Ok);
        assert_eq!(*packet.node_no(), 0);
        assert_eq!(packet.payload(), &[0x01]);
        assert!(packet.is_valid());
    }
}
