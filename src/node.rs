//! Receiving side of the JVS transport.
//!
//! [`WireFramer`] is the incremental decoder: it takes one wire byte at a
//! time and yields a [`Packet`] once a complete, correctly addressed packet
//! with a valid checksum has been received. Anything else is dropped
//! silently and the decoder waits for the next SYNC.
//!
//! [`Node`] couples a decoder with a byte [`Channel`] and the local node
//! number assigned by the bus master.

use core::mem;

use log::{debug, trace};

use crate::packet::Packet;
use crate::types::NodeNo;
use crate::wire::{ESCAPE, MAX_PAYLOAD, SYNC};

/// Byte oriented duplex channel carrying the transport, typically a UART.
pub trait Channel {
    type Error;

    /// Number of received bytes that can be read without blocking.
    fn bytes_available(&mut self) -> Result<usize, Self::Error>;

    fn read_byte(&mut self) -> Result<u8, Self::Error>;

    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error>;

    /// Wait until every written byte has left the channel.
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// Decoder phase, advanced by each received byte.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Discarding bytes until a SYNC arrives.
    WaitSync,
    /// SYNC seen, the next byte is the node number.
    GotSync,
    /// Packet is for us, the next byte is the payload length.
    GotAddress,
    /// Collecting payload bytes.
    ReceivingData,
    /// Payload complete, the next byte is the checksum.
    ReceivedAll,
}

#[derive(Debug, Clone)]
struct ParserState {
    phase: Phase,
    escaped: bool,
    length: u8,
    packet: Packet,
}

impl ParserState {
    fn new() -> Self {
        Self {
            phase: Phase::WaitSync,
            escaped: false,
            length: 0,
            packet: Packet::new(NodeNo::MASTER),
        }
    }

    fn reset(&mut self) {
        self.phase = Phase::WaitSync;
        self.escaped = false;
    }
}

/// Incremental, resumable packet decoder.
///
/// Packets can be fed in arbitrary fragments, down to one byte per call.
/// A partially received packet is kept until it completes or a SYNC
/// restarts it; there is no timeout.
///
/// # Example
/// ```
/// use jvs_psx_proto::{node, WireFramer};
///
/// let mut framer = WireFramer::new(node(1));
/// let wire = [0xe0, 0x01, 0x01, 0x10, 0x11];
/// let (head, tail) = wire.split_at(4);
/// assert_eq!(framer.decode_slice(head), (4, None));
/// let (_, packet) = framer.decode_slice(tail);
/// assert_eq!(packet.unwrap().payload(), &[0x10]);
/// ```
#[derive(Debug, Clone)]
pub struct WireFramer {
    local: NodeNo,
    state: ParserState,
}

impl WireFramer {
    /// Create a decoder accepting packets for `local` and broadcasts.
    pub fn new(local: NodeNo) -> Self {
        Self {
            local,
            state: ParserState::new(),
        }
    }

    pub const fn local(&self) -> NodeNo {
        self.local
    }

    /// Change the accepted node number. A packet in progress is dropped.
    pub fn set_local(&mut self, local: NodeNo) {
        self.local = local;
        self.state.reset();
    }

    pub const fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Drop any packet in progress and wait for the next SYNC.
    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// Feed one wire byte. Returns a packet when `byte` completes one.
    pub fn decode(&mut self, byte: u8) -> Option<Packet> {
        let state = &mut self.state;

        if byte == SYNC {
            if state.phase != Phase::WaitSync {
                trace!("SYNC restarts packet in phase {:?}", state.phase);
            }
            state.phase = Phase::GotSync;
            state.escaped = false;
            return None;
        }
        if state.phase == Phase::WaitSync {
            return None;
        }
        if byte == ESCAPE {
            state.escaped = true;
            return None;
        }
        let byte = if mem::take(&mut state.escaped) {
            byte.wrapping_add(1)
        } else {
            byte
        };

        match state.phase {
            Phase::WaitSync => None,
            Phase::GotSync => {
                match NodeNo::new(byte) {
                    Ok(node_no) if node_no.accepted_by(self.local) => {
                        state.packet = Packet::new(node_no);
                        state.phase = Phase::GotAddress;
                    }
                    _ => {
                        trace!("ignoring packet for node {:#04x}", byte);
                        state.reset();
                    }
                }
                None
            }
            Phase::GotAddress => {
                if usize::from(byte) > MAX_PAYLOAD {
                    debug!("dropping packet with length {}", byte);
                    state.reset();
                } else {
                    state.length = byte;
                    state.phase = if byte == 0 {
                        Phase::ReceivedAll
                    } else {
                        Phase::ReceivingData
                    };
                }
                None
            }
            Phase::ReceivingData => {
                if state.packet.push(byte).is_err() {
                    state.reset();
                } else if state.packet.payload().len() == usize::from(state.length) {
                    state.phase = Phase::ReceivedAll;
                }
                None
            }
            Phase::ReceivedAll => {
                state.reset();
                let packet = mem::replace(&mut state.packet, Packet::new(NodeNo::MASTER));
                if packet.checksum() == byte {
                    trace!(
                        "received packet for node {:#04x}, {} bytes",
                        *packet.node_no(),
                        packet.payload().len()
                    );
                    Some(packet)
                } else {
                    debug!(
                        "dropping packet, checksum {:#04x} != {:#04x}",
                        byte,
                        packet.checksum()
                    );
                    None
                }
            }
        }
    }

    /// Feed bytes until a packet completes.
    ///
    /// Returns the number of bytes consumed, bytes after a completed packet
    /// are left to the caller.
    pub fn decode_slice(&mut self, data: &[u8]) -> (usize, Option<Packet>) {
        for (i, byte) in data.iter().enumerate() {
            if let Some(packet) = self.decode(*byte) {
                return (i + 1, Some(packet));
            }
        }
        (data.len(), None)
    }
}

/// A JVS node: decoder plus transmit side, bound to the local node number.
///
/// ```
/// use jvs_psx_proto::{node, Node, NodeNo};
/// let mut io = Node::new(NodeNo::MASTER);
/// io.set_address(node(1));
/// assert_eq!(io.address(), node(1));
/// io.reset();
/// assert_eq!(io.address(), NodeNo::MASTER);
/// ```
#[derive(Debug, Clone)]
pub struct Node {
    framer: WireFramer,
    last_sent: Option<Packet>,
}

impl Node {
    pub fn new(address: NodeNo) -> Self {
        Self {
            framer: WireFramer::new(address),
            last_sent: None,
        }
    }

    pub const fn address(&self) -> NodeNo {
        self.framer.local()
    }

    /// Take the node number assigned by the master's SetAddress command.
    pub fn set_address(&mut self, address: NodeNo) {
        debug!("node address set to {:#04x}", *address);
        self.framer.set_local(address);
    }

    /// Bus reset: forget the assigned node number and any partial packet.
    pub fn reset(&mut self) {
        self.framer.set_local(NodeNo::MASTER);
        self.last_sent = None;
    }

    pub fn framer(&mut self) -> &mut WireFramer {
        &mut self.framer
    }

    /// Consume the bytes currently available on `channel`.
    ///
    /// Returns as soon as a packet completes; remaining bytes stay in the
    /// channel for the next call. Never waits for more data.
    pub fn poll<C: Channel>(&mut self, channel: &mut C) -> Result<Option<Packet>, C::Error> {
        let available = channel.bytes_available()?;
        for _ in 0..available {
            let byte = channel.read_byte()?;
            if let Some(packet) = self.framer.decode(byte) {
                return Ok(Some(packet));
            }
        }
        Ok(None)
    }

    /// Write `packet` to `channel` and wait for it to be sent.
    pub fn send<C: Channel>(&mut self, channel: &mut C, packet: &Packet) -> Result<(), C::Error> {
        for byte in packet.encode() {
            channel.write_byte(byte)?;
        }
        channel.flush()?;
        self.last_sent = Some(packet.clone());
        Ok(())
    }

    /// Send the previous packet again, for the master's Retry command.
    /// Returns false if nothing has been sent since the last reset.
    pub fn resend<C: Channel>(&mut self, channel: &mut C) -> Result<bool, C::Error> {
        match self.last_sent.clone() {
            Some(packet) => {
                self.send(channel, &packet)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
