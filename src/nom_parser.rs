//! Frame scanner over contiguous wire buffers, for bus monitors.

use nom::branch::alt;
use nom::bytes::streaming::tag;
use nom::combinator::{map, map_res, verify};
use nom::multi::many1_count;
use nom::number::streaming::u8;
use nom::sequence::preceded;
use nom::Err::Incomplete;
use nom::IResult;

use crate::packet::{Packet, Payload};
use crate::types::NodeNo;
use crate::wire::{ESCAPE, MAX_PAYLOAD, SYNC};

type Buf = [u8];

const SYNC_TAG: &Buf = &[SYNC];
const ESCAPE_TAG: &Buf = &[ESCAPE];

/// Result of scanning a wire buffer with [`parse_frame`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameToken {
    /// A complete packet with a valid checksum, for any node.
    Packet(Packet),
    /// A frame that failed its checksum, or was cut short by a SYNC.
    Corrupt,
    /// No complete frame in the buffer yet.
    NeedData,
}

/// Scan a buffer of wire bytes for the next frame, regardless of address.
///
/// Returns the number of bytes consumed and what was found. Bytes before
/// the first SYNC are consumed as garbage. On [`FrameToken::NeedData`] the
/// caller keeps the unconsumed tail and calls again once more data arrived.
///
/// ```
/// use jvs_psx_proto::{parse_frame, FrameToken};
/// let (consumed, token) = parse_frame(&[0x00, 0xe0, 0x05, 0x01, 0x10, 0x15, 0xe0]);
/// assert_eq!(consumed, 6);
/// assert!(matches!(token, FrameToken::Packet(p) if *p.node_no() == 5));
/// ```
pub fn parse_frame(buf: &Buf) -> (usize, FrameToken) {
    let start = match buf.iter().position(|b| *b == SYNC) {
        Some(start) => start,
        None => return (buf.len(), FrameToken::NeedData),
    };
    match frame(&buf[start..]) {
        Ok((remaining, token)) => (buf.len() - remaining.len(), token),
        Err(Incomplete(_)) => (start, FrameToken::NeedData),
        // skip this SYNC, the next call resynchronizes on the following one
        Err(_) => (start + 1, FrameToken::Corrupt),
    }
}

fn frame(buf: &Buf) -> IResult<&Buf, FrameToken> {
    let (buf, _sync) = tag(SYNC_TAG)(buf)?;
    let (buf, node_no) = map_res(escaped_byte, |b: u8| NodeNo::new(b))(buf)?;
    let (mut buf, length) = verify(escaped_byte, |len: &u8| usize::from(*len) <= MAX_PAYLOAD)(buf)?;

    let mut payload = Payload::new();
    for _ in 0..length {
        let (remaining, byte) = escaped_byte(buf)?;
        payload.push(byte);
        buf = remaining;
    }
    let (buf, sum) = escaped_byte(buf)?;

    let token = match Packet::from_parts(node_no, &payload, sum) {
        Ok(packet) if packet.is_valid() => FrameToken::Packet(packet),
        _ => FrameToken::Corrupt,
    };
    Ok((buf, token))
}

fn escaped_byte(buf: &Buf) -> IResult<&Buf, u8> {
    alt((
        map(
            // repeated ESCAPE markers collapse into one
            preceded(many1_count(tag(ESCAPE_TAG)), verify(u8, |b: &u8| *b != SYNC)),
            |b: u8| b.wrapping_add(1),
        ),
        verify(u8, |b: &u8| *b != SYNC && *b != ESCAPE),
    ))(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::node;

    use nom::Needed;

    macro_rules! incomplete {
        ($x: expr) => {
            Err(Incomplete(Needed::new($x)))
        };
    }

    fn packet(node_no: u8, payload: &[u8]) -> Packet {
        let mut packet = Packet::new(node(node_no));
        packet.extend_from_slice(payload).unwrap();
        packet
    }

    #[test]
    fn test_escaped_byte() {
        assert_eq!(escaped_byte(b"\x10\x11"), Ok((&b"\x11"[..], 0x10)));
        assert_eq!(escaped_byte(b"\xd0\xdf"), Ok((&b""[..], 0xe0)));
        assert_eq!(escaped_byte(b"\xd0\xcf"), Ok((&b""[..], 0xd0)));
        assert_eq!(escaped_byte(b"\xd0"), incomplete!(1));
        assert_eq!(escaped_byte(b""), incomplete!(1));
        assert!(escaped_byte(b"\xe0").is_err());
        assert!(escaped_byte(b"\xd0\xe0").is_err());
    }

    #[test]
    fn test_repeated_escape() {
        assert_eq!(escaped_byte(b"\xd0\xd0\x10\x11"), Ok((&b"\x11"[..], 0x11)));
        assert_eq!(escaped_byte(b"\xd0\xd0"), incomplete!(1));

        // node 1, length 1, payload D0 D0 0F, checksum 0x11
        let wire = [0xe0, 0x01, 0x01, 0xd0, 0xd0, 0x0f, 0x11];
        let (consumed, decoded) = crate::WireFramer::new(node(1)).decode_slice(&wire);
        assert_eq!(decoded.as_ref().map(Packet::payload), Some(&[0x10][..]));
        assert_eq!(parse_frame(&wire), (consumed, FrameToken::Packet(decoded.unwrap())));
    }

    #[test]
    fn test_parse_frame() {
        let p = packet(3, &[0xe0, 0x01, 0xd0]);
        let wire = p.encode();
        assert_eq!(parse_frame(&wire), (wire.len(), FrameToken::Packet(p)));
    }

    #[test]
    fn test_need_data() {
        let wire = packet(3, &[1, 2, 3]).encode();
        for cut in 1..wire.len() {
            assert_eq!(parse_frame(&wire[..cut]), (0, FrameToken::NeedData));
        }
        assert_eq!(parse_frame(b"\x01\x02"), (2, FrameToken::NeedData));
        assert_eq!(parse_frame(b"\x01\x02\xe0\x03"), (2, FrameToken::NeedData));
    }

    #[test]
    fn test_corrupt() {
        let mut wire = packet(3, &[1, 2, 3]).encode().to_vec();
        let last = wire.len() - 1;
        wire[last] ^= 0x01;
        assert_eq!(parse_frame(&wire), (wire.len(), FrameToken::Corrupt));

        // SYNC inside a frame aborts it, the next frame is still found
        let mut wire = vec![0xe0, 0x03, 0x04, 0x01];
        let second = packet(4, &[9]);
        wire.extend_from_slice(&second.encode());
        let (consumed, token) = parse_frame(&wire);
        assert_eq!((consumed, token), (1, FrameToken::Corrupt));
        let (_, token) = parse_frame(&wire[consumed..]);
        assert_eq!(token, FrameToken::Packet(second));
    }

    #[test]
    fn test_agrees_with_framer() {
        let p = packet(0xff, &[0xd0, 0xd0, 0xe0, 0x7f]);
        let wire = p.encode();
        let mut framer = crate::WireFramer::new(node(1));
        let (_, decoded) = framer.decode_slice(&wire);
        assert_eq!(parse_frame(&wire).1, FrameToken::Packet(decoded.unwrap()));
    }
}
