//! The built-in leaf attribute types: `none`, the fixed-width
//! unsigned integers, an IP address, an L2 (MAC) address, a hex dump, raw
//! opaque binary, and a zero-terminated string.
//!
//! Each atom is a pure function pair operating directly on an attribute's
//! payload bytes — unlike the field codec, these aren't declared through
//! the `B H I Q s z` format grammar, because several of them (`ipaddr`,
//! `l2addr`) need bespoke presentation-form conversions the grammar has no
//! way to express.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use crate::context::DecodeContext;
use crate::error::{AtomDecodeError, EncodeError};

/// `AF_INET` / `AF_INET6` as carried in a `family` field. The engine does
/// not otherwise validate that an address belongs to a valid family.
pub const AF_INET: u16 = 2;
pub const AF_INET6: u16 = 10;

/// A 6-byte L2 (MAC) address, presented as `xx:xx:xx:xx:xx:xx`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MacAddr(pub [u8; 6]);

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl FromStr for MacAddr {
    type Err = AtomDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut out = [0u8; 6];
        let mut parts = s.split(':');
        for slot in out.iter_mut() {
            let part = parts
                .next()
                .ok_or(AtomDecodeError::UnexpectedLength { expected: "6 octets", got: 0 })?;
            *slot = u8::from_str_radix(part, 16)
                .map_err(|_| AtomDecodeError::UnexpectedLength { expected: "hex octet", got: part.len() })?;
        }
        if parts.next().is_some() {
            return Err(AtomDecodeError::UnexpectedLength { expected: "6 octets", got: 7 });
        }
        Ok(MacAddr(out))
    }
}

/// Which built-in codec a leaf attribute slot uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafKind {
    None,
    U8,
    U16,
    U32,
    U64,
    IpAddr,
    L2Addr,
    Hex,
    CData,
    Asciiz,
}

/// The decoded value of one leaf attribute.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Atom {
    None,
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    IpAddr(IpAddr),
    L2Addr(MacAddr),
    Hex(String),
    CData(Vec<u8>),
    Asciiz(String),
}

/// Render `payload` as a lowercase hex dump, e.g. `"de:ad:be:ef"`-less
/// contiguous form `"deadbeef"` (the `hex` atom is explicitly documented
/// as "not normally round-trippable", so there is no colon-separated
/// presentation contract to honor here, unlike `l2addr`).
fn hexdump(payload: &[u8]) -> String {
    payload.iter().map(|b| format!("{b:02x}")).collect()
}

pub fn decode(kind: LeafKind, payload: &[u8], ctx: &DecodeContext) -> Result<Atom, AtomDecodeError> {
    match kind {
        LeafKind::None => Ok(Atom::None),
        LeafKind::U8 => {
            let b = payload
                .first()
                .ok_or(AtomDecodeError::UnexpectedLength { expected: "1", got: payload.len() })?;
            Ok(Atom::U8(*b))
        }
        LeafKind::U16 => {
            let bytes: [u8; 2] = payload
                .try_into()
                .map_err(|_| AtomDecodeError::UnexpectedLength { expected: "2", got: payload.len() })?;
            Ok(Atom::U16(u16::from_ne_bytes(bytes)))
        }
        LeafKind::U32 => {
            let bytes: [u8; 4] = payload
                .try_into()
                .map_err(|_| AtomDecodeError::UnexpectedLength { expected: "4", got: payload.len() })?;
            Ok(Atom::U32(u32::from_ne_bytes(bytes)))
        }
        LeafKind::U64 => {
            let bytes: [u8; 8] = payload
                .try_into()
                .map_err(|_| AtomDecodeError::UnexpectedLength { expected: "8", got: payload.len() })?;
            Ok(Atom::U64(u64::from_ne_bytes(bytes)))
        }
        LeafKind::IpAddr => {
            let family = ctx.family.ok_or(AtomDecodeError::MissingFamily)?;
            let ip = match (family, payload.len()) {
                (AF_INET, 4) => IpAddr::V4(Ipv4Addr::new(payload[0], payload[1], payload[2], payload[3])),
                (AF_INET6, 16) => {
                    let bytes: [u8; 16] = payload.try_into().unwrap();
                    IpAddr::V6(Ipv6Addr::from(bytes))
                }
                (AF_INET, n) | (AF_INET6, n) => {
                    return Err(AtomDecodeError::UnexpectedLength { expected: "4 or 16", got: n })
                }
                (other, _) => return Err(AtomDecodeError::UnsupportedFamily(other)),
            };
            Ok(Atom::IpAddr(ip))
        }
        LeafKind::L2Addr => {
            let bytes: [u8; 6] = payload
                .try_into()
                .map_err(|_| AtomDecodeError::UnexpectedLength { expected: "6", got: payload.len() })?;
            Ok(Atom::L2Addr(MacAddr(bytes)))
        }
        LeafKind::Hex => Ok(Atom::Hex(hexdump(payload))),
        LeafKind::CData => Ok(Atom::CData(payload.to_vec())),
        LeafKind::Asciiz => {
            let body = payload.strip_suffix(&[0]).unwrap_or(payload);
            match std::str::from_utf8(body) {
                Ok(s) => Ok(Atom::Asciiz(s.to_string())),
                Err(_) => Ok(Atom::Asciiz(String::from_utf8_lossy(body).into_owned())),
            }
        }
    }
}

/// Encode an atom's value back to wire bytes. `cdata` and the raw
/// fallback the attribute-chain walk uses are the only forms guaranteed
/// to round-trip exactly; `hex` is a diagnostic dump and is refused here.
pub fn encode(atom: &Atom) -> Result<Vec<u8>, EncodeError> {
    let bytes = match atom {
        Atom::None => Vec::new(),
        Atom::U8(v) => vec![*v],
        Atom::U16(v) => v.to_ne_bytes().to_vec(),
        Atom::U32(v) => v.to_ne_bytes().to_vec(),
        Atom::U64(v) => v.to_ne_bytes().to_vec(),
        Atom::IpAddr(IpAddr::V4(v)) => v.octets().to_vec(),
        Atom::IpAddr(IpAddr::V6(v)) => v.octets().to_vec(),
        Atom::L2Addr(mac) => mac.0.to_vec(),
        Atom::CData(bytes) => bytes.clone(),
        Atom::Asciiz(s) => {
            let mut bytes = s.as_bytes().to_vec();
            bytes.push(0);
            bytes
        }
        Atom::Hex(_) => {
            return Err(EncodeError::Attribute {
                attr: "hex",
                reason: "the hex atom is a diagnostic dump and is not round-trippable".into(),
            })
        }
    };
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipaddr_roundtrips_v6_under_family_context() {
        let ctx = DecodeContext::new().with_family(AF_INET6);
        let payload: [u8; 16] = [0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1];
        let atom = decode(LeafKind::IpAddr, &payload, &ctx).unwrap();
        assert_eq!(atom, Atom::IpAddr("2001:db8::1".parse().unwrap()));
        assert_eq!(encode(&atom).unwrap(), payload.to_vec());
    }

    #[test]
    fn ipaddr_without_family_in_context_fails() {
        let ctx = DecodeContext::new();
        let err = decode(LeafKind::IpAddr, &[1, 2, 3, 4], &ctx).unwrap_err();
        assert!(matches!(err, AtomDecodeError::MissingFamily));
    }

    #[test]
    fn l2addr_presentation_form() {
        let mac = MacAddr([0xde, 0xad, 0xbe, 0xef, 0x00, 0x01]);
        assert_eq!(mac.to_string(), "de:ad:be:ef:00:01");
        assert_eq!("de:ad:be:ef:00:01".parse::<MacAddr>().unwrap(), mac);
    }

    #[test]
    fn asciiz_drops_trailing_null_both_ways() {
        let ctx = DecodeContext::new();
        let atom = decode(LeafKind::Asciiz, b"hello\0", &ctx).unwrap();
        assert_eq!(atom, Atom::Asciiz("hello".to_string()));
        assert_eq!(encode(&atom).unwrap(), b"hello\0".to_vec());
    }

    #[test]
    fn hex_refuses_to_encode() {
        let atom = Atom::Hex("deadbeef".to_string());
        assert!(encode(&atom).is_err());
    }
}
