//! The two fixed header shapes every node in this engine is framed by:
//! the outer `nlmsghdr` and the inner attribute header. Both implement
//! [`MessageHeader`] so the generic message-base decode/encode skeleton in
//! [`crate::message`] can be written once and reused for both
//! message-level and attribute-level nodes.

use crate::cursor::Cursor;
use crate::error::HeaderDecodeError;

pub const NLM_F_REQUEST: u16 = 1;
pub const NLM_F_MULTI: u16 = 2;
pub const NLM_F_ACK: u16 = 4;
pub const NLM_F_DUMP_INTR: u16 = 0x10;
pub const NLM_F_DUMP: u16 = 0x100 | 0x200; // NLM_F_ROOT | NLM_F_MATCH

pub const NLMSG_ERROR: u16 = 2;
pub const NLMSG_DONE: u16 = 3;

/// Attribute-header "nested" flag (`NLA_F_NESTED`), set on the numeric
/// type of attributes whose payload is itself an attribute chain.
pub const NLA_F_NESTED: u16 = 1 << 15;
/// Attribute-header "network byte order" flag (`NLA_F_NET_BYTEORDER`).
pub const NLA_F_NET_BYTEORDER: u16 = 1 << 14;
const NLA_TYPE_MASK: u16 = !(NLA_F_NESTED | NLA_F_NET_BYTEORDER);

/// Common behavior of a fixed framing header: decode/encode itself, and
/// expose the `length`/`type` fields the surrounding message-base skeleton
/// needs to know how many bytes the node occupies and how to dispatch it.
pub trait MessageHeader: Copy + std::fmt::Debug {
    const SIZE: usize;

    fn decode(cur: &mut Cursor) -> Result<Self, HeaderDecodeError>
    where
        Self: Sized;
    fn encode(&self, cur: &mut Cursor);

    fn length(&self) -> usize;
    fn set_length(&mut self, len: usize);

    /// The numeric type this header carries (`nlmsg_type` or the
    /// attribute's `nla_type`, masked of its flag bits).
    fn type_code(&self) -> u16;
    fn set_type_code(&mut self, type_code: u16);
}

/// The standard 16-byte Netlink message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NlmsgHeader {
    pub length: u32,
    pub msg_type: u16,
    pub flags: u16,
    pub sequence_number: u32,
    pub pid: u32,
}

impl NlmsgHeader {
    pub fn new(msg_type: u16, sequence_number: u32) -> Self {
        NlmsgHeader {
            length: 0,
            msg_type,
            flags: NLM_F_REQUEST | NLM_F_ACK,
            sequence_number,
            pid: 0,
        }
    }
}

impl MessageHeader for NlmsgHeader {
    const SIZE: usize = 16;

    fn decode(cur: &mut Cursor) -> Result<Self, HeaderDecodeError> {
        let available = cur.len().saturating_sub(cur.tell());
        let bytes = cur.read(Self::SIZE).ok_or(HeaderDecodeError::Truncated { needed: Self::SIZE, available })?;
        Ok(NlmsgHeader {
            length: u32::from_ne_bytes(bytes[0..4].try_into().unwrap()),
            msg_type: u16::from_ne_bytes(bytes[4..6].try_into().unwrap()),
            flags: u16::from_ne_bytes(bytes[6..8].try_into().unwrap()),
            sequence_number: u32::from_ne_bytes(bytes[8..12].try_into().unwrap()),
            pid: u32::from_ne_bytes(bytes[12..16].try_into().unwrap()),
        })
    }

    fn encode(&self, cur: &mut Cursor) {
        cur.write(&self.length.to_ne_bytes());
        cur.write(&self.msg_type.to_ne_bytes());
        cur.write(&self.flags.to_ne_bytes());
        cur.write(&self.sequence_number.to_ne_bytes());
        cur.write(&self.pid.to_ne_bytes());
    }

    fn length(&self) -> usize {
        self.length as usize
    }

    fn set_length(&mut self, len: usize) {
        self.length = len as u32;
    }

    fn type_code(&self) -> u16 {
        self.msg_type
    }

    fn set_type_code(&mut self, type_code: u16) {
        self.msg_type = type_code;
    }
}

/// The 4-byte attribute (NLA) header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NlaHeader {
    pub length: u16,
    pub attr_type: u16,
}

impl NlaHeader {
    pub fn is_nested(&self) -> bool {
        self.attr_type & NLA_F_NESTED != 0
    }

    /// The attribute type with the nested/byte-order flag bits masked
    /// off — this is what a family's NLA map indexes by.
    pub fn payload_type(&self) -> u16 {
        self.attr_type & NLA_TYPE_MASK
    }
}

impl MessageHeader for NlaHeader {
    const SIZE: usize = 4;

    fn decode(cur: &mut Cursor) -> Result<Self, HeaderDecodeError> {
        let available = cur.len().saturating_sub(cur.tell());
        let bytes = cur.read(Self::SIZE).ok_or(HeaderDecodeError::Truncated { needed: Self::SIZE, available })?;
        Ok(NlaHeader {
            length: u16::from_ne_bytes(bytes[0..2].try_into().unwrap()),
            attr_type: u16::from_ne_bytes(bytes[2..4].try_into().unwrap()),
        })
    }

    fn encode(&self, cur: &mut Cursor) {
        cur.write(&self.length.to_ne_bytes());
        cur.write(&self.attr_type.to_ne_bytes());
    }

    fn length(&self) -> usize {
        self.length as usize
    }

    fn set_length(&mut self, len: usize) {
        self.length = len as u16;
    }

    fn type_code(&self) -> u16 {
        self.payload_type()
    }

    fn set_type_code(&mut self, type_code: u16) {
        self.attr_type = (self.attr_type & !NLA_TYPE_MASK) | (type_code & NLA_TYPE_MASK);
    }
}

/// The generic-netlink family header (`cmd`, `version`, `reserved`),
/// appended inside the payload of a `GENL_ID_CTRL`-framed message. This is
/// not itself a [`MessageHeader`] — it rides in the field block, not the
/// framing header — but lives here next to the other fixed wire shapes.
pub const GENL_HDR_FIELDS: crate::field::FieldBlock = &[
    crate::field::FieldDescriptor::new("cmd", crate::field::ByteOrder::Native, crate::field::FieldKind::U8),
    crate::field::FieldDescriptor::new(
        "version",
        crate::field::ByteOrder::Native,
        crate::field::FieldKind::U8,
    ),
    crate::field::FieldDescriptor::new(
        "reserved",
        crate::field::ByteOrder::Native,
        crate::field::FieldKind::U16,
    ),
];
