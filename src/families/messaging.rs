//! A custom point-to-point messaging family: a fixed envelope (source and
//! destination address/port, a hop count, and a correlation id) followed
//! by an attribute chain carrying the message body.

use crate::atoms::LeafKind;
use crate::context::DecodeContext;
use crate::cursor::Cursor;
use crate::error::{EncodeError, MessageDecodeError};
use crate::field::{ByteOrder, FieldBlock, FieldDescriptor, FieldKind, FieldValue};
use crate::header::NlmsgHeader;
use crate::message::{self, Node};
use crate::nla::{AtomKind, NlaMap, NlaSpec};

pub const MSG_ENVELOPE_FIELDS: FieldBlock = &[
    FieldDescriptor::new("dst", ByteOrder::Native, FieldKind::U32),
    FieldDescriptor::new("dport", ByteOrder::Native, FieldKind::U32),
    FieldDescriptor::new("src", ByteOrder::Native, FieldKind::U32),
    FieldDescriptor::new("sport", ByteOrder::Native, FieldKind::U32),
    FieldDescriptor::new("ttl", ByteOrder::Native, FieldKind::U16),
    FieldDescriptor::new("reserved", ByteOrder::Native, FieldKind::U16),
    FieldDescriptor::new("id", ByteOrder::Native, FieldKind::FixedBytes(16)),
];

const IPR_ATTR_CDATA: u16 = 1;
const IPR_ATTR_CNAME: u16 = 2;

pub const IPR_ATTR_MAP: &[NlaSpec] = &[
    NlaSpec { attr_type: IPR_ATTR_CDATA, name: "cdata", kind: AtomKind::Leaf(LeafKind::CData) },
    NlaSpec { attr_type: IPR_ATTR_CNAME, name: "cname", kind: AtomKind::Leaf(LeafKind::Asciiz) },
];

pub fn attr_map() -> NlaMap {
    NlaMap::new(IPR_ATTR_MAP)
}

pub type MessagingMessage = Node<NlmsgHeader>;

pub fn new_envelope(
    msg_type: u16,
    sequence_number: u32,
    dst: u32,
    dport: u32,
    src: u32,
    sport: u32,
    ttl: u16,
    id: [u8; 16],
) -> MessagingMessage {
    let mut node = Node::new(NlmsgHeader::new(msg_type, sequence_number));
    node.fields.insert("dst", FieldValue::U32(dst));
    node.fields.insert("dport", FieldValue::U32(dport));
    node.fields.insert("src", FieldValue::U32(src));
    node.fields.insert("sport", FieldValue::U32(sport));
    node.fields.insert("ttl", FieldValue::U16(ttl));
    node.fields.insert("reserved", FieldValue::U16(0));
    node.fields.insert("id", FieldValue::Bytes(id.to_vec()));
    node
}

pub fn decode(cur: &mut Cursor) -> Result<MessagingMessage, MessageDecodeError> {
    let map = attr_map();
    let ctx = DecodeContext::new();
    message::decode_message(cur, MSG_ENVELOPE_FIELDS, Some(&map), &ctx)
}

pub fn encode(message: &MessagingMessage) -> Result<Vec<u8>, EncodeError> {
    let mut cur = Cursor::new();
    message::encode_message(&mut cur, message, MSG_ENVELOPE_FIELDS)?;
    Ok(cur.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::Atom;
    use crate::nla::{get_attr, AttrEntry, AttrForm, AttrValue};

    #[test]
    fn envelope_and_cdata_round_trip() {
        let id = [0x11u8; 16];
        let mut msg = new_envelope(0x20, 1, 0x0a000001, 5000, 0x0a000002, 5001, 64, id);
        msg.attrs.push(AttrEntry {
            attr_type: IPR_ATTR_CDATA,
            name: Some("cdata"),
            value: AttrValue::Atom(Atom::CData(vec![0xde, 0xad, 0xbe, 0xef])),
            ..Default::default()
        });
        msg.attrs.push(AttrEntry {
            attr_type: IPR_ATTR_CNAME,
            name: Some("cname"),
            value: AttrValue::Atom(Atom::Asciiz("hello".to_string())),
            ..Default::default()
        });

        let wire = encode(&msg).unwrap();
        let mut cur = Cursor::from_bytes(wire);
        let decoded = decode(&mut cur).unwrap();

        assert_eq!(decoded.fields.get("dport"), Some(&FieldValue::U32(5000)));
        assert_eq!(decoded.fields.get("ttl"), Some(&FieldValue::U16(64)));
        assert_eq!(decoded.fields.get("id").unwrap().as_bytes().unwrap(), &id);
        assert_eq!(
            get_attr(&decoded.attrs, "cdata", None, AttrForm::Value).unwrap().as_value().unwrap(),
            &AttrValue::Atom(Atom::CData(vec![0xde, 0xad, 0xbe, 0xef]))
        );
        assert_eq!(
            get_attr(&decoded.attrs, "cname", None, AttrForm::Value).unwrap().as_value().unwrap(),
            &AttrValue::Atom(Atom::Asciiz("hello".to_string()))
        );
    }
}
