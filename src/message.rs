//! The generic message-base skeleton shared by every framed node, whether
//! it's a top-level `nlmsghdr`-framed message or an `nla`-framed attribute
//! carrying a nested field block of its own. A family module supplies the
//! header type, a field block, and an attribute map; this module supplies
//! the three-phase decode/encode walk once.

use std::collections::HashMap;

use crate::context::DecodeContext;
use crate::cursor::{align4, Cursor, Whence};
use crate::error::MessageDecodeError;
use crate::field::{self, FieldBlock, FieldValue};
use crate::header::MessageHeader;
use crate::nla::{self, AttrEntry, NlaMap};

/// A decoded node: its header, its fixed field values, and its attribute
/// chain. Generic over the header shape so the same struct serves both
/// message-level (`NlmsgHeader`) and attribute-level (`NlaHeader`) framing.
///
/// There is deliberately no back-reference to an enclosing node — callers
/// that need ancestor state thread a [`DecodeContext`] instead.
#[derive(Debug, Clone)]
pub struct Node<H: MessageHeader> {
    pub header: H,
    pub fields: HashMap<&'static str, FieldValue>,
    pub attrs: Vec<AttrEntry>,
    /// The node's original byte slice, its position within the buffer it
    /// was decoded from, and its declared length. Empty/zero on a node
    /// built fresh for encoding rather than decoded from the wire.
    pub raw: Vec<u8>,
    pub offset: usize,
    pub length: usize,
}

impl<H: MessageHeader> Node<H> {
    pub fn new(header: H) -> Self {
        Node { header, fields: HashMap::new(), attrs: Vec::new(), raw: Vec::new(), offset: 0, length: 0 }
    }
}

/// Decode one framed node: header, then its field block, then whatever
/// attribute chain fills the rest of its declared length. The field block
/// and the attribute chain are each aligned to a 4-byte boundary, so an
/// odd-sized field block doesn't desynchronize the attribute walk.
///
/// `ctx` carries the family (for atoms like `ipaddr` that need it) and the
/// recursion budget for nested attributes; it is not mutated here, only
/// passed down into [`nla::decode_attr_chain`].
pub fn decode_message<H: MessageHeader>(
    cur: &mut Cursor,
    fields: FieldBlock,
    map: Option<&NlaMap>,
    ctx: &DecodeContext,
) -> Result<Node<H>, MessageDecodeError> {
    let start = cur.tell();
    let header = H::decode(cur)?;
    let declared_len = header.length();
    let body_remaining = declared_len.saturating_sub(H::SIZE);

    let field_start = cur.tell();
    let field_values = field::decode(fields, cur, body_remaining);
    cur.align4();
    let consumed_before_attrs = cur.tell() - field_start;

    // A field block that declares its own `family` (e.g. an address-family
    // byte ahead of the attribute chain) overrides the ambient context for
    // every attribute decoded under this node, without counting as a
    // recursion step.
    let node_ctx = match field_values.get("family").and_then(FieldValue::as_u16) {
        Some(family) => ctx.with_family(family),
        None => *ctx,
    };

    let attrs_len = body_remaining.saturating_sub(consumed_before_attrs);
    let available = cur.len().saturating_sub(cur.tell());
    let attrs_len = attrs_len.min(available);
    let attr_payload = cur.read(attrs_len).unwrap_or(&[]).to_vec();
    let attrs = nla::decode_attr_chain(&attr_payload, map, &node_ctx)?;

    let node_end = (start + declared_len.max(H::SIZE)).min(cur.len());
    let raw = cur.as_slice()[start..node_end].to_vec();
    let length = raw.len();

    cur.seek(align4(start + declared_len.max(H::SIZE)) as i64, Whence::Absolute);

    Ok(Node { header, fields: field_values, attrs, raw, offset: start, length })
}

/// Encode one framed node, back-patching the header's length field once
/// the body size is known.
pub fn encode_message<H: MessageHeader>(
    cur: &mut Cursor,
    node: &Node<H>,
    field_block: FieldBlock,
) -> Result<(), crate::error::EncodeError> {
    let header_start = cur.tell();
    let mut header = node.header;
    header.set_length(0);
    cur.reserve(H::SIZE);

    field::encode(field_block, cur, &node.fields)?;
    cur.pad_to_align4();
    let attr_bytes = nla::encode_attr_chain(&node.attrs)?;
    cur.write(&attr_bytes);

    let end = cur.tell();
    let total_len = end - header_start;
    header.set_length(total_len);

    cur.seek(header_start as i64, Whence::Absolute);
    header.encode(cur);
    cur.seek(end as i64, Whence::Absolute);
    cur.pad_to_align4();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{GENL_HDR_FIELDS, NlmsgHeader};
    use crate::nla::{AtomKind, AttrValue, NlaSpec};
    use crate::atoms::{Atom, LeafKind};

    const CTRL_MAP: &[NlaSpec] = &[
        NlaSpec { attr_type: 2, name: "family_id", kind: AtomKind::Leaf(LeafKind::U32) },
    ];

    #[test]
    fn message_round_trips_header_fields_and_attrs() {
        let mut node = Node::new(NlmsgHeader::new(16, 1));
        node.fields.insert("cmd", FieldValue::U8(3));
        node.fields.insert("version", FieldValue::U8(1));
        node.fields.insert("reserved", FieldValue::U16(0));
        node.attrs.push(AttrEntry {
            attr_type: 2,
            name: Some("family_id"),
            value: AttrValue::Atom(Atom::U32(0x10)),
            ..Default::default()
        });

        let mut out = Cursor::new();
        encode_message(&mut out, &node, GENL_HDR_FIELDS).unwrap();
        let wire = out.into_bytes();

        let map = NlaMap::new(CTRL_MAP);
        let ctx = DecodeContext::new();
        let mut cur = Cursor::from_bytes(wire);
        let decoded: Node<NlmsgHeader> =
            decode_message(&mut cur, GENL_HDR_FIELDS, Some(&map), &ctx).unwrap();

        assert_eq!(decoded.header.msg_type, 16);
        assert_eq!(decoded.fields.get("cmd"), Some(&FieldValue::U8(3)));
        assert_eq!(decoded.header.length as usize, decoded.raw.len());
        assert_eq!(
            nla::get_attr(&decoded.attrs, "family_id", None, nla::AttrForm::Value).unwrap().as_value().unwrap(),
            &AttrValue::Atom(Atom::U32(0x10))
        );
    }

    #[test]
    fn odd_sized_field_block_still_aligns_before_the_attribute_chain() {
        use crate::field::{ByteOrder, FieldDescriptor, FieldKind};

        const ODD_BLOCK: FieldBlock = &[FieldDescriptor::new("cmd", ByteOrder::Native, FieldKind::U8)];

        let mut node = Node::new(NlmsgHeader::new(16, 1));
        node.fields.insert("cmd", FieldValue::U8(7));
        node.attrs.push(AttrEntry {
            attr_type: 2,
            name: Some("family_id"),
            value: AttrValue::Atom(Atom::U32(0xaa)),
            ..Default::default()
        });

        let mut out = Cursor::new();
        encode_message(&mut out, &node, ODD_BLOCK).unwrap();
        let wire = out.into_bytes();

        let map = NlaMap::new(CTRL_MAP);
        let ctx = DecodeContext::new();
        let mut cur = Cursor::from_bytes(wire);
        let decoded: Node<NlmsgHeader> = decode_message(&mut cur, ODD_BLOCK, Some(&map), &ctx).unwrap();

        assert_eq!(decoded.fields.get("cmd"), Some(&FieldValue::U8(7)));
        assert_eq!(
            nla::get_attr(&decoded.attrs, "family_id", None, nla::AttrForm::Value).unwrap().as_value().unwrap(),
            &AttrValue::Atom(Atom::U32(0xaa))
        );
    }

    #[test]
    fn a_family_field_in_the_block_threads_into_ipaddr_attributes() {
        use crate::field::{ByteOrder, FieldDescriptor, FieldKind};

        const FAMILY_BLOCK: FieldBlock =
            &[FieldDescriptor::new("family", ByteOrder::Native, FieldKind::U16)];
        const ADDR_MAP: &[NlaSpec] =
            &[NlaSpec { attr_type: 1, name: "addr", kind: AtomKind::Leaf(LeafKind::IpAddr) }];

        let mut node = Node::new(NlmsgHeader::new(1, 1));
        node.fields.insert("family", FieldValue::U16(crate::atoms::AF_INET6));
        let payload: [u8; 16] = [0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1];
        let addr = std::net::IpAddr::V6(std::net::Ipv6Addr::from(payload));
        node.attrs.push(AttrEntry {
            attr_type: 1,
            name: Some("addr"),
            value: AttrValue::Atom(Atom::IpAddr(addr)),
            ..Default::default()
        });

        let mut out = Cursor::new();
        encode_message(&mut out, &node, FAMILY_BLOCK).unwrap();

        let map = NlaMap::new(ADDR_MAP);
        // No family is passed in by the caller; it must come from the
        // node's own field block instead.
        let ctx = DecodeContext::new();
        let mut cur = Cursor::from_bytes(out.into_bytes());
        let decoded: Node<NlmsgHeader> =
            decode_message(&mut cur, FAMILY_BLOCK, Some(&map), &ctx).unwrap();

        match nla::get_attr(&decoded.attrs, "addr", None, nla::AttrForm::Value).unwrap().as_value().unwrap() {
            AttrValue::Atom(Atom::IpAddr(ip)) => assert_eq!(ip.to_string(), "2001:db8::1"),
            other => panic!("expected an IpAddr atom, got {other:?}"),
        }
    }
}
