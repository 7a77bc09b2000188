//! The generic-netlink controller family: family (de)registration
//! queries, addressed at [`super::generic::GENL_ID_CTRL`].

use crate::atoms::LeafKind;
use crate::context::DecodeContext;
use crate::cursor::Cursor;
use crate::error::{EncodeError, MessageDecodeError};
use crate::field::FieldValue;
use crate::header::NlmsgHeader;
use crate::message::{self, Node};
use crate::nla::{AtomKind, NlaMap, NlaSpec};

use super::generic::GENL_HDR;

pub const CTRL_CMD_UNSPEC: u8 = 0;
pub const CTRL_CMD_NEWFAMILY: u8 = 1;
pub const CTRL_CMD_DELFAMILY: u8 = 2;
pub const CTRL_CMD_GETFAMILY: u8 = 3;
pub const CTRL_CMD_NEWMCAST_GRP: u8 = 7;
pub const CTRL_CMD_DELMCAST_GRP: u8 = 8;

const CTRL_ATTR_UNSPEC: u16 = 0;
const CTRL_ATTR_FAMILY_ID: u16 = 1;
const CTRL_ATTR_FAMILY_NAME: u16 = 2;
const CTRL_ATTR_VERSION: u16 = 3;
const CTRL_ATTR_HDRSIZE: u16 = 4;
const CTRL_ATTR_MAXATTR: u16 = 5;
const CTRL_ATTR_OPS: u16 = 6;
const CTRL_ATTR_MCAST_GROUPS: u16 = 7;

const MCAST_GRP_NAME: u16 = 1;
const MCAST_GRP_ID: u16 = 2;

const MCAST_GROUP_ENTRY_MAP: &[NlaSpec] = &[
    NlaSpec { attr_type: MCAST_GRP_NAME, name: "name", kind: AtomKind::Leaf(LeafKind::Asciiz) },
    NlaSpec { attr_type: MCAST_GRP_ID, name: "id", kind: AtomKind::Leaf(LeafKind::U32) },
];

const OP_ID: u16 = 1;
const OP_FLAGS: u16 = 2;

const OP_ENTRY_MAP: &[NlaSpec] = &[
    NlaSpec { attr_type: OP_ID, name: "id", kind: AtomKind::Leaf(LeafKind::U32) },
    NlaSpec { attr_type: OP_FLAGS, name: "flags", kind: AtomKind::Leaf(LeafKind::U32) },
];

/// Numeric-type → name → codec map for the controller family's
/// attributes. `CTRL_ATTR_OPS` and `CTRL_ATTR_MCAST_GROUPS` are nested
/// lists: each child index is itself a nested attribute whose own
/// children are `{id, flags}` or `{name, id}` pairs.
pub const CTRL_ATTR_MAP: &[NlaSpec] = &[
    NlaSpec { attr_type: CTRL_ATTR_UNSPEC, name: "unspec", kind: AtomKind::Leaf(LeafKind::None) },
    NlaSpec { attr_type: CTRL_ATTR_FAMILY_ID, name: "family_id", kind: AtomKind::Leaf(LeafKind::U32) },
    NlaSpec { attr_type: CTRL_ATTR_FAMILY_NAME, name: "family_name", kind: AtomKind::Leaf(LeafKind::Asciiz) },
    NlaSpec { attr_type: CTRL_ATTR_VERSION, name: "version", kind: AtomKind::Leaf(LeafKind::U32) },
    NlaSpec { attr_type: CTRL_ATTR_HDRSIZE, name: "hdrsize", kind: AtomKind::Leaf(LeafKind::U32) },
    NlaSpec { attr_type: CTRL_ATTR_MAXATTR, name: "maxattr", kind: AtomKind::Leaf(LeafKind::U32) },
    NlaSpec { attr_type: CTRL_ATTR_OPS, name: "ops", kind: AtomKind::List(OP_ENTRY_MAP) },
    NlaSpec { attr_type: CTRL_ATTR_MCAST_GROUPS, name: "mcast_groups", kind: AtomKind::List(MCAST_GROUP_ENTRY_MAP) },
];

/// `ops` and `mcast_groups` are lists whose children are indexed by
/// position (1, 2, 3, ...) rather than a fixed attribute type; each
/// indexed child is itself nested with the entry's own `{name, id}` /
/// `{id, flags}` shape.
pub fn attr_map() -> NlaMap {
    NlaMap::new(CTRL_ATTR_MAP)
}

pub type CtrlMessage = Node<NlmsgHeader>;

/// Build a `CTRL_CMD_GETFAMILY` request for the named family.
pub fn get_family_request(name: &str, sequence_number: u32) -> CtrlMessage {
    let mut node = Node::new(NlmsgHeader::new(super::generic::GENL_ID_CTRL, sequence_number));
    node.fields.insert("cmd", FieldValue::U8(CTRL_CMD_GETFAMILY));
    node.fields.insert("version", FieldValue::U8(1));
    node.fields.insert("reserved", FieldValue::U16(0));
    node.attrs.push(crate::nla::AttrEntry {
        attr_type: CTRL_ATTR_FAMILY_NAME,
        name: Some("family_name"),
        value: crate::nla::AttrValue::Atom(crate::atoms::Atom::Asciiz(name.to_string())),
        ..Default::default()
    });
    node
}

pub fn decode(cur: &mut Cursor) -> Result<CtrlMessage, MessageDecodeError> {
    let map = attr_map();
    let ctx = DecodeContext::new();
    message::decode_message(cur, GENL_HDR, Some(&map), &ctx)
}

pub fn encode(message: &CtrlMessage) -> Result<Vec<u8>, EncodeError> {
    let mut cur = Cursor::new();
    message::encode_message(&mut cur, message, GENL_HDR)?;
    Ok(cur.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nla::{get_attr, AttrForm, AttrValue};
    use crate::atoms::Atom;

    #[test]
    fn get_family_request_round_trips() {
        let request = get_family_request("nl80211", 7);
        let wire = encode(&request).unwrap();
        let mut cur = Cursor::from_bytes(wire);
        let decoded = decode(&mut cur).unwrap();

        assert_eq!(decoded.fields.get("cmd"), Some(&FieldValue::U8(CTRL_CMD_GETFAMILY)));
        assert_eq!(
            get_attr(&decoded.attrs, "family_name", None, AttrForm::Value).unwrap().as_value().unwrap(),
            &AttrValue::Atom(Atom::Asciiz("nl80211".to_string()))
        );
    }

    #[test]
    fn newfamily_response_exposes_nested_mcast_groups() {
        let mut response = Node::new(NlmsgHeader::new(super::super::generic::GENL_ID_CTRL, 7));
        response.fields.insert("cmd", FieldValue::U8(CTRL_CMD_NEWFAMILY));
        response.fields.insert("version", FieldValue::U8(1));
        response.fields.insert("reserved", FieldValue::U16(0));
        response.attrs.push(crate::nla::AttrEntry {
            attr_type: CTRL_ATTR_FAMILY_ID,
            name: Some("family_id"),
            value: AttrValue::Atom(Atom::U32(0x13)),
            ..Default::default()
        });
        response.attrs.push(crate::nla::AttrEntry {
            attr_type: CTRL_ATTR_MCAST_GROUPS,
            name: Some("mcast_groups"),
            value: AttrValue::Nested(vec![crate::nla::AttrEntry {
                attr_type: 1,
                name: None,
                value: AttrValue::Nested(vec![
                    crate::nla::AttrEntry {
                        attr_type: MCAST_GRP_NAME,
                        name: Some("name"),
                        value: AttrValue::Atom(Atom::Asciiz("config".to_string())),
                        ..Default::default()
                    },
                    crate::nla::AttrEntry {
                        attr_type: MCAST_GRP_ID,
                        name: Some("id"),
                        value: AttrValue::Atom(Atom::U32(1)),
                        ..Default::default()
                    },
                ]),
                ..Default::default()
            }]),
            ..Default::default()
        });

        let wire = encode(&response).unwrap();
        let mut cur = Cursor::from_bytes(wire);
        let decoded = decode(&mut cur).unwrap();

        let groups = get_attr(&decoded.attrs, "mcast_groups", None, AttrForm::Value)
            .unwrap()
            .as_value()
            .unwrap()
            .as_nested()
            .unwrap();
        let first_group = groups[0].value.as_nested().unwrap();
        assert_eq!(
            get_attr(first_group, "name", None, AttrForm::Value).unwrap().as_value().unwrap(),
            &AttrValue::Atom(Atom::Asciiz("config".to_string()))
        );
    }
}
