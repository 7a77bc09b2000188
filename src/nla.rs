//! The attribute (NLA) chain: a declarative map from numeric type to name
//! and codec, and the recursive decode/encode walk that interprets it.
//!
//! The map is schema-as-data: a `&'static [NlaSpec]` table built once per
//! family and interpreted here, rather than one hand-written decoder per
//! family. A family module only supplies the table; the walk, the
//! clamping, and the localized per-attribute recovery are shared.

use std::collections::HashMap;

use crate::atoms::{self, Atom, LeafKind};
use crate::context::DecodeContext;
use crate::cursor::{align4, Cursor, Whence};
use crate::error::{EncodeError, NlaDecodeError};
use crate::header::{MessageHeader, NlaHeader};

/// What an attribute's payload holds: one of the built-in leaf codecs, a
/// nested attribute chain described by another static table, or a table
/// chosen at decode time from the surrounding context (used when a
/// payload's shape depends on a sibling attribute, e.g. a command code).
#[derive(Debug, Clone, Copy)]
pub enum AtomKind {
    Leaf(LeafKind),
    Nested(&'static [NlaSpec]),
    /// An indexed list: the payload is itself an attribute chain, but its
    /// children are keyed by position (1, 2, 3, ...) rather than a type
    /// from a fixed map, and every child is nested with `table` again.
    List(&'static [NlaSpec]),
    Dynamic(fn(&DecodeContext) -> AtomKind),
}

/// One entry in a family's NLA map: the numeric type, its canonical name,
/// and how to interpret its payload.
#[derive(Debug, Clone, Copy)]
pub struct NlaSpec {
    pub attr_type: u16,
    pub name: &'static str,
    pub kind: AtomKind,
}

/// A family's attribute map, indexed both ways. Built once (typically into
/// a `static`) and shared by every message of that family.
pub struct NlaMap {
    by_type: HashMap<u16, NlaSpec>,
    by_name: HashMap<&'static str, NlaSpec>,
    /// Codec applied to any attribute type not present in `by_type`. Used
    /// for indexed list containers (e.g. a multicast-group or operation
    /// list) whose children are keyed by position, not a fixed type.
    default: Option<AtomKind>,
}

impl NlaMap {
    pub fn new(specs: &'static [NlaSpec]) -> Self {
        let mut by_type = HashMap::with_capacity(specs.len());
        let mut by_name = HashMap::with_capacity(specs.len());
        for spec in specs {
            by_type.insert(spec.attr_type, *spec);
            by_name.insert(spec.name, *spec);
        }
        NlaMap { by_type, by_name, default: None }
    }

    /// Build a map where every attribute type not explicitly listed falls
    /// back to `default` instead of the generic hex-blob fallback.
    pub fn with_default(specs: &'static [NlaSpec], default: AtomKind) -> Self {
        let mut map = Self::new(specs);
        map.default = Some(default);
        map
    }

    pub fn by_type(&self, attr_type: u16) -> Option<&NlaSpec> {
        self.by_type.get(&attr_type)
    }

    pub fn by_name(&self, name: &str) -> Option<&NlaSpec> {
        self.by_name.get(name)
    }

    fn default_kind(&self) -> Option<AtomKind> {
        self.default
    }
}

/// A decoded attribute's value: one of the leaf atoms, a nested chain, or
/// an opaque fallback for a type the map didn't recognize, or whose atom
/// decode failed.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttrValue {
    Atom(Atom),
    Nested(Vec<AttrEntry>),
    /// Localized recovery: the attribute's raw payload, kept verbatim so
    /// the rest of the chain still decodes even though this one entry
    /// couldn't be interpreted.
    Raw(Vec<u8>),
}

impl Default for AttrValue {
    fn default() -> Self {
        AttrValue::Raw(Vec::new())
    }
}

/// One decoded attribute, with its name resolved from the map when known.
///
/// `raw`, `offset`, and `length` describe the attribute's own encoded
/// header+payload span within the attribute chain it was decoded from
/// (offsets are local to that chain's buffer, not the top-level message —
/// a nested attribute's children are numbered from 0 within their own
/// parent payload, same as the rest of the decode walk).
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttrEntry {
    pub attr_type: u16,
    pub name: Option<&'static str>,
    pub value: AttrValue,
    pub raw: Vec<u8>,
    pub offset: usize,
    pub length: usize,
}

/// Decode a full attribute chain out of `payload`, recursing into nested
/// attributes as the map directs.
///
/// Per-attribute failures (a short/garbled atom payload) never abort the
/// chain: the offending entry is kept as [`AttrValue::Raw`] and decoding
/// continues with the next attribute. Only a truncated attribute *header*
/// or exceeding the recursion depth limit is chain-fatal.
pub fn decode_attr_chain(
    payload: &[u8],
    map: Option<&NlaMap>,
    ctx: &DecodeContext,
) -> Result<Vec<AttrEntry>, NlaDecodeError> {
    let mut cur = Cursor::from_bytes(payload.to_vec());
    let mut out = Vec::new();

    while cur.tell() < payload.len() {
        let remaining = payload.len() - cur.tell();
        if remaining < NlaHeader::SIZE {
            // Trailing padding shorter than a header is not a fault; real
            // messages commonly end on an alignment pad.
            break;
        }
        let header_start = cur.tell();
        let header = NlaHeader::decode(&mut cur).map_err(|_| NlaDecodeError::Truncated { offset: header_start })?;
        let payload_len = (header.length() as usize).saturating_sub(NlaHeader::SIZE);
        let available = payload.len().saturating_sub(cur.tell());
        let clamped_len = payload_len.min(available);
        let attr_payload = cur.read(clamped_len).unwrap_or(&[]).to_vec();

        let attr_type = header.payload_type();
        let spec = map.and_then(|m| m.by_type(attr_type));
        let default_kind = map.and_then(|m| m.default_kind());

        let mut entry = decode_one(attr_type, spec, default_kind, &attr_payload, header.is_nested(), ctx)?;
        entry.raw = payload[header_start..cur.tell()].to_vec();
        entry.offset = header_start;
        entry.length = entry.raw.len();
        out.push(entry);

        // Realign to the attribute's declared length rather than however
        // much payload was actually available, so a truncated attribute
        // doesn't desynchronize the rest of the chain relative to a sender
        // that computed offsets from the (possibly optimistic) length.
        let declared_end = header_start + NlaHeader::SIZE + payload_len;
        cur.seek(align4(declared_end.max(cur.tell())) as i64, Whence::Absolute);
    }

    Ok(out)
}

fn decode_nested(
    attr_payload: &[u8],
    child_map: Option<&NlaMap>,
    ctx: &DecodeContext,
) -> Result<AttrValue, NlaDecodeError> {
    let child_ctx = ctx.descend(None).ok_or(NlaDecodeError::DepthExceeded { limit: ctx.max_depth() })?;
    match decode_attr_chain(attr_payload, child_map, &child_ctx) {
        Ok(children) => Ok(AttrValue::Nested(children)),
        Err(NlaDecodeError::DepthExceeded { limit }) => Err(NlaDecodeError::DepthExceeded { limit }),
        Err(_) => Ok(AttrValue::Raw(attr_payload.to_vec())),
    }
}

fn decode_one(
    attr_type: u16,
    spec: Option<&NlaSpec>,
    default_kind: Option<AtomKind>,
    attr_payload: &[u8],
    header_says_nested: bool,
    ctx: &DecodeContext,
) -> Result<AttrEntry, NlaDecodeError> {
    let name = spec.map(|s| s.name);

    let kind = match spec.map(|s| s.kind).or(default_kind) {
        Some(AtomKind::Dynamic(resolve)) => resolve(ctx),
        Some(other) => other,
        None if header_says_nested => {
            // Unknown but flagged nested: recurse with no map rather than
            // falling back to an opaque blob, so the shape is still
            // visible even though the names aren't.
            AtomKind::Nested(&[])
        }
        None => AtomKind::Leaf(LeafKind::Hex),
    };

    let value = match kind {
        AtomKind::Nested(child_specs) => {
            let child_map = if child_specs.is_empty() { None } else { Some(NlaMap::new(child_specs)) };
            decode_nested(attr_payload, child_map.as_ref(), ctx)?
        }
        AtomKind::List(entry_specs) => {
            let list_map = NlaMap::with_default(&[], AtomKind::Nested(entry_specs));
            decode_nested(attr_payload, Some(&list_map), ctx)?
        }
        AtomKind::Leaf(leaf) => match atoms::decode(leaf, attr_payload, ctx) {
            Ok(atom) => AttrValue::Atom(atom),
            Err(e) => {
                log::debug!(
                    "attribute {attr_type} ({name:?}) fell back to a raw blob: {e}",
                    name = name.unwrap_or("?")
                );
                AttrValue::Raw(attr_payload.to_vec())
            }
        },
        AtomKind::Dynamic(_) => unreachable!("resolved above"),
    };

    log::trace!("decoded attribute type={attr_type} name={name:?}");
    Ok(AttrEntry { attr_type, name, value, ..Default::default() })
}

/// Encode an attribute chain back to wire bytes, padding each entry to a
/// 4-byte boundary as it is appended.
pub fn encode_attr_chain(entries: &[AttrEntry]) -> Result<Vec<u8>, EncodeError> {
    let mut cur = Cursor::new();
    for entry in entries {
        let header_pos = cur.tell();
        cur.reserve(NlaHeader::SIZE);
        let payload = encode_value(&entry.value).map_err(|e| {
            log::error!("failed to pack attribute {} ({:?}): {e}", entry.attr_type, entry.name);
            e
        })?;
        cur.write(&payload);
        let total_len = NlaHeader::SIZE + payload.len();

        let end = cur.tell();
        cur.seek(header_pos as i64, Whence::Absolute);
        let mut header = NlaHeader { length: 0, attr_type: entry.attr_type };
        if matches!(entry.value, AttrValue::Nested(_)) {
            header.attr_type |= crate::header::NLA_F_NESTED;
        }
        header.set_length(total_len);
        header.encode(&mut cur);
        cur.seek(end as i64, Whence::Absolute);

        cur.pad_to_align4();
    }
    Ok(cur.into_bytes())
}

fn encode_value(value: &AttrValue) -> Result<Vec<u8>, EncodeError> {
    match value {
        AttrValue::Atom(atom) => atoms::encode(atom),
        AttrValue::Raw(bytes) => Ok(bytes.clone()),
        AttrValue::Nested(children) => encode_attr_chain(children),
    }
}

/// Which representation a lookup should hand back: the decoded value, or
/// the attribute's original encoded bytes (its own 4-byte NLA header plus
/// payload, as it appeared in the chain it was decoded from).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrForm {
    Value,
    Encoded,
}

/// The result of a lookup, tagged by the [`AttrForm`] that was requested.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrLookup<'a> {
    Value(&'a AttrValue),
    Encoded(&'a [u8]),
}

impl<'a> AttrLookup<'a> {
    pub fn as_value(&self) -> Option<&'a AttrValue> {
        match *self {
            AttrLookup::Value(v) => Some(v),
            AttrLookup::Encoded(_) => None,
        }
    }

    pub fn as_encoded(&self) -> Option<&'a [u8]> {
        match *self {
            AttrLookup::Encoded(b) => Some(b),
            AttrLookup::Value(_) => None,
        }
    }
}

/// Look up the first attribute with the given name, by wire order, in
/// either its decoded `value` or its original `encoded` bytes. Falls back
/// to `default` when no attribute with that name is present.
pub fn get_attr<'a>(
    entries: &'a [AttrEntry],
    name: &str,
    default: Option<AttrLookup<'a>>,
    form: AttrForm,
) -> Option<AttrLookup<'a>> {
    match entries.iter().find(|e| e.name == Some(name)) {
        Some(e) => Some(match form {
            AttrForm::Value => AttrLookup::Value(&e.value),
            AttrForm::Encoded => AttrLookup::Encoded(&e.raw),
        }),
        None => default,
    }
}

/// Look up every attribute with the given name, in wire order (an
/// attribute type may legally repeat, e.g. a list of multicast groups).
pub fn get_attrs<'a>(entries: &'a [AttrEntry], name: &str, form: AttrForm) -> Vec<AttrLookup<'a>> {
    entries
        .iter()
        .filter(|e| e.name == Some(name))
        .map(|e| match form {
            AttrForm::Value => AttrLookup::Value(&e.value),
            AttrForm::Encoded => AttrLookup::Encoded(&e.raw),
        })
        .collect()
}

/// Entries of `entries` that are absent from `other`, or present under the
/// same name/type but with a different value (per-attribute complement).
pub fn difference(entries: &[AttrEntry], other: &[AttrEntry]) -> Vec<AttrEntry> {
    entries
        .iter()
        .filter(|e| !other.iter().any(|o| o.attr_type == e.attr_type && o.value == e.value))
        .cloned()
        .collect()
}

/// Entries of `entries` that also appear in `other` under the same
/// name/type and with the same value.
pub fn intersect(entries: &[AttrEntry], other: &[AttrEntry]) -> Vec<AttrEntry> {
    entries
        .iter()
        .filter(|e| other.iter().any(|o| o.attr_type == e.attr_type && o.value == e.value))
        .cloned()
        .collect()
}

/// In-place attribute-chain operations that read naturally as a chain of
/// method calls on the decoded attribute list itself.
pub trait AttrChainExt {
    /// Drop every attribute whose name is in `names`, in place, returning
    /// `self` so callers can chain further operations.
    fn strip(&mut self, names: &[&str]) -> &mut Self;
}

impl AttrChainExt for Vec<AttrEntry> {
    fn strip(&mut self, names: &[&str]) -> &mut Self {
        self.retain(|e| !names.contains(&e.name.unwrap_or("")));
        self
    }
}

impl AttrValue {
    pub fn as_atom(&self) -> Option<&Atom> {
        match self {
            AttrValue::Atom(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_nested(&self) -> Option<&[AttrEntry]> {
        match self {
            AttrValue::Nested(v) => Some(v),
            _ => None,
        }
    }
}
