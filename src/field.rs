//! The field codec: a compact format-string grammar for a sequence of
//! named, fixed-width fields, plus the `s`/`z` variable-width tokens whose
//! length comes from the enclosing header rather than the format itself.

use std::collections::HashMap;

use crate::cursor::Cursor;
use crate::error::EncodeError;

/// Byte order modifier recognized in a format token (`! > < @ =`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Native,
    Big,
    Little,
}

/// The decoded shape of one field descriptor's format token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    U8,
    U16,
    U32,
    U64,
    /// `s` — consume the remaining payload verbatim.
    Bytes,
    /// `z` — consume the remaining payload, dropping one trailing zero.
    CStr,
    /// `<N>s`, e.g. `"16s"` — a fixed-size raw byte field whose length is
    /// part of the format token itself rather than derived from the
    /// enclosing node's length, the same convention Python's `struct`
    /// module uses for fixed-width byte strings.
    FixedBytes(usize),
}

/// One *(name, format)* pair from a field block.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub order: ByteOrder,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, order: ByteOrder, kind: FieldKind) -> Self {
        FieldDescriptor { name, order, kind }
    }

    /// Fixed width in bytes, or `None` for the variable-width `s`/`z`
    /// tokens whose size depends on the enclosing node's length.
    pub const fn fixed_size(&self) -> Option<usize> {
        match self.kind {
            FieldKind::U8 => Some(1),
            FieldKind::U16 => Some(2),
            FieldKind::U32 => Some(4),
            FieldKind::U64 => Some(8),
            FieldKind::FixedBytes(n) => Some(n),
            FieldKind::Bytes | FieldKind::CStr => None,
        }
    }
}

/// Parse a single format token such as `"I"`, `"<H"`, `"!Q"`, `"s"`, `"z"`,
/// or `"16s"` (a fixed-size byte field, length given by the leading
/// digits).
pub fn parse_format(fmt: &str) -> Option<(ByteOrder, FieldKind)> {
    let mut chars = fmt.chars().peekable();
    let first = *chars.peek()?;
    let (order, rest): (ByteOrder, String) = match first {
        '!' | '>' => {
            chars.next();
            (ByteOrder::Big, chars.collect())
        }
        '<' => {
            chars.next();
            (ByteOrder::Little, chars.collect())
        }
        '@' | '=' => {
            chars.next();
            (ByteOrder::Native, chars.collect())
        }
        _ => (ByteOrder::Native, chars.collect()),
    };

    let digits_len = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    let (count, letter_str) = rest.split_at(digits_len);
    let mut letters = letter_str.chars();
    let letter = letters.next()?;
    if letters.next().is_some() {
        return None;
    }

    let kind = match (count.is_empty(), letter) {
        (true, 'B') => FieldKind::U8,
        (true, 'H') => FieldKind::U16,
        (true, 'I') => FieldKind::U32,
        (true, 'Q') => FieldKind::U64,
        (true, 's') => FieldKind::Bytes,
        (true, 'z') => FieldKind::CStr,
        (false, 's') => FieldKind::FixedBytes(count.parse().ok()?),
        _ => return None,
    };
    Some((order, kind))
}

/// A decoded field's value, after runtime coercion per the descriptor's
/// kind.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FieldValue {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Bytes(Vec<u8>),
    Text(String),
}

impl FieldValue {
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            FieldValue::U8(v) => Some(*v as u32),
            FieldValue::U16(v) => Some(*v as u32),
            FieldValue::U32(v) => Some(*v),
            FieldValue::U64(v) => u32::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_u16(&self) -> Option<u16> {
        match self {
            FieldValue::U8(v) => Some(*v as u16),
            FieldValue::U16(v) => Some(*v),
            FieldValue::U32(v) => u16::try_from(*v).ok(),
            FieldValue::U64(v) => u16::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            FieldValue::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

/// An ordered sequence of field descriptors, i.e. the schema for one
/// message's fixed (or header) fields.
pub type FieldBlock = &'static [FieldDescriptor];

/// Sum of the fixed-width descriptors' sizes. Variable-width tokens
/// contribute nothing here (their size is only known at decode/encode
/// time), matching `struct.calcsize` on a format string without `s`/`z`.
pub fn size_of(block: FieldBlock) -> usize {
    block.iter().filter_map(|d| d.fixed_size()).sum()
}

fn read_uint(cur: &mut Cursor, order: ByteOrder, kind: FieldKind) -> Option<FieldValue> {
    let width = match kind {
        FieldKind::U8 => 1,
        FieldKind::U16 => 2,
        FieldKind::U32 => 4,
        FieldKind::U64 => 8,
        _ => unreachable!("read_uint called on a variable-width kind"),
    };
    let bytes = cur.read(width)?;
    Some(match (order, kind) {
        (ByteOrder::Big, FieldKind::U8) => FieldValue::U8(bytes[0]),
        (ByteOrder::Big, FieldKind::U16) => FieldValue::U16(u16::from_be_bytes(bytes.try_into().ok()?)),
        (ByteOrder::Big, FieldKind::U32) => FieldValue::U32(u32::from_be_bytes(bytes.try_into().ok()?)),
        (ByteOrder::Big, FieldKind::U64) => FieldValue::U64(u64::from_be_bytes(bytes.try_into().ok()?)),
        (ByteOrder::Little, FieldKind::U8) => FieldValue::U8(bytes[0]),
        (ByteOrder::Little, FieldKind::U16) => FieldValue::U16(u16::from_le_bytes(bytes.try_into().ok()?)),
        (ByteOrder::Little, FieldKind::U32) => FieldValue::U32(u32::from_le_bytes(bytes.try_into().ok()?)),
        (ByteOrder::Little, FieldKind::U64) => FieldValue::U64(u64::from_le_bytes(bytes.try_into().ok()?)),
        (ByteOrder::Native, FieldKind::U8) => FieldValue::U8(bytes[0]),
        (ByteOrder::Native, FieldKind::U16) => FieldValue::U16(u16::from_ne_bytes(bytes.try_into().ok()?)),
        (ByteOrder::Native, FieldKind::U32) => FieldValue::U32(u32::from_ne_bytes(bytes.try_into().ok()?)),
        (ByteOrder::Native, FieldKind::U64) => FieldValue::U64(u64::from_ne_bytes(bytes.try_into().ok()?)),
        _ => unreachable!(),
    })
}

fn write_uint(cur: &mut Cursor, order: ByteOrder, value: &FieldValue) -> Result<(), EncodeError> {
    macro_rules! pack {
        ($v:expr, $ty:ty) => {{
            let v = $v as $ty;
            match order {
                ByteOrder::Big => cur.write(&v.to_be_bytes()),
                ByteOrder::Little => cur.write(&v.to_le_bytes()),
                ByteOrder::Native => cur.write(&v.to_ne_bytes()),
            }
        }};
    }
    match value {
        FieldValue::U8(v) => pack!(*v, u8),
        FieldValue::U16(v) => pack!(*v, u16),
        FieldValue::U32(v) => pack!(*v, u32),
        FieldValue::U64(v) => pack!(*v, u64),
        _ => {
            return Err(EncodeError::Field {
                field: "<fixed-width>",
                reason: "expected a numeric field value".into(),
            })
        }
    }
    Ok(())
}

/// Decode one field block. A short read on a fixed-width field stops the
/// block early (the already-decoded fields are kept, nothing is raised);
/// `s`/`z` tokens always succeed (they simply consume whatever payload
/// remains, even zero bytes).
///
/// `payload_remaining` is the number of bytes left in the enclosing
/// node's framed length, used to size `s`/`z` tokens.
pub fn decode(
    block: FieldBlock,
    cur: &mut Cursor,
    payload_remaining: usize,
) -> HashMap<&'static str, FieldValue> {
    let mut out = HashMap::with_capacity(block.len());
    let start = cur.tell();
    for desc in block {
        match desc.kind {
            FieldKind::Bytes | FieldKind::CStr => {
                let consumed_so_far = cur.tell() - start;
                let remaining = payload_remaining.saturating_sub(consumed_so_far);
                let bytes = cur.read_remaining(remaining).to_vec();
                let bytes = if desc.kind == FieldKind::CStr {
                    strip_one_trailing_zero(bytes)
                } else {
                    bytes
                };
                out.insert(desc.name, FieldValue::Bytes(bytes));
            }
            FieldKind::FixedBytes(n) => match cur.read(n) {
                Some(bytes) => {
                    out.insert(desc.name, FieldValue::Bytes(bytes.to_vec()));
                }
                None => break,
            },
            _ => match read_uint(cur, desc.order, desc.kind) {
                Some(v) => {
                    out.insert(desc.name, v);
                }
                None => break,
            },
        }
    }
    out
}

fn strip_one_trailing_zero(mut bytes: Vec<u8>) -> Vec<u8> {
    if bytes.last() == Some(&0) {
        bytes.pop();
    }
    bytes
}

/// Encode a field block from a name → value mapping. Runtime coercions:
/// `Text` becomes UTF-8 bytes for `s`/`z` tokens; `z` appends exactly one
/// terminator byte.
pub fn encode(
    block: FieldBlock,
    cur: &mut Cursor,
    values: &HashMap<&'static str, FieldValue>,
) -> Result<(), EncodeError> {
    encode_inner(block, cur, values).map_err(|e| {
        log::error!("failed to pack field block: {e}");
        e
    })
}

fn encode_inner(
    block: FieldBlock,
    cur: &mut Cursor,
    values: &HashMap<&'static str, FieldValue>,
) -> Result<(), EncodeError> {
    for desc in block {
        let value = values.get(desc.name).ok_or_else(|| EncodeError::Field {
            field: desc.name,
            reason: "missing value".into(),
        })?;
        match desc.kind {
            FieldKind::Bytes => {
                let bytes = coerce_bytes(desc.name, value)?;
                cur.write(&bytes);
            }
            FieldKind::CStr => {
                let mut bytes = coerce_bytes(desc.name, value)?;
                bytes.push(0);
                cur.write(&bytes);
            }
            FieldKind::FixedBytes(n) => {
                let bytes = coerce_bytes(desc.name, value)?;
                if bytes.len() != n {
                    return Err(EncodeError::Field {
                        field: desc.name,
                        reason: format!("expected exactly {n} bytes, got {}", bytes.len()),
                    });
                }
                cur.write(&bytes);
            }
            _ => write_uint(cur, desc.order, value)?,
        }
    }
    Ok(())
}

fn coerce_bytes(field: &'static str, value: &FieldValue) -> Result<Vec<u8>, EncodeError> {
    match value {
        FieldValue::Bytes(b) => Ok(b.clone()),
        FieldValue::Text(s) => Ok(s.as_bytes().to_vec()),
        _ => Err(EncodeError::Field { field, reason: "expected bytes or text".into() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK: FieldBlock = &[
        FieldDescriptor::new("cmd", ByteOrder::Native, FieldKind::U8),
        FieldDescriptor::new("version", ByteOrder::Native, FieldKind::U8),
        FieldDescriptor::new("reserved", ByteOrder::Native, FieldKind::U16),
    ];

    #[test]
    fn parses_every_grammar_token() {
        assert_eq!(parse_format("B"), Some((ByteOrder::Native, FieldKind::U8)));
        assert_eq!(parse_format("!H"), Some((ByteOrder::Big, FieldKind::U16)));
        assert_eq!(parse_format("<I"), Some((ByteOrder::Little, FieldKind::U32)));
        assert_eq!(parse_format("@Q"), Some((ByteOrder::Native, FieldKind::U64)));
        assert_eq!(parse_format("s"), Some((ByteOrder::Native, FieldKind::Bytes)));
        assert_eq!(parse_format("z"), Some((ByteOrder::Native, FieldKind::CStr)));
        assert_eq!(parse_format("16s"), Some((ByteOrder::Native, FieldKind::FixedBytes(16))));
        assert_eq!(parse_format("X"), None);
    }

    #[test]
    fn fixed_bytes_field_requires_exact_length_to_encode() {
        const ID_BLOCK: FieldBlock =
            &[FieldDescriptor::new("id", ByteOrder::Native, FieldKind::FixedBytes(4))];
        let mut cur = Cursor::from_bytes(vec![1, 2, 3, 4]);
        let fields = decode(ID_BLOCK, &mut cur, 4);
        assert_eq!(fields.get("id").unwrap().as_bytes().unwrap(), &[1, 2, 3, 4]);

        let mut short = HashMap::new();
        short.insert("id", FieldValue::Bytes(vec![1, 2]));
        let mut out = Cursor::new();
        assert!(encode(ID_BLOCK, &mut out, &short).is_err());
    }

    #[test]
    fn decode_roundtrips_fixed_fields() {
        let mut cur = Cursor::from_bytes(vec![1, 2, 0, 0]);
        let fields = decode(BLOCK, &mut cur, 4);
        assert_eq!(fields.get("cmd"), Some(&FieldValue::U8(1)));
        assert_eq!(fields.get("version"), Some(&FieldValue::U8(2)));
        assert_eq!(fields.get("reserved"), Some(&FieldValue::U16(0)));

        let mut out = Cursor::new();
        encode(BLOCK, &mut out, &fields).unwrap();
        assert_eq!(out.into_bytes(), vec![1, 2, 0, 0]);
    }

    #[test]
    fn decode_stops_at_first_short_field_without_erroring() {
        let mut cur = Cursor::from_bytes(vec![1]);
        let fields = decode(BLOCK, &mut cur, 1);
        assert_eq!(fields.get("cmd"), Some(&FieldValue::U8(1)));
        assert!(fields.get("version").is_none());
    }

    #[test]
    fn z_token_drops_exactly_one_trailing_zero() {
        const Z_BLOCK: FieldBlock =
            &[FieldDescriptor::new("value", ByteOrder::Native, FieldKind::CStr)];
        let mut cur = Cursor::from_bytes(b"hello\0".to_vec());
        let fields = decode(Z_BLOCK, &mut cur, 6);
        assert_eq!(fields.get("value").unwrap().as_bytes().unwrap(), b"hello");
    }

    #[test]
    fn zero_length_z_field_decodes_to_empty_string() {
        const Z_BLOCK: FieldBlock =
            &[FieldDescriptor::new("value", ByteOrder::Native, FieldKind::CStr)];
        let mut cur = Cursor::from_bytes(vec![]);
        let fields = decode(Z_BLOCK, &mut cur, 0);
        assert_eq!(fields.get("value").unwrap().as_bytes().unwrap(), b"");

        let mut out = Cursor::new();
        encode(Z_BLOCK, &mut out, &fields).unwrap();
        assert_eq!(out.into_bytes(), vec![0]);
    }
}
