//! The three-tier error taxonomy from the engine's error handling design:
//! a header fault, a field/data fault, and an attribute-chain fault, each
//! fatal for the message that raised it but never for its siblings.

use thiserror::Error;

/// Corruption or shortage in a fixed header (`nlmsghdr` or an attribute's
/// own 4-byte header). Fatal for the message currently being decoded.
#[derive(Debug, Error)]
pub enum HeaderDecodeError {
    #[error("header requires {needed} bytes but only {available} remain")]
    Truncated { needed: usize, available: usize },
}

/// Corruption in the field block. In practice this engine tolerates a
/// short field by stopping the field block early (see [`crate::field`]),
/// so this variant is reserved for faults that are not ordinary
/// truncation, e.g. a field whose value cannot be packed at all.
#[derive(Debug, Error)]
pub enum DataDecodeError {
    #[error("field `{field}` could not be decoded: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// An unrecoverable fault in the attribute chain as a whole. Faults
/// confined to a single attribute are *not* represented here — they are
/// handled by the localized-recovery path in [`crate::nla`] and never
/// escalate to this type.
#[derive(Debug, Error)]
pub enum NlaDecodeError {
    #[error("attribute chain header truncated at offset {offset}")]
    Truncated { offset: usize },
    #[error("nested attribute recursion exceeded the configured depth limit ({limit})")]
    DepthExceeded { limit: u32 },
}

/// Top-level decode failure for one message node, tagging which of the
/// three decode phases (header, fields, attribute chain) failed.
#[derive(Debug, Error)]
pub enum MessageDecodeError {
    #[error("header decode failed")]
    Header(#[source] HeaderDecodeError),
    #[error("field decode failed")]
    Data(#[source] DataDecodeError),
    #[error("attribute chain decode failed")]
    Nla(#[source] NlaDecodeError),
}

impl From<HeaderDecodeError> for MessageDecodeError {
    fn from(e: HeaderDecodeError) -> Self {
        MessageDecodeError::Header(e)
    }
}

impl From<DataDecodeError> for MessageDecodeError {
    fn from(e: DataDecodeError) -> Self {
        MessageDecodeError::Data(e)
    }
}

impl From<NlaDecodeError> for MessageDecodeError {
    fn from(e: NlaDecodeError) -> Self {
        MessageDecodeError::Nla(e)
    }
}

/// A single atom's decode attempt failed. Caught and downgraded to a
/// hex-blob entry by the attribute-chain walk; never itself escalated.
#[derive(Debug, Error)]
pub enum AtomDecodeError {
    #[error("attribute payload has unexpected length {got} (expected {expected})")]
    UnexpectedLength { expected: &'static str, got: usize },
    #[error("ipaddr attribute decoded with no `family` in the decode context")]
    MissingFamily,
    #[error("unsupported address family {0} for ipaddr attribute")]
    UnsupportedFamily(u16),
}

/// Failure while packing a value for the wire. These are logged with full
/// context at the call site and then re-raised — never swallowed into a
/// partial success.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("failed to pack field `{field}`: {reason}")]
    Field { field: &'static str, reason: String },
    #[error("failed to pack attribute `{attr}`: {reason}")]
    Attribute { attr: &'static str, reason: String },
}
