//! A schema-driven encoder/decoder engine for Netlink-shaped wire
//! protocols: a fixed outer header, a named field block, and a recursive
//! chain of type-length-value attributes.
//!
//! The engine itself does not open sockets or know about any particular
//! kernel subsystem — see [`families`] for the concrete message classes
//! built on top of it ([`families::control`], the generic-netlink
//! controller; [`families::messaging`], a custom point-to-point
//! protocol). Callers supply a field block and an attribute map; the
//! [`message`] and [`nla`] modules supply the shared decode/encode walk.

pub mod atoms;
pub mod context;
pub mod cursor;
pub mod error;
pub mod families;
pub mod field;
pub mod header;
pub mod message;
pub mod names;
pub mod nla;

pub use context::DecodeContext;
pub use cursor::Cursor;
pub use error::{AtomDecodeError, DataDecodeError, EncodeError, HeaderDecodeError, MessageDecodeError, NlaDecodeError};
pub use message::Node;
pub use nla::{AttrChainExt, AttrEntry, AttrForm, AttrLookup, AttrValue};
