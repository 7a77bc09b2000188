//! The generic-netlink sub-header shared by every family built on top of
//! `GENL_ID_CTRL` framing: a one-byte command, a one-byte version, and a
//! reserved padding field, immediately following the outer `nlmsghdr`.

use crate::field::FieldBlock;
use crate::header::GENL_HDR_FIELDS;

/// `GENL_ID_CTRL`: the netlink family identifier the controller itself is
/// reached at, fixed by convention rather than looked up dynamically.
pub const GENL_ID_CTRL: u16 = 0x10;

pub const GENL_HDR: FieldBlock = GENL_HDR_FIELDS;
