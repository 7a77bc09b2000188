//! Canonical attribute names are family-prefixed (`CTRL_ATTR_FAMILY_ID`,
//! `IPR_ATTR_CDATA`) to stay unambiguous across families sharing one
//! numeric type space in diagnostics. Call sites that already know which
//! family they're in usually want the shorter, prefix-stripped form.

/// Strip a family's attribute prefix (`"CTRL_ATTR_"`, `"IPR_ATTR_"`, ...)
/// from a canonical name, lowercased, e.g. `"CTRL_ATTR_FAMILY_ID"` to
/// `"family_id"`. Names that don't start with `prefix` are lowercased
/// unchanged.
pub fn short_name(canonical: &str, prefix: &str) -> String {
    canonical.strip_prefix(prefix).unwrap_or(canonical).to_ascii_lowercase()
}

/// Re-attach a family's attribute prefix to a short name, e.g.
/// `("family_id", "CTRL_ATTR_")` to `"CTRL_ATTR_FAMILY_ID"`.
pub fn canonical_name(short: &str, prefix: &str) -> String {
    format!("{prefix}{}", short.to_ascii_uppercase())
}

/// Generic netlink's reserved family identifiers. Index 17 is a
/// documented gap in the allocation (reserved, never assigned), kept here
/// so `family_name(17)` returns `None` rather than silently lining up
/// with whatever comes next.
const RESERVED_FAMILY_NAMES: &[(u16, &str)] = &[
    (0, "NETLINK_ROUTE"),
    (1, "NETLINK_UNUSED"),
    (2, "NETLINK_USERSOCK"),
    (3, "NETLINK_FIREWALL"),
    (4, "NETLINK_SOCK_DIAG"),
    (5, "NETLINK_NFLOG"),
    (6, "NETLINK_XFRM"),
    (7, "NETLINK_SELINUX"),
    (8, "NETLINK_ISCSI"),
    (9, "NETLINK_AUDIT"),
    (10, "NETLINK_FIB_LOOKUP"),
    (11, "NETLINK_CONNECTOR"),
    (12, "NETLINK_NETFILTER"),
    (13, "NETLINK_IP6_FW"),
    (14, "NETLINK_DNRTMSG"),
    (15, "NETLINK_KOBJECT_UEVENT"),
    (16, "NETLINK_GENERIC"),
    // 17 reserved, never assigned.
    (18, "NETLINK_SCSITRANSPORT"),
];

/// Look up the reserved name for a well-known netlink family identifier.
pub fn reserved_family_name(id: u16) -> Option<&'static str> {
    RESERVED_FAMILY_NAMES.iter().find(|(i, _)| *i == id).map(|(_, name)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_and_reattaches_prefix() {
        assert_eq!(short_name("CTRL_ATTR_FAMILY_ID", "CTRL_ATTR_"), "family_id");
        assert_eq!(canonical_name("family_id", "CTRL_ATTR_"), "CTRL_ATTR_FAMILY_ID");
    }

    #[test]
    fn reserved_gap_at_seventeen_has_no_name() {
        assert_eq!(reserved_family_name(16), Some("NETLINK_GENERIC"));
        assert_eq!(reserved_family_name(17), None);
        assert_eq!(reserved_family_name(18), Some("NETLINK_SCSITRANSPORT"));
    }
}
