use std::collections::HashSet;
use std::net::IpAddr;
use std::str::FromStr;

use crate::error::WebhookError;

/// Network addresses allowed to deliver webhooks
///
/// Addresses are stored and looked up in canonical form, so an IPv4 peer
/// seen through a dual-stack socket (`::ffff:203.0.113.1`) matches the plain
/// IPv4 entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceAllowlist {
    addrs: HashSet<IpAddr>,
}

impl SourceAllowlist {
    pub fn new(addrs: impl IntoIterator<Item = IpAddr>) -> Self {
        Self {
            addrs: addrs.into_iter().map(|ip| ip.to_canonical()).collect(),
        }
    }

    /// Loopback only, for local development.
    pub fn loopback() -> Self {
        Self::new([
            IpAddr::from([127, 0, 0, 1]),
            IpAddr::from([0, 0, 0, 0, 0, 0, 0, 1]),
        ])
    }

    pub fn contains(&self, ip: IpAddr) -> bool {
        self.addrs.contains(&ip.to_canonical())
    }

    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IpAddr> {
        self.addrs.iter()
    }
}

impl FromStr for SourceAllowlist {
    type Err = WebhookError;

    /// Parse a comma-separated address list, e.g. `"203.0.113.1, ::1"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let addrs = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<IpAddr>()
                    .map_err(|e| WebhookError::config(format!("Invalid allowed IP '{}': {}", part, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(addrs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        let list: SourceAllowlist = "203.0.113.1, 203.0.113.2,::1".parse().unwrap();
        assert_eq!(list.len(), 3);
        assert!(list.contains("203.0.113.2".parse().unwrap()));
        assert!(list.contains("::1".parse().unwrap()));
        assert!(!list.contains("203.0.113.3".parse().unwrap()));
    }

    #[test]
    fn test_parse_skips_blank_entries() {
        let list: SourceAllowlist = " 10.1.1.1 , ,".parse().unwrap();
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = "10.1.1.1,not-an-ip".parse::<SourceAllowlist>().unwrap_err();
        assert!(matches!(err, WebhookError::Config(_)));
        assert!(err.to_string().contains("not-an-ip"));
    }

    #[test]
    fn test_ipv4_mapped_addresses_match() {
        let list: SourceAllowlist = "127.0.0.1".parse().unwrap();
        assert!(list.contains("::ffff:127.0.0.1".parse().unwrap()));

        let mapped: SourceAllowlist = "::ffff:10.0.0.5".parse().unwrap();
        assert!(mapped.contains("10.0.0.5".parse().unwrap()));
    }

    #[test]
    fn test_loopback_default() {
        let list = SourceAllowlist::loopback();
        assert!(list.contains("127.0.0.1".parse().unwrap()));
        assert!(list.contains("::1".parse().unwrap()));
        assert!(!list.contains("192.168.1.10".parse().unwrap()));
    }
}
