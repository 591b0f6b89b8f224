//! Network segment address range.
//!
//! Example: "172.29.1.0/16"  =>  base 172.29.1.0, prefix 16.
//!
//! Fixed service addresses are drawn by offsetting the last octet of the
//! literal base address (base+0, base+1, ...), matching how the compose
//! file pins them. The prefix is used for containment checks only.

use crate::Result;
use anyhow::{Context, bail};
use std::fmt;
use std::net::Ipv4Addr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subnet {
    base: Ipv4Addr,
    prefix: u8,
}

impl Subnet {
    /// Parse "a.b.c.d/p" into a Subnet.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let (addr, prefix) = match s.split_once('/') {
            Some(parts) => parts,
            None => bail!("subnet must be in base/prefix form: {:?}", s),
        };
        let base: Ipv4Addr = addr
            .parse()
            .with_context(|| format!("bad subnet base address: {:?}", addr))?;
        let prefix: u8 = prefix
            .parse()
            .with_context(|| format!("bad subnet prefix: {:?}", prefix))?;
        if !(1..=30).contains(&prefix) {
            bail!("subnet prefix must be between 1 and 30, got /{}", prefix);
        }
        Ok(Self { base, prefix })
    }

    /// Fixed address for host slot `index` (slot 0 = dev, slot i = node i).
    ///
    /// Slots only move the last octet; a harness larger than the base
    /// octet allows is rejected rather than wrapped.
    pub fn host_at(&self, index: usize) -> Result<Ipv4Addr> {
        let octets = self.base.octets();
        let last = octets[3] as usize + index;
        if last > 255 {
            bail!(
                "host slot {} overflows the last octet of base {}",
                index,
                self.base
            );
        }
        let addr = Ipv4Addr::new(octets[0], octets[1], octets[2], last as u8);
        if !self.contains(addr) {
            bail!("host slot {} ({}) falls outside subnet {}", index, addr, self);
        }
        Ok(addr)
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        let mask = u32::MAX << (32 - u32::from(self.prefix));
        (u32::from(addr) & mask) == (u32::from(self.base) & mask)
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_roundtrips_through_display() {
        let subnet = Subnet::parse("172.29.1.0/16").unwrap();
        assert_eq!(subnet.to_string(), "172.29.1.0/16");
    }

    #[test]
    fn parse_rejects_missing_prefix() {
        assert!(Subnet::parse("172.29.1.0").is_err());
    }

    #[test]
    fn parse_rejects_host_prefix() {
        assert!(Subnet::parse("10.0.0.0/31").is_err());
        assert!(Subnet::parse("10.0.0.0/0").is_err());
    }

    #[test]
    fn host_slots_offset_the_base() {
        let subnet = Subnet::parse("172.29.1.0/16").unwrap();
        assert_eq!(subnet.host_at(0).unwrap(), Ipv4Addr::new(172, 29, 1, 0));
        assert_eq!(subnet.host_at(4).unwrap(), Ipv4Addr::new(172, 29, 1, 4));
    }

    #[test]
    fn host_slot_overflow_is_rejected() {
        let subnet = Subnet::parse("10.0.0.250/24").unwrap();
        assert!(subnet.host_at(5).is_ok());
        assert!(subnet.host_at(6).is_err());
    }

    #[test]
    fn containment_follows_the_prefix() {
        let subnet = Subnet::parse("172.29.1.0/16").unwrap();
        assert!(subnet.contains(Ipv4Addr::new(172, 29, 200, 9)));
        assert!(!subnet.contains(Ipv4Addr::new(172, 30, 1, 1)));
    }
}
