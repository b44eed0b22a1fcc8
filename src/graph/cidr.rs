/// IPv4 CIDR blocks and subnet carving
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CidrError {
    #[error("invalid CIDR notation: {0}")]
    Malformed(String),

    #[error("prefix length {0} is out of range (0-32)")]
    PrefixOutOfRange(u8),

    #[error("address {addr} has host bits set for /{prefix}")]
    HostBitsSet { addr: Ipv4Addr, prefix: u8 },

    #[error("cannot split {block} into {count} subnets")]
    TooManySubnets { block: Ipv4Cidr, count: usize },
}

/// An IPv4 network block, e.g. `192.100.0.0/16`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ipv4Cidr {
    addr: Ipv4Addr,
    prefix: u8,
}

impl Ipv4Cidr {
    pub fn new(addr: Ipv4Addr, prefix: u8) -> Result<Self, CidrError> {
        if prefix > 32 {
            return Err(CidrError::PrefixOutOfRange(prefix));
        }
        if u32::from(addr) & !Self::mask(prefix) != 0 {
            return Err(CidrError::HostBitsSet { addr, prefix });
        }
        Ok(Self { addr, prefix })
    }

    /// The block covering every IPv4 address
    pub fn any() -> Self {
        Self {
            addr: Ipv4Addr::UNSPECIFIED,
            prefix: 0,
        }
    }

    #[cfg(test)]
    pub fn addr(&self) -> Ipv4Addr {
        self.addr
    }

    #[cfg(test)]
    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    fn mask(prefix: u8) -> u32 {
        if prefix == 0 {
            0
        } else {
            u32::MAX << (32 - prefix)
        }
    }

    /// Split the block into `count` equally sized subnets.
    ///
    /// The new prefix grows by `ceil(log2(count))`, so a /16 split four ways
    /// yields four /18 blocks in address order. When `count` is not a power
    /// of two the tail of the range is left unallocated.
    pub fn split(&self, count: usize) -> Result<Vec<Ipv4Cidr>, CidrError> {
        if count == 0 {
            return Ok(vec![]);
        }

        let extra_bits = count.next_power_of_two().trailing_zeros() as u8;
        let new_prefix = self.prefix + extra_bits;
        if new_prefix > 32 {
            return Err(CidrError::TooManySubnets {
                block: *self,
                count,
            });
        }

        let base = u32::from(self.addr);
        let size: u64 = 1u64 << (32 - new_prefix);
        Ok((0..count as u64)
            .map(|i| Ipv4Cidr {
                addr: Ipv4Addr::from((base as u64 + i * size) as u32),
                prefix: new_prefix,
            })
            .collect())
    }

    /// Whether `other` lies completely inside this block
    pub fn contains(&self, other: &Ipv4Cidr) -> bool {
        other.prefix >= self.prefix
            && u32::from(other.addr) & Self::mask(self.prefix) == u32::from(self.addr)
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}

impl FromStr for Ipv4Cidr {
    type Err = CidrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| CidrError::Malformed(s.to_string()))?;
        let addr: Ipv4Addr = addr
            .parse()
            .map_err(|_| CidrError::Malformed(s.to_string()))?;
        let prefix: u8 = prefix
            .parse()
            .map_err(|_| CidrError::Malformed(s.to_string()))?;
        Self::new(addr, prefix)
    }
}

impl Serialize for Ipv4Cidr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Ipv4Cidr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let cidr: Ipv4Cidr = "192.100.0.0/16".parse().unwrap();
        assert_eq!(cidr.addr(), Ipv4Addr::new(192, 100, 0, 0));
        assert_eq!(cidr.prefix(), 16);
        assert_eq!(cidr.to_string(), "192.100.0.0/16");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "192.100.0.0".parse::<Ipv4Cidr>(),
            Err(CidrError::Malformed(_))
        ));
        assert!(matches!(
            "10.0.0.0/40".parse::<Ipv4Cidr>(),
            Err(CidrError::PrefixOutOfRange(40))
        ));
        assert!(matches!(
            "10.0.0.1/24".parse::<Ipv4Cidr>(),
            Err(CidrError::HostBitsSet { .. })
        ));
    }

    #[test]
    fn test_split_into_quarters() {
        let vpc: Ipv4Cidr = "192.100.0.0/16".parse().unwrap();
        let subnets: Vec<String> = vpc.split(4).unwrap().iter().map(|c| c.to_string()).collect();
        assert_eq!(
            subnets,
            vec![
                "192.100.0.0/18",
                "192.100.64.0/18",
                "192.100.128.0/18",
                "192.100.192.0/18",
            ]
        );
    }

    #[test]
    fn test_split_non_power_of_two() {
        let vpc: Ipv4Cidr = "10.0.0.0/16".parse().unwrap();
        let subnets = vpc.split(6).unwrap();
        assert_eq!(subnets.len(), 6);
        assert!(subnets.iter().all(|s| s.prefix() == 19));
        assert!(subnets.iter().all(|s| vpc.contains(s)));
        assert_eq!(subnets[5].to_string(), "10.0.160.0/19");
    }

    #[test]
    fn test_split_too_small() {
        let block: Ipv4Cidr = "10.0.0.0/31".parse().unwrap();
        assert!(matches!(
            block.split(4),
            Err(CidrError::TooManySubnets { count: 4, .. })
        ));
    }

    #[test]
    fn test_any() {
        assert_eq!(Ipv4Cidr::any().to_string(), "0.0.0.0/0");
        let inner: Ipv4Cidr = "10.1.0.0/16".parse().unwrap();
        assert!(Ipv4Cidr::any().contains(&inner));
    }
}
