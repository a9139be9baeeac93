//! IPv4 CIDR arithmetic for VPC address planning

use crate::error::{AwsError, Result};
use std::net::Ipv4Addr;
use std::str::FromStr;

/// IPv4 network block, e.g. `10.0.0.0/16`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Cidr {
    network: Ipv4Addr,
    prefix: u8,
}

impl Ipv4Cidr {
    pub const ANY: Ipv4Cidr = Ipv4Cidr {
        network: Ipv4Addr::UNSPECIFIED,
        prefix: 0,
    };

    /// Build a block; `network` must have no host bits set
    pub fn new(network: Ipv4Addr, prefix: u8) -> Result<Self> {
        if prefix > 32 {
            return Err(AwsError::InvalidCidr(format!("{}/{}", network, prefix)));
        }
        let cidr = Self { network, prefix };
        if u32::from(network) & !cidr.mask() != 0 {
            return Err(AwsError::InvalidCidr(format!(
                "{}/{} has host bits set",
                network, prefix
            )));
        }
        Ok(cidr)
    }

    /// Single-address block (`/32`)
    pub fn host(address: Ipv4Addr) -> Self {
        Self {
            network: address,
            prefix: 32,
        }
    }

    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    fn mask(&self) -> u32 {
        if self.prefix == 0 {
            0
        } else {
            u32::MAX << (32 - self.prefix)
        }
    }

    /// Number of addresses in the block
    pub fn size(&self) -> u64 {
        1u64 << (32 - self.prefix)
    }

    pub fn contains(&self, other: &Ipv4Cidr) -> bool {
        other.prefix >= self.prefix && u32::from(other.network) & self.mask() == u32::from(self.network)
    }
}

impl std::fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

impl FromStr for Ipv4Cidr {
    type Err = AwsError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || AwsError::InvalidCidr(s.to_string());
        let (addr, prefix) = s.split_once('/').ok_or_else(invalid)?;
        let network: Ipv4Addr = addr.parse().map_err(|_| invalid())?;
        let prefix: u8 = prefix.parse().map_err(|_| invalid())?;
        Self::new(network, prefix)
    }
}

/// Hands out consecutive, aligned sub-blocks of a parent block
#[derive(Debug)]
pub struct CidrAllocator {
    parent: Ipv4Cidr,
    /// Offset of the next free address from the parent's network address
    cursor: u64,
}

impl CidrAllocator {
    pub fn new(parent: Ipv4Cidr) -> Self {
        Self { parent, cursor: 0 }
    }

    /// Allocate the next block with the given prefix
    pub fn allocate(&mut self, prefix: u8) -> Result<Ipv4Cidr> {
        if prefix < self.parent.prefix || prefix > 32 {
            return Err(AwsError::InvalidSubnetLayout(format!(
                "/{} does not fit in {}",
                prefix, self.parent
            )));
        }

        let size = 1u64 << (32 - prefix);
        let start = self.cursor.div_ceil(size) * size;
        if start + size > self.parent.size() {
            return Err(AwsError::InvalidSubnetLayout(format!(
                "{} has no room left for another /{}",
                self.parent, prefix
            )));
        }
        self.cursor = start + size;

        let base = u32::from(self.parent.network) as u64 + start;
        Ipv4Cidr::new(Ipv4Addr::from(base as u32), prefix)
    }
}

/// Prefix length that splits `parent` evenly into at least `count` blocks
pub fn even_split_prefix(parent: &Ipv4Cidr, count: usize) -> Result<u8> {
    let count = count.max(1);
    let extra_bits = count.next_power_of_two().trailing_zeros() as u8;
    let prefix = parent.prefix + extra_bits;
    if prefix > 28 {
        return Err(AwsError::InvalidSubnetLayout(format!(
            "cannot split {} into {} subnets",
            parent, count
        )));
    }
    Ok(prefix)
}
