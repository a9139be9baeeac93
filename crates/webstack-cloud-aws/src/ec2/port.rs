//! Traffic peers and ports for security group rules

use crate::ec2::network::Ipv4Cidr;
use crate::error::{AwsError, Result};
use std::net::Ipv4Addr;

/// IP protocol of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Icmp,
    /// Every protocol (`-1`)
    All,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Icmp => "icmp",
            Protocol::All => "-1",
        }
    }
}

/// Source (ingress) or destination (egress) of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Peer {
    /// Any IPv4 address
    AnyIpv4,
    Ipv4(Ipv4Cidr),
}

impl Peer {
    pub fn any_ipv4() -> Self {
        Peer::AnyIpv4
    }

    pub fn ipv4(cidr: &str) -> Result<Self> {
        Ok(Peer::Ipv4(cidr.parse()?))
    }

    pub fn ipv4_host(octets: [u8; 4]) -> Self {
        Peer::Ipv4(Ipv4Cidr::host(Ipv4Addr::from(octets)))
    }

    pub fn cidr(&self) -> Ipv4Cidr {
        match self {
            Peer::AnyIpv4 => Ipv4Cidr::ANY,
            Peer::Ipv4(cidr) => *cidr,
        }
    }
}

impl std::fmt::Display for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.cidr())
    }
}

/// Protocol plus port range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Port {
    pub protocol: Protocol,
    /// Inclusive range; `None` for protocols without ports
    pub range: Option<(u16, u16)>,
}

impl Port {
    pub fn tcp(port: u16) -> Self {
        Self {
            protocol: Protocol::Tcp,
            range: Some((port, port)),
        }
    }

    pub fn tcp_range(from: u16, to: u16) -> Result<Self> {
        if from > to {
            return Err(AwsError::InvalidPortRange { from, to });
        }
        Ok(Self {
            protocol: Protocol::Tcp,
            range: Some((from, to)),
        })
    }

    pub fn all_traffic() -> Self {
        Self {
            protocol: Protocol::All,
            range: None,
        }
    }

    pub fn from_port(&self) -> Option<u16> {
        self.range.map(|(from, _)| from)
    }

    pub fn to_port(&self) -> Option<u16> {
        self.range.map(|(_, to)| to)
    }
}

impl std::fmt::Display for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.range {
            None => write!(f, "ALL TRAFFIC"),
            Some((from, to)) if from == to => write!(f, "{}", from),
            Some((from, to)) => write!(f, "{}-{}", from, to),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tcp_port() {
        let port = Port::tcp(80);
        assert_eq!(port.protocol.as_str(), "tcp");
        assert_eq!(port.from_port(), Some(80));
        assert_eq!(port.to_port(), Some(80));
        assert_eq!(port.to_string(), "80");
    }

    #[test]
    fn test_port_range() {
        assert_eq!(Port::tcp_range(8000, 8080).unwrap().to_string(), "8000-8080");
        assert!(matches!(
            Port::tcp_range(90, 80),
            Err(AwsError::InvalidPortRange { from: 90, to: 80 })
        ));
    }

    #[test]
    fn test_all_traffic() {
        let port = Port::all_traffic();
        assert_eq!(port.protocol.as_str(), "-1");
        assert_eq!(port.from_port(), None);
        assert_eq!(port.to_string(), "ALL TRAFFIC");
    }

    #[test]
    fn test_peer() {
        assert_eq!(Peer::any_ipv4().to_string(), "0.0.0.0/0");
        assert_eq!(Peer::ipv4("192.168.0.0/24").unwrap().to_string(), "192.168.0.0/24");
        assert!(Peer::ipv4("not-a-cidr").is_err());
    }
}
