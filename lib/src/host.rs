use crate::constants::{ATTR_FAMILY_IPV4, ATTR_FAMILY_IPV6};
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// An endpoint reported by a STUN server, either the mapped address the
/// server saw for a request or the alternate address it answers from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Host {
    addr: SocketAddr,
}

impl Host {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// Address family as carried on the wire: `0x01` for IPv4, `0x02` for IPv6.
    pub fn family(&self) -> u8 {
        match self.addr.ip() {
            IpAddr::V4(_) => ATTR_FAMILY_IPV4,
            IpAddr::V6(_) => ATTR_FAMILY_IPV6,
        }
    }

    pub fn ip(&self) -> IpAddr {
        self.addr.ip()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn socket_addr(&self) -> SocketAddr {
        self.addr
    }

    // "ip:port", ipv6 带中括号
    pub fn transport_addr(&self) -> String {
        self.addr.to_string()
    }
}

impl From<SocketAddr> for Host {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr)
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.addr)
    }
}
