use std::fmt;

/// Outcome of one NAT discovery run, rfc 3489 10.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NatType {
    Error,
    Unknown,
    Blocked,
    FullCone,
    Symmetric,
    Restricted,
    PortRestricted,
    None,
    SymmetricUdpFirewall,
}

impl NatType {
    // unknown / blocked 可能只是这个 server 的问题, 多 server 时不作为最终结果
    pub fn is_conclusive(&self) -> bool {
        !matches!(self, NatType::Unknown | NatType::Blocked)
    }
}

impl fmt::Display for NatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NatType::Error => "Test failed",
            NatType::Unknown => "Unexpected response from the STUN server",
            NatType::Blocked => "UDP is blocked",
            NatType::FullCone => "Full cone NAT",
            NatType::Symmetric => "Symmetric NAT",
            NatType::Restricted => "Restricted NAT",
            NatType::PortRestricted => "Port restricted NAT",
            NatType::None => "Not behind a NAT",
            NatType::SymmetricUdpFirewall => "Symmetric UDP firewall",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conclusive() {
        assert!(!NatType::Unknown.is_conclusive());
        assert!(!NatType::Blocked.is_conclusive());
        assert!(NatType::FullCone.is_conclusive());
        assert!(NatType::Error.is_conclusive());
    }

    #[test]
    fn test_display() {
        assert_eq!(NatType::PortRestricted.to_string(), "Port restricted NAT");
        assert_eq!(NatType::None.to_string(), "Not behind a NAT");
    }
}
