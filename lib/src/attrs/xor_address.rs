use crate::attrs::address_attr::{pack_address, AddressAttr};
use crate::attrs::RawAttr;
use crate::constants::*;
use crate::error::ParsePacketErr;
use crate::header::TransId;
use crate::util;
use std::net::SocketAddr;

// xor-mapped-address 端口和ip需要混淆
// port 和 magic cookie 高16位做 xor
// address(ipv4) 和 magic cookie做xor
// address(ipv6) 和 magic cookie + trans_id 做xor

#[derive(Debug, Clone)]
pub struct XorMappedAddress {
    pub address: SocketAddr,
    pub trans_id: TransId,
}

impl XorMappedAddress {
    pub fn new(trans_id: TransId, address: SocketAddr) -> Self {
        Self { trans_id, address }
    }

    pub fn from_base_attr(base_attr: RawAttr, trans_id: &TransId) -> Result<Self, ParsePacketErr> {
        let address_attr: AddressAttr = base_attr.try_into()?;

        Ok(Self {
            address: util::xor_address(address_attr.address, trans_id),
            trans_id: *trans_id,
        })
    }
}

impl From<XorMappedAddress> for RawAttr {
    fn from(attr: XorMappedAddress) -> Self {
        let xor_socket_addr = util::xor_address(attr.address, &attr.trans_id);
        pack_address(ATTR_XOR_MAPPED_ADDRESS, &xor_socket_addr)
    }
}
