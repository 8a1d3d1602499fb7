use crate::attrs::RawAttr;
use crate::constants::*;
use crate::error::{AttrValidator, ParsePacketErr, ValidateErr};
use bytes::{BufMut, BytesMut};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

// 地址类的attribute
//
// mapped-address  changed-address  other-address  response-origin

// 0(1) + family(1) + port(2) + address
// ipv4: family: 0x01, 4 bytes
// ipv6: family: 0x02, 16 bytes

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressAttr {
    pub attr_type: u16,
    pub address: SocketAddr,
}

impl AddressAttr {
    pub fn new(attr_type: u16, address: SocketAddr) -> Self {
        Self { attr_type, address }
    }
}

pub(crate) fn pack_address(attr_type: u16, address: &SocketAddr) -> RawAttr {
    let (family, ip_bytes): (u8, Vec<u8>) = match address {
        SocketAddr::V4(addr) => (ATTR_FAMILY_IPV4, addr.ip().octets().into()),
        SocketAddr::V6(addr) => (ATTR_FAMILY_IPV6, addr.ip().octets().into()),
    };

    let mut bytes_buf = BytesMut::with_capacity(4 + ip_bytes.len());

    bytes_buf.put_u8(0);
    bytes_buf.put_u8(family);
    bytes_buf.put_u16(address.port());
    bytes_buf.put_slice(&ip_bytes);

    RawAttr::new(attr_type, bytes_buf.freeze())
}

impl From<AddressAttr> for RawAttr {
    fn from(attr: AddressAttr) -> Self {
        pack_address(attr.attr_type, &attr.address)
    }
}

impl TryFrom<RawAttr> for AddressAttr {
    type Error = ParsePacketErr;

    fn try_from(base_attr: RawAttr) -> Result<Self, Self::Error> {
        let attr_type = base_attr.attr_type;

        // 从 value中解析
        let mut index = 0_usize;
        let value = &base_attr.value[..];

        if value.len() < 4 {
            return Err(ParsePacketErr::BufSize(format!(
                "address attr buf len:{}",
                value.len()
            )));
        }

        index += 1;
        let family = value[index];

        index += 1;
        let port = u16::from_be_bytes([value[index], value[index + 1]]);

        index += 2;

        let address = match family {
            ATTR_FAMILY_IPV4 => {
                if index + 4 > value.len() {
                    return Err(ParsePacketErr::BufSize("ipv4 buf len < 4".to_string()));
                }
                let mut addr = [0_u8; 4];
                addr.copy_from_slice(&value[index..index + 4]);
                SocketAddr::new(IpAddr::V4(Ipv4Addr::from(addr)), port)
            }
            ATTR_FAMILY_IPV6 => {
                if index + 16 > value.len() {
                    return Err(ParsePacketErr::BufSize("ipv6 buf len < 16".to_string()));
                }
                let mut addr = [0_u8; 16];
                addr.copy_from_slice(&value[index..index + 16]);
                SocketAddr::new(IpAddr::V6(Ipv6Addr::from(addr)), port)
            }
            v => {
                return Err(ParsePacketErr::BadValue(format!("ip family: {}", v)));
            }
        };

        Ok(Self { attr_type, address })
    }
}

impl AttrValidator for AddressAttr {
    fn validate(&self) -> Option<ValidateErr> {
        if self.address.port() != 0 {
            return None;
        }

        let err_msg = format!(
            "attr {:#06x}, wrong address: {}",
            self.attr_type, self.address
        );
        Some(ValidateErr(err_msg))
    }
}
