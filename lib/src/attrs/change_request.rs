use crate::attrs::RawAttr;
use crate::constants::*;
use crate::error::ParsePacketErr;
use bytes::{BufMut, BytesMut};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangeRequest {
    pub change_ip: bool,
    pub change_port: bool,
}

impl ChangeRequest {
    pub fn new(change_ip: bool, change_port: bool) -> Self {
        Self {
            change_ip,
            change_port,
        }
    }
}

impl From<ChangeRequest> for RawAttr {
    fn from(attr: ChangeRequest) -> Self {
        let mut flag: u32 = 0;
        if attr.change_ip {
            flag |= CHANGE_IP_FLAG;
        }
        if attr.change_port {
            flag |= CHANGE_PORT_FLAG;
        }
        let mut bytes_buf = BytesMut::with_capacity(4);
        bytes_buf.put_u32(flag);
        RawAttr::new(ATTR_CHANGE_REQUEST, bytes_buf.freeze())
    }
}

impl TryFrom<RawAttr> for ChangeRequest {
    type Error = ParsePacketErr;

    fn try_from(base_attr: RawAttr) -> Result<Self, Self::Error> {
        if base_attr.value.len() != 4 {
            return Err(ParsePacketErr::BufSize(format!(
                "change_request attr len:{} !=4",
                base_attr.value.len()
            )));
        }

        let value = &base_attr.value[..];
        let flag = u32::from_be_bytes([value[0], value[1], value[2], value[3]]);

        Ok(Self {
            change_ip: flag & CHANGE_IP_FLAG == CHANGE_IP_FLAG,
            change_port: flag & CHANGE_PORT_FLAG == CHANGE_PORT_FLAG,
        })
    }
}
