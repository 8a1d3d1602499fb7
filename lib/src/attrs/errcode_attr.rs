use crate::attrs::RawAttr;
use crate::constants::ATTR_ERROR_CODE;
use crate::error::{AttrValidator, ParsePacketErr, ValidateErr};
use crate::util;
use bytes::{BufMut, BytesMut};

// class:  3 bit        3-6
// number: 8 bit        0-99

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrcodeAttr {
    pub code: u16,
    pub msg: String,
}

impl ErrcodeAttr {
    pub fn new(code: u16, msg: &str) -> Self {
        Self {
            code,
            msg: msg.to_string(),
        }
    }
}

impl From<ErrcodeAttr> for RawAttr {
    fn from(attr: ErrcodeAttr) -> Self {
        let mut bytes_buf = BytesMut::with_capacity(4 + attr.msg.len());
        bytes_buf.put_u16(0);
        bytes_buf.put_u16(util::pack_error_code(attr.code));
        bytes_buf.put_slice(attr.msg.as_bytes());

        RawAttr::new(ATTR_ERROR_CODE, bytes_buf.freeze())
    }
}

impl TryFrom<RawAttr> for ErrcodeAttr {
    type Error = ParsePacketErr;

    fn try_from(base_attr: RawAttr) -> Result<Self, Self::Error> {
        if base_attr.value.len() < 4 {
            return Err(ParsePacketErr::BufSize(format!(
                "err_code attr buf len:{} < 4",
                base_attr.value.len()
            )));
        }

        let value = &base_attr.value[..];
        let code = u16::from_be_bytes([value[2], value[3]]);
        let code = util::unpack_error_code(code);

        let msg = match String::from_utf8(value[4..].to_vec()) {
            Ok(v) => v,
            Err(_e) => {
                return Err(ParsePacketErr::NotUtf8);
            }
        };

        Ok(Self { code, msg })
    }
}

impl AttrValidator for ErrcodeAttr {
    fn validate(&self) -> Option<ValidateErr> {
        if self.code >= 300 && self.code < 700 {
            return None;
        }

        let err_msg = format!("wrong code: {}", self.code);
        Some(ValidateErr(err_msg))
    }
}
