use crate::attrs::RawAttr;
use crate::constants::ATTR_SOFTWARE;
use crate::error::ParsePacketErr;
use bytes::Bytes;

// utf8 描述客户端, padding 在 RawAttr 里处理
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftwareAttr {
    pub name: String,
}

impl SoftwareAttr {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl From<SoftwareAttr> for RawAttr {
    fn from(attr: SoftwareAttr) -> Self {
        RawAttr::new(ATTR_SOFTWARE, Bytes::from(attr.name.into_bytes()))
    }
}

impl TryFrom<RawAttr> for SoftwareAttr {
    type Error = ParsePacketErr;

    fn try_from(base_attr: RawAttr) -> Result<Self, Self::Error> {
        match String::from_utf8(base_attr.value.to_vec()) {
            Ok(name) => Ok(Self { name }),
            Err(_e) => Err(ParsePacketErr::NotUtf8),
        }
    }
}
