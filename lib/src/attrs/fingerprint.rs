use crate::attrs::RawAttr;
use crate::constants::*;
use crate::error::ParsePacketErr;
use bytes::{BufMut, BytesMut};

// rfc 5389, 15.5
// crc32(fingerprint 之前的所有字节, header 的长度已包含 fingerprint) ^ 0x5354554e
// 必须是最后一个属性

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerprintAttr {
    pub crc: u32,
}

impl FingerprintAttr {
    pub fn new(crc: u32) -> Self {
        Self { crc }
    }

    pub fn compute(buf: &[u8]) -> Self {
        Self::new(crc32fast::hash(buf) ^ FINGERPRINT_XOR)
    }
}

impl From<FingerprintAttr> for RawAttr {
    fn from(attr: FingerprintAttr) -> Self {
        let mut bytes_buf = BytesMut::with_capacity(FINGERPRINT_LEN);
        bytes_buf.put_u32(attr.crc);
        RawAttr::new(ATTR_FINGERPRINT, bytes_buf.freeze())
    }
}

impl TryFrom<RawAttr> for FingerprintAttr {
    type Error = ParsePacketErr;

    fn try_from(base_attr: RawAttr) -> Result<Self, Self::Error> {
        if base_attr.value.len() != FINGERPRINT_LEN {
            return Err(ParsePacketErr::BufSize(format!(
                "fingerprint attr len:{} != {}",
                base_attr.value.len(),
                FINGERPRINT_LEN
            )));
        }

        let value = &base_attr.value[..];
        let crc = u32::from_be_bytes([value[0], value[1], value[2], value[3]]);
        Ok(Self { crc })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute() {
        // crc32("123456789") = 0xCBF43926
        let attr = FingerprintAttr::compute(b"123456789");
        assert_eq!(attr.crc, 0xCBF4_3926 ^ FINGERPRINT_XOR);
    }

    #[test]
    fn test_bad_len() {
        let raw = RawAttr::new(ATTR_FINGERPRINT, bytes::Bytes::from_static(&[1, 2]));
        let res: Result<FingerprintAttr, _> = raw.try_into();
        assert!(res.is_err());
    }
}
