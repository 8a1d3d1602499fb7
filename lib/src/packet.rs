use crate::attrs::address_attr::AddressAttr;
use crate::attrs::change_request::ChangeRequest;
use crate::attrs::errcode_attr::ErrcodeAttr;
use crate::attrs::fingerprint::FingerprintAttr;
use crate::attrs::{Attribute, RawAttr};
use crate::constants::*;
use crate::error::{AttrValidator, PackErr, ParsePacketErr, ValidateErr};
use crate::header::Header;
use crate::host::Host;
use bytes::{Bytes, BytesMut};

// 是否是一个正确的stun 包
// message_type 在范围内
// 验证message length
// 属性解析是否正常

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub header: Header,
    pub attrs: Vec<Attribute>,
}

impl Packet {
    pub fn new(header: Header, attrs: Vec<Attribute>) -> Self {
        let mut packet = Self { header, attrs };
        packet.update_header_len();
        packet
    }

    fn raw_attrs(&self) -> Vec<RawAttr> {
        let trans_id = &self.header.trans_id;
        self.attrs.iter().map(|x| x.to_raw(trans_id)).collect()
    }

    fn update_header_len(&mut self) {
        let total = self.raw_attrs().iter().fold(0_usize, |acc, x| acc + x.len());
        // 超长时不改 header, pack 时报错
        if let Ok(len) = u16::try_from(total) {
            self.header.msg_len = len;
        }
    }

    pub fn add_attr(&mut self, attr: Attribute) {
        self.attrs.push(attr);
        self.update_header_len();
    }

    /// Appends a FINGERPRINT attribute holding the checksum of the message
    /// as it will be encoded.
    pub fn add_fingerprint(&mut self) -> Result<(), PackErr> {
        self.add_attr(Attribute::Fingerprint(0));
        let buf = match self.pack() {
            Ok(v) => v,
            Err(e) => {
                self.attrs.pop();
                self.update_header_len();
                return Err(e);
            }
        };

        let offset = buf.len() - FINGERPRINT_LEN;
        let crc = u32::from_be_bytes([
            buf[offset],
            buf[offset + 1],
            buf[offset + 2],
            buf[offset + 3],
        ]);
        if let Some(last) = self.attrs.last_mut() {
            *last = Attribute::Fingerprint(crc);
        }
        Ok(())
    }

    pub fn pack(&self) -> Result<Bytes, PackErr> {
        let raw_attrs = self.raw_attrs();

        for raw in raw_attrs.iter() {
            if raw.value.len() > u16::MAX as usize {
                return Err(PackErr::AttrTooLarge {
                    attr_type: raw.attr_type,
                    len: raw.value.len(),
                });
            }
        }

        let body_len = raw_attrs.iter().fold(0_usize, |acc, x| acc + x.len());
        if body_len > u16::MAX as usize {
            return Err(PackErr::MessageTooLarge(body_len));
        }

        // header 里写最终长度, fingerprint 要覆盖它
        let header = Header::new(self.header.msg_type, body_len as u16, self.header.trans_id);
        let mut buf = BytesMut::with_capacity(HEADER_LEN + body_len);
        header.pack_into(&mut buf);

        let last = raw_attrs.len().saturating_sub(1);
        for (i, raw) in raw_attrs.iter().enumerate() {
            if raw.attr_type == ATTR_FINGERPRINT {
                if i != last {
                    return Err(PackErr::FingerprintNotLast);
                }
                let fingerprint: RawAttr = FingerprintAttr::compute(&buf).into();
                fingerprint.pack_into(&mut buf)?;
            } else {
                raw.pack_into(&mut buf)?;
            }
        }

        Ok(buf.freeze())
    }

    pub fn unpack(buf: &[u8]) -> Result<Self, ParsePacketErr> {
        if buf.len() < HEADER_LEN {
            return Err(ParsePacketErr::BufSize(format!(
                "header buf len:{} < {}",
                buf.len(),
                HEADER_LEN
            )));
        }

        let header = Header::unpack(&buf[..HEADER_LEN])?;
        let total = HEADER_LEN + header.msg_len as usize;

        if buf.len() < total {
            return Err(ParsePacketErr::BufSize(format!(
                "packet truncated, buf len:{} < {}",
                buf.len(),
                total
            )));
        }
        if buf.len() > total {
            return Err(ParsePacketErr::NotMatch(format!(
                "header len:{} != {}",
                header.msg_len,
                buf.len() - HEADER_LEN
            )));
        }

        let mut body = &buf[HEADER_LEN..];
        let mut attrs = vec![];

        while !body.is_empty() {
            let (raw, used) = RawAttr::unpack(body)?;
            attrs.push(Attribute::from_raw(raw, &header.trans_id)?);
            body = &body[used..];
        }

        Ok(Self { header, attrs })
    }

    /// Recomputes the fingerprint over `raw` (the bytes this packet was
    /// decoded from). `None` when the packet carries no FINGERPRINT.
    pub fn check_fingerprint(&self, raw: &[u8]) -> Option<bool> {
        let crc = match self.attrs.last() {
            Some(Attribute::Fingerprint(v)) => *v,
            _ => return None,
        };

        let attr_len = ATTR_HEADER_LEN + FINGERPRINT_LEN;
        if raw.len() < HEADER_LEN + attr_len {
            return Some(false);
        }

        let expect = FingerprintAttr::compute(&raw[..raw.len() - attr_len]);
        Some(expect.crc == crc)
    }

    pub fn xor_mapped_address(&self) -> Option<Host> {
        self.attrs.iter().find_map(|x| match x {
            Attribute::XorMappedAddress(v) => Some(Host::new(*v)),
            _ => None,
        })
    }

    pub fn mapped_address(&self) -> Option<Host> {
        self.attrs.iter().find_map(|x| match x {
            Attribute::MappedAddress(v) => Some(Host::new(*v)),
            _ => None,
        })
    }

    pub fn changed_address(&self) -> Option<Host> {
        self.attrs.iter().find_map(|x| match x {
            Attribute::ChangedAddress(v) => Some(Host::new(*v)),
            _ => None,
        })
    }

    // rfc 5780 的 other-address
    pub fn other_address(&self) -> Option<Host> {
        self.attrs.iter().find_map(|x| match x {
            Attribute::OtherAddress(v) => Some(Host::new(*v)),
            _ => None,
        })
    }

    pub fn change_request(&self) -> Option<ChangeRequest> {
        self.attrs.iter().find_map(|x| match x {
            Attribute::ChangeRequest(v) => Some(*v),
            _ => None,
        })
    }

    pub fn software(&self) -> Option<&str> {
        self.attrs.iter().find_map(|x| match x {
            Attribute::Software(v) => Some(v.as_str()),
            _ => None,
        })
    }

    pub fn error_code(&self) -> Option<&ErrcodeAttr> {
        self.attrs.iter().find_map(|x| match x {
            Attribute::ErrorCode(v) => Some(v),
            _ => None,
        })
    }

    pub fn fingerprint(&self) -> Option<u32> {
        self.attrs.iter().find_map(|x| match x {
            Attribute::Fingerprint(v) => Some(*v),
            _ => None,
        })
    }

    pub fn validate(&self) -> Option<ValidateErr> {
        if let Some(v) = self.header.validate() {
            return Some(v);
        }

        for v in self.attrs.iter() {
            let address = match v {
                Attribute::MappedAddress(addr)
                | Attribute::XorMappedAddress(addr)
                | Attribute::ChangedAddress(addr)
                | Attribute::OtherAddress(addr) => Some(AddressAttr::new(v.attr_type(), *addr)),
                _ => None,
            };
            if let Some(e) = address.and_then(|x| x.validate()) {
                return Some(e);
            }

            if let Attribute::ErrorCode(e) = v {
                if let Some(e) = e.validate() {
                    return Some(e);
                }
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::new_trans_id;

    fn request() -> Packet {
        let header = Header::new(MESSAGE_TYPE_BIND_REQ, 0, new_trans_id());
        Packet::new(
            header,
            vec![
                Attribute::Software("StunClient".to_string()),
                Attribute::ChangeRequest(ChangeRequest::new(true, true)),
            ],
        )
    }

    #[test]
    fn test_header_len() {
        let packet = request();
        // software 4+12, change-request 4+4
        assert_eq!(packet.header.msg_len, 24);
        assert_eq!(packet.pack().unwrap().len(), HEADER_LEN + 24);
    }

    #[test]
    fn test_fingerprint_last() {
        let mut packet = request();
        packet.add_fingerprint().unwrap();
        assert_eq!(packet.header.msg_len, 32);

        let buf = packet.pack().unwrap();
        assert_eq!(&buf[buf.len() - 8..buf.len() - 4], &[0x80, 0x28, 0x00, 0x04]);

        let parsed = Packet::unpack(&buf).unwrap();
        assert_eq!(parsed, packet);
        assert_eq!(parsed.check_fingerprint(&buf), Some(true));
    }

    #[test]
    fn test_fingerprint_not_last() {
        let mut packet = request();
        packet.add_fingerprint().unwrap();
        packet.add_attr(Attribute::Software("x".to_string()));
        assert_eq!(packet.pack().unwrap_err(), PackErr::FingerprintNotLast);
    }

    #[test]
    fn test_tampered_fingerprint() {
        let mut packet = request();
        packet.add_fingerprint().unwrap();
        let mut buf = packet.pack().unwrap().to_vec();
        // 改 software 的一个字节
        buf[HEADER_LEN + 4] ^= 0x20;

        let parsed = Packet::unpack(&buf).unwrap();
        assert_eq!(parsed.check_fingerprint(&buf), Some(false));
    }

    #[test]
    fn test_truncated() {
        let buf = request().pack().unwrap();
        let err = Packet::unpack(&buf[..buf.len() - 4]).unwrap_err();
        assert!(matches!(err, ParsePacketErr::BufSize(_)));
    }

    #[test]
    fn test_trailing_bytes() {
        let mut buf = request().pack().unwrap().to_vec();
        buf.extend_from_slice(&[0, 0, 0, 0]);
        let err = Packet::unpack(&buf).unwrap_err();
        assert!(matches!(err, ParsePacketErr::NotMatch(_)));
    }

    #[test]
    fn test_declared_len_inside_attr() {
        // header 声明的长度切断了最后一个属性
        let mut buf = request().pack().unwrap().to_vec();
        buf.truncate(buf.len() - 4);
        let len = (buf.len() - HEADER_LEN) as u16;
        buf[2..4].copy_from_slice(&len.to_be_bytes());

        let err = Packet::unpack(&buf).unwrap_err();
        assert!(matches!(err, ParsePacketErr::BufSize(_)));
    }

    #[test]
    fn test_many_attrs() {
        let header = Header::new(MESSAGE_TYPE_BIND_RES, 0, new_trans_id());
        let attrs = (0..33)
            .map(|_| Attribute::Software("a".to_string()))
            .collect();
        let packet = Packet::new(header, attrs);
        let buf = packet.pack().unwrap();
        assert_eq!(buf.len(), HEADER_LEN + 33 * 8);

        assert_eq!(Packet::unpack(&buf).unwrap(), packet);
    }

    #[test]
    fn test_message_too_large() {
        let header = Header::new(MESSAGE_TYPE_BIND_REQ, 0, new_trans_id());
        let big = Attribute::Unknown(RawAttr::new(0x7f00, Bytes::from(vec![0_u8; 40000])));
        let mut packet = Packet::new(header, vec![big.clone()]);
        assert_eq!(packet.header.msg_len, 40004);

        packet.add_attr(big);
        assert_eq!(packet.header.msg_len, 40004);
        assert!(matches!(packet.pack(), Err(PackErr::MessageTooLarge(80008))));
    }

    #[test]
    fn test_accessors() {
        let header = Header::new(MESSAGE_TYPE_BIND_RES, 0, new_trans_id());
        let mapped = "1.2.3.4:1000".parse().unwrap();
        let xor_mapped = "1.2.3.4:1001".parse().unwrap();
        let changed = "5.6.7.8:3479".parse().unwrap();
        let packet = Packet::new(
            header,
            vec![
                Attribute::MappedAddress(mapped),
                Attribute::XorMappedAddress(xor_mapped),
                Attribute::ChangedAddress(changed),
            ],
        );

        assert_eq!(packet.mapped_address(), Some(Host::new(mapped)));
        assert_eq!(packet.xor_mapped_address(), Some(Host::new(xor_mapped)));
        assert_eq!(packet.changed_address(), Some(Host::new(changed)));
        assert_eq!(packet.other_address(), None);
        assert_eq!(packet.change_request(), None);
        assert_eq!(packet.fingerprint(), None);
        assert!(packet.validate().is_none());
    }

    #[test]
    fn test_validate_error_response() {
        let header = Header::new(MESSAGE_TYPE_BIND_ERR_RES, 0, new_trans_id());
        let packet = Packet::new(header, vec![Attribute::ErrorCode(ErrcodeAttr::new(120, "x"))]);
        assert!(packet.validate().is_some());
    }
}
