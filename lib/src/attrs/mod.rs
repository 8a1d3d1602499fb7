#![allow(clippy::len_without_is_empty)]

use bytes::{BufMut, Bytes, BytesMut};
use std::net::SocketAddr;

use crate::constants::*;
use crate::error::{PackErr, ParsePacketErr};
use crate::header::TransId;
use crate::util::align;

pub mod address_attr;
pub mod change_request;
pub mod errcode_attr;
pub mod fingerprint;
pub mod software;
pub mod xor_address;

use address_attr::AddressAttr;
use change_request::ChangeRequest;
use errcode_attr::ErrcodeAttr;
use fingerprint::FingerprintAttr;
use software::SoftwareAttr;
use xor_address::XorMappedAddress;

// type(2) + length(2) + value, value 按4字节对齐补0
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttr {
    pub attr_type: u16,
    pub value: Bytes,
}

impl RawAttr {
    pub fn new(attr_type: u16, value: Bytes) -> Self {
        Self { attr_type, value }
    }

    // 编码后占用的字节数, 包括 4 字节头和 padding
    pub fn len(&self) -> usize {
        ATTR_HEADER_LEN + align(self.value.len())
    }

    pub fn pack_into(&self, buf: &mut BytesMut) -> Result<(), PackErr> {
        let value_len = self.value.len();
        if value_len > u16::MAX as usize {
            return Err(PackErr::AttrTooLarge {
                attr_type: self.attr_type,
                len: value_len,
            });
        }

        buf.put_u16(self.attr_type);
        buf.put_u16(value_len as u16);
        buf.put_slice(&self.value);
        buf.put_bytes(0, align(value_len) - value_len);
        Ok(())
    }

    pub fn pack(&self) -> Result<Bytes, PackErr> {
        let mut buf = BytesMut::with_capacity(self.len());
        self.pack_into(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Reads one attribute from the front of `buf`, returning it together with
    /// the number of bytes it occupied (padding included).
    pub fn unpack(buf: &[u8]) -> Result<(Self, usize), ParsePacketErr> {
        if buf.len() < ATTR_HEADER_LEN {
            return Err(ParsePacketErr::BufSize(format!("attr buf len:{}", buf.len())));
        }

        let mut index = 0_usize;
        let attr_type = u16::from_be_bytes([buf[index], buf[index + 1]]);

        index += 2;
        let attr_len = u16::from_be_bytes([buf[index], buf[index + 1]]) as usize;

        let total = ATTR_HEADER_LEN + align(attr_len);
        if buf.len() < total {
            return Err(ParsePacketErr::BufSize(format!(
                "attr {:#06x} buf len:{} < {}",
                attr_type,
                buf.len(),
                total
            )));
        }

        index += 2;
        let value = Bytes::copy_from_slice(&buf[index..index + attr_len]);

        Ok((Self { attr_type, value }, total))
    }
}

/// A decoded STUN attribute. Types this crate does not understand are kept
/// as `Unknown` so a message survives decode/encode unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    MappedAddress(SocketAddr),
    XorMappedAddress(SocketAddr),
    ChangedAddress(SocketAddr),
    OtherAddress(SocketAddr),
    ChangeRequest(ChangeRequest),
    Software(String),
    ErrorCode(ErrcodeAttr),
    Fingerprint(u32),
    Unknown(RawAttr),
}

impl Attribute {
    pub fn attr_type(&self) -> u16 {
        match self {
            Attribute::MappedAddress(_) => ATTR_MAPPED_ADDRESS,
            Attribute::XorMappedAddress(_) => ATTR_XOR_MAPPED_ADDRESS,
            Attribute::ChangedAddress(_) => ATTR_CHANGED_ADDRESS,
            Attribute::OtherAddress(_) => ATTR_OTHER_ADDRESS,
            Attribute::ChangeRequest(_) => ATTR_CHANGE_REQUEST,
            Attribute::Software(_) => ATTR_SOFTWARE,
            Attribute::ErrorCode(_) => ATTR_ERROR_CODE,
            Attribute::Fingerprint(_) => ATTR_FINGERPRINT,
            Attribute::Unknown(raw) => raw.attr_type,
        }
    }

    // xor-mapped-address(ipv6) 需要 trans_id
    pub fn to_raw(&self, trans_id: &TransId) -> RawAttr {
        match self {
            Attribute::MappedAddress(addr) => AddressAttr::new(ATTR_MAPPED_ADDRESS, *addr).into(),
            Attribute::XorMappedAddress(addr) => XorMappedAddress::new(*trans_id, *addr).into(),
            Attribute::ChangedAddress(addr) => {
                AddressAttr::new(ATTR_CHANGED_ADDRESS, *addr).into()
            }
            Attribute::OtherAddress(addr) => AddressAttr::new(ATTR_OTHER_ADDRESS, *addr).into(),
            Attribute::ChangeRequest(v) => v.clone().into(),
            Attribute::Software(v) => SoftwareAttr::new(v).into(),
            Attribute::ErrorCode(v) => v.clone().into(),
            Attribute::Fingerprint(v) => FingerprintAttr::new(*v).into(),
            Attribute::Unknown(raw) => raw.clone(),
        }
    }

    pub fn from_raw(raw: RawAttr, trans_id: &TransId) -> Result<Self, ParsePacketErr> {
        let attr = match raw.attr_type {
            ATTR_MAPPED_ADDRESS => {
                let v: AddressAttr = raw.try_into()?;
                Attribute::MappedAddress(v.address)
            }
            ATTR_XOR_MAPPED_ADDRESS | ATTR_XOR_MAPPED_ADDRESS_OLD => {
                let v = XorMappedAddress::from_base_attr(raw, trans_id)?;
                Attribute::XorMappedAddress(v.address)
            }
            ATTR_CHANGED_ADDRESS => {
                let v: AddressAttr = raw.try_into()?;
                Attribute::ChangedAddress(v.address)
            }
            ATTR_OTHER_ADDRESS => {
                let v: AddressAttr = raw.try_into()?;
                Attribute::OtherAddress(v.address)
            }
            ATTR_CHANGE_REQUEST => Attribute::ChangeRequest(raw.try_into()?),
            ATTR_SOFTWARE => {
                let v: SoftwareAttr = raw.try_into()?;
                Attribute::Software(v.name)
            }
            ATTR_ERROR_CODE => Attribute::ErrorCode(raw.try_into()?),
            ATTR_FINGERPRINT => {
                let v: FingerprintAttr = raw.try_into()?;
                Attribute::Fingerprint(v.crc)
            }
            _ => Attribute::Unknown(raw),
        };

        Ok(attr)
    }
}
