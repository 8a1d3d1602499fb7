#![allow(clippy::len_without_is_empty)]

use crate::constants::*;
use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{ParsePacketErr, ValidateErr};

pub type TransId = [u8; TRANS_ID_LEN];

// rfc 3489, 11.1
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub msg_type: u16,

    // 不包括header的20字节
    pub msg_len: u16,

    pub trans_id: TransId,
}

impl Header {
    pub fn new(msg_type: u16, msg_len: u16, trans_id: TransId) -> Self {
        Self {
            msg_type,
            msg_len,
            trans_id,
        }
    }

    pub fn len(&self) -> usize {
        HEADER_LEN
    }

    pub fn pack(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_LEN);
        self.pack_into(&mut buf);
        buf.freeze()
    }

    pub fn pack_into(&self, buf: &mut BytesMut) {
        buf.put_u16(self.msg_type);
        buf.put_u16(self.msg_len);
        buf.put_slice(&self.trans_id);
    }

    pub fn unpack(buf: &[u8]) -> Result<Self, ParsePacketErr> {
        // 只检查长度，不检查有效性
        let buf = match buf.get(..HEADER_LEN) {
            Some(v) => v,
            None => {
                return Err(ParsePacketErr::BufSize(format!(
                    "header buf len:{} < {}",
                    buf.len(),
                    HEADER_LEN
                )))
            }
        };

        let mut trans_id = [0_u8; TRANS_ID_LEN];
        trans_id.copy_from_slice(&buf[4..]);

        Ok(Self {
            msg_type: u16::from_be_bytes([buf[0], buf[1]]),
            msg_len: u16::from_be_bytes([buf[2], buf[3]]),
            trans_id,
        })
    }

    pub fn is_response(&self) -> bool {
        matches!(
            self.msg_type,
            MESSAGE_TYPE_BIND_RES | MESSAGE_TYPE_BIND_ERR_RES
        )
    }

    pub fn validate(&self) -> Option<ValidateErr> {
        if self.msg_type == MESSAGE_TYPE_BIND_REQ || self.is_response() {
            return None;
        }

        Some(ValidateErr(format!(
            "not support message type: {:#06x}",
            self.msg_type
        )))
    }
}
