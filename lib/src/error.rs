use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error, {0}")]
    Io(#[from] io::Error),

    #[error("can't resolve address: {0}")]
    Resolve(String),

    #[error("parse packet error, {0}")]
    Parse(#[from] ParsePacketErr),

    #[error("pack packet error, {0}")]
    Pack(#[from] PackErr),

    #[error("validate error, {0}")]
    Validate(#[from] ValidateErr),

    #[error("error response, code: {code}, reason: {reason}")]
    ErrorResponse { code: u16, reason: String },

    #[error("no {0} attribute in response")]
    MissingAttr(&'static str),

    #[error("stun: no response")]
    NoResponse,

    #[error("stun: deadline exceeded")]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidateErr(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParsePacketErr {
    // 长度或值不匹配
    #[error("length not match, {0}")]
    NotMatch(String),

    // buf不够
    #[error("buffer too short, {0}")]
    BufSize(String),

    //字段的值不合规
    #[error("bad value, {0}")]
    BadValue(String),

    // 不是utf8字符串
    #[error("not utf8 string")]
    NotUtf8,

}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackErr {
    // value 超过 u16
    #[error("attr {attr_type:#06x} value len {len} > 65535")]
    AttrTooLarge { attr_type: u16, len: usize },

    #[error("message body len {0} > 65535")]
    MessageTooLarge(usize),

    #[error("fingerprint must be the last attribute")]
    FingerprintNotLast,
}

pub trait AttrValidator {
    fn validate(&self) -> Option<ValidateErr>;
}
