// 0x2112A442
pub const MAGIC_COOKIE: [u8; 4] = [0x21, 0x12, 0xA4, 0x42];

pub const TRANS_ID_LEN: usize = 16;
pub const HEADER_LEN: usize = 20;
pub const ATTR_HEADER_LEN: usize = 4;

pub const MESSAGE_TYPE_BIND_REQ: u16 = 0x0001;
pub const MESSAGE_TYPE_BIND_RES: u16 = 0x0101;
pub const MESSAGE_TYPE_BIND_ERR_RES: u16 = 0x0111;

pub const ATTR_FAMILY_IPV4: u8 = 0x01;
pub const ATTR_FAMILY_IPV6: u8 = 0x02;

pub const ATTR_MAPPED_ADDRESS: u16 = 0x0001;
pub const ATTR_CHANGE_REQUEST: u16 = 0x0003;
pub const ATTR_CHANGED_ADDRESS: u16 = 0x0005;
pub const ATTR_ERROR_CODE: u16 = 0x0009;
pub const ATTR_XOR_MAPPED_ADDRESS: u16 = 0x0020;

// rfc 3489bis drafts, still sent by some old servers
pub const ATTR_XOR_MAPPED_ADDRESS_OLD: u16 = 0x8020;
pub const ATTR_SOFTWARE: u16 = 0x8022;
pub const ATTR_FINGERPRINT: u16 = 0x8028;
pub const ATTR_RESPONSE_ORIGIN: u16 = 0x802b;
pub const ATTR_OTHER_ADDRESS: u16 = 0x802c;

pub const CHANGE_IP_FLAG: u32 = 0x04;
pub const CHANGE_PORT_FLAG: u32 = 0x02;

// rfc 5389, 15.5
pub const FINGERPRINT_XOR: u32 = 0x5354_554e;
pub const FINGERPRINT_LEN: usize = 4;

pub const DEFAULT_SOFTWARE: &str = "StunClient";

pub const RECV_BUF_LEN: usize = 32 * 1024;
