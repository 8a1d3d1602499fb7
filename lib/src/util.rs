use crate::constants::{MAGIC_COOKIE, TRANS_ID_LEN};
use crate::header::TransId;
use rand::prelude::*;
use std::fmt::Write as _;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};

pub fn print_bytes(buf: &[u8], separator: &str, row_width: usize) -> String {
    let mut hex = String::new();
    buf.iter().enumerate().for_each(|(x, y)| {
        let _ = write!(hex, "{:02X}", y);
        if (x + 1) % row_width == 0 {
            hex.push('\n');
        } else {
            hex.push_str(separator);
        }
    });

    hex
}

// 前4字节是 magic cookie, 后12字节随机
pub fn new_trans_id() -> TransId {
    let cookie_len = MAGIC_COOKIE.len();
    let mut trans_id = [0u8; TRANS_ID_LEN];

    trans_id[..cookie_len].copy_from_slice(&MAGIC_COOKIE[..]);
    rand::thread_rng().fill_bytes(&mut trans_id[cookie_len..]);
    trans_id
}

/// Rounds `len` up to the next multiple of 4.
pub fn align(len: usize) -> usize {
    (len + 3) & !3
}

fn xor_port(port: u16) -> u16 {
    let magic_prefix = u16::from_be_bytes([MAGIC_COOKIE[0], MAGIC_COOKIE[1]]);
    port ^ magic_prefix
}

pub fn xor_address_v4(addr: SocketAddrV4) -> SocketAddrV4 {
    let src_buf = addr.ip().octets();
    let mut buf = [0_u8; 4];
    for i in 0..buf.len() {
        buf[i] = src_buf[i] ^ MAGIC_COOKIE[i];
    }

    SocketAddrV4::new(Ipv4Addr::from(buf), xor_port(addr.port()))
}

// ipv6 和 magic cookie + 12字节 transaction id 做xor,
// trans_id 本身以 magic cookie 开头, 所以直接逐字节异或
pub fn xor_address_v6(addr: SocketAddrV6, trans_id: &TransId) -> SocketAddrV6 {
    let src_buf = addr.ip().octets();
    let mut buf = [0_u8; 16];
    for i in 0..buf.len() {
        if i < MAGIC_COOKIE.len() {
            buf[i] = src_buf[i] ^ MAGIC_COOKIE[i];
        } else {
            buf[i] = src_buf[i] ^ trans_id[i];
        }
    }

    SocketAddrV6::new(Ipv6Addr::from(buf), xor_port(addr.port()), 0, 0)
}

pub fn xor_address(addr: SocketAddr, trans_id: &TransId) -> SocketAddr {
    match addr {
        SocketAddr::V4(v) => SocketAddr::V4(xor_address_v4(v)),
        SocketAddr::V6(v) => SocketAddr::V6(xor_address_v6(v, trans_id)),
    }
}

// class * 100 + number
pub fn pack_error_code(code: u16) -> u16 {
    let n1 = code / 100;
    let n2 = code % 100;

    n1 << 8 | n2
}

pub fn unpack_error_code(code: u16) -> u16 {
    let n2 = code & 0x00ff;
    let n1 = (code >> 8) & 0x07;
    n1 * 100 + n2
}
