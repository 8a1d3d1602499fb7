//! UDP plumbing for the discovery engine.
//!
//! A [`Transport`] opens one [`Socket`] per discovery run; every test of the
//! run is sent from that socket so the server sees the same source endpoint
//! each time. A send waits for a single reply and reports a timeout as
//! `Ok(None)`, which the engine reads as "filtered", while socket and DNS
//! failures come back as errors.

use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, warn};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::{lookup_host, UdpSocket};
use tokio::time::{timeout_at, Instant};

use crate::constants::{HEADER_LEN, RECV_BUF_LEN};
use crate::error::Error;
use crate::header::Header;
use crate::packet::Packet;
use crate::util::print_bytes;

pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(3);

#[async_trait]
pub trait Transport: Send + Sync {
    /// Opens the socket a discovery run against `server` sends from.
    async fn bind(&self, server: &str, deadline: Instant) -> Result<Box<dyn Socket>, Error>;
}

#[async_trait]
pub trait Socket: Send {
    fn local_addr(&self) -> SocketAddr;

    /// Sends `request` to `dest` once and waits for its reply.
    async fn send(
        &mut self,
        dest: &str,
        request: &Packet,
        deadline: Instant,
    ) -> Result<Option<Bytes>, Error>;
}

#[derive(Debug, Clone)]
pub struct UdpTransport {
    local_ip: Option<IpAddr>,
    reply_timeout: Duration,
}

impl Default for UdpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UdpTransport {
    pub fn new() -> Self {
        Self {
            local_ip: None,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
        }
    }

    pub fn with_local_ip(mut self, ip: IpAddr) -> Self {
        self.local_ip = Some(ip);
        self
    }

    /// How long one test waits for its reply; never past the run deadline.
    pub fn with_reply_timeout(mut self, reply_timeout: Duration) -> Self {
        self.reply_timeout = reply_timeout;
        self
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn bind(&self, server: &str, deadline: Instant) -> Result<Box<dyn Socket>, Error> {
        let server_addr = resolve(server, self.local_ip, deadline).await?;

        let local_ip = match self.local_ip {
            Some(v) => v,
            None => route_ip(server_addr).await?,
        };

        // 不 connect, change-request 的响应来自另一个地址/端口
        let socket = UdpSocket::bind(SocketAddr::new(local_ip, 0)).await?;
        let local_addr = socket.local_addr()?;
        debug!("local addr: {}, server: {} ({})", local_addr, server, server_addr);

        Ok(Box::new(UdpProbeSocket {
            socket,
            local_addr,
            reply_timeout: self.reply_timeout,
            recv_buf: vec![0u8; RECV_BUF_LEN],
        }))
    }
}

struct UdpProbeSocket {
    socket: UdpSocket,
    local_addr: SocketAddr,
    reply_timeout: Duration,
    recv_buf: Vec<u8>,
}

#[async_trait]
impl Socket for UdpProbeSocket {
    fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    async fn send(
        &mut self,
        dest: &str,
        request: &Packet,
        deadline: Instant,
    ) -> Result<Option<Bytes>, Error> {
        let dest_addr = resolve(dest, Some(self.local_addr.ip()), deadline).await?;

        let buf = request.pack()?;
        debug!(
            "{} --> {}\n{}",
            self.local_addr,
            dest_addr,
            print_bytes(&buf, " ", 8)
        );
        let sent = self.socket.send_to(&buf, dest_addr).await?;
        debug!("sent: {}", sent);

        // 丢弃的包不延长等待, wait_until 只算一次
        let wait_until = deadline.min(Instant::now() + self.reply_timeout);

        loop {
            let (len, remote_addr) =
                match timeout_at(wait_until, self.socket.recv_from(&mut self.recv_buf)).await {
                    Ok(v) => v?,
                    Err(_) => {
                        debug!("{} <-- {}, no reply", self.local_addr, dest_addr);
                        return Ok(None);
                    }
                };

            let data = Bytes::copy_from_slice(&self.recv_buf[..len]);
            debug!(
                "{} <-- {}\n{}",
                self.local_addr,
                remote_addr,
                print_bytes(&data, " ", 8)
            );

            // 不是 stun 包, 丢掉继续等
            if data.len() < HEADER_LEN {
                warn!(
                    "drop datagram from {}, len:{} < {}",
                    remote_addr,
                    data.len(),
                    HEADER_LEN
                );
                continue;
            }

            // 上一个测试迟到的响应, 丢掉继续等
            if !same_transaction(&data, request) {
                warn!(
                    "drop datagram from {}, transaction id not match",
                    remote_addr
                );
                continue;
            }

            return Ok(Some(data));
        }
    }
}

fn same_transaction(data: &[u8], request: &Packet) -> bool {
    match Header::unpack(data) {
        Ok(header) => header.trans_id == request.header.trans_id,
        Err(_) => false,
    }
}

async fn resolve(
    addr: &str,
    family_of: Option<IpAddr>,
    deadline: Instant,
) -> Result<SocketAddr, Error> {
    let addrs: Vec<SocketAddr> = match timeout_at(deadline, lookup_host(addr)).await {
        Ok(v) => v?.collect(),
        Err(_) => return Err(Error::Cancelled),
    };

    let found = match family_of {
        Some(ip) => addrs.iter().find(|x| x.is_ipv4() == ip.is_ipv4()),
        None => addrs.first(),
    };

    found.copied().ok_or_else(|| Error::Resolve(addr.to_string()))
}

// connect 一个临时 socket, 由路由表选出本地地址
async fn route_ip(server: SocketAddr) -> Result<IpAddr, Error> {
    let unspecified = match server {
        SocketAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        SocketAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    };

    let probe = UdpSocket::bind(SocketAddr::new(unspecified, 0)).await?;
    probe.connect(server).await?;
    Ok(probe.local_addr()?.ip())
}
