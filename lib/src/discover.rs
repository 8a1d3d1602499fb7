//! Single server NAT discovery, rfc 3489 10.1.
//!
//! ```text
//!  test I ──no reply──> Blocked
//!    │
//!    ├─ mapped == local ── test II ──reply──> None
//!    │                        └──no reply──> SymmetricUdpFirewall
//!    │
//!    └─ test II ──reply──> FullCone
//!          └─ test I (changed address) ──no reply──> Unknown
//!                 ├─ mapped differs ──> Symmetric
//!                 └─ test III ──reply──> Restricted
//!                        └──no reply──> PortRestricted
//! ```

use log::{debug, warn};
use std::net::SocketAddr;
use tokio::time::Instant;

use crate::attrs::change_request::ChangeRequest;
use crate::attrs::Attribute;
use crate::constants::*;
use crate::error::{Error, ValidateErr};
use crate::header::Header;
use crate::host::Host;
use crate::nat::NatType;
use crate::packet::Packet;
use crate::transport::{Socket, Transport, UdpTransport};
use crate::util::new_trans_id;

/// What one discovery run concluded. `error` is set exactly when
/// `nat_type` is [`NatType::Error`]; `host` is kept whenever test I got
/// far enough to learn it.
#[derive(Debug)]
pub struct Discovery {
    pub nat_type: NatType,
    pub host: Option<Host>,
    pub error: Option<Error>,
}

impl Discovery {
    fn new(nat_type: NatType, host: Option<Host>) -> Self {
        Self {
            nat_type,
            host,
            error: None,
        }
    }

    fn failed(host: Option<Host>, error: Error) -> Self {
        Self {
            nat_type: NatType::Error,
            host,
            error: Some(error),
        }
    }

    pub fn into_result(self) -> Result<(NatType, Option<Host>), Error> {
        match self.error {
            Some(e) => Err(e),
            None => Ok((self.nat_type, self.host)),
        }
    }
}

/// Discovery against a single STUN server.
#[derive(Debug, Clone)]
pub struct Client<T = UdpTransport> {
    server: String,
    software: String,
    transport: T,
}

impl Client<UdpTransport> {
    pub fn new(server: &str) -> Self {
        Self {
            server: server.to_string(),
            software: DEFAULT_SOFTWARE.to_string(),
            transport: UdpTransport::new(),
        }
    }
}

impl<T: Transport> Client<T> {
    pub fn with_software(mut self, software: &str) -> Self {
        self.software = software.to_string();
        self
    }

    pub fn with_transport<U: Transport>(self, transport: U) -> Client<U> {
        Client {
            server: self.server,
            software: self.software,
            transport,
        }
    }

    pub async fn discover(&self, deadline: Instant) -> Discovery {
        discover_single(&self.transport, &self.server, &self.software, deadline).await
    }
}

struct Test1 {
    host: Host,
    changed_addr: Host,
    local_addr: SocketAddr,
}

impl Test1 {
    // 本地地址和 server 看到的地址一样, 没有经过 NAT
    fn identical(&self) -> bool {
        self.local_addr.to_string() == self.host.transport_addr()
    }
}

pub async fn discover_single<T: Transport + ?Sized>(
    transport: &T,
    server: &str,
    software: &str,
    deadline: Instant,
) -> Discovery {
    let mut socket = match transport.bind(server, deadline).await {
        Ok(v) => v,
        Err(e) => return Discovery::failed(None, e),
    };

    let discovery = run_tests(socket.as_mut(), server, software, deadline).await;
    debug!(
        "server: {}, nat type: {:?}, host: {:?}",
        server, discovery.nat_type, discovery.host
    );
    discovery
}

async fn run_tests(
    socket: &mut dyn Socket,
    server: &str,
    software: &str,
    deadline: Instant,
) -> Discovery {
    let first = match test1(socket, server, software, deadline).await {
        Ok(Some(v)) => v,
        Ok(None) => return Discovery::new(NatType::Blocked, None),
        Err(e) => return Discovery::failed(None, e),
    };
    let host = Some(first.host);
    debug!(
        "test I, {} mapped to {}, changed address: {}",
        first.local_addr, first.host, first.changed_addr
    );

    if first.identical() {
        return match test2(socket, server, software, deadline).await {
            Ok(Some(_)) => Discovery::new(NatType::None, host),
            Ok(None) => Discovery::new(NatType::SymmetricUdpFirewall, host),
            Err(e) => Discovery::failed(host, e),
        };
    }

    match test2(socket, server, software, deadline).await {
        Ok(Some(_)) => return Discovery::new(NatType::FullCone, host),
        Ok(None) => {}
        Err(e) => return Discovery::failed(host, e),
    }

    let changed_addr = first.changed_addr.transport_addr();
    let second = match test1(socket, &changed_addr, software, deadline).await {
        Ok(Some(v)) => v,
        // test I 已经通过, 正常不会走到这里
        Ok(None) => return Discovery::new(NatType::Unknown, host),
        Err(e) => return Discovery::failed(host, e),
    };
    debug!("test I at {}, mapped to {}", changed_addr, second.host);

    if second.host != first.host {
        return Discovery::new(NatType::Symmetric, host);
    }

    match test3(socket, server, software, deadline).await {
        Ok(Some(_)) => Discovery::new(NatType::Restricted, host),
        Ok(None) => Discovery::new(NatType::PortRestricted, host),
        Err(e) => Discovery::failed(host, e),
    }
}

pub fn new_request(
    software: &str,
    change_request: Option<ChangeRequest>,
) -> Result<Packet, Error> {
    let header = Header::new(MESSAGE_TYPE_BIND_REQ, 0, new_trans_id());
    let mut request = Packet::new(header, vec![Attribute::Software(software.to_string())]);

    if let Some(v) = change_request {
        request.add_attr(Attribute::ChangeRequest(v));
    }

    request.add_fingerprint()?;
    Ok(request)
}

async fn send_request(
    socket: &mut dyn Socket,
    dest: &str,
    software: &str,
    change_request: Option<ChangeRequest>,
    deadline: Instant,
) -> Result<Option<Packet>, Error> {
    let request = new_request(software, change_request)?;

    let buf = match socket.send(dest, &request, deadline).await? {
        Some(v) => v,
        None => return Ok(None),
    };

    let response = Packet::unpack(&buf)?;
    check_response(&request, &response)?;
    Ok(Some(response))
}

fn check_response(request: &Packet, response: &Packet) -> Result<(), Error> {
    if response.header.trans_id != request.header.trans_id {
        warn!("response transaction id not match");
        return Err(ValidateErr("transaction id not match".to_string()).into());
    }

    if response.header.msg_type == MESSAGE_TYPE_BIND_ERR_RES {
        let (code, reason) = match response.error_code() {
            Some(v) => (v.code, v.msg.clone()),
            None => (0, String::new()),
        };
        return Err(Error::ErrorResponse { code, reason });
    }

    if response.header.msg_type != MESSAGE_TYPE_BIND_RES {
        return Err(ValidateErr(format!(
            "not a binding response: {:#06x}",
            response.header.msg_type
        ))
        .into());
    }

    match response.validate() {
        None => Ok(()),
        Some(e) => Err(e.into()),
    }
}

async fn test1(
    socket: &mut dyn Socket,
    dest: &str,
    software: &str,
    deadline: Instant,
) -> Result<Option<Test1>, Error> {
    let response = match send_request(socket, dest, software, None, deadline).await? {
        Some(v) => v,
        None => return Ok(None),
    };

    // rfc 3489 的 server 不一定返回 xor-mapped-address
    let host = response
        .xor_mapped_address()
        .or_else(|| response.mapped_address())
        .ok_or(Error::MissingAttr("mapped address"))?;

    let changed_addr = response
        .changed_address()
        .or_else(|| response.other_address())
        .ok_or(Error::MissingAttr("changed address"))?;

    Ok(Some(Test1 {
        host,
        changed_addr,
        local_addr: socket.local_addr(),
    }))
}

async fn test2(
    socket: &mut dyn Socket,
    server: &str,
    software: &str,
    deadline: Instant,
) -> Result<Option<Packet>, Error> {
    let change = ChangeRequest::new(true, true);
    send_request(socket, server, software, Some(change), deadline).await
}

async fn test3(
    socket: &mut dyn Socket,
    server: &str,
    software: &str,
    deadline: Instant,
) -> Result<Option<Packet>, Error> {
    let change = ChangeRequest::new(false, true);
    send_request(socket, server, software, Some(change), deadline).await
}
