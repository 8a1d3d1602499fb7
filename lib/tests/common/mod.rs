#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use stun_nat::attrs::change_request::ChangeRequest;
use stun_nat::attrs::errcode_attr::ErrcodeAttr;
use stun_nat::attrs::Attribute;
use stun_nat::constants::*;
use stun_nat::error::Error;
use stun_nat::header::Header;
use stun_nat::packet::Packet;
use stun_nat::transport::{Socket, Transport};

pub const SERVER: &str = "198.51.100.1:3478";
pub const CHANGED: &str = "198.51.100.2:3479";

/// How a fake STUN server behaves towards one discovery run.
#[derive(Debug, Clone)]
pub struct Script {
    pub local: SocketAddr,
    pub mapped: SocketAddr,
    pub mapped_at_changed: SocketAddr,
    pub changed: Option<SocketAddr>,
    pub answer_test1: bool,
    pub answer_change_both: bool,
    pub answer_change_port: bool,
    pub answer_at_changed: bool,
    pub legacy_mapped: bool,
    pub other_address: bool,
    pub omit_mapped: bool,
    pub error_response: bool,
    pub wrong_trans_id: bool,
    pub fail_change_request: bool,
    pub fail_bind: bool,
    pub hang: bool,
    pub delay: Duration,
}

impl Script {
    // 经过 NAT, 只有 test I 有响应
    pub fn behind_nat() -> Self {
        Self {
            local: "192.168.1.10:50000".parse().unwrap(),
            mapped: "203.0.113.5:61000".parse().unwrap(),
            mapped_at_changed: "203.0.113.5:61000".parse().unwrap(),
            changed: Some(CHANGED.parse().unwrap()),
            answer_test1: true,
            answer_change_both: false,
            answer_change_port: false,
            answer_at_changed: true,
            legacy_mapped: false,
            other_address: false,
            omit_mapped: false,
            error_response: false,
            wrong_trans_id: false,
            fail_change_request: false,
            fail_bind: false,
            hang: false,
            delay: Duration::ZERO,
        }
    }

    pub fn open_internet() -> Self {
        let local: SocketAddr = "203.0.113.9:50000".parse().unwrap();
        Self {
            local,
            mapped: local,
            mapped_at_changed: local,
            ..Self::behind_nat()
        }
    }

    pub fn blocked() -> Self {
        Self {
            answer_test1: false,
            ..Self::behind_nat()
        }
    }

    pub fn full_cone() -> Self {
        Self {
            answer_change_both: true,
            ..Self::behind_nat()
        }
    }

    pub fn unknown() -> Self {
        Self {
            answer_at_changed: false,
            ..Self::behind_nat()
        }
    }

    pub fn hang() -> Self {
        Self {
            hang: true,
            ..Self::behind_nat()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub dest: String,
    pub change_request: Option<ChangeRequest>,
    pub raw: Bytes,
}

#[derive(Clone, Default)]
pub struct ScriptedTransport {
    scripts: HashMap<String, Script>,
    pub sent: Arc<Mutex<Vec<Sent>>>,
}

impl ScriptedTransport {
    pub fn new(script: Script) -> Self {
        let mut transport = Self::default();
        transport.scripts.insert(SERVER.to_string(), script);
        transport
    }

    pub fn with_server(mut self, server: &str, script: Script) -> Self {
        self.scripts.insert(server.to_string(), script);
        self
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn bind(&self, server: &str, _deadline: Instant) -> Result<Box<dyn Socket>, Error> {
        let script = match self.scripts.get(server) {
            Some(v) => v.clone(),
            None => return Err(Error::Resolve(server.to_string())),
        };
        if script.fail_bind {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                "bind failed",
            )));
        }

        Ok(Box::new(ScriptedSocket {
            server: server.to_string(),
            script,
            sent: self.sent.clone(),
        }))
    }
}

struct ScriptedSocket {
    server: String,
    script: Script,
    sent: Arc<Mutex<Vec<Sent>>>,
}

#[async_trait]
impl Socket for ScriptedSocket {
    fn local_addr(&self) -> SocketAddr {
        self.script.local
    }

    async fn send(
        &mut self,
        dest: &str,
        request: &Packet,
        _deadline: Instant,
    ) -> Result<Option<Bytes>, Error> {
        let script = &self.script;
        if script.hang {
            std::future::pending::<()>().await;
        }
        if !script.delay.is_zero() {
            tokio::time::sleep(script.delay).await;
        }

        let change_request = request.change_request();
        let raw = request.pack()?;
        self.sent.lock().unwrap().push(Sent {
            dest: dest.to_string(),
            change_request,
            raw,
        });

        if change_request.is_some() && script.fail_change_request {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "unreachable",
            )));
        }

        let at_changed = script.changed.map(|x| x.to_string()) == Some(dest.to_string());
        let (answer, mapped) = match (at_changed, change_request) {
            (false, None) => (script.answer_test1, script.mapped),
            (false, Some(v)) if v.change_ip => (script.answer_change_both, script.mapped),
            (false, Some(_)) => (script.answer_change_port, script.mapped),
            (true, _) => (script.answer_at_changed, script.mapped_at_changed),
        };
        assert!(at_changed || dest == self.server, "unexpected dest: {}", dest);

        if !answer {
            return Ok(None);
        }

        Ok(Some(response(script, request, mapped)))
    }
}

pub fn response(script: &Script, request: &Packet, mapped: SocketAddr) -> Bytes {
    let mut trans_id = request.header.trans_id;
    if script.wrong_trans_id {
        trans_id[15] ^= 0xff;
    }

    if script.error_response {
        let header = Header::new(MESSAGE_TYPE_BIND_ERR_RES, 0, trans_id);
        let attrs = vec![Attribute::ErrorCode(ErrcodeAttr::new(420, "Unknown Attribute"))];
        return Packet::new(header, attrs).pack().unwrap();
    }

    let mut attrs = vec![];
    if !script.omit_mapped {
        if script.legacy_mapped {
            attrs.push(Attribute::MappedAddress(mapped));
        } else {
            attrs.push(Attribute::MappedAddress("10.0.0.1:1".parse().unwrap()));
            attrs.push(Attribute::XorMappedAddress(mapped));
        }
    }
    if let Some(changed) = script.changed {
        if script.other_address {
            attrs.push(Attribute::OtherAddress(changed));
        } else {
            attrs.push(Attribute::ChangedAddress(changed));
        }
    }

    let header = Header::new(MESSAGE_TYPE_BIND_RES, 0, trans_id);
    Packet::new(header, attrs).pack().unwrap()
}

pub fn deadline() -> Instant {
    Instant::now() + Duration::from_secs(30)
}
