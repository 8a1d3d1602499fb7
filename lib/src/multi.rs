use log::debug;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};

use crate::constants::DEFAULT_SOFTWARE;
use crate::discover::{discover_single, Discovery};
use crate::error::Error;
use crate::transport::{Transport, UdpTransport};

/// Races the same discovery against several STUN servers and keeps the
/// first conclusive answer.
#[derive(Debug, Clone)]
pub struct MultiClient<T = UdpTransport> {
    servers: Vec<String>,
    software: String,
    transport: Arc<T>,
}

impl MultiClient<UdpTransport> {
    pub fn new<S: AsRef<str>>(servers: &[S]) -> Self {
        Self {
            servers: servers.iter().map(|x| x.as_ref().to_string()).collect(),
            software: DEFAULT_SOFTWARE.to_string(),
            transport: Arc::new(UdpTransport::new()),
        }
    }
}

impl<T: Transport + 'static> MultiClient<T> {
    pub fn with_software(mut self, software: &str) -> Self {
        self.software = software.to_string();
        self
    }

    pub fn with_transport<U: Transport + 'static>(self, transport: U) -> MultiClient<U> {
        MultiClient {
            servers: self.servers,
            software: self.software,
            transport: Arc::new(transport),
        }
    }

    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    pub async fn discover(&self, deadline: Instant) -> Result<Discovery, Error> {
        discover_multi(self.transport.clone(), &self.servers, &self.software, deadline).await
    }
}

/// Runs one discovery per server concurrently, all bound by `deadline`.
///
/// The first result that is free of errors and neither `Unknown` nor
/// `Blocked` wins. Otherwise the last result received is returned once
/// every server has answered. `Err` is reserved for the call as a whole:
/// [`Error::NoResponse`] when no server reported anything and
/// [`Error::Cancelled`] when the deadline passed first. Workers still
/// running when this returns finish on their own by `deadline`.
pub async fn discover_multi<T: Transport + 'static>(
    transport: Arc<T>,
    servers: &[String],
    software: &str,
    deadline: Instant,
) -> Result<Discovery, Error> {
    if servers.is_empty() {
        return Err(Error::NoResponse);
    }

    // 容量等于 server 数, worker 发送不会阻塞
    let (tx, mut rx) = mpsc::channel::<Discovery>(servers.len());

    for server in servers {
        let tx = tx.clone();
        let transport = transport.clone();
        let server = server.clone();
        let software = software.to_string();

        tokio::spawn(async move {
            let discovery = discover_single(transport.as_ref(), &server, &software, deadline).await;
            // 已经有结果时 receiver 被 drop, 忽略
            let _ = tx.try_send(discovery);
        });
    }
    drop(tx);

    let mut last = None;
    loop {
        let discovery = match timeout_at(deadline, rx.recv()).await {
            Ok(Some(v)) => v,
            Ok(None) => break,
            Err(_) => {
                debug!("deadline exceeded, last result: {:?}", last);
                return Err(Error::Cancelled);
            }
        };

        debug!(
            "result: {:?}, host: {:?}, error: {:?}",
            discovery.nat_type, discovery.host, discovery.error
        );
        if discovery.error.is_none() && discovery.nat_type.is_conclusive() {
            return Ok(discovery);
        }
        last = Some(discovery);
    }

    last.ok_or(Error::NoResponse)
}
