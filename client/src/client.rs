use log::{debug, error};
use std::net::IpAddr;
use std::time::Duration;
use tokio::time::Instant;

use stun_nat::error::Error;
use stun_nat::transport::UdpTransport;
use stun_nat::{Discovery, Host, MultiClient};

pub const DEFAULT_SERVERS: [&str; 19] = [
    "stun.l.google.com:19302",
    "stun1.l.google.com:19302",
    "stun2.l.google.com:19302",
    "stun3.l.google.com:19302",
    "stun4.l.google.com:19302",
    "stun01.sipphone.com:3478",
    "stun.ekiga.net:3478",
    "stun.fwdnet.net:3478",
    "stun.ideasip.com:3478",
    "stun.iptel.org:3478",
    "stun.rixtelecom.se:3478",
    "stun.schlund.de:3478",
    "stunserver.org:3478",
    "stun.softjoys.com:3478",
    "stun.voiparound.com:3478",
    "stun.voipbuster.com:3478",
    "stun.voipstunt.com:3478",
    "stun.voxgratia.org:3478",
    "stun.xten.com:3478",
];

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub servers: Vec<String>,
    pub software: String,
    pub timeout: Duration,
    pub local_ip: Option<IpAddr>,
}

pub async fn probe_nat(config: &ProbeConfig) -> Result<Discovery, Error> {
    let mut transport = UdpTransport::new();
    if let Some(ip) = config.local_ip {
        transport = transport.with_local_ip(ip);
    }

    let client = MultiClient::new(&config.servers)
        .with_software(&config.software)
        .with_transport(transport);
    debug!(
        "probe {} servers, timeout: {:?}",
        client.servers().len(),
        config.timeout
    );

    let deadline = Instant::now() + config.timeout;
    let discovery = client.discover(deadline).await?;

    if let Some(e) = discovery.error.as_ref() {
        error!("error, last server failed, {}", e);
    }
    Ok(discovery)
}

/// Lines printed for a finished discovery.
pub fn report(discovery: &Discovery) -> Vec<String> {
    let mut lines = vec![discovery.nat_type.to_string()];

    if let Some(host) = discovery.host.as_ref() {
        lines.extend(host_lines(host));
    }
    lines
}

fn host_lines(host: &Host) -> [String; 3] {
    [
        host.family().to_string(),
        host.ip().to_string(),
        host.port().to_string(),
    ]
}
