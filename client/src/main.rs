// ./client --server stun.l.google.com:19302 --server stun.ekiga.net:3478 --timeout 10

use std::net::IpAddr;
use std::process;
use std::time::Duration;

use clap::builder::ValueParser;
use clap::{Arg, ArgAction, Command};
use log::{debug, error};

use client::client::{probe_nat, report, ProbeConfig, DEFAULT_SERVERS};
use stun_nat::constants::DEFAULT_SOFTWARE;

const APP_NAME: &str = env!("CARGO_PKG_NAME");
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

fn parse_ip(s: &str) -> Result<IpAddr, String> {
    let ip = match s.parse::<IpAddr>() {
        Ok(v) => v,
        Err(e) => {
            return Err(format!("{}", e));
        }
    };
    // 不能是 0.0.0.0 / ::
    if ip.is_unspecified() {
        return Err(format!("{} not allow", ip));
    }

    Ok(ip)
}

fn parse_timeout(s: &str) -> Result<Duration, String> {
    match s.parse::<u64>() {
        Ok(0) => Err("timeout must be greater than 0".to_string()),
        Ok(v) => Ok(Duration::from_secs(v)),
        Err(e) => Err(format!("{}", e)),
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let app = Command::new(APP_NAME)
        .version(APP_VERSION)
        .about("a stun client for probing nat")
        .arg(
            Arg::new("server")
                .long("server")
                .takes_value(true)
                .action(ArgAction::Append)
                .help("stun server, host:port, repeat for more servers"),
        )
        .arg(
            Arg::new("software")
                .long("software")
                .takes_value(true)
                .default_value(DEFAULT_SOFTWARE)
                .help("software attribute sent with every request"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .takes_value(true)
                .default_value("30")
                .help("overall timeout in seconds")
                .value_parser(ValueParser::new(parse_timeout)),
        )
        .arg(
            Arg::new("local_ip")
                .long("local_ip")
                .takes_value(true)
                .help("local ip")
                .value_parser(ValueParser::new(parse_ip)),
        )
        .get_matches();

    let servers: Vec<String> = match app.get_many::<String>("server") {
        Some(v) => v.cloned().collect(),
        None => DEFAULT_SERVERS.iter().map(|x| x.to_string()).collect(),
    };
    let software = app
        .get_one::<String>("software")
        .cloned()
        .unwrap_or_else(|| DEFAULT_SOFTWARE.to_string());
    let timeout = app
        .get_one::<Duration>("timeout")
        .copied()
        .unwrap_or(Duration::from_secs(30));
    let local_ip = app.get_one::<IpAddr>("local_ip").copied();

    let config = ProbeConfig {
        servers,
        software,
        timeout,
        local_ip,
    };
    debug!("config: {:?}", config);

    match probe_nat(&config).await {
        Ok(discovery) => {
            for line in report(&discovery) {
                println!("{}", line);
            }
        }
        Err(e) => {
            error!("error, probe nat, {}", e);
            println!("{}", e);
            process::exit(1);
        }
    }
}
