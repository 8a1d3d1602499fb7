//! NAT type discovery over STUN (rfc 3489 / rfc 5389).
//!
//! ```no_run
//! use std::time::Duration;
//! use stun_nat::multi::MultiClient;
//!
//! # async fn run() -> Result<(), stun_nat::error::Error> {
//! let client = MultiClient::new(&["stun.l.google.com:19302", "stun.ekiga.net:3478"]);
//! let deadline = tokio::time::Instant::now() + Duration::from_secs(30);
//!
//! let discovery = client.discover(deadline).await?;
//! println!("{}", discovery.nat_type);
//! # Ok(())
//! # }
//! ```

pub mod attrs;
pub mod constants;
pub mod discover;
pub mod error;
pub mod header;
pub mod host;
pub mod multi;
pub mod nat;
pub mod packet;
pub mod transport;
pub mod util;

pub use discover::{discover_single, Client, Discovery};
pub use error::Error;
pub use host::Host;
pub use multi::{discover_multi, MultiClient};
pub use nat::NatType;
