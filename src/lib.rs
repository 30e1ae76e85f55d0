//! A standalone Rust implementation of a ROS-style coordination master: a
//! central pub/sub and service-RPC registry with a hierarchical parameter
//! cache. Run a master and talk to it from other nodes entirely in Rust,
//! without any other ROS installation.
//!
//! # Examples
//! ```
//! use url::Url;
//! async fn demo() -> anyhow::Result<()>{
//!   const MASTER_URI: &str = "http://0.0.0.0:11311";
//!   let uri = Url::parse(MASTER_URI).unwrap();
//!   let socket_address = nodecore_rs::url_to_socket_addr(&uri)?;
//!   let master = nodecore_rs::core::Master::new(&socket_address);
//!   master.serve().await
//! }
//! ```
//!
pub mod client_api;
pub mod core;
pub mod error;
pub mod name;
pub mod node;
pub mod param_cache;
pub mod registration_manager;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use url::Url;

pub fn url_to_socket_addr(url: &Url) -> anyhow::Result<SocketAddr> {
    let ip_addr = match url.host() {
        Some(url::Host::Domain(domain)) if domain == "localhost" => IpAddr::V4(Ipv4Addr::LOCALHOST),
        Some(url::Host::Domain(domain)) => domain.parse()?,
        Some(url::Host::Ipv4(ip)) => IpAddr::V4(ip),
        Some(url::Host::Ipv6(ip)) => IpAddr::V6(ip),
        None => anyhow::bail!("Invalid URL: no host specified"),
    };
    let port = url.port().expect("Invalid URL: no port specified");
    Ok(SocketAddr::new(ip_addr, port))
}
