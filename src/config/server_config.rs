//! Listener configuration.

use anyhow::{Context, Result};
use std::net::{IpAddr, SocketAddr};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEnvConfig {
    pub bind_address: IpAddr,
    pub port: u16,
}

impl ServerEnvConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind = lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0".to_string());
        let bind_address = bind
            .parse::<IpAddr>()
            .with_context(|| format!("Invalid BIND_ADDRESS: {}", bind))?;

        let port = match lookup("PORT") {
            Some(v) => v
                .parse::<u16>()
                .with_context(|| format!("Invalid PORT: {}", v))?,
            None => 8000,
        };

        Ok(Self { bind_address, port })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}
