//! Source-IP allowlist for the webhook endpoint.
//!
//! Entries are single IPs or CIDR blocks. An empty allowlist allows
//! everything — authenticity then rests on the deployment's transport.

use std::net::IpAddr;

use ipnet::IpNet;

use fh_domain::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct IpAllowlist {
    entries: Vec<IpNet>,
}

impl IpAllowlist {
    /// Parse from config entries. Bare IPs become /32 (or /128) networks.
    pub fn parse(values: &[String]) -> Result<Self> {
        let mut entries = Vec::with_capacity(values.len());
        for value in values {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                continue;
            }
            let net = if trimmed.contains('/') {
                trimmed
                    .parse::<IpNet>()
                    .map_err(|e| Error::Config(format!("invalid CIDR {trimmed:?}: {e}")))?
            } else {
                let ip: IpAddr = trimmed
                    .parse()
                    .map_err(|e| Error::Config(format!("invalid IP {trimmed:?}: {e}")))?;
                IpNet::from(ip)
            };
            entries.push(net);
        }
        Ok(Self { entries })
    }

    pub fn allows(&self, ip: IpAddr) -> bool {
        if self.entries.is_empty() {
            return true;
        }
        self.entries.iter().any(|net| net.contains(&ip))
    }
}
