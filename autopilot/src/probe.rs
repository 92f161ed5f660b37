//! TCP liveness prober.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use common::PublicKey;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tracing::debug;

use crate::hosts::HostProber;

/// Considers a host reachable if a TCP connection to its net address can be
/// established within the timeout. The latency is the connect time.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProber;

#[async_trait]
impl HostProber for TcpProber {
    async fn probe(
        &self,
        host_key: PublicKey,
        net_address: &str,
        timeout: Duration,
    ) -> Result<Duration> {
        if net_address.is_empty() {
            bail!("host {} has no net address", host_key);
        }

        let start = Instant::now();
        let stream = tokio::time::timeout(timeout, TcpStream::connect(net_address))
            .await
            .with_context(|| format!("connecting to {} timed out after {:?}", net_address, timeout))?
            .with_context(|| format!("failed to connect to {}", net_address))?;
        let latency = start.elapsed();
        drop(stream);

        debug!(host = %host_key, net_address, latency_ms = latency.as_millis() as u64, "Host reachable");
        Ok(latency)
    }
}
