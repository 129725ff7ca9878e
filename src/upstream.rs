//! Upstream resolvers.
//!
//! [`Exchange`] is the whole contract the query handler has with name
//! resolution: a query goes in, a full response or an error comes out.
//! [`UdpUpstream`] is the implementation used by the server.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{self, BoxFuture, FutureExt};
use hickory_proto::error::ProtoError;
use hickory_proto::op::Message;
use thiserror::Error;
use tokio::net::UdpSocket;
use tracing::trace;

/// Largest datagram accepted from an upstream.
const MAX_UPSTREAM_PACKET_SIZE: usize = u16::MAX as usize;

/// Errors from an upstream exchange.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed DNS message: {0}")]
    Malformed(#[from] ProtoError),

    #[error("upstream timed out after {0:?}")]
    Timeout(Duration),

    #[error("no upstream servers configured")]
    NoUpstreams,
}

/// Sends a query upstream and waits for the answer.
///
/// Implementations must be safe to call from many in-flight queries at
/// once. Dropping the returned future abandons the exchange.
#[async_trait]
pub trait Exchange: Send + Sync {
    async fn exchange(&self, query: &Message) -> Result<Message, UpstreamError>;
}

/// Forwards queries over UDP, racing all configured upstreams.
///
/// Each exchange uses fresh ephemeral sockets, so concurrent exchanges share
/// no state. The first well-formed reply carrying the query's transaction ID
/// wins; replies with another ID are ignored until the timeout.
pub struct UdpUpstream {
    upstreams: Vec<SocketAddr>,
    timeout: Duration,
}

impl UdpUpstream {
    pub fn new(upstreams: Vec<SocketAddr>, timeout: Duration) -> Self {
        Self { upstreams, timeout }
    }

    pub fn upstreams(&self) -> &[SocketAddr] {
        &self.upstreams
    }
}

#[async_trait]
impl Exchange for UdpUpstream {
    async fn exchange(&self, query: &Message) -> Result<Message, UpstreamError> {
        if self.upstreams.is_empty() {
            return Err(UpstreamError::NoUpstreams);
        }

        let packet = query.to_vec()?;
        let id = query.id();

        let attempts: Vec<BoxFuture<'_, Result<Message, UpstreamError>>> = self
            .upstreams
            .iter()
            .map(|&upstream| exchange_one(upstream, &packet, id).boxed())
            .collect();

        match tokio::time::timeout(self.timeout, future::select_ok(attempts)).await {
            Ok(Ok((response, _))) => Ok(response),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(UpstreamError::Timeout(self.timeout)),
        }
    }
}

async fn exchange_one(
    upstream: SocketAddr,
    packet: &[u8],
    id: u16,
) -> Result<Message, UpstreamError> {
    let local: SocketAddr = match upstream {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };
    let socket = UdpSocket::bind(local).await?;
    socket.connect(upstream).await?;
    socket.send(packet).await?;

    let mut buf = vec![0u8; MAX_UPSTREAM_PACKET_SIZE];
    loop {
        let len = socket.recv(&mut buf).await?;
        let response = Message::from_vec(&buf[..len])?;
        if response.id() == id {
            return Ok(response);
        }
        trace!(%upstream, expected = id, got = response.id(), "ignoring mismatched reply");
    }
}
