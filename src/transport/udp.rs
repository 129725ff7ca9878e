//! UDP transport for DNS queries.
//!
//! One socket serves every client. Each datagram that parses as a DNS
//! message is handled in its own task, so a slow upstream exchange never
//! holds up other clients. Datagrams that do not parse get no reply.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use hickory_proto::op::Message;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::dns;
use crate::handler::QueryHandler;

use super::{MAX_DNS_PACKET_SIZE, QueryLogger};

/// UDP transport for the forwarder.
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
}

impl UdpTransport {
    /// Bind the listening socket.
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);

        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Start the receive loop.
    ///
    /// The loop runs until the returned task is aborted.
    pub fn start(self, handler: Arc<QueryHandler>, logger: QueryLogger) -> JoinHandle<()> {
        tokio::spawn(run(self.socket, handler, logger))
    }
}

async fn run(socket: Arc<UdpSocket>, handler: Arc<QueryHandler>, logger: QueryLogger) {
    let mut buf = [0u8; MAX_DNS_PACKET_SIZE];

    loop {
        let (len, src) = match socket.recv_from(&mut buf).await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "UDP recv error");
                continue;
            }
        };

        let request = match Message::from_vec(&buf[..len]) {
            Ok(request) => request,
            Err(e) => {
                debug!(%src, len, error = %e, "dropping malformed datagram");
                continue;
            }
        };

        tokio::spawn(respond(
            socket.clone(),
            src,
            request,
            handler.clone(),
            logger,
        ));
    }
}

async fn respond(
    socket: Arc<UdpSocket>,
    src: SocketAddr,
    request: Message,
    handler: Arc<QueryHandler>,
    logger: QueryLogger,
) {
    let reply = handler.handle(&request).await;

    let bytes = match reply.message.to_vec() {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(%src, id = request.id(), error = %e, "failed to encode reply");
            return;
        }
    };

    if let Err(e) = socket.send_to(&bytes, src).await {
        warn!(%src, error = %e, "UDP response error");
    }

    logger.log(&dns::question_name(&request), src, &reply);
}
