//! UDP DNS Server
//!
//! Receives datagrams, hands each one to its own task and sends back the
//! encoded reply. Undecodable packets and packets that are themselves
//! responses are dropped without a reply.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{debug, error, info};

use crate::config::DdnsConfig;
use crate::dns::message::{Message, RECV_BUFFER_SIZE};
use crate::dns::DdnsResponder;

/// Pause after a failed receive so a persistent socket error cannot spin the loop
const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// Run the DNS server
pub async fn run_dns_server(
    config: Arc<DdnsConfig>,
    responder: Arc<DdnsResponder>,
) -> anyhow::Result<()> {
    let addr = SocketAddr::new(config.listen_addr, config.listen_port);
    let socket = Arc::new(UdpSocket::bind(addr).await?);

    info!("🌐 DNS server listening on {} for {}", addr, config.base_domain);

    serve(socket, responder).await
}

/// Answer datagrams arriving on `socket` until a socket error ends the loop
pub async fn serve(socket: Arc<UdpSocket>, responder: Arc<DdnsResponder>) -> anyhow::Result<()> {
    loop {
        let mut buf = [0u8; RECV_BUFFER_SIZE];
        match socket.recv_from(&mut buf).await {
            Ok((len, src)) => {
                let request = buf[..len].to_vec();
                let responder = responder.clone();
                let socket = socket.clone();

                tokio::spawn(async move {
                    if let Err(e) =
                        handle_dns_query(socket.as_ref(), src, &request, &responder).await
                    {
                        debug!("DNS query error from {}: {}", src, e);
                    }
                });
            }
            Err(e) => {
                // ICMP port-unreachable from earlier replies surfaces here on some platforms
                error!("DNS socket error: {}", e);
                tokio::time::sleep(RECV_ERROR_BACKOFF).await;
            }
        }
    }
}

/// Handle a single DNS query
async fn handle_dns_query(
    socket: &UdpSocket,
    src: SocketAddr,
    request: &[u8],
    responder: &DdnsResponder,
) -> anyhow::Result<()> {
    let request = Message::decode(request)?;
    if request.header.is_response() {
        return Ok(());
    }

    let reply = responder.handle(&request).await;
    let response = reply.encode(request.max_udp_payload())?;

    socket.send_to(&response, src).await?;

    Ok(())
}
