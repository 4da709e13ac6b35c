// ── SNMPv2c client ──
//
// One UDP socket per target. Every request gets a fresh request-id and a
// bounded number of attempts; datagrams that don't decode or don't carry
// our request-id are dropped and we keep listening until the attempt's
// deadline. Walks use GETBULK and stop at the first varbind outside the
// requested subtree.

use std::net::SocketAddr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tokio::net::UdpSocket;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, trace};

use super::ber::{Message, Pdu, PduKind, Value};
use super::oid::Oid;
use crate::error::Error;

const MAX_DATAGRAM: usize = 65_507;
const MAX_WALK_ROWS: usize = 10_000;

/// Connection settings for an SNMPv2c agent.
#[derive(Debug, Clone)]
pub struct SnmpConfig {
    pub community: SecretString,
    pub port: u16,
    /// Per-attempt wait for a matching response.
    pub timeout: Duration,
    /// Extra attempts after the first.
    pub retries: u32,
    pub max_repetitions: u32,
}

impl Default for SnmpConfig {
    fn default() -> Self {
        Self {
            community: SecretString::from("public"),
            port: 161,
            timeout: Duration::from_secs(2),
            retries: 1,
            max_repetitions: 20,
        }
    }
}

/// A client bound to a single agent.
pub struct SnmpClient {
    socket: UdpSocket,
    target: SocketAddr,
    community: Vec<u8>,
    timeout: Duration,
    retries: u32,
    max_repetitions: u32,
    next_id: i32,
}

impl SnmpClient {
    /// Resolve `address` and open a socket for it.
    pub async fn connect(address: &str, config: &SnmpConfig) -> Result<Self, Error> {
        let target = resolve(address, config.port).await?;
        let bind: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(bind).await?;
        socket.connect(target).await?;

        // Seed request-ids from the local port so concurrent clients differ.
        let seed = socket.local_addr().map(|a| i32::from(a.port())).unwrap_or(1);

        Ok(Self {
            socket,
            target,
            community: config.community.expose_secret().as_bytes().to_vec(),
            timeout: config.timeout,
            retries: config.retries,
            max_repetitions: config.max_repetitions.max(1),
            next_id: seed.wrapping_mul(7919).abs().max(1),
        })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// GET a set of scalar OIDs.
    pub async fn get(&mut self, oids: &[Oid]) -> Result<Vec<(Oid, Value)>, Error> {
        let id = self.next_request_id();
        let response = self.request(Pdu::get(id, oids)).await?;
        Ok(response.varbinds)
    }

    /// Walk every varbind under `root`, in agent order.
    pub async fn walk(&mut self, root: &Oid) -> Result<Vec<(Oid, Value)>, Error> {
        let mut cursor = root.clone();
        let mut rows = Vec::new();

        'walk: loop {
            let id = self.next_request_id();
            let response = self
                .request(Pdu::get_bulk(id, self.max_repetitions, std::slice::from_ref(&cursor)))
                .await?;
            if response.varbinds.is_empty() {
                break;
            }

            for (oid, value) in response.varbinds {
                if !oid.starts_with(root) || value.is_exception() || oid <= cursor {
                    break 'walk;
                }
                cursor = oid.clone();
                rows.push((oid, value));
                if rows.len() >= MAX_WALK_ROWS {
                    debug!(target = %self.target, %root, "walk row cap reached");
                    break 'walk;
                }
            }
        }

        trace!(target = %self.target, %root, rows = rows.len(), "walk complete");
        Ok(rows)
    }

    async fn request(&mut self, pdu: Pdu) -> Result<Pdu, Error> {
        let request_id = pdu.request_id;
        let datagram = Message::v2c(self.community.clone(), pdu).encode();
        let mut buf = vec![0u8; MAX_DATAGRAM];

        for attempt in 0..=self.retries {
            self.socket.send(&datagram).await?;
            let deadline = Instant::now() + self.timeout;

            loop {
                let Ok(received) = timeout_at(deadline, self.socket.recv(&mut buf)).await else {
                    debug!(target = %self.target, attempt, "no response before deadline");
                    break;
                };
                let len = received?;
                let Some(bytes) = buf.get(..len) else {
                    continue;
                };
                let message = match Message::decode(bytes) {
                    Ok(m) => m,
                    Err(e) => {
                        trace!(target = %self.target, error = %e, "dropping undecodable datagram");
                        continue;
                    }
                };
                if message.pdu.kind != PduKind::Response || message.pdu.request_id != request_id {
                    trace!(target = %self.target, "dropping unrelated datagram");
                    continue;
                }
                if message.pdu.error_status != 0 {
                    return Err(Error::SnmpStatus {
                        status: message.pdu.error_status,
                        index: message.pdu.error_index,
                    });
                }
                return Ok(message.pdu);
            }
        }

        Err(Error::SnmpNoResponse {
            address: self.target.to_string(),
            attempts: self.retries + 1,
        })
    }

    fn next_request_id(&mut self) -> i32 {
        self.next_id = self.next_id.checked_add(1).unwrap_or(1);
        self.next_id
    }
}

async fn resolve(address: &str, port: u16) -> Result<SocketAddr, Error> {
    if let Ok(addr) = address.parse::<SocketAddr>() {
        return Ok(addr);
    }
    if let Ok(ip) = address.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }
    tokio::net::lookup_host((address, port))
        .await?
        .next()
        .ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no address found for {address}"),
            ))
        })
}
