//! Sending requests to a KDC: endpoint selection, UDP/TCP framing, and the
//! UDP/TCP preference and fallback policy.
//!
//! RFC 4120 section 7.2: UDP exchanges are a single unframed datagram; TCP
//! exchanges carry a 4 byte big endian length prefix in both directions. A
//! reply that decodes as a KRB-ERROR is surfaced as a typed failure and
//! stops any fallback, except that `KRB_ERR_RESPONSE_TOO_BIG` over UDP
//! triggers the TCP retry it asks for.

use crate::constants::{KDC_ATTEMPT_TIMEOUT, KDC_UDP_RECV_BUF};
use crate::error::KrbError;
use crate::proto::ErrorReply;

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, trace};

/// Failure of one `send_to_kdc` call.
#[derive(Debug, PartialEq, Eq)]
pub enum KdcError {
    /// The KDC answered with a KRB-ERROR. The reply carries the raw
    /// response bytes alongside the decoded fields.
    Reply(Box<ErrorReply>),
    /// The selected transport failed without a protocol-level reply.
    Transport(KrbError),
    /// Both transport legs failed without a protocol-level reply.
    Exhausted { primary: KrbError, fallback: KrbError },
    /// The caller's cancellation token was triggered.
    Cancelled,
}

/// Cooperative cancellation for in-flight KDC exchanges. The flag is
/// polled between endpoint attempts; each blocking socket operation is
/// already bounded by the per-attempt deadline.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transport {
    Udp,
    Tcp,
}

/// The ordered KDC endpoint lists of one realm, kept per transport: a
/// realm's datagram and stream endpoints routinely differ (UDP-only KDCs,
/// TCP proxies).
#[derive(Debug, Clone, Default)]
struct RealmKdcs {
    udp: Vec<String>,
    tcp: Vec<String>,
}

/// A KDC client: per realm and transport ordered endpoint lists plus the
/// UDP preference limit steering the policy table.
#[derive(Debug, Clone, Default)]
pub struct KdcClient {
    realms: HashMap<String, RealmKdcs>,
    udp_preference_limit: usize,
}

impl KdcClient {
    /// `udp_preference_limit` of 1 forces TCP for every request; otherwise
    /// requests up to the limit try UDP first.
    pub fn new(udp_preference_limit: usize) -> Self {
        KdcClient {
            realms: HashMap::new(),
            udp_preference_limit,
        }
    }

    /// Register the ordered KDC endpoint list (`host:port`) for one
    /// transport of a realm.
    pub fn add_realm_kdcs(&mut self, realm: &str, want_tcp: bool, kdcs: Vec<String>) {
        let realm_kdcs = self.realms.entry(realm.to_uppercase()).or_default();
        if want_tcp {
            realm_kdcs.tcp = kdcs;
        } else {
            realm_kdcs.udp = kdcs;
        }
    }

    /// Register the same ordered endpoint list for both transports of a
    /// realm.
    pub fn add_realm(&mut self, realm: &str, kdcs: Vec<String>) {
        self.add_realm_kdcs(realm, false, kdcs.clone());
        self.add_realm_kdcs(realm, true, kdcs);
    }

    /// The ordered KDC endpoints of a realm for one transport.
    fn kdcs(&self, realm: &str, want_tcp: bool) -> Result<&[String], KrbError> {
        let realm_kdcs = self
            .realms
            .get(&realm.to_uppercase())
            .ok_or(KrbError::NoKdcsForRealm)?;
        let list = if want_tcp {
            &realm_kdcs.tcp
        } else {
            &realm_kdcs.udp
        };
        if list.is_empty() {
            return Err(KrbError::NoKdcsForRealm);
        }
        Ok(list)
    }

    /// Ship `req` to a KDC of `realm` per the transport policy and return
    /// the raw response bytes.
    pub fn send_to_kdc(&self, req: &[u8], realm: &str) -> Result<Vec<u8>, KdcError> {
        self.send_to_kdc_with_cancel(req, realm, &CancelToken::new())
    }

    pub fn send_to_kdc_with_cancel(
        &self,
        req: &[u8],
        realm: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<u8>, KdcError> {
        // A realm with no KDCs on either transport is a configuration
        // error, not a transport failure to retry around. A list missing
        // for just one transport fails that leg and lets the policy fall
        // back to the other.
        if self.kdcs(realm, false).is_err() && self.kdcs(realm, true).is_err() {
            return Err(KdcError::Transport(KrbError::NoKdcsForRealm));
        }

        if self.udp_preference_limit == 1 {
            // Always TCP, no fallback.
            return self.exchange(Transport::Tcp, realm, req, cancel);
        }

        if req.len() <= self.udp_preference_limit {
            // UDP first; TCP only on transport failure or on the KDC
            // telling us the reply does not fit a datagram.
            match self.exchange(Transport::Udp, realm, req, cancel) {
                Ok(rb) => Ok(rb),
                Err(KdcError::Cancelled) => Err(KdcError::Cancelled),
                Err(KdcError::Reply(reply)) if !reply.is_response_too_big() => {
                    Err(KdcError::Reply(reply))
                }
                Err(udp_err) => {
                    debug!("retrying over TCP after UDP attempt failed");
                    match self.exchange(Transport::Tcp, realm, req, cancel) {
                        Ok(rb) => Ok(rb),
                        Err(KdcError::Transport(tcp_err)) => match udp_err {
                            KdcError::Transport(e) => Err(KdcError::Exhausted {
                                primary: e,
                                fallback: tcp_err,
                            }),
                            // The too-big reply stands when TCP is
                            // unreachable; the KDC did answer.
                            other => Err(other),
                        },
                        Err(other) => Err(other),
                    }
                }
            }
        } else {
            // TCP first; UDP only on transport failure. A KRB-ERROR over
            // TCP is final.
            match self.exchange(Transport::Tcp, realm, req, cancel) {
                Ok(rb) => Ok(rb),
                Err(KdcError::Cancelled) => Err(KdcError::Cancelled),
                Err(KdcError::Reply(reply)) => Err(KdcError::Reply(reply)),
                Err(KdcError::Transport(tcp_err)) => {
                    debug!("retrying over UDP after TCP attempt failed");
                    match self.exchange(Transport::Udp, realm, req, cancel) {
                        Ok(rb) => Ok(rb),
                        Err(KdcError::Transport(udp_err)) => Err(KdcError::Exhausted {
                            primary: tcp_err,
                            fallback: udp_err,
                        }),
                        Err(other) => Err(other),
                    }
                }
                Err(other) => Err(other),
            }
        }
    }

    fn exchange(
        &self,
        transport: Transport,
        realm: &str,
        req: &[u8],
        cancel: &CancelToken,
    ) -> Result<Vec<u8>, KdcError> {
        let kdcs = self
            .kdcs(realm, transport == Transport::Tcp)
            .map_err(KdcError::Transport)?;
        let rb = match transport {
            Transport::Udp => send_udp(kdcs, req, cancel),
            Transport::Tcp => send_tcp(kdcs, req, cancel),
        }?;
        check_for_krb_error(rb)
    }
}

/// A response that decodes as KRB-ERROR becomes a typed failure.
fn check_for_krb_error(rb: Vec<u8>) -> Result<Vec<u8>, KdcError> {
    match ErrorReply::unmarshal(&rb) {
        Ok(reply) => {
            trace!(code = reply.error_code, "KDC returned KRB-ERROR");
            Err(KdcError::Reply(Box::new(reply)))
        }
        Err(_) => Ok(rb),
    }
}

fn resolve(endpoint: &str) -> Result<Vec<SocketAddr>, KrbError> {
    endpoint
        .to_socket_addrs()
        .map(Iterator::collect)
        .map_err(|err| {
            error!(?err, endpoint, "unable to resolve KDC endpoint");
            KrbError::KdcAddressInvalid
        })
}

fn send_udp(kdcs: &[String], req: &[u8], cancel: &CancelToken) -> Result<Vec<u8>, KdcError> {
    let mut last_err = KrbError::KdcConnectionFailed;

    for endpoint in kdcs {
        if cancel.is_cancelled() {
            return Err(KdcError::Cancelled);
        }
        // A resolver failure aborts the whole leg; an unreachable endpoint
        // moves on to the next one.
        let addrs = resolve(endpoint).map_err(KdcError::Transport)?;
        for addr in addrs {
            match exchange_udp(addr, req) {
                Ok(rb) => return Ok(rb),
                Err(err) => {
                    debug!(?err, %addr, "UDP exchange failed");
                    last_err = err;
                }
            }
        }
    }

    Err(KdcError::Transport(last_err))
}

fn exchange_udp(addr: SocketAddr, req: &[u8]) -> Result<Vec<u8>, KrbError> {
    let socket = UdpSocket::bind(("0.0.0.0", 0)).map_err(|_| KrbError::KdcConnectionFailed)?;
    socket
        .set_read_timeout(Some(KDC_ATTEMPT_TIMEOUT))
        .and_then(|()| socket.set_write_timeout(Some(KDC_ATTEMPT_TIMEOUT)))
        .map_err(|_| KrbError::KdcConnectionFailed)?;
    socket
        .connect(addr)
        .map_err(|_| KrbError::KdcConnectionFailed)?;

    socket.send(req).map_err(|_| KrbError::KdcWriteFailed)?;

    let mut buf = vec![0u8; KDC_UDP_RECV_BUF];
    let n = socket.recv(&mut buf).map_err(|_| KrbError::KdcReadFailed)?;
    if n < 1 {
        return Err(KrbError::KdcResponseEmpty);
    }
    buf.truncate(n);
    Ok(buf)
}

fn send_tcp(kdcs: &[String], req: &[u8], cancel: &CancelToken) -> Result<Vec<u8>, KdcError> {
    let mut last_err = KrbError::KdcConnectionFailed;

    for endpoint in kdcs {
        if cancel.is_cancelled() {
            return Err(KdcError::Cancelled);
        }
        let addrs = resolve(endpoint).map_err(KdcError::Transport)?;
        for addr in addrs {
            match exchange_tcp(addr, req) {
                Ok(rb) => return Ok(rb),
                Err(err) => {
                    debug!(?err, %addr, "TCP exchange failed");
                    last_err = err;
                }
            }
        }
    }

    Err(KdcError::Transport(last_err))
}

fn exchange_tcp(addr: SocketAddr, req: &[u8]) -> Result<Vec<u8>, KrbError> {
    let mut stream = TcpStream::connect_timeout(&addr, KDC_ATTEMPT_TIMEOUT)
        .map_err(|_| KrbError::KdcConnectionFailed)?;
    stream
        .set_read_timeout(Some(KDC_ATTEMPT_TIMEOUT))
        .and_then(|()| stream.set_write_timeout(Some(KDC_ATTEMPT_TIMEOUT)))
        .map_err(|_| KrbError::KdcConnectionFailed)?;

    // 4 byte big endian length prefix on the request.
    let mut framed = Vec::with_capacity(4 + req.len());
    framed.extend_from_slice(&(req.len() as u32).to_be_bytes());
    framed.extend_from_slice(req);
    stream
        .write_all(&framed)
        .map_err(|_| KrbError::KdcWriteFailed)?;

    // Length prefix on the response, then exactly that many bytes.
    let mut len_bytes = [0u8; 4];
    stream
        .read_exact(&mut len_bytes)
        .map_err(|_| KrbError::KdcReadFailed)?;
    let len = u32::from_be_bytes(len_bytes) as usize;
    if len < 1 {
        return Err(KrbError::KdcResponseEmpty);
    }

    let mut rb = vec![0u8; len];
    stream
        .read_exact(&mut rb)
        .map_err(|_| KrbError::KdcReadFailed)?;
    Ok(rb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asn1::constants::KrbErrorCode;
    use crate::proto::Name;
    use std::net::{TcpListener, UdpSocket};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, UNIX_EPOCH};

    fn krb_error_bytes(code: KrbErrorCode) -> Vec<u8> {
        ErrorReply::new(
            code,
            Name::krbtgt("EXAMPLE.COM"),
            "EXAMPLE.COM",
            UNIX_EPOCH + Duration::from_secs(1_700_000_000),
        )
        .marshal()
        .expect("Failed to encode KRB-ERROR")
    }

    /// One-shot UDP responder returning a fixed payload.
    fn spawn_udp_responder(response: Vec<u8>) -> (String, std::thread::JoinHandle<()>) {
        let socket = UdpSocket::bind("127.0.0.1:0").expect("Failed to bind");
        let endpoint = socket.local_addr().expect("Failed to get addr").to_string();
        let handle = std::thread::spawn(move || {
            let mut buf = [0u8; 4096];
            if let Ok((_, peer)) = socket.recv_from(&mut buf) {
                let _ = socket.send_to(&response, peer);
            }
        });
        (endpoint, handle)
    }

    /// One-shot TCP responder speaking the 4 byte length framing. Sets the
    /// flag when a connection arrives.
    fn spawn_tcp_responder(
        response: Vec<u8>,
        accepted: Arc<AtomicBool>,
    ) -> (String, std::thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
        let endpoint = listener
            .local_addr()
            .expect("Failed to get addr")
            .to_string();
        let handle = std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                accepted.store(true, Ordering::SeqCst);
                let mut len_bytes = [0u8; 4];
                if stream.read_exact(&mut len_bytes).is_err() {
                    return;
                }
                let mut req = vec![0u8; u32::from_be_bytes(len_bytes) as usize];
                if stream.read_exact(&mut req).is_err() {
                    return;
                }
                let mut framed = (response.len() as u32).to_be_bytes().to_vec();
                framed.extend_from_slice(&response);
                let _ = stream.write_all(&framed);
            }
        });
        (endpoint, handle)
    }

    #[test]
    fn no_kdcs_for_realm() {
        let client = KdcClient::new(1300);
        assert_eq!(
            client.send_to_kdc(b"request", "EXAMPLE.COM"),
            Err(KdcError::Transport(KrbError::NoKdcsForRealm))
        );
    }

    #[test]
    fn udp_too_big_falls_back_to_tcp() {
        let (udp, udp_handle) =
            spawn_udp_responder(krb_error_bytes(KrbErrorCode::KrbErrResponseTooBig));
        let accepted = Arc::new(AtomicBool::new(false));
        let (tcp, tcp_handle) = spawn_tcp_responder(b"AS-REP bytes".to_vec(), accepted.clone());

        // Each transport resolves its own endpoint set for the realm.
        let mut client = KdcClient::new(1300);
        client.add_realm_kdcs("EXAMPLE.COM", false, vec![udp]);
        client.add_realm_kdcs("EXAMPLE.COM", true, vec![tcp]);

        let rb = client
            .send_to_kdc(&[0u8; 100], "EXAMPLE.COM")
            .expect("Failed to exchange");
        assert_eq!(rb, b"AS-REP bytes");
        assert!(accepted.load(Ordering::SeqCst));

        udp_handle.join().expect("udp thread");
        tcp_handle.join().expect("tcp thread");
    }

    #[test]
    fn udp_krb_error_short_circuits() {
        let (udp, udp_handle) =
            spawn_udp_responder(krb_error_bytes(KrbErrorCode::KdcErrCPrincipalUnknown));
        let accepted = Arc::new(AtomicBool::new(false));
        let (tcp, _tcp_handle) = spawn_tcp_responder(b"unreached".to_vec(), accepted.clone());

        let mut client = KdcClient::new(1300);
        client.add_realm_kdcs("EXAMPLE.COM", false, vec![udp]);
        client.add_realm_kdcs("EXAMPLE.COM", true, vec![tcp]);

        match client.send_to_kdc(&[0u8; 100], "EXAMPLE.COM") {
            Err(KdcError::Reply(reply)) => {
                assert_eq!(reply.code(), Some(KrbErrorCode::KdcErrCPrincipalUnknown));
                assert!(!reply.raw.is_empty());
            }
            other => panic!("expected a KRB-ERROR reply, got {other:?}"),
        }
        // TCP must not have been consulted.
        assert!(!accepted.load(Ordering::SeqCst));
        udp_handle.join().expect("udp thread");
    }

    #[test]
    fn limit_of_one_forces_tcp() {
        let accepted = Arc::new(AtomicBool::new(false));
        let (tcp, tcp_handle) = spawn_tcp_responder(b"reply".to_vec(), accepted.clone());

        // A TCP-only realm is enough when the limit forces TCP.
        let mut client = KdcClient::new(1);
        client.add_realm_kdcs("EXAMPLE.COM", true, vec![tcp]);

        let rb = client
            .send_to_kdc(&[0u8; 10], "EXAMPLE.COM")
            .expect("Failed to exchange");
        assert_eq!(rb, b"reply");
        assert!(accepted.load(Ordering::SeqCst));
        tcp_handle.join().expect("tcp thread");
    }

    #[test]
    fn large_requests_prefer_tcp() {
        let accepted = Arc::new(AtomicBool::new(false));
        let (tcp, tcp_handle) = spawn_tcp_responder(b"reply".to_vec(), accepted.clone());

        let mut client = KdcClient::new(1300);
        client.add_realm_kdcs("EXAMPLE.COM", true, vec![tcp]);

        let rb = client
            .send_to_kdc(&[0u8; 2000], "EXAMPLE.COM")
            .expect("Failed to exchange");
        assert_eq!(rb, b"reply");
        assert!(accepted.load(Ordering::SeqCst));
        tcp_handle.join().expect("tcp thread");
    }

    #[test]
    fn large_request_falls_back_to_udp() {
        // The realm has no TCP endpoints at all, so the preferred TCP leg
        // fails as a transport error and the UDP fallback carries the
        // exchange.
        let (udp, udp_handle) = spawn_udp_responder(b"reply".to_vec());

        let mut client = KdcClient::new(1300);
        client.add_realm_kdcs("EXAMPLE.COM", false, vec![udp]);

        let rb = client
            .send_to_kdc(&[0u8; 2000], "EXAMPLE.COM")
            .expect("Failed to exchange");
        assert_eq!(rb, b"reply");
        udp_handle.join().expect("udp thread");
    }

    #[test]
    fn transports_resolve_distinct_endpoint_sets() {
        // The same realm maps to different endpoints per transport; a
        // small request lands on the UDP set without touching the TCP one.
        let (udp, udp_handle) = spawn_udp_responder(b"datagram reply".to_vec());
        let accepted = Arc::new(AtomicBool::new(false));
        let (tcp, _tcp_handle) = spawn_tcp_responder(b"stream reply".to_vec(), accepted.clone());

        let mut client = KdcClient::new(1300);
        client.add_realm_kdcs("EXAMPLE.COM", false, vec![udp]);
        client.add_realm_kdcs("EXAMPLE.COM", true, vec![tcp]);

        let rb = client
            .send_to_kdc(&[0u8; 100], "EXAMPLE.COM")
            .expect("Failed to exchange");
        assert_eq!(rb, b"datagram reply");
        assert!(!accepted.load(Ordering::SeqCst));
        udp_handle.join().expect("udp thread");
    }

    #[test]
    fn cancellation_is_distinct() {
        let mut client = KdcClient::new(1300);
        client.add_realm("EXAMPLE.COM", vec!["127.0.0.1:1".to_string()]);
        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(
            client.send_to_kdc_with_cancel(&[0u8; 10], "EXAMPLE.COM", &cancel),
            Err(KdcError::Cancelled)
        );
    }
}
