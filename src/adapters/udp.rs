//! Minimal UDP process-data bus.
//!
//! Implements [`ProcessDataPort`] over plain `std::net::UdpSocket` sockets:
//! a channel id maps to a UDP port, publishers re-send their latest payload
//! each elapsed period inside `process_pending`, subscribers keep only the
//! newest matching datagram.  This is a bench transport — it deliberately
//! does not reproduce the real train bus's timing, retry, or framing
//! behaviour, just enough for the binary to run against a peer or a test
//! harness.
//!
//! Reception sockets bind to the concrete destination address (own unicast
//! address, or the multicast group itself), which lets all three status
//! subscriptions share one port without address reuse tricks.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::error::TransportError;
use crate::ports::{
    MAX_PAYLOAD, Payload, ProcessDataPort, PubHandle, ReceivedFrame, SourceFilter, SubHandle,
};

struct Subscription {
    socket: UdpSocket,
    accept_from: Option<IpAddr>,
    latest: Option<ReceivedFrame>,
}

struct Publisher {
    socket: UdpSocket,
    dest: SocketAddr,
    payload: Option<Payload>,
    period: Duration,
    last_sent: Option<Instant>,
}

/// UDP implementation of the process-data port.
pub struct UdpBus {
    own: Ipv4Addr,
    gateway: Ipv4Addr,
    open: bool,
    subs: Vec<Subscription>,
    pubs: Vec<Publisher>,
}

impl UdpBus {
    pub fn new(own: Ipv4Addr, gateway: Ipv4Addr) -> Self {
        Self {
            own,
            gateway,
            open: false,
            subs: Vec::new(),
            pubs: Vec::new(),
        }
    }

    fn require_open(&self) -> Result<(), TransportError> {
        if self.open {
            Ok(())
        } else {
            Err(TransportError::SessionClosed)
        }
    }
}

impl ProcessDataPort for UdpBus {
    fn init(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn open_session(&mut self) -> Result<(), TransportError> {
        self.open = true;
        Ok(())
    }

    fn subscribe(
        &mut self,
        channel: u16,
        filter: SourceFilter,
    ) -> Result<SubHandle, TransportError> {
        self.require_open()?;

        let bind_addr = match filter.group {
            Some(group) => SocketAddr::from((group, channel)),
            None => SocketAddr::from((self.own, channel)),
        };
        let socket = UdpSocket::bind(bind_addr)?;
        socket.set_nonblocking(true)?;
        if let Some(group) = filter.group {
            socket.join_multicast_v4(&group, &self.own)?;
        }

        debug!("udp: subscribed channel {channel} at {bind_addr}");
        self.subs.push(Subscription {
            socket,
            accept_from: filter.source,
            latest: None,
        });
        Ok(SubHandle(self.subs.len() - 1))
    }

    fn publish(&mut self, channel: u16, period: Duration) -> Result<PubHandle, TransportError> {
        self.require_open()?;

        let socket = UdpSocket::bind(SocketAddr::from((self.own, 0)))?;
        socket.set_nonblocking(true)?;
        let dest = SocketAddr::from((self.gateway, channel));

        debug!("udp: publishing channel {channel} to {dest} every {period:?}");
        self.pubs.push(Publisher {
            socket,
            dest,
            payload: None,
            period,
            last_sent: None,
        });
        Ok(PubHandle(self.pubs.len() - 1))
    }

    fn put(&mut self, handle: PubHandle, payload: &[u8]) -> Result<(), TransportError> {
        self.require_open()?;
        if payload.len() > MAX_PAYLOAD {
            return Err(TransportError::PayloadTooLarge(payload.len()));
        }
        let publisher = self
            .pubs
            .get_mut(handle.0)
            .ok_or(TransportError::UnknownHandle)?;

        let mut buf = Payload::new();
        let _ = buf.extend_from_slice(payload);
        publisher.payload = Some(buf);
        Ok(())
    }

    fn get(&mut self, handle: SubHandle) -> Option<ReceivedFrame> {
        let sub = self.subs.get_mut(handle.0)?;

        // Drain everything pending; only the newest matching datagram
        // survives.
        let mut buf = [0u8; MAX_PAYLOAD + 1];
        loop {
            match sub.socket.recv_from(&mut buf) {
                Ok((len, from)) => {
                    if let Some(accept) = sub.accept_from {
                        if from.ip() != accept {
                            debug!("udp: ignoring datagram from {from}");
                            continue;
                        }
                    }
                    if len > MAX_PAYLOAD {
                        warn!("udp: oversized datagram ({len} bytes) dropped");
                        continue;
                    }
                    let mut payload = Payload::new();
                    let _ = payload.extend_from_slice(&buf[..len]);
                    sub.latest = Some(ReceivedFrame {
                        payload,
                        source: Some(from),
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!("udp: recv failed: {e}");
                    break;
                }
            }
        }

        sub.latest.take()
    }

    fn process_pending(&mut self, wait: Duration) -> Result<(), TransportError> {
        self.require_open()?;

        // Re-send every due publisher payload, then pace the cycle.
        let now = Instant::now();
        for publisher in &mut self.pubs {
            let due = publisher
                .last_sent
                .is_none_or(|t| now.duration_since(t) >= publisher.period);
            if !due {
                continue;
            }
            if let Some(payload) = &publisher.payload {
                if let Err(e) = publisher.socket.send_to(payload, publisher.dest) {
                    warn!("udp: send to {} failed: {e}", publisher.dest);
                } else {
                    publisher.last_sent = Some(now);
                }
            }
        }

        std::thread::sleep(wait);
        Ok(())
    }

    fn close_session(&mut self) -> Result<(), TransportError> {
        self.subs.clear();
        self.pubs.clear();
        self.open = false;
        Ok(())
    }

    fn terminate(&mut self) {}
}
