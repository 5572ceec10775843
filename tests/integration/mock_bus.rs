//! Recording mock process-data bus for integration tests.
//!
//! Shares its interior behind an `Arc<Mutex<_>>` so a test can keep a clone
//! while the coordinator owns the other: script incoming status frames,
//! then assert on every frame the coordinator handed to a publisher.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use doorhmi::error::TransportError;
use doorhmi::ports::{
    MAX_PAYLOAD, Payload, ProcessDataPort, PubHandle, ReceivedFrame, SourceFilter, SubHandle,
};

#[derive(Debug, Default)]
struct Inner {
    open: bool,
    closed_sessions: usize,
    terminated: bool,
    process_calls: usize,
    /// Newest scripted frame per subscription (last-value-wins).
    pending: Vec<Option<Payload>>,
    sub_channels: Vec<u16>,
    sub_filters: Vec<SourceFilter>,
    pub_channels: Vec<u16>,
    /// Every payload put per channel, in order.
    sent: HashMap<u16, Vec<Vec<u8>>>,
    fail_put: bool,
    fail_process: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingBus {
    inner: Arc<Mutex<Inner>>,
}

#[allow(dead_code)]
impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    /// Script the newest incoming frame on subscription `sub`.
    pub fn push_status(&self, sub: usize, payload: &[u8]) {
        let mut inner = self.lock();
        let mut buf = Payload::new();
        buf.extend_from_slice(payload).unwrap();
        inner.pending[sub] = Some(buf);
    }

    /// All frames put on `channel` so far.
    pub fn sent(&self, channel: u16) -> Vec<Vec<u8>> {
        self.lock().sent.get(&channel).cloned().unwrap_or_default()
    }

    /// The most recent frame put on `channel`.
    pub fn last_sent(&self, channel: u16) -> Option<Vec<u8>> {
        self.sent(channel).last().cloned()
    }

    pub fn subscription_count(&self) -> usize {
        self.lock().sub_channels.len()
    }

    pub fn subscription_channels(&self) -> Vec<u16> {
        self.lock().sub_channels.clone()
    }

    pub fn subscription_filters(&self) -> Vec<SourceFilter> {
        self.lock().sub_filters.clone()
    }

    pub fn publisher_channels(&self) -> Vec<u16> {
        self.lock().pub_channels.clone()
    }

    pub fn process_calls(&self) -> usize {
        self.lock().process_calls
    }

    pub fn session_closed(&self) -> bool {
        let inner = self.lock();
        inner.closed_sessions > 0 && !inner.open
    }

    pub fn terminated(&self) -> bool {
        self.lock().terminated
    }

    /// Make every subsequent `put` fail.
    pub fn fail_puts(&self, fail: bool) {
        self.lock().fail_put = fail;
    }

    /// Make every subsequent `process_pending` fail.
    pub fn fail_process(&self, fail: bool) {
        self.lock().fail_process = fail;
    }
}

impl ProcessDataPort for RecordingBus {
    fn init(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn open_session(&mut self) -> Result<(), TransportError> {
        self.lock().open = true;
        Ok(())
    }

    fn subscribe(
        &mut self,
        channel: u16,
        filter: SourceFilter,
    ) -> Result<SubHandle, TransportError> {
        let mut inner = self.lock();
        if !inner.open {
            return Err(TransportError::SessionClosed);
        }
        inner.sub_channels.push(channel);
        inner.sub_filters.push(filter);
        inner.pending.push(None);
        Ok(SubHandle(inner.sub_channels.len() - 1))
    }

    fn publish(&mut self, channel: u16, _period: Duration) -> Result<PubHandle, TransportError> {
        let mut inner = self.lock();
        if !inner.open {
            return Err(TransportError::SessionClosed);
        }
        inner.pub_channels.push(channel);
        Ok(PubHandle(inner.pub_channels.len() - 1))
    }

    fn put(&mut self, handle: PubHandle, payload: &[u8]) -> Result<(), TransportError> {
        let mut inner = self.lock();
        if inner.fail_put {
            return Err(TransportError::Io(std::io::ErrorKind::BrokenPipe));
        }
        if payload.len() > MAX_PAYLOAD {
            return Err(TransportError::PayloadTooLarge(payload.len()));
        }
        let channel = *inner
            .pub_channels
            .get(handle.0)
            .ok_or(TransportError::UnknownHandle)?;
        inner.sent.entry(channel).or_default().push(payload.to_vec());
        Ok(())
    }

    fn get(&mut self, handle: SubHandle) -> Option<ReceivedFrame> {
        let mut inner = self.lock();
        let payload = inner.pending.get_mut(handle.0)?.take()?;
        Some(ReceivedFrame {
            payload,
            source: None,
        })
    }

    fn process_pending(&mut self, _wait: Duration) -> Result<(), TransportError> {
        // No sleeping in tests — the coordinator's pacing is the bus's
        // responsibility and the mock has none.
        let mut inner = self.lock();
        inner.process_calls += 1;
        if inner.fail_process {
            return Err(TransportError::Io(std::io::ErrorKind::TimedOut));
        }
        Ok(())
    }

    fn close_session(&mut self) -> Result<(), TransportError> {
        let mut inner = self.lock();
        inner.open = false;
        inner.closed_sessions += 1;
        Ok(())
    }

    fn terminate(&mut self) {
        self.lock().terminated = true;
    }
}
