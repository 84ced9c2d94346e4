//! In-memory device used by tests

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

use super::{DeviceConnection, DeviceError, DeviceEvent, INBOUND_CAPACITY};
use crate::midi::WireEvent;

/// Records outbound events and lets tests inject inbound ones
#[derive(Default)]
pub struct MockDevice {
    pub sent: Mutex<Vec<WireEvent>>,
    inbound: Mutex<Option<mpsc::Sender<DeviceEvent>>>,
    connected: AtomicBool,
    fail_sends: AtomicBool,
    pub disconnects: Mutex<u32>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Push a raw packet as if the hardware sent it
    pub async fn inject(&self, raw: &[u8]) {
        let tx = self.inbound.lock().clone();
        if let Some(tx) = tx {
            tx.send(DeviceEvent::new(raw)).await.expect("receiver alive");
        }
    }

    /// Stop delivering events (closes the inbound channel)
    pub fn close_inbound(&self) {
        self.inbound.lock().take();
    }

    pub fn sent(&self) -> Vec<WireEvent> {
        self.sent.lock().clone()
    }

    pub fn clear_sent(&self) {
        self.sent.lock().clear();
    }
}

impl DeviceConnection for MockDevice {
    fn connect(&self, _identifier: &str) -> Result<mpsc::Receiver<DeviceEvent>, DeviceError> {
        let (tx, rx) = mpsc::channel(INBOUND_CAPACITY);
        *self.inbound.lock() = Some(tx);
        self.connected.store(true, Ordering::SeqCst);
        Ok(rx)
    }

    fn send(&self, event: &WireEvent) -> Result<(), DeviceError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(DeviceError::NotConnected);
        }
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(DeviceError::Send("mock failure".into()));
        }
        self.sent.lock().push(*event);
        Ok(())
    }

    fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.inbound.lock().take();
        *self.disconnects.lock() += 1;
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
