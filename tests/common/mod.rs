//! Scripted transceiver used by the end-to-end tests.
//!
//! The transport records every written frame and answers the way an RFXtrx
//! does: an interface response to GET_STATUS, a receiver started message to
//! START_RECEIVER and, unless disabled, an ack for each device message.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use rfxcom::{
    BridgeConfig, Error, PacketSink, RfxcomBridge, Transport, TransportConfig, TransportError,
    TransportEvent,
};
use tokio::time::Instant;

/// Shared state between a test and the transports its bridge creates.
pub struct Script {
    writes: Mutex<Vec<(Instant, Vec<u8>)>>,
    sink: Mutex<Option<PacketSink>>,
    connected: AtomicBool,
    connect_delay: Mutex<Duration>,
    connects: AtomicUsize,
    fail_connect: AtomicBool,
    fail_writes: AtomicBool,
    auto_ack: AtomicBool,
    ack_response: AtomicU8,
    transceiver_type: AtomicU8,
}

impl Script {
    pub fn new() -> Self {
        Self {
            writes: Mutex::new(Vec::new()),
            sink: Mutex::new(None),
            connected: AtomicBool::new(false),
            connect_delay: Mutex::new(Duration::ZERO),
            connects: AtomicUsize::new(0),
            fail_connect: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            auto_ack: AtomicBool::new(true),
            ack_response: AtomicU8::new(0x00),
            transceiver_type: AtomicU8::new(0x53),
        }
    }

    /// All frames written so far, with the time they were written.
    pub fn writes(&self) -> Vec<(Instant, Vec<u8>)> {
        self.writes.lock().clone()
    }

    /// Written frames whose packet type is a device type.
    pub fn device_writes(&self) -> Vec<Vec<u8>> {
        self.writes
            .lock()
            .iter()
            .map(|(_, frame)| frame.clone())
            .filter(|frame| frame.len() > 1 && frame[1] >= 0x10)
            .collect()
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn set_fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes every connect take `delay` before it completes.
    pub fn set_connect_delay(&self, delay: Duration) {
        *self.connect_delay.lock() = delay;
    }

    pub fn set_auto_ack(&self, ack: bool) {
        self.auto_ack.store(ack, Ordering::SeqCst);
    }

    pub fn set_ack_response(&self, response: u8) {
        self.ack_response.store(response, Ordering::SeqCst);
    }

    pub fn set_transceiver_type(&self, transceiver_type: u8) {
        self.transceiver_type.store(transceiver_type, Ordering::SeqCst);
    }

    /// Delivers a packet payload as if the transceiver had sent it.
    pub fn inject(&self, payload: &[u8]) -> bool {
        self.emit(TransportEvent::Packet(Bytes::copy_from_slice(payload)))
    }

    /// Acknowledges the last written device frame.
    pub fn ack_last(&self, response: u8) -> bool {
        let Some(frame) = self.device_writes().pop() else {
            return false;
        };
        self.inject(&[0x02, 0x01, frame[3], response])
    }

    /// Reports the link as lost.
    pub fn close_link(&self) -> bool {
        self.emit(TransportEvent::Closed(Error::Io(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "transceiver unplugged",
        ))))
    }

    fn emit(&self, event: TransportEvent) -> bool {
        let sink = self.sink.lock().clone();
        sink.is_some_and(|sink| sink.try_send(event).is_ok())
    }

    fn respond(&self, frame: &[u8]) {
        let Some(payload) = frame.get(1..) else {
            return;
        };
        if payload.len() < 4 {
            return;
        }
        let seq = payload[2];

        match (payload[0], payload[3]) {
            // GET_STATUS
            (0x00, 0x02) => {
                self.inject(&[
                    0x01,
                    0x00,
                    seq,
                    0x02,
                    self.transceiver_type.load(Ordering::SeqCst),
                    0x9A,
                    0x00,
                    0x00,
                    0x27,
                    0x00,
                    0x01,
                    0x01,
                    0x1C,
                    0x03,
                ]);
            }
            // START_RECEIVER
            (0x00, 0x07) => {
                let mut packet = vec![0x01, 0x07, seq, 0x07];
                packet.extend_from_slice(b"Copyright RFXCOM");
                self.inject(&packet);
            }
            (packet_type, _) if packet_type >= 0x10 && self.auto_ack.load(Ordering::SeqCst) => {
                self.inject(&[0x02, 0x01, seq, self.ack_response.load(Ordering::SeqCst)]);
            }
            _ => {}
        }
    }
}

pub struct ScriptedTransport {
    script: Arc<Script>,
}

impl Transport for ScriptedTransport {
    fn connect(&mut self) -> BoxFuture<'_, rfxcom::Result<()>> {
        Box::pin(async move {
            let delay = *self.script.connect_delay.lock();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if self.script.fail_connect.load(Ordering::SeqCst) {
                return Err(TransportError::NoSuchPort {
                    port: "/dev/ttyUSB0".into(),
                }
                .into());
            }
            self.script.connects.fetch_add(1, Ordering::SeqCst);
            self.script.connected.store(true, Ordering::SeqCst);
            Ok(())
        })
    }

    fn disconnect(&mut self) -> BoxFuture<'_, rfxcom::Result<()>> {
        Box::pin(async move {
            self.script.connected.store(false, Ordering::SeqCst);
            Ok(())
        })
    }

    fn write(&mut self, frame: Bytes) -> BoxFuture<'_, rfxcom::Result<()>> {
        Box::pin(async move {
            if !self.script.is_connected() {
                return Err(Error::NotConnected);
            }
            if self.script.fail_writes.load(Ordering::SeqCst) {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "write refused",
                )));
            }
            self.script
                .writes
                .lock()
                .push((Instant::now(), frame.to_vec()));
            self.script.respond(&frame);
            Ok(())
        })
    }

    fn subscribe(&mut self, sink: PacketSink) {
        *self.script.sink.lock() = Some(sink);
    }

    fn is_connected(&self) -> bool {
        self.script.is_connected()
    }
}

/// Creates a bridge whose transports are driven by a fresh script.
pub fn bridge(config: BridgeConfig) -> (Arc<RfxcomBridge>, Arc<Script>) {
    init_tracing();

    let script = Arc::new(Script::new());
    let shared = Arc::clone(&script);
    let factory = move |_: &TransportConfig| -> Box<dyn Transport> {
        Box::new(ScriptedTransport {
            script: Arc::clone(&shared),
        })
    };

    let bridge = RfxcomBridge::with_transport_factory("rfxcom:test", config, factory);
    (Arc::new(bridge), script)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
