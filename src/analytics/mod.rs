//! Analytics uplink.
//!
//! Ships violations to a central analytics server as newline-delimited
//! JSON over TCP. The hot path only ever does a non-blocking queue offer;
//! a single worker owns the connection, reconnecting in the background
//! when it breaks. Overflow and send failures drop violations (counted),
//! never block.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::AnalyticsConfig;
use crate::constants::NANOS_PER_MILLI;
use crate::model::Violation;

/// Maximum queued violations before offers are dropped.
const QUEUE_CAPACITY: usize = 1000;

/// How long `stop` waits for the worker to drain before detaching it.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

pub struct AnalyticsClient {
    config: AnalyticsConfig,
    sender: Mutex<Option<mpsc::Sender<Violation>>>,
    receiver: Mutex<Option<mpsc::Receiver<Violation>>>,
    connected: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    worker: Mutex<Option<WorkerHandle>>,
}

struct WorkerHandle {
    thread: std::thread::JoinHandle<()>,
    done: std::sync::mpsc::Receiver<()>,
}

impl AnalyticsClient {
    pub fn new(config: AnalyticsConfig) -> Self {
        Self::with_capacity(config, QUEUE_CAPACITY)
    }

    fn with_capacity(config: AnalyticsConfig, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            config,
            sender: Mutex::new(Some(tx)),
            receiver: Mutex::new(Some(rx)),
            connected: Arc::new(AtomicBool::new(false)),
            dropped: Arc::new(AtomicU64::new(0)),
            worker: Mutex::new(None),
        }
    }

    /// Starts the background sender. Idempotent.
    pub fn start(&self) {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return;
        }
        let Some(receiver) = self.receiver.lock().take() else {
            return;
        };

        let config = self.config.clone();
        let connected = Arc::clone(&self.connected);
        let dropped = Arc::clone(&self.dropped);
        let (done_tx, done_rx) = std::sync::mpsc::channel();

        let spawned = std::thread::Builder::new()
            .name("warden-analytics".into())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_io()
                    .enable_time()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        warn!(error = %e, "analytics runtime failed to start");
                        return;
                    }
                };
                runtime.block_on(sender_loop(receiver, config, connected, dropped));
                let _ = done_tx.send(());
            });

        match spawned {
            Ok(thread) => {
                *worker = Some(WorkerHandle {
                    thread,
                    done: done_rx,
                });
                info!(host = %self.config.host, port = self.config.port, "analytics client started");
            }
            Err(e) => warn!(error = %e, "failed to spawn analytics thread"),
        }
    }

    /// Stops the worker, waiting up to 5 seconds for it to drain.
    pub fn stop(&self) {
        // Closing the channel wakes the worker out of recv
        self.sender.lock().take();

        let Some(handle) = self.worker.lock().take() else {
            return;
        };
        match handle.done.recv_timeout(STOP_TIMEOUT) {
            Ok(()) => {
                let _ = handle.thread.join();
                info!("analytics client stopped");
            }
            Err(_) => {
                warn!("analytics worker did not stop in time, detaching");
            }
        }
    }

    /// Offers a violation to the queue without blocking. Returns false
    /// (and counts a drop) when the queue is full or the client stopped.
    pub fn send_violation(&self, violation: &Violation) -> bool {
        let sender = self.sender.lock();
        let Some(sender) = sender.as_ref() else {
            return false;
        };
        match sender.try_send(violation.clone()) {
            Ok(()) => true,
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Violations dropped due to queue overflow or send failure.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

async fn sender_loop(
    mut receiver: mpsc::Receiver<Violation>,
    config: AnalyticsConfig,
    connected: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
) {
    let mut stream: Option<TcpStream> = None;

    while let Some(violation) = receiver.recv().await {
        if stream.is_none() {
            stream = connect(&config, &connected).await;
            if stream.is_none() {
                // Connection refused: this violation is lost, retry later
                dropped.fetch_add(1, Ordering::Relaxed);
                tokio::time::sleep(Duration::from_millis(config.reconnect_delay_ms)).await;
                continue;
            }
        }

        let line = wire_format(&violation);
        if let Some(s) = stream.as_mut() {
            if let Err(e) = s.write_all(line.as_bytes()).await {
                debug!(error = %e, "analytics send failed, reconnecting");
                dropped.fetch_add(1, Ordering::Relaxed);
                connected.store(false, Ordering::Relaxed);
                stream = None;
                tokio::time::sleep(Duration::from_millis(config.reconnect_delay_ms)).await;
            }
        }
    }

    connected.store(false, Ordering::Relaxed);
}

async fn connect(config: &AnalyticsConfig, connected: &Arc<AtomicBool>) -> Option<TcpStream> {
    let address = (config.host.as_str(), config.port);
    let attempt = TcpStream::connect(address);
    match tokio::time::timeout(Duration::from_millis(config.connect_timeout_ms), attempt).await {
        Ok(Ok(stream)) => {
            let _ = stream.set_nodelay(true);
            connected.store(true, Ordering::Relaxed);
            info!(host = %config.host, port = config.port, "connected to analytics server");
            Some(stream)
        }
        Ok(Err(e)) => {
            debug!(error = %e, "analytics connection failed");
            None
        }
        Err(_) => {
            debug!("analytics connection timed out");
            None
        }
    }
}

/// One violation as a newline-terminated JSON object.
fn wire_format(violation: &Violation) -> String {
    let name_json =
        serde_json::to_string(&violation.player_name).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        "{{\"type\":\"violation\",\"player_uuid\":\"{}\",\"player_name\":{},\"category\":\"{}\",\"confidence\":{:.6},\"severity\":{:.6},\"timestamp\":{}}}\n",
        violation.player_id,
        name_json,
        violation.category,
        violation.confidence,
        violation.severity,
        violation.timestamp / NANOS_PER_MILLI,
    )
}
