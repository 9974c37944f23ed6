//! The coordinator half of the worker protocol.
//!
//! `WorkerThread::spawn` starts the worker on a dedicated OS thread with its
//! own single-threaded tokio runtime, then runs the readiness handshake: a
//! `Ready` probe goes out immediately and every 100ms until the worker
//! answers `ReadyAck`. Polling tolerates worker startup latency without a
//! fixed schedule assumption; the wait is bounded only when the host
//! configures a handshake timeout.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc, watch};

use rn_bridge::RnError;

use crate::environment::WorkerEnvironment;
use crate::error::WorkerError;
use crate::message::{MessageKind, WorkerMessage};

/// Interval between readiness probes during the startup handshake.
const READY_PROBE_INTERVAL: Duration = Duration::from_millis(100);

/// Capacity of the coordinator-side broadcast of worker messages.
const INBOUND_CAPACITY: usize = 256;

/// Handler invoked with worker-originated uncaught errors.
pub type WorkerErrorHandler = Arc<dyn Fn(RnError) + Send + Sync>;

/// Options for spawning the worker thread.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkerOptions {
    /// Bound on the startup handshake. `None` waits indefinitely; an
    /// unresponsive worker then stalls instance creation, which is the
    /// documented trade-off of the polling handshake.
    pub handshake_timeout: Option<Duration>,
}

/// Coordinator handle to the worker execution context.
///
/// Messages from the worker fan out over a broadcast channel, so listeners
/// can subscribe and unsubscribe concurrently with worker-originated
/// callbacks.
pub struct WorkerThread {
    to_worker: mpsc::UnboundedSender<WorkerMessage>,
    inbound: broadcast::Sender<WorkerMessage>,
    shutdown_tx: watch::Sender<bool>,
    terminated: Arc<AtomicBool>,
    thread_handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl WorkerThread {
    /// Spawn the worker and run the readiness handshake to completion.
    ///
    /// Worker-side uncaught errors are converted to [`RnError`] and passed to
    /// `error_handler`; they are never silently dropped.
    pub async fn spawn<E: WorkerEnvironment>(
        environment: E,
        options: WorkerOptions,
        error_handler: WorkerErrorHandler,
    ) -> Result<Arc<Self>, WorkerError> {
        let (to_worker, worker_rx) = mpsc::unbounded_channel::<WorkerMessage>();
        let (worker_out_tx, mut worker_out_rx) = mpsc::unbounded_channel::<WorkerMessage>();
        let (inbound, _) = broadcast::channel(INBOUND_CAPACITY);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let terminated = Arc::new(AtomicBool::new(false));

        let thread_handle = thread::Builder::new()
            .name("rn-worker".into())
            .spawn(move || {
                let rt = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to build worker runtime");
                        return;
                    }
                };
                rt.block_on(run_worker(environment, worker_rx, worker_out_tx, shutdown_rx));
            })
            .map_err(WorkerError::SpawnFailed)?;

        // Pump worker-originated messages into the broadcast, peeling off the
        // reserved error channel for the host error handler.
        let broadcast_tx = inbound.clone();
        tokio::spawn(async move {
            while let Some(message) = worker_out_rx.recv().await {
                if let WorkerMessage::Error { error } = &message {
                    tracing::error!(message = %error.message, "Worker reported an uncaught error");
                    error_handler(error.clone());
                }
                // No receivers subscribed is fine; the send is best-effort.
                let _ = broadcast_tx.send(message);
            }
            tracing::debug!("Worker message pump finished");
        });

        let worker = Arc::new(Self {
            to_worker,
            inbound,
            shutdown_tx,
            terminated,
            thread_handle: Mutex::new(Some(thread_handle)),
        });

        worker.handshake(options.handshake_timeout).await?;
        Ok(worker)
    }

    /// Probe until the worker acknowledges readiness, then stop probing.
    async fn handshake(&self, timeout: Option<Duration>) -> Result<(), WorkerError> {
        let mut rx = self.inbound.subscribe();
        let mut probe = tokio::time::interval(READY_PROBE_INTERVAL);
        let deadline = timeout.map(|t| tokio::time::Instant::now() + t);

        loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Ok(WorkerMessage::ReadyAck) => {
                        tracing::debug!("Worker handshake complete");
                        return Ok(());
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Handshake listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(WorkerError::ChannelClosed);
                    }
                },
                // The first tick fires immediately, so the first probe goes
                // out right away.
                _ = probe.tick() => {
                    self.post_message(WorkerMessage::Ready)?;
                }
                _ = sleep_until_deadline(deadline) => {
                    return Err(WorkerError::HandshakeTimedOut);
                }
            }
        }
    }

    /// Fire-and-forget send to the worker.
    pub fn post_message(&self, message: WorkerMessage) -> Result<(), WorkerError> {
        if self.terminated.load(Ordering::SeqCst) {
            return Err(WorkerError::Terminated);
        }
        self.to_worker
            .send(message)
            .map_err(|_| WorkerError::ChannelClosed)
    }

    /// Resolve the first future message matching `kind` and `predicate`.
    ///
    /// Only messages arriving after the call are considered; for
    /// request/acknowledgment exchanges use [`post_and_wait`](Self::post_and_wait),
    /// which subscribes before posting.
    pub async fn wait_for_message<P>(
        &self,
        kind: MessageKind,
        predicate: P,
    ) -> Result<WorkerMessage, WorkerError>
    where
        P: Fn(&WorkerMessage) -> bool,
    {
        let rx = self.inbound.subscribe();
        self.wait_on(rx, kind, predicate).await
    }

    /// Post a request and wait for its acknowledgment, correlated through
    /// `predicate`. The subscription is taken before the post so the
    /// acknowledgment cannot be missed.
    pub async fn post_and_wait<P>(
        &self,
        message: WorkerMessage,
        ack_kind: MessageKind,
        predicate: P,
    ) -> Result<WorkerMessage, WorkerError>
    where
        P: Fn(&WorkerMessage) -> bool,
    {
        let rx = self.inbound.subscribe();
        self.post_message(message)?;
        self.wait_on(rx, ack_kind, predicate).await
    }

    async fn wait_on<P>(
        &self,
        mut rx: broadcast::Receiver<WorkerMessage>,
        kind: MessageKind,
        predicate: P,
    ) -> Result<WorkerMessage, WorkerError>
    where
        P: Fn(&WorkerMessage) -> bool,
    {
        loop {
            match rx.recv().await {
                Ok(message) if message.kind() == kind && predicate(&message) => {
                    return Ok(message);
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Worker listener lagged; messages were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(WorkerError::ChannelClosed);
                }
            }
        }
    }

    /// Signal the worker loop to exit. Idempotent.
    pub fn terminate(&self) {
        if self.terminated.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }
}

impl Drop for WorkerThread {
    fn drop(&mut self) {
        self.terminate();
        if let Some(handle) = self.thread_handle.lock().take() {
            let _ = handle.join();
        }
    }
}

async fn sleep_until_deadline(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// The loop running inside the worker thread.
async fn run_worker<E: WorkerEnvironment>(
    mut environment: E,
    mut rx: mpsc::UnboundedReceiver<WorkerMessage>,
    tx: mpsc::UnboundedSender<WorkerMessage>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    tracing::debug!("Worker thread started");
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
            message = rx.recv() => {
                let Some(message) = message else { break };
                match message {
                    WorkerMessage::Ready => {
                        if environment.on_ready_probe() {
                            let _ = tx.send(WorkerMessage::ReadyAck);
                        }
                    }
                    WorkerMessage::CreateInstance { instance_id } => {
                        if let Err(error) = environment.create_instance(instance_id) {
                            let _ = tx.send(WorkerMessage::Error { error });
                        }
                        // The ack goes out even on failure so instance
                        // creation on the UI side is not wedged; the failure
                        // travels the error channel.
                        let _ = tx.send(WorkerMessage::InstanceCreated { instance_id });
                    }
                    WorkerMessage::DestroyInstance { instance_id } => {
                        if let Err(error) = environment.destroy_instance(instance_id) {
                            let _ = tx.send(WorkerMessage::Error { error });
                        }
                        let _ = tx.send(WorkerMessage::InstanceDestroyed { instance_id });
                    }
                    WorkerMessage::Custom { kind, payload } => {
                        if let Some(reply) = environment.on_message(&kind, payload) {
                            let _ = tx.send(reply);
                        }
                    }
                    other => {
                        tracing::warn!(kind = ?other.kind(), "Unexpected message in worker");
                    }
                }
            }
        }
    }
    tracing::debug!("Worker thread finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::NullWorkerEnvironment;
    use std::sync::atomic::AtomicUsize;

    fn noop_handler() -> WorkerErrorHandler {
        Arc::new(|_| {})
    }

    /// Environment that refuses the first two readiness probes.
    struct SlowStartEnvironment {
        probes: Arc<AtomicUsize>,
    }

    impl WorkerEnvironment for SlowStartEnvironment {
        fn on_ready_probe(&mut self) -> bool {
            self.probes.fetch_add(1, Ordering::SeqCst) + 1 >= 3
        }

        fn create_instance(&mut self, _instance_id: u32) -> Result<(), RnError> {
            Ok(())
        }

        fn destroy_instance(&mut self, _instance_id: u32) -> Result<(), RnError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn handshake_resolves_on_third_probe_and_stops_probing() {
        let probes = Arc::new(AtomicUsize::new(0));
        let environment = SlowStartEnvironment {
            probes: Arc::clone(&probes),
        };

        let worker = WorkerThread::spawn(environment, WorkerOptions::default(), noop_handler())
            .await
            .unwrap();

        assert_eq!(probes.load(Ordering::SeqCst), 3);

        // No probe may be sent after the handshake resolved.
        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(probes.load(Ordering::SeqCst), 3);

        worker.terminate();
    }

    #[tokio::test]
    async fn handshake_times_out_when_worker_never_acks() {
        struct DeafEnvironment;
        impl WorkerEnvironment for DeafEnvironment {
            fn on_ready_probe(&mut self) -> bool {
                false
            }
            fn create_instance(&mut self, _instance_id: u32) -> Result<(), RnError> {
                Ok(())
            }
            fn destroy_instance(&mut self, _instance_id: u32) -> Result<(), RnError> {
                Ok(())
            }
        }

        let options = WorkerOptions {
            handshake_timeout: Some(Duration::from_millis(250)),
        };
        let result = WorkerThread::spawn(DeafEnvironment, options, noop_handler()).await;
        assert!(matches!(result, Err(WorkerError::HandshakeTimedOut)));
    }

    #[tokio::test]
    async fn create_instance_exchange_correlates_by_id() {
        let worker = WorkerThread::spawn(
            NullWorkerEnvironment,
            WorkerOptions::default(),
            noop_handler(),
        )
        .await
        .unwrap();

        let ack = worker
            .post_and_wait(
                WorkerMessage::CreateInstance { instance_id: 42 },
                MessageKind::InstanceCreated,
                |m| matches!(m, WorkerMessage::InstanceCreated { instance_id } if *instance_id == 42),
            )
            .await
            .unwrap();
        assert!(matches!(ack, WorkerMessage::InstanceCreated { instance_id: 42 }));

        worker.terminate();
    }

    #[tokio::test]
    async fn custom_exchange_round_trips_through_environment() {
        struct EchoEnvironment;
        impl WorkerEnvironment for EchoEnvironment {
            fn create_instance(&mut self, _instance_id: u32) -> Result<(), RnError> {
                Ok(())
            }
            fn destroy_instance(&mut self, _instance_id: u32) -> Result<(), RnError> {
                Ok(())
            }
            fn on_message(
                &mut self,
                kind: &str,
                payload: serde_json::Value,
            ) -> Option<WorkerMessage> {
                (kind == "echo").then(|| WorkerMessage::Custom {
                    kind: "echo-ack".into(),
                    payload,
                })
            }
        }

        let worker =
            WorkerThread::spawn(EchoEnvironment, WorkerOptions::default(), noop_handler())
                .await
                .unwrap();

        let reply = worker
            .post_and_wait(
                WorkerMessage::Custom {
                    kind: "echo".into(),
                    payload: serde_json::json!({ "n": 1 }),
                },
                MessageKind::Custom,
                |m| matches!(m, WorkerMessage::Custom { kind, .. } if kind == "echo-ack"),
            )
            .await
            .unwrap();
        assert!(matches!(reply, WorkerMessage::Custom { .. }));

        worker.terminate();
    }

    #[tokio::test]
    async fn worker_faults_reach_the_error_handler() {
        struct FailingEnvironment;
        impl WorkerEnvironment for FailingEnvironment {
            fn create_instance(&mut self, instance_id: u32) -> Result<(), RnError> {
                Err(RnError::new(format!(
                    "worker refused instance {instance_id}"
                )))
            }
            fn destroy_instance(&mut self, _instance_id: u32) -> Result<(), RnError> {
                Ok(())
            }
        }

        let faults = Arc::new(AtomicUsize::new(0));
        let faults_seen = Arc::clone(&faults);
        let handler: WorkerErrorHandler = Arc::new(move |error| {
            assert!(error.message.contains("refused instance 7"));
            faults_seen.fetch_add(1, Ordering::SeqCst);
        });

        let worker = WorkerThread::spawn(FailingEnvironment, WorkerOptions::default(), handler)
            .await
            .unwrap();

        // The ack still arrives so the caller is not wedged.
        worker
            .post_and_wait(
                WorkerMessage::CreateInstance { instance_id: 7 },
                MessageKind::InstanceCreated,
                |m| matches!(m, WorkerMessage::InstanceCreated { instance_id } if *instance_id == 7),
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(faults.load(Ordering::SeqCst), 1);

        worker.terminate();
    }
}
