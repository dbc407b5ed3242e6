//! Poll loop: fetch, execute, acknowledge

use crate::client::{Ack, ClientError, ControlApi, Poll};
use crate::command::{CommandExecutor, CommandResult};
use gadget_shared::state_machine::{
    DeliveryEvent, DeliveryState, DeliveryStateMachine, TransitionResult,
};
use gadget_shared::{DeviceId, SeqToken};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// What one poll cycle achieved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing pending on the server
    Idle,
    /// Server doesn't know this device
    UnknownDevice,
    /// Batch processed and acknowledged
    Acknowledged(SeqToken),
    /// Batch processing failed; it stays queued for the next poll
    ProcessingFailed(SeqToken),
    /// Batch already handled by this agent
    AlreadyHandled(SeqToken),
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleOutcome::Idle => write!(f, "no commands pending"),
            CycleOutcome::UnknownDevice => write!(f, "device unknown to server"),
            CycleOutcome::Acknowledged(seq) => write!(f, "seq={} acknowledged", seq),
            CycleOutcome::ProcessingFailed(seq) => write!(f, "seq={} failed, will retry", seq),
            CycleOutcome::AlreadyHandled(seq) => write!(f, "seq={} already handled", seq),
        }
    }
}

/// Drives one device through the polling protocol
pub struct Poller<C> {
    device_id: DeviceId,
    api: C,
    executor: CommandExecutor,
    fsm: DeliveryStateMachine,
}

impl<C: ControlApi> Poller<C> {
    pub fn new(device_id: DeviceId, api: C, executor: CommandExecutor) -> Self {
        Self {
            device_id,
            api,
            executor,
            fsm: DeliveryStateMachine::new(),
        }
    }

    /// Current delivery state
    pub fn state(&self) -> &DeliveryState {
        self.fsm.state()
    }

    /// Run a single poll cycle
    pub async fn poll_once(&mut self) -> Result<CycleOutcome, ClientError> {
        let (seq, body) = match self.api.poll(&self.device_id).await? {
            Poll::Commands { seq, body } => (seq, body),
            Poll::NoCommands => {
                self.fsm.process_event(DeliveryEvent::NothingPending);
                return Ok(CycleOutcome::Idle);
            }
            Poll::UnknownDevice => {
                warn!("Server does not know device {}", self.device_id);
                self.fsm.process_event(DeliveryEvent::NothingPending);
                return Ok(CycleOutcome::UnknownDevice);
            }
        };

        debug!("Polled seq={} ({} bytes)", seq, body.len());

        match self.fsm.process_event(DeliveryEvent::Delivered(seq.clone())) {
            TransitionResult::Execute(seq) => match self.executor.execute(&seq, &body).await {
                CommandResult::Completed { lines } => {
                    info!("Batch seq={} completed ({} commands)", seq, lines);
                    self.acknowledge(seq).await
                }
                CommandResult::Failed { message } => {
                    warn!("Batch seq={} left queued: {}", seq, message);
                    self.fsm
                        .process_event(DeliveryEvent::ProcessingFailed(seq.clone()));
                    Ok(CycleOutcome::ProcessingFailed(seq))
                }
            },
            // Executed earlier but the acknowledgement never got through
            TransitionResult::Unchanged if *self.fsm.state() == DeliveryState::Pending(seq.clone()) => {
                info!("Retrying acknowledgement for seq={}", seq);
                self.acknowledge(seq).await
            }
            _ => Ok(CycleOutcome::AlreadyHandled(seq)),
        }
    }

    async fn acknowledge(&mut self, seq: SeqToken) -> Result<CycleOutcome, ClientError> {
        let event = match self.api.acknowledge(&self.device_id, &seq).await? {
            Ack::Acknowledged => DeliveryEvent::Acknowledged(seq.clone()),
            Ack::AlreadyAcknowledged => {
                debug!("Batch seq={} was already removed", seq);
                DeliveryEvent::AlreadyAcknowledged(seq.clone())
            }
        };
        self.fsm.process_event(event);
        info!("Acknowledged seq={}", seq);
        Ok(CycleOutcome::Acknowledged(seq))
    }

    /// Poll on a fixed interval until `shutdown` resolves.
    ///
    /// `shutdown` is polled for the whole run, including while a cycle is
    /// in flight; an interrupted cycle is dropped without acknowledging.
    pub async fn run<F>(mut self, poll_interval: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            let cycle = tokio::select! {
                _ = &mut shutdown => None,
                _ = ticker.tick() => tokio::select! {
                    result = self.poll_once() => Some(result),
                    _ = &mut shutdown => None,
                },
            };

            match cycle {
                Some(Ok(outcome)) => debug!("Poll: {}", outcome),
                Some(Err(e)) => error!("Poll failed: {}", e),
                None => break,
            }
        }

        info!("Shutting down agent for {}", self.device_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::sync::Notify;
    use tokio::time::{sleep, timeout};

    /// Server stand-in with the same queue semantics
    #[derive(Default)]
    struct FakeServer {
        pointer: Mutex<Option<String>>,
        batches: Mutex<HashMap<String, Vec<u8>>>,
        failing_acks: AtomicUsize,
        acks_sent: AtomicUsize,
    }

    impl FakeServer {
        fn publish(&self, seq: &str, body: &str) {
            *self.pointer.lock().unwrap() = Some(seq.to_string());
            self.batches
                .lock()
                .unwrap()
                .insert(seq.to_string(), body.as_bytes().to_vec());
        }
    }

    #[async_trait]
    impl ControlApi for Arc<FakeServer> {
        async fn poll(&self, _device: &DeviceId) -> Result<Poll, ClientError> {
            let Some(seq) = self.pointer.lock().unwrap().clone() else {
                return Ok(Poll::UnknownDevice);
            };
            Ok(match self.batches.lock().unwrap().get(&seq) {
                Some(body) => Poll::Commands {
                    seq: SeqToken::new(seq)?,
                    body: body.clone(),
                },
                None => Poll::NoCommands,
            })
        }

        async fn acknowledge(&self, _device: &DeviceId, seq: &SeqToken) -> Result<Ack, ClientError> {
            self.acks_sent.fetch_add(1, Ordering::SeqCst);
            if self
                .failing_acks
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(ClientError::UnexpectedStatus {
                    status: 503,
                    body: "unavailable".into(),
                });
            }
            Ok(match self.batches.lock().unwrap().remove(seq.as_str()) {
                Some(_) => Ack::Acknowledged,
                None => Ack::AlreadyAcknowledged,
            })
        }
    }

    fn poller(server: &Arc<FakeServer>, program: Option<&str>) -> Poller<Arc<FakeServer>> {
        let device = DeviceId::new("sensor1").unwrap();
        let executor = CommandExecutor::new(device.clone(), program.map(PathBuf::from));
        Poller::new(device, Arc::clone(server), executor)
    }

    fn tok(s: &str) -> SeqToken {
        SeqToken::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_device() {
        let server = Arc::new(FakeServer::default());
        let mut poller = poller(&server, None);

        assert_eq!(poller.poll_once().await.unwrap(), CycleOutcome::UnknownDevice);
    }

    #[tokio::test]
    async fn test_unknown_device_clears_pending_batch() {
        let server = Arc::new(FakeServer::default());
        server.publish("7", "REBOOT\n");
        server.failing_acks.store(1, Ordering::SeqCst);
        let mut poller = poller(&server, None);

        assert!(poller.poll_once().await.is_err());
        assert_eq!(poller.state(), &DeliveryState::Pending(tok("7")));

        // Pointer record removed on the server
        *server.pointer.lock().unwrap() = None;
        assert_eq!(poller.poll_once().await.unwrap(), CycleOutcome::UnknownDevice);
        assert_eq!(poller.state(), &DeliveryState::NoCommands);

        // Re-publishing the same token runs it again
        *server.pointer.lock().unwrap() = Some("7".into());
        assert_eq!(
            poller.poll_once().await.unwrap(),
            CycleOutcome::Acknowledged(tok("7"))
        );
        assert_eq!(server.acks_sent.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_execute_and_acknowledge() {
        let server = Arc::new(FakeServer::default());
        server.publish("7", "REBOOT\n");
        let mut poller = poller(&server, None);

        assert_eq!(
            poller.poll_once().await.unwrap(),
            CycleOutcome::Acknowledged(tok("7"))
        );
        assert!(server.batches.lock().unwrap().is_empty());
        assert_eq!(poller.state(), &DeliveryState::Acknowledged(tok("7")));

        assert_eq!(poller.poll_once().await.unwrap(), CycleOutcome::Idle);
        assert_eq!(server.acks_sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_new_batch_after_acknowledge() {
        let server = Arc::new(FakeServer::default());
        server.publish("7", "REBOOT\n");
        let mut poller = poller(&server, None);
        poller.poll_once().await.unwrap();

        server.publish("8", "FEED\n");
        assert_eq!(
            poller.poll_once().await.unwrap(),
            CycleOutcome::Acknowledged(tok("8"))
        );
    }

    #[tokio::test]
    async fn test_failed_acknowledge_is_retried_without_reexecuting() {
        let server = Arc::new(FakeServer::default());
        server.publish("7", "REBOOT\n");
        server.failing_acks.store(1, Ordering::SeqCst);
        let mut poller = poller(&server, None);

        assert!(poller.poll_once().await.is_err());
        assert_eq!(poller.state(), &DeliveryState::Pending(tok("7")));

        assert_eq!(
            poller.poll_once().await.unwrap(),
            CycleOutcome::Acknowledged(tok("7"))
        );
        assert_eq!(server.acks_sent.load(Ordering::SeqCst), 2);
        assert!(server.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_processing_keeps_batch_queued() {
        let server = Arc::new(FakeServer::default());
        server.publish("7", "REBOOT\n");
        let mut poller = poller(&server, Some("/nonexistent/gadget-handler"));

        assert_eq!(
            poller.poll_once().await.unwrap(),
            CycleOutcome::ProcessingFailed(tok("7"))
        );
        assert_eq!(server.acks_sent.load(Ordering::SeqCst), 0);
        assert_eq!(server.batches.lock().unwrap().len(), 1);
        assert_eq!(poller.state(), &DeliveryState::NoCommands);
    }

    /// Server whose poll never answers
    #[derive(Default)]
    struct StalledServer {
        polls: AtomicUsize,
        poll_started: Notify,
    }

    #[async_trait]
    impl ControlApi for Arc<StalledServer> {
        async fn poll(&self, _device: &DeviceId) -> Result<Poll, ClientError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            self.poll_started.notify_one();
            std::future::pending().await
        }

        async fn acknowledge(&self, _device: &DeviceId, _seq: &SeqToken) -> Result<Ack, ClientError> {
            std::future::pending().await
        }
    }

    fn stalled_poller(server: &Arc<StalledServer>) -> Poller<Arc<StalledServer>> {
        let device = DeviceId::new("sensor1").unwrap();
        let executor = CommandExecutor::new(device.clone(), None);
        Poller::new(device, Arc::clone(server), executor)
    }

    #[tokio::test]
    async fn test_run_stops_during_in_flight_poll() {
        let server = Arc::new(StalledServer::default());
        let poller = stalled_poller(&server);

        let watcher = Arc::clone(&server);
        let shutdown = async move { watcher.poll_started.notified().await };

        timeout(
            Duration::from_secs(5),
            poller.run(Duration::from_millis(10), shutdown),
        )
        .await
        .expect("run did not stop while a poll was in flight");
        assert_eq!(server.polls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_stops_when_shutdown_already_resolved() {
        let server = Arc::new(FakeServer::default());
        let poller = poller(&server, None);

        timeout(
            Duration::from_secs(5),
            poller.run(Duration::from_secs(3600), std::future::ready(())),
        )
        .await
        .expect("run did not stop");
    }

    #[tokio::test]
    async fn test_run_keeps_polling_until_shutdown() {
        let server = Arc::new(FakeServer::default());
        server.publish("7", "REBOOT\n");
        let poller = poller(&server, None);

        timeout(
            Duration::from_secs(5),
            poller.run(Duration::from_millis(10), sleep(Duration::from_millis(100))),
        )
        .await
        .expect("run did not stop");
        assert!(server.batches.lock().unwrap().is_empty());
        assert_eq!(server.acks_sent.load(Ordering::SeqCst), 1);
    }
}
