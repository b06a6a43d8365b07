use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Semaphore, mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use txexec_events::{CommandHandlingResult, Envelope, MessageBus, Outbox};

use super::Consumer;

#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// Name for logging.
    pub name: &'static str,
    /// Messages handled concurrently.
    pub max_in_flight: usize,
    /// Redelivery delay after an unexpected event.
    pub unexpected_event_delay: Duration,
    /// Redelivery delay after any other failure.
    pub default_failure_delay: Duration,
}

/// Worker runtime statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkerStats {
    /// Deliveries handled to completion.
    pub processed: u64,
    /// Deliveries scheduled for redelivery.
    pub retried: u64,
    /// Deliveries rejected by a state table.
    pub defects: u64,
}

#[derive(Debug, Default)]
struct Counters {
    processed: AtomicU64,
    retried: AtomicU64,
    defects: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> WorkerStats {
        WorkerStats {
            processed: self.processed.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            defects: self.defects.load(Ordering::Relaxed),
        }
    }
}

/// Handle to control a running worker.
#[derive(Debug)]
pub struct WorkerHandle {
    name: &'static str,
    shutdown: oneshot::Sender<()>,
    join: JoinHandle<()>,
    counters: Arc<Counters>,
}

impl WorkerHandle {
    pub fn stats(&self) -> WorkerStats {
        self.counters.snapshot()
    }

    /// Stop taking new deliveries and wait for in-flight ones to finish.
    /// Pending redeliveries are dropped.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(err) = self.join.await {
            warn!(worker = self.name, error = %err, "worker task ended abnormally");
        }
    }
}

/// Item of the private retry queue.
enum Retry<In, Out> {
    /// Run the consumer again.
    Deliver(Envelope<In>),
    /// Handling succeeded; only the unpublished messages are left.
    Publish(Produced<In, Out>),
}

/// Messages produced by a successful handling, not yet published.
struct Produced<In, Out> {
    source: Envelope<In>,
    messages: VecDeque<Envelope<Out>>,
    result: CommandHandlingResult,
}

struct Context<C: Consumer, O> {
    consumer: Arc<C>,
    outbound: O,
    retries: mpsc::UnboundedSender<Retry<C::In, C::Out>>,
    options: WorkerOptions,
    counters: Arc<Counters>,
}

/// Consumes one bus and publishes the produced messages to another.
///
/// - Every delivery runs in its own task, bounded by `max_in_flight`
/// - Produced messages are published only when handling returned `Ok`
/// - A failed publish retries the remaining produced messages; the handling
///   is not run again
/// - Retries go through a private queue after the requested delay, so other
///   subscribers of the inbound bus never see a redelivery
#[derive(Debug)]
pub struct MessageWorker;

impl MessageWorker {
    /// Spawn a worker on the current tokio runtime.
    ///
    /// The inbound subscription is taken before this returns: messages
    /// published afterwards are not missed.
    pub fn spawn<C, I, O>(
        consumer: Arc<C>,
        inbound: &I,
        outbound: O,
        options: WorkerOptions,
    ) -> WorkerHandle
    where
        C: Consumer,
        I: MessageBus<Envelope<C::In>> + ?Sized,
        O: MessageBus<Envelope<C::Out>> + 'static,
    {
        let mut subscription = inbound.subscribe();
        let (retry_tx, mut retry_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let counters = Arc::new(Counters::default());
        let name = options.name;
        let semaphore = Arc::new(Semaphore::new(options.max_in_flight.max(1)));

        let context = Arc::new(Context {
            consumer,
            outbound,
            retries: retry_tx,
            options,
            counters: counters.clone(),
        });

        let join = tokio::spawn(async move {
            info!(worker = name, "worker started");
            let mut in_flight = JoinSet::new();

            loop {
                let work = tokio::select! {
                    _ = &mut shutdown_rx => break,
                    Some(_) = in_flight.join_next(), if !in_flight.is_empty() => continue,
                    Some(work) = retry_rx.recv() => work,
                    next = subscription.recv() => match next {
                        Some(envelope) => Retry::Deliver(envelope),
                        None => break,
                    },
                };

                let Ok(permit) = semaphore.clone().acquire_owned().await else {
                    break;
                };
                let context = context.clone();
                in_flight.spawn(async move {
                    match work {
                        Retry::Deliver(envelope) => context.deliver(envelope).await,
                        Retry::Publish(produced) => context.publish(produced),
                    }
                    drop(permit);
                });
            }

            while in_flight.join_next().await.is_some() {}
            info!(worker = name, "worker stopped");
        });

        WorkerHandle {
            name,
            shutdown: shutdown_tx,
            join,
            counters,
        }
    }
}

impl<C, O> Context<C, O>
where
    C: Consumer,
    O: MessageBus<Envelope<C::Out>> + 'static,
{
    async fn deliver(&self, envelope: Envelope<C::In>) {
        let message_type = C::message_type(envelope.payload());
        let mut outbox = Outbox::new();

        match self.consumer.consume(envelope.payload(), &mut outbox).await {
            Ok(result) => {
                let correlation_id = envelope.correlation_id();
                let messages = outbox
                    .into_messages()
                    .into_iter()
                    .map(|message| Envelope::new(correlation_id, message))
                    .collect();
                self.publish(Produced {
                    source: envelope,
                    messages,
                    result,
                });
            }
            Err(err) if err.is_defect() => {
                error!(
                    worker = self.options.name,
                    message_type,
                    correlation_id = %envelope.correlation_id(),
                    attempt = envelope.attempt(),
                    error = %err,
                    "unexpected event"
                );
                self.counters.defects.fetch_add(1, Ordering::Relaxed);
                self.redeliver(envelope, self.options.unexpected_event_delay);
            }
            Err(err) => {
                warn!(
                    worker = self.options.name,
                    message_type,
                    correlation_id = %envelope.correlation_id(),
                    attempt = envelope.attempt(),
                    error = %err,
                    "message handling failed"
                );
                self.redeliver(envelope, self.options.default_failure_delay);
            }
        }
    }

    /// Publish in order; on failure keep the rest for a later attempt.
    fn publish(&self, mut produced: Produced<C::In, C::Out>) {
        while let Some(message) = produced.messages.front() {
            if let Err(err) = self.outbound.publish(message.clone()) {
                warn!(
                    worker = self.options.name,
                    correlation_id = %produced.source.correlation_id(),
                    unpublished = produced.messages.len(),
                    error = ?err,
                    "failed to publish produced messages"
                );
                self.schedule(Retry::Publish(produced), self.options.default_failure_delay);
                return;
            }
            produced.messages.pop_front();
        }

        match produced.result {
            CommandHandlingResult::Handled => {
                self.counters.processed.fetch_add(1, Ordering::Relaxed);
            }
            CommandHandlingResult::RetryAfter(delay) => {
                let source = produced.source;
                debug!(
                    worker = self.options.name,
                    message_type = C::message_type(source.payload()),
                    correlation_id = %source.correlation_id(),
                    attempt = source.attempt(),
                    ?delay,
                    "redelivery requested"
                );
                self.redeliver(source, delay);
            }
        }
    }

    fn redeliver(&self, envelope: Envelope<C::In>, delay: Duration) {
        self.schedule(Retry::Deliver(envelope.redelivery()), delay);
    }

    fn schedule(&self, work: Retry<C::In, C::Out>, delay: Duration) {
        self.counters.retried.fetch_add(1, Ordering::Relaxed);
        let retries = self.retries.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The worker may be gone by now; nothing to do then.
            let _ = retries.send(work);
        });
    }
}
