use crate::blcp::model::BlcpFrame;
use crate::blcp::proto::RpcMeta;
use crate::correlator::Correlator;
use crate::notify::{NotifyQueue, DEFAULT_QUEUE_CAPACITY};
use crate::{Error, Result};
use futures::sink::{Sink, SinkExt};
use futures::stream::{Stream, StreamExt};
use log::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinSet;

pub(crate) type BlcpConnSink = Box<dyn Sink<BlcpFrame, Error = Error> + Send + Sync + Unpin>;
pub(crate) type BlcpConnSource = Box<dyn Stream<Item = Result<BlcpFrame>> + Send + Sync + Unpin>;

/// A server-pushed frame delivered through the event queue, e.g. a chatroom
/// message
#[derive(Debug, Clone, PartialEq)]
pub struct BlcpEvent {
    /// The push's RPC metadata
    pub meta: RpcMeta,
    /// The raw body; decode per [`crate::blcp::body`]
    pub body: Vec<u8>,
}

/// A shareable BLCP connection.
///
/// One dispatcher task reads frames and routes each by its metadata: a
/// notify frame (other than a heartbeat acknowledgment) goes onto the
/// bounded event queue, anything else resolves the correlator entry with
/// the matching correlation id. The dispatcher routes each frame and
/// immediately resumes reading; it never waits on a consumer.
pub(crate) struct BlcpConnection {
    sink: Mutex<BlcpConnSink>,
    correlator: Arc<Correlator<BlcpFrame>>,
    events: Arc<NotifyQueue<BlcpEvent>>,
    closed: Arc<AtomicBool>,
    rx_thread: StdMutex<JoinSet<()>>,
}

impl BlcpConnection {
    pub(crate) fn new(sink: BlcpConnSink, mut source: BlcpConnSource) -> Arc<BlcpConnection> {
        let correlator: Arc<Correlator<BlcpFrame>> = Arc::new(Correlator::new());
        let events: Arc<NotifyQueue<BlcpEvent>> =
            Arc::new(NotifyQueue::new(DEFAULT_QUEUE_CAPACITY));
        let closed = Arc::new(AtomicBool::new(false));

        let mut rx_thread = JoinSet::new();
        {
            let correlator = correlator.clone();
            let events = events.clone();
            let closed = closed.clone();
            rx_thread.spawn(async move {
                loop {
                    let frame = match source.next().await {
                        Some(Ok(frame)) => frame,
                        Some(Err(e)) => {
                            error!("BLCP transport error: {:?}", e);
                            break;
                        }
                        None => {
                            debug!("BLCP stream ended");
                            break;
                        }
                    };
                    Self::dispatch(frame, &correlator, &events);
                }
                closed.store(true, Ordering::Relaxed);
                correlator.release_all();
            });
        }

        Arc::new(BlcpConnection {
            sink: Mutex::new(sink),
            correlator,
            events,
            closed,
            rx_thread: StdMutex::new(rx_thread),
        })
    }

    fn dispatch(
        frame: BlcpFrame,
        correlator: &Correlator<BlcpFrame>,
        events: &NotifyQueue<BlcpEvent>,
    ) {
        if frame.is_notify() {
            if frame.is_heartbeat_ack() {
                trace!("Heartbeat acknowledged");
            } else {
                events.push(BlcpEvent {
                    meta: frame.meta,
                    body: frame.body,
                });
            }
        } else {
            let correlation_id = frame.correlation_id();
            if correlator.set_done(correlation_id, frame).is_some() {
                debug!(
                    "Ignoring response with no pending request (correlation id {})",
                    correlation_id
                );
            }
        }
    }

    /// Registers the frame's correlation id, writes it, and waits for the
    /// reply. Send and read timeouts are independent; on timeout only this
    /// caller's entry is cancelled.
    pub(crate) async fn send_and_wait(
        &self,
        frame: BlcpFrame,
        send_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<BlcpFrame> {
        let reply = self.correlator.register(frame.correlation_id())?;
        self.send(frame, send_timeout).await?;
        reply.read(read_timeout).await
    }

    /// Writes a frame without waiting for any response; heartbeats use this
    pub(crate) async fn send(&self, frame: BlcpFrame, send_timeout: Duration) -> Result<()> {
        trace!(
            "send Wait: correlation id {}",
            frame.correlation_id()
        );
        tokio::time::timeout(send_timeout, self.sink.lock().await.send(frame)).await??;
        trace!("send Complete");
        Ok(())
    }

    /// The next server-pushed event
    pub(crate) async fn next_event(&self) -> BlcpEvent {
        self.events.recv().await
    }

    /// Whether the dispatcher is still reading the socket
    pub(crate) fn is_alive(&self) -> bool {
        !self.closed.load(Ordering::Relaxed)
    }

    /// Stops the dispatcher, closes the socket and releases every pending
    /// request with a cancellation error
    pub(crate) async fn shutdown(&self) {
        self.closed.store(true, Ordering::Relaxed);
        self.rx_thread.lock().unwrap().abort_all();
        self.correlator.release_all();
        if let Err(e) = self.sink.lock().await.close().await {
            debug!("Error closing BLCP sink: {:?}", e);
        }
    }
}

impl Drop for BlcpConnection {
    fn drop(&mut self) {
        self.correlator.release_all();
    }
}
