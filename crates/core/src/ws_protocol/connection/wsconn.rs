use crate::correlator::Correlator;
use crate::notify::{NotifyQueue, DEFAULT_QUEUE_CAPACITY};
use crate::wsmsg::model::{SendOpts, WsFrame};
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

pub(crate) type WsConnSink =
    Box<dyn Sink<(WsFrame, SendOpts), Error = Error> + Send + Sync + Unpin>;
pub(crate) type WsConnSource = Box<dyn Stream<Item = Result<WsFrame>> + Send + Sync + Unpin>;

/// A server-pushed frame delivered through the event queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsEvent {
    /// The cmd the server pushed
    pub cmd: u32,
    /// The decoded payload
    pub payload: Vec<u8>,
}

/// A shareable connection to the IM websocket.
///
/// A single dispatcher task reads frames and routes each one by req_id:
/// a frame matching a registered request resolves that caller; anything
/// else is an event and goes onto the bounded queue. The dispatcher never
/// waits on a consumer, so a slow event reader cannot delay responses.
pub(crate) struct WsConnection {
    sink: Mutex<WsConnSink>,
    correlator: Arc<Correlator<WsFrame>>,
    events: Arc<NotifyQueue<WsEvent>>,
    closed: Arc<AtomicBool>,
    rx_thread: StdMutex<JoinSet<()>>,
}

impl WsConnection {
    pub(crate) fn new(sink: WsConnSink, mut source: WsConnSource) -> Arc<WsConnection> {
        let correlator: Arc<Correlator<WsFrame>> = Arc::new(Correlator::new());
        let events: Arc<NotifyQueue<WsEvent>> = Arc::new(NotifyQueue::new(DEFAULT_QUEUE_CAPACITY));
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
                            error!("Websocket transport error: {:?}", e);
                            break;
                        }
                        None => {
                            debug!("Websocket stream ended");
                            break;
                        }
                    };

                    let req_id = u64::from(frame.req_id);
                    if let Some(unclaimed) = correlator.set_done(req_id, frame) {
                        events.push(WsEvent {
                            cmd: unclaimed.cmd,
                            payload: unclaimed.payload,
                        });
                    }
                }
                closed.store(true, Ordering::Relaxed);
                correlator.release_all();
            });
        }

        Arc::new(WsConnection {
            sink: Mutex::new(sink),
            correlator,
            events,
            closed,
            rx_thread: StdMutex::new(rx_thread),
        })
    }

    /// Registers `req_id`, writes the frame, and waits for the reply.
    ///
    /// The two waits are independent: `send_timeout` bounds the socket
    /// write, `read_timeout` the resolution of the correlator entry. On
    /// timeout only this caller's entry is removed; the connection and any
    /// other pending work are untouched.
    pub(crate) async fn send_and_wait(
        &self,
        frame: WsFrame,
        opts: SendOpts,
        send_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<WsFrame> {
        let reply = self.correlator.register(u64::from(frame.req_id))?;
        self.send(frame, opts, send_timeout).await?;
        reply.read(read_timeout).await
    }

    /// Writes a frame without registering for a reply
    pub(crate) async fn send(
        &self,
        frame: WsFrame,
        opts: SendOpts,
        send_timeout: Duration,
    ) -> Result<()> {
        trace!("send Wait: cmd {} req_id {}", frame.cmd, frame.req_id);
        tokio::time::timeout(send_timeout, self.sink.lock().await.send((frame, opts))).await??;
        trace!("send Complete");
        Ok(())
    }

    /// The next server-pushed event
    pub(crate) async fn next_event(&self) -> WsEvent {
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
            debug!("Error closing websocket sink: {:?}", e);
        }
    }
}

impl Drop for WsConnection {
    fn drop(&mut self) {
        // Waiters must not hang on a connection nobody holds anymore
        self.correlator.release_all();
    }
}
