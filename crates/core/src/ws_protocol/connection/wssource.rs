use crate::crypto::ecb::WsCipher;
use crate::wsmsg::codex::WsCodex;
use crate::wsmsg::model::{SendOpts, WsFrame};
use crate::{Error, Result};
use futures::{Sink, Stream, StreamExt};
use log::*;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use super::{WsConnSink, WsConnSource};

/// Adapts a websocket into a frame-level Sink/Stream pair.
///
/// The websocket already delivers whole messages, so this is a straight
/// per-message mapping through the codex. A frame that fails to decode is
/// logged and dropped right here; per-frame problems never surface to the
/// dispatcher, let alone terminate it.
pub(crate) struct WsSource<S> {
    inner: WebSocketStream<S>,
    codex: WsCodex,
}

impl<S> WsSource<S>
where
    S: AsyncRead + AsyncWrite + Send + Sync + Unpin + 'static,
{
    pub(crate) fn new(inner: WebSocketStream<S>, cipher: Arc<WsCipher>) -> Self {
        Self {
            inner,
            codex: WsCodex::new(cipher),
        }
    }

    /// Boxes the two halves for the connection seam
    pub(crate) fn split(self) -> (WsConnSink, WsConnSource) {
        let (sink, source) = StreamExt::split(self);
        (Box::new(sink), Box::new(source))
    }
}

impl<S> Stream for WsSource<S>
where
    S: AsyncRead + AsyncWrite + Send + Sync + Unpin + 'static,
{
    type Item = Result<WsFrame>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            let message = match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Ready(Some(Err(e))) => return Poll::Ready(Some(Err(e.into()))),
                Poll::Ready(Some(Ok(message))) => message,
            };
            match message {
                Message::Binary(buf) => match self.codex.decode(&buf) {
                    Ok(frame) => return Poll::Ready(Some(Ok(frame))),
                    Err(e) => {
                        error!("Dropping undecodable frame: {:?}", e);
                        continue;
                    }
                },
                // The stream yields None on its own after a close frame
                Message::Close(_) => continue,
                other => {
                    trace!("Ignoring non-binary message: {:?}", other);
                    continue;
                }
            }
        }
    }
}

impl<S> Sink<(WsFrame, SendOpts)> for WsSource<S>
where
    S: AsyncRead + AsyncWrite + Send + Sync + Unpin + 'static,
{
    type Error = Error;

    fn poll_ready(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<()>> {
        Pin::new(&mut self.inner)
            .poll_ready(cx)
            .map(|ready| ready.map_err(Error::from))
    }

    fn start_send(mut self: Pin<&mut Self>, item: (WsFrame, SendOpts)) -> Result<()> {
        let (frame, opts) = item;
        let buf = self.codex.encode(&frame, opts)?;
        Pin::new(&mut self.inner)
            .start_send(Message::Binary(buf))
            .map_err(Error::from)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<()>> {
        Pin::new(&mut self.inner)
            .poll_flush(cx)
            .map(|flushed| flushed.map_err(Error::from))
    }

    fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<()>> {
        Pin::new(&mut self.inner)
            .poll_close(cx)
            .map(|closed| closed.map_err(Error::from))
    }
}
