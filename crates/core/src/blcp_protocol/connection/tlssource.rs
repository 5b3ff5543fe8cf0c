use super::{BlcpConnSink, BlcpConnSource};
use crate::blcp::codex::BlcpCodex;
use crate::blcp::model::BlcpFrame;
use crate::{Error, Result, TransportError};
use delegate::delegate;
use futures::{
    sink::Sink,
    stream::{Stream, StreamExt},
};
use lazy_static::lazy_static;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use tokio_util::codec::{Decoder, Encoder, Framed};

lazy_static! {
    static ref TLS_CONFIG: Arc<ClientConfig> = {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let provider = Arc::new(tokio_rustls::rustls::crypto::ring::default_provider());
        let config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .expect("ring supports the default protocol versions")
            .with_root_certificates(roots)
            .with_no_client_auth();
        Arc::new(config)
    };
}

pub(crate) struct TlsSource {
    inner: Framed<TlsStream<TcpStream>, BlcpCodex>,
}

impl TlsSource {
    pub(crate) async fn new(host: &str, port: u16) -> Result<TlsSource> {
        let addr = tokio::net::lookup_host((host, port))
            .await?
            .next()
            .ok_or(Error::Transport(TransportError::AddrResolution))?;
        let stream = TcpStream::connect(addr).await?;

        let connector = TlsConnector::from(TLS_CONFIG.clone());
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|_| Error::Transport(TransportError::ServerName))?;
        let tls = connector.connect(server_name, stream).await?;

        Ok(Self {
            inner: Framed::new(tls, BlcpCodex::new()),
        })
    }

    /// Boxes the two halves for the connection seam
    pub(crate) fn split(self) -> (BlcpConnSink, BlcpConnSource) {
        let (sink, source) = StreamExt::split(self);
        (Box::new(sink), Box::new(source))
    }
}

impl Stream for TlsSource {
    type Item = std::result::Result<<BlcpCodex as Decoder>::Item, <BlcpCodex as Decoder>::Error>;

    delegate! {
        to Pin::new(&mut self.inner) {
            fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>>;
        }
    }

    delegate! {
        to self.inner {
            fn size_hint(&self) -> (usize, Option<usize>);
        }
    }
}

impl Sink<BlcpFrame> for TlsSource {
    type Error = <BlcpCodex as Encoder<BlcpFrame>>::Error;

    delegate! {
        to Pin::new(&mut self.inner) {
            fn poll_ready(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>>;
            fn start_send(mut self: Pin<&mut Self>, item: BlcpFrame) -> std::result::Result<(), Self::Error>;
            fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>>;
            fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>>;
        }
    }
}
