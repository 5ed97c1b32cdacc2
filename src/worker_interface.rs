use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};

use crate::commands::{DeviceCommand, Query, Reading};
use crate::device::{resolve_address, LinkStatus, WorkerEvent, WorkerRequest};
use crate::device_worker::{write_line, ReceiverWorker};
use crate::error::{DeviceError, DeviceResult};

/// Handle to a connected receiver. The session itself lives in a
/// [`ReceiverWorker`] task; this side only queues requests.
pub struct ReceiverLink {
    pub address: String,
    pub status: Arc<ArcSwap<LinkStatus>>,
    request_tx: mpsc::UnboundedSender<WorkerRequest>,
    event_rx: mpsc::UnboundedReceiver<WorkerEvent>,
}

impl ReceiverLink {
    /// Open a session over TCP, optionally resetting the receiver before
    /// handing it out.
    pub async fn connect(address: &str, default_port: u16, reset: bool) -> DeviceResult<Self> {
        let target = resolve_address(address, default_port)?;
        tracing::info!("Connecting to receiver at {}", target);
        let stream = TcpStream::connect(&target).await?;
        stream.set_nodelay(true)?;
        Self::attach(stream, target, reset).await
    }

    pub async fn attach<S>(mut stream: S, address: String, reset: bool) -> DeviceResult<Self>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        if reset {
            tracing::info!("Resetting receiver at {}", address);
            write_line(&mut stream, &DeviceCommand::Reset.to_scpi()).await?;
        }

        let status = Arc::new(ArcSwap::new(Arc::new(LinkStatus::new(address.clone()))));
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let worker = ReceiverWorker::new(stream, request_rx, event_tx, status.clone());
        tokio::spawn(async move {
            if let Err(e) = worker.run().await {
                tracing::error!("Worker error: {}", e);
            }
        });

        tracing::info!("Connected to receiver at {}", address);
        Ok(Self {
            address,
            status,
            request_tx,
            event_rx,
        })
    }

    /// Queue a write. Does not wait for the device.
    pub fn send(&self, command: DeviceCommand) -> DeviceResult<()> {
        self.request_tx
            .send(WorkerRequest::Command(command))
            .map_err(|_| DeviceError::Closed)
    }

    pub fn query(&self, query: Query) -> DeviceResult<oneshot::Receiver<DeviceResult<Reading>>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request_tx
            .send(WorkerRequest::Query(query, reply_tx))
            .map_err(|_| DeviceError::Closed)?;
        Ok(reply_rx)
    }

    pub fn is_connected(&self) -> bool {
        self.status.load().connected
    }

    pub fn poll_event(&mut self) -> Option<WorkerEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn close(self) {
        tracing::info!("Closing receiver link to {}", self.address);
        // Already gone if the worker failed
        let _ = self.request_tx.send(WorkerRequest::Exit);
    }
}
