use anyhow::Result;
use arc_swap::ArcSwap;
use chrono::Utc;
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf,
};
use tokio::sync::mpsc;

use crate::commands::{Query, Reading};
use crate::device::{LinkStatus, WorkerEvent, WorkerRequest};
use crate::error::{DeviceError, DeviceResult};

/// Owns the session with the receiver. Requests are serviced one at a time
/// in arrival order.
pub struct ReceiverWorker<S> {
    pub reader: BufReader<ReadHalf<S>>,
    pub writer: WriteHalf<S>,
    pub request_rx: mpsc::UnboundedReceiver<WorkerRequest>,
    pub event_tx: mpsc::UnboundedSender<WorkerEvent>,
    pub status: Arc<ArcSwap<LinkStatus>>,
}

pub async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> DeviceResult<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

impl<S: AsyncRead + AsyncWrite + Send + 'static> ReceiverWorker<S> {
    pub fn new(
        stream: S,
        request_rx: mpsc::UnboundedReceiver<WorkerRequest>,
        event_tx: mpsc::UnboundedSender<WorkerEvent>,
        status: Arc<ArcSwap<LinkStatus>>,
    ) -> Self {
        let (read, writer) = tokio::io::split(stream);
        Self {
            reader: BufReader::new(read),
            writer,
            request_rx,
            event_tx,
            status,
        }
    }

    async fn handle_request(&mut self, request: WorkerRequest) -> DeviceResult<ControlFlow<()>> {
        match request {
            WorkerRequest::Command(command) => {
                let line = command.to_scpi();
                tracing::info!("Sending '{}'", line);
                write_line(&mut self.writer, &line).await?;
                self.record_command(line);
            }
            WorkerRequest::Query(query, reply) => match self.query(query).await {
                Ok(reading) => {
                    // The panel may be gone already
                    let _ = reply.send(Ok(reading));
                }
                Err(e) if e.is_connection() => {
                    let _ = reply.send(Err(DeviceError::Closed));
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!("Query '{}' failed: {}", query.to_scpi(), e);
                    let _ = reply.send(Err(e));
                }
            },
            WorkerRequest::Exit => {
                tracing::info!("Exiting receiver worker");
                return Ok(ControlFlow::Break(()));
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    async fn query(&mut self, query: Query) -> DeviceResult<Reading> {
        write_line(&mut self.writer, query.to_scpi()).await?;
        let mut response = String::new();
        let read = self.reader.read_line(&mut response).await?;
        if read == 0 {
            return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
        }
        tracing::debug!("'{}' -> '{}'", query.to_scpi(), response.trim_end());
        query.parse(&response)
    }

    fn record_command(&self, line: String) {
        let status = self.status.load();
        self.status.store(Arc::new(LinkStatus {
            address: status.address.clone(),
            connected: true,
            commands_sent: status.commands_sent + 1,
            last_command: Some(line),
            last_update: Utc::now(),
        }));
    }

    fn set_disconnected(&self) {
        let status = self.status.load();
        self.status.store(Arc::new(LinkStatus {
            address: status.address.clone(),
            connected: false,
            commands_sent: status.commands_sent,
            last_command: status.last_command.clone(),
            last_update: Utc::now(),
        }));
    }

    fn set_lost_connection(&self, error: &DeviceError) {
        let address = self.status.load().address.clone();
        tracing::error!("Lost connection to {}: {}", address, error);
        self.set_disconnected();
        // Nobody listening means the window is already closing
        let _ = self.event_tx.send(WorkerEvent::Failed(format!(
            "Lost connection to {}: {}",
            address, error
        )));
    }

    pub async fn run(mut self) -> Result<()> {
        tracing::info!("Receiver worker started");

        while let Some(request) = self.request_rx.recv().await {
            match self.handle_request(request).await {
                Ok(ControlFlow::Continue(())) => {}
                Ok(ControlFlow::Break(())) => break,
                Err(e) => {
                    self.set_lost_connection(&e);
                    return Err(e.into());
                }
            }
        }

        self.set_disconnected();
        tracing::info!("Receiver worker stopped");
        Ok(())
    }
}
