use anyhow::{bail, Context, Result};
use chrono::Utc;
use log::info;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::db::Database;
use crate::decode::{Decoder, FrameSource};
use crate::models::{ScanSession, ScanSessionStatus};

use super::loop_worker::{scan_loop, ScanConfig};
use super::status::StatusLine;

/// Owns one scanning session at a time: records its trace row, spawns the
/// loop, and hands the caller the status-line receiver that the rendering
/// layer consumes.
pub struct ScanController {
    db: Database,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    session_id: Option<String>,
}

impl ScanController {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            handle: None,
            cancel_token: None,
            session_id: None,
        }
    }

    pub async fn start_scan(
        &mut self,
        source: Box<dyn FrameSource>,
        decoder: Box<dyn Decoder>,
        config: ScanConfig,
    ) -> Result<watch::Receiver<StatusLine>> {
        if self.handle.is_some() {
            bail!("scan session already active");
        }

        let session_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();

        let session = ScanSession {
            id: session_id.clone(),
            started_at,
            stopped_at: None,
            status: ScanSessionStatus::Running,
            frames: 0,
            detections: 0,
            marked: 0,
            created_at: started_at,
            updated_at: started_at,
        };
        self.db.insert_scan_session(&session).await?;

        let (status_tx, status_rx) = watch::channel(StatusLine::idle(started_at));
        let cancel_token = CancellationToken::new();
        let token_clone = cancel_token.clone();

        let handle = tokio::spawn(scan_loop(
            session_id.clone(),
            self.db.clone(),
            source,
            decoder,
            config,
            status_tx,
            token_clone,
        ));

        info!("scan session {session_id} started");

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        self.session_id = Some(session_id);
        Ok(status_rx)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Token an external shutdown source (e.g. a ctrl-c handler) can use to
    /// cancel the session without holding the controller.
    pub fn stop_signal(&self) -> Option<CancellationToken> {
        self.cancel_token.clone()
    }

    /// Cancel the running loop and wait for it to finish its finalization.
    pub async fn stop_scan(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("scan loop task failed to join")?;
        }

        Ok(())
    }

    /// Wait for the loop to end on its own (acquisition failure).
    pub async fn wait(&mut self) -> Result<()> {
        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("scan loop task failed to join")?;
        }
        self.cancel_token = None;
        Ok(())
    }
}
