use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use tokio::sync::watch;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::db::Database;
use crate::decode::{Decoder, FrameError, FrameSource};
use crate::models::ScanSessionStatus;

use super::debounce::DebounceGate;
use super::pipeline::{process_detection, ScanOutcome};
use super::status::{StatusBoard, StatusLine};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Acquisition cadence. ~15 Hz matches a typical preview stream.
    pub tick_interval: Duration,
    /// Bound on one acquisition + decode + commit pass; an overrun counts
    /// as a dropped frame, not a fatal error.
    pub frame_timeout: Duration,
    pub cooldown: chrono::Duration,
    pub display_window: chrono::Duration,
    /// Consecutive transient failures tolerated before the session is
    /// declared dead.
    pub max_consecutive_failures: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(66),
            frame_timeout: Duration::from_secs(2),
            cooldown: chrono::Duration::seconds(3),
            display_window: chrono::Duration::seconds(3),
            max_consecutive_failures: 5,
        }
    }
}

#[derive(Default)]
struct Tally {
    frames: u64,
    detections: u64,
    marked: u64,
}

enum TickStatus {
    Processed,
    NoFrame,
    SourceGone,
}

/// One scanning session: acquire a frame per tick, decode it, route every
/// detection through resolve → gate → commit, and keep the operator status
/// line current. Runs until cancelled or until acquisition gives out.
pub async fn scan_loop(
    session_id: String,
    db: Database,
    source: Box<dyn FrameSource>,
    decoder: Box<dyn Decoder>,
    config: ScanConfig,
    status_tx: watch::Sender<StatusLine>,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(config.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let source = Arc::new(Mutex::new(source));
    let decoder = Arc::new(Mutex::new(decoder));
    let mut gate = DebounceGate::new(config.cooldown);
    let mut board = StatusBoard::new(status_tx, config.display_window);
    let mut tally = Tally::default();
    let mut consecutive_failures: u32 = 0;

    let end_status = loop {
        tokio::select! {
            _ = ticker.tick() => {
                board.tick(Utc::now());

                let fut = process_tick(&db, &source, &decoder, &mut gate, &mut board, &mut tally);
                match tokio::time::timeout(config.frame_timeout, fut).await {
                    Ok(Ok(TickStatus::Processed)) | Ok(Ok(TickStatus::NoFrame)) => {
                        consecutive_failures = 0;
                    }
                    Ok(Ok(TickStatus::SourceGone)) => {
                        log_error!("frame source unavailable, ending session {}", session_id);
                        break ScanSessionStatus::Failed;
                    }
                    Ok(Err(err)) => {
                        consecutive_failures += 1;
                        log_warn!(
                            "frame pass failed ({}/{}) for session {}: {err:?}",
                            consecutive_failures, config.max_consecutive_failures, session_id
                        );
                        if consecutive_failures >= config.max_consecutive_failures {
                            log_error!("retry budget exhausted, ending session {}", session_id);
                            break ScanSessionStatus::Failed;
                        }
                    }
                    Err(_) => {
                        consecutive_failures += 1;
                        log_warn!(
                            "frame dropped after {:?} timeout ({}/{}) for session {}",
                            config.frame_timeout, consecutive_failures,
                            config.max_consecutive_failures, session_id
                        );
                        if consecutive_failures >= config.max_consecutive_failures {
                            log_error!("retry budget exhausted, ending session {}", session_id);
                            break ScanSessionStatus::Failed;
                        }
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("scan loop shutting down for session {}", session_id);
                break ScanSessionStatus::Completed;
            }
        }
    };

    if let Err(err) = db
        .finalize_scan_session(
            &session_id,
            end_status,
            tally.frames,
            tally.detections,
            tally.marked,
            Utc::now(),
        )
        .await
    {
        log_error!("failed to finalize scan session {}: {err:?}", session_id);
    }

    log_info!(
        "session {} ended {:?}: {} frames, {} detections, {} marked",
        session_id, end_status, tally.frames, tally.detections, tally.marked
    );
}

async fn process_tick(
    db: &Database,
    source: &Arc<Mutex<Box<dyn FrameSource>>>,
    decoder: &Arc<Mutex<Box<dyn Decoder>>>,
    gate: &mut DebounceGate,
    board: &mut StatusBoard,
    tally: &mut Tally,
) -> Result<TickStatus> {
    let acquired = tokio::task::spawn_blocking({
        let source = Arc::clone(source);
        move || {
            let mut source = source.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            source.next_frame()
        }
    })
    .await
    .context("frame acquisition worker join failed")?;

    let frame = match acquired {
        Ok(Some(frame)) => frame,
        Ok(None) => return Ok(TickStatus::NoFrame),
        Err(FrameError::Unavailable(err)) => {
            log_error!("acquisition failure: {err:?}");
            return Ok(TickStatus::SourceGone);
        }
        Err(FrameError::Transient(err)) => {
            return Err(err.context("frame acquisition failed"));
        }
    };

    tally.frames += 1;

    let detections = tokio::task::spawn_blocking({
        let decoder = Arc::clone(decoder);
        move || {
            let mut decoder = decoder.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            decoder.decode(&frame)
        }
    })
    .await
    .context("decode worker join failed")?
    .context("frame decode failed")?;

    if detections.is_empty() {
        return Ok(TickStatus::Processed);
    }

    // All codes in the frame are processed in detection order; the status
    // line keeps whichever message was published last.
    let now = Utc::now();
    let local = Local::now();
    for detection in &detections {
        let outcome =
            process_detection(db, gate, detection, now, local.date_naive(), local.time()).await?;

        tally.detections += 1;
        if matches!(outcome, ScanOutcome::Marked(_)) {
            tally.marked += 1;
        }

        log_info!(
            "outcome {} for payload '{}' at {:?}",
            outcome.label(), detection.payload, detection.bounds
        );
        board.publish(outcome.display_text(), now);
    }

    Ok(TickStatus::Processed)
}
