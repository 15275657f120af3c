use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::watch;

pub const IDLE_PROMPT: &str = "Ready to scan";

/// The single current operator message and when it was set. No history is
/// kept; consumers only ever see the latest line.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusLine {
    pub text: String,
    pub set_at: DateTime<Utc>,
}

impl StatusLine {
    pub fn idle(now: DateTime<Utc>) -> Self {
        Self {
            text: IDLE_PROMPT.to_string(),
            set_at: now,
        }
    }
}

/// Owns the operator status line for one session. Outcome messages persist
/// for a fixed display window, then the board reverts to the idle prompt on
/// a later tick regardless of further non-detecting frames.
pub struct StatusBoard {
    tx: watch::Sender<StatusLine>,
    display_window: Duration,
    showing_outcome: bool,
}

impl StatusBoard {
    pub fn new(tx: watch::Sender<StatusLine>, display_window: Duration) -> Self {
        Self {
            tx,
            display_window,
            showing_outcome: false,
        }
    }

    /// Replace the current message. With several codes in one frame this is
    /// called once per outcome in detection order, so the last one wins the
    /// display slot.
    pub fn publish(&mut self, text: String, now: DateTime<Utc>) {
        self.tx.send_replace(StatusLine { text, set_at: now });
        self.showing_outcome = true;
    }

    /// Revert to the idle prompt once the display window has elapsed.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        if !self.showing_outcome {
            return;
        }

        let set_at = self.tx.borrow().set_at;
        if now - set_at >= self.display_window {
            self.tx.send_replace(StatusLine::idle(now));
            self.showing_outcome = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).single().expect("valid timestamp")
    }

    fn board() -> (StatusBoard, watch::Receiver<StatusLine>) {
        let (tx, rx) = watch::channel(StatusLine::idle(at(0)));
        (StatusBoard::new(tx, Duration::seconds(3)), rx)
    }

    #[test]
    fn published_message_is_visible_to_the_consumer() {
        let (mut board, rx) = board();
        board.publish("Priya marked present".to_string(), at(0));
        assert_eq!(rx.borrow().text, "Priya marked present");
    }

    #[test]
    fn message_holds_until_the_window_elapses() {
        let (mut board, rx) = board();
        board.publish("Priya marked present".to_string(), at(0));

        board.tick(at(1));
        board.tick(at(2));
        assert_eq!(rx.borrow().text, "Priya marked present");

        board.tick(at(3));
        assert_eq!(rx.borrow().text, IDLE_PROMPT);
    }

    #[test]
    fn a_newer_message_restarts_the_window() {
        let (mut board, rx) = board();
        board.publish("first".to_string(), at(0));
        board.publish("second".to_string(), at(2));

        board.tick(at(4));
        assert_eq!(rx.borrow().text, "second");

        board.tick(at(5));
        assert_eq!(rx.borrow().text, IDLE_PROMPT);
    }

    #[test]
    fn idle_board_does_not_republish_on_tick() {
        let (mut board, mut rx) = board();
        rx.mark_unchanged();

        board.tick(at(10));
        assert!(!rx.has_changed().expect("channel open"));
    }
}
