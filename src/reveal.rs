//! Character-by-character reveal of canned assistant messages (the initial
//! greeting and the fixed error apologies), played through the same
//! transcript mechanics as live streaming.

use crate::transcript::ChatEvent;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const CHAR_DELAY: Duration = Duration::from_millis(30);

/// Spawns the reveal task. It opens the target entry, emits one character
/// per tick, then finalizes the entry. If the receiver is gone the task
/// simply ends.
pub fn spawn_reveal(
    sender: mpsc::UnboundedSender<ChatEvent>,
    text: &'static str,
    drop_status: bool,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if sender.send(ChatEvent::RevealBegin { drop_status }).is_err() {
            return;
        }
        for ch in text.chars() {
            tokio::time::sleep(CHAR_DELAY).await;
            if sender.send(ChatEvent::RevealChar(ch)).is_err() {
                return;
            }
        }
        let _ = sender.send(ChatEvent::RevealEnd);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn reveal_emits_begin_chars_end() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = spawn_reveal(tx, "hi!", true);
        handle.await.unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }

        assert_eq!(events.first(), Some(&ChatEvent::RevealBegin { drop_status: true }));
        assert_eq!(events.last(), Some(&ChatEvent::RevealEnd));
        let revealed: String = events
            .iter()
            .filter_map(|e| match e {
                ChatEvent::RevealChar(ch) => Some(*ch),
                _ => None,
            })
            .collect();
        assert_eq!(revealed, "hi!");
    }

    #[tokio::test(start_paused = true)]
    async fn reveal_stops_when_receiver_is_dropped() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let handle = spawn_reveal(tx, "nobody listening", false);
        // Must end without panicking even though every send fails.
        handle.await.unwrap();
    }
}
