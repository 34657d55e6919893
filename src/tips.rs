//! Tip rotation shown while slide generation runs. Purely cosmetic and
//! independent of the event stream: the task only sends [`ChatEvent::Tip`]
//! ticks; the reducer writes the index onto the generation status entry.

use crate::messages::TIPS;
use crate::transcript::ChatEvent;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Delay before the first tip appears.
pub const FIRST_TIP_DELAY: Duration = Duration::from_secs(3);
/// Interval between subsequent rotations.
pub const ROTATE_INTERVAL: Duration = Duration::from_secs(5);

/// Picks a tip index, never repeating the previous one when more than one
/// tip exists.
pub fn pick_tip(previous: Option<usize>) -> usize {
    loop {
        let index = fastrand::usize(..TIPS.len());
        if TIPS.len() <= 1 || Some(index) != previous {
            return index;
        }
    }
}

/// Owns the rotation timers. `start` always replaces any running rotation;
/// `stop` is idempotent and safe to call when never started. Dropping the
/// controller cancels the task, so a discarded conversation can't keep a
/// timer mutating its transcript.
#[derive(Debug, Default)]
pub struct TipRotation {
    task: Option<JoinHandle<()>>,
}

impl TipRotation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, sender: mpsc::UnboundedSender<ChatEvent>) {
        self.stop();
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(FIRST_TIP_DELAY).await;
            let mut current = pick_tip(None);
            if sender.send(ChatEvent::Tip(current)).is_err() {
                return;
            }
            loop {
                tokio::time::sleep(ROTATE_INTERVAL).await;
                current = pick_tip(Some(current));
                if sender.send(ChatEvent::Tip(current)).is_err() {
                    return;
                }
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for TipRotation {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pick_tip_never_repeats_previous() {
        let mut previous = pick_tip(None);
        for _ in 0..200 {
            let next = pick_tip(Some(previous));
            assert_ne!(next, previous);
            assert!(next < TIPS.len());
            previous = next;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rotation_waits_then_ticks_on_interval() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut rotation = TipRotation::new();
        rotation.start(tx);

        // Nothing before the initial delay elapses.
        tokio::time::sleep(FIRST_TIP_DELAY - Duration::from_millis(1)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(2)).await;
        let first = rx.recv().await.unwrap();
        let ChatEvent::Tip(first_index) = first else {
            panic!("expected a tip tick");
        };

        tokio::time::sleep(ROTATE_INTERVAL + Duration::from_millis(1)).await;
        let ChatEvent::Tip(second_index) = rx.recv().await.unwrap() else {
            panic!("expected a tip tick");
        };
        if TIPS.len() > 1 {
            assert_ne!(second_index, first_index);
        }

        rotation.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent_and_silences_the_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut rotation = TipRotation::new();

        // Stopping before any start is a no-op.
        rotation.stop();

        rotation.start(tx);
        rotation.stop();
        rotation.stop();

        tokio::time::sleep(FIRST_TIP_DELAY + ROTATE_INTERVAL * 3).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_the_running_rotation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut rotation = TipRotation::new();
        rotation.start(tx.clone());

        // Restart just before the first tick would fire; the old timer must
        // not deliver.
        tokio::time::sleep(FIRST_TIP_DELAY - Duration::from_millis(1)).await;
        rotation.start(tx);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(FIRST_TIP_DELAY).await;
        assert!(matches!(rx.recv().await, Some(ChatEvent::Tip(_))));

        rotation.stop();
    }
}
