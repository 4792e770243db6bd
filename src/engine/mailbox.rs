//! Single-slot coalescing mailbox between the capture worker and a consumer.
//!
//! Depth-1 with per-channel maximum merge is the backpressure policy: when
//! the consumer redraws slower than the capture cadence, the loudest unread
//! peak survives rather than the most recent one, so transient clipping
//! stays visible.

use crate::lock_or_recover;
use std::sync::{Condvar, Mutex};

struct MailboxState {
    values: Vec<f32>,
    /// Unread update count; 0 means empty, >0 selects merge over overwrite.
    pending: u32,
    closed: bool,
}

/// Monitor over {empty, pending, closed}: one mutex, one condition
/// variable, critical sections O(channels).
pub struct PeakMailbox {
    state: Mutex<MailboxState>,
    update: Condvar,
}

impl PeakMailbox {
    pub fn new(channels: usize) -> Self {
        Self {
            state: Mutex::new(MailboxState {
                values: vec![0.0; channels],
                pending: 0,
                closed: false,
            }),
            update: Condvar::new(),
        }
    }

    /// Store one amplitude vector and wake any waiter. Unread values merge
    /// by per-channel maximum so bursts never drop a transient peak. No-op
    /// once the mailbox is closed.
    pub fn publish(&self, amplitudes: &[f32]) {
        let mut state = lock_or_recover(&self.state, "peak mailbox");
        if state.closed {
            return;
        }
        if state.pending > 0 {
            for (slot, &amplitude) in state.values.iter_mut().zip(amplitudes) {
                if amplitude > *slot {
                    *slot = amplitude;
                }
            }
        } else {
            for (slot, &amplitude) in state.values.iter_mut().zip(amplitudes) {
                *slot = amplitude;
            }
        }
        state.pending = state.pending.saturating_add(1);
        self.update.notify_all();
    }

    /// Copy the unread amplitudes into `into` and reset to empty.
    ///
    /// Returns 0 when nothing is unread (or the mailbox is closed),
    /// otherwise the true channel count even when `into` is smaller, so
    /// the caller can detect truncation. Non-blocking; safe on a timer
    /// tick.
    pub fn try_take(&self, into: &mut [f32]) -> usize {
        let mut state = lock_or_recover(&self.state, "peak mailbox");
        if state.closed || state.pending == 0 {
            return 0;
        }
        let have = state.values.len();
        let copied = have.min(into.len());
        into[..copied].copy_from_slice(&state.values[..copied]);
        state.pending = 0;
        have
    }

    /// Block until an unread update exists or the mailbox closes. Returns
    /// immediately when an update is already pending.
    pub fn wait_for_update(&self) {
        let mut state = lock_or_recover(&self.state, "peak mailbox");
        while !state.closed && state.pending == 0 {
            state = self
                .update
                .wait(state)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    /// True when an unread update is waiting.
    pub fn peak_available(&self) -> bool {
        let state = lock_or_recover(&self.state, "peak mailbox");
        !state.closed && state.pending > 0
    }

    pub fn is_closed(&self) -> bool {
        lock_or_recover(&self.state, "peak mailbox").closed
    }

    /// Mark the session as over, discard unread data, and release every
    /// waiter. Idempotent.
    pub fn close(&self) {
        let mut state = lock_or_recover(&self.state, "peak mailbox");
        state.closed = true;
        state.pending = 0;
        self.update.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn take_returns_published_values() {
        let mailbox = PeakMailbox::new(2);
        mailbox.publish(&[0.25, 0.5]);
        let mut out = [0.0; 2];
        assert_eq!(mailbox.try_take(&mut out), 2);
        assert_eq!(out, [0.25, 0.5]);
    }

    #[test]
    fn empty_mailbox_returns_zero() {
        let mailbox = PeakMailbox::new(2);
        let mut out = [0.0; 2];
        assert_eq!(mailbox.try_take(&mut out), 0);
    }

    #[test]
    fn take_resets_to_empty() {
        let mailbox = PeakMailbox::new(1);
        mailbox.publish(&[0.7]);
        let mut out = [0.0; 1];
        assert_eq!(mailbox.try_take(&mut out), 1);
        assert_eq!(mailbox.try_take(&mut out), 0);
    }

    #[test]
    fn unread_updates_coalesce_by_maximum() {
        let mailbox = PeakMailbox::new(2);
        mailbox.publish(&[0.8, 0.1]);
        mailbox.publish(&[0.2, 0.6]);
        let mut out = [0.0; 2];
        assert_eq!(mailbox.try_take(&mut out), 2);
        assert_eq!(out, [0.8, 0.6]);
    }

    #[test]
    fn bursts_keep_the_elementwise_maximum() {
        let mailbox = PeakMailbox::new(3);
        let bursts = [
            [0.1, 0.9, 0.3],
            [0.5, 0.2, 0.4],
            [0.2, 0.3, 0.7],
            [0.4, 0.1, 0.1],
        ];
        for burst in &bursts {
            mailbox.publish(burst);
        }
        let mut out = [0.0; 3];
        assert_eq!(mailbox.try_take(&mut out), 3);
        assert_eq!(out, [0.5, 0.9, 0.7]);
    }

    #[test]
    fn fresh_publish_overwrites_taken_values() {
        let mailbox = PeakMailbox::new(1);
        mailbox.publish(&[0.9]);
        let mut out = [0.0; 1];
        mailbox.try_take(&mut out);
        // The slot was read, so a quieter update must not merge with it.
        mailbox.publish(&[0.1]);
        assert_eq!(mailbox.try_take(&mut out), 1);
        assert_eq!(out, [0.1]);
    }

    #[test]
    fn short_destination_reports_true_channel_count() {
        let mailbox = PeakMailbox::new(4);
        mailbox.publish(&[0.1, 0.2, 0.3, 0.4]);
        let mut out = [0.0; 2];
        assert_eq!(mailbox.try_take(&mut out), 4);
        assert_eq!(out, [0.1, 0.2]);
    }

    #[test]
    fn peak_available_tracks_pending_state() {
        let mailbox = PeakMailbox::new(1);
        assert!(!mailbox.peak_available());
        mailbox.publish(&[0.5]);
        assert!(mailbox.peak_available());
        let mut out = [0.0; 1];
        mailbox.try_take(&mut out);
        assert!(!mailbox.peak_available());
    }

    #[test]
    fn closed_mailbox_yields_nothing() {
        let mailbox = PeakMailbox::new(1);
        mailbox.publish(&[0.5]);
        mailbox.close();
        let mut out = [0.0; 1];
        assert_eq!(mailbox.try_take(&mut out), 0);
        assert!(!mailbox.peak_available());
        // Publishing after close must not resurrect the mailbox.
        mailbox.publish(&[0.9]);
        assert_eq!(mailbox.try_take(&mut out), 0);
    }

    #[test]
    fn close_is_idempotent() {
        let mailbox = PeakMailbox::new(1);
        mailbox.close();
        mailbox.close();
        assert!(mailbox.is_closed());
    }

    #[test]
    fn wait_returns_immediately_when_pending() {
        let mailbox = PeakMailbox::new(1);
        mailbox.publish(&[0.5]);
        mailbox.wait_for_update();
    }

    #[test]
    fn publish_releases_a_blocked_waiter() {
        let mailbox = Arc::new(PeakMailbox::new(1));
        let waiter_mailbox = Arc::clone(&mailbox);
        let waiter = thread::spawn(move || waiter_mailbox.wait_for_update());
        thread::sleep(Duration::from_millis(20));
        mailbox.publish(&[0.5]);
        waiter.join().expect("waiter should return after publish");
    }

    #[test]
    fn close_releases_a_blocked_waiter() {
        let mailbox = Arc::new(PeakMailbox::new(1));
        let waiter_mailbox = Arc::clone(&mailbox);
        let waiter = thread::spawn(move || waiter_mailbox.wait_for_update());
        thread::sleep(Duration::from_millis(20));
        mailbox.close();
        waiter.join().expect("waiter should return after close");
    }
}
