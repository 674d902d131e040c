use std::time::Duration;

use crate::model::entity::WatchProgress;

/// A persistence request emitted by [`PlaybackTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flush {
    pub position: u64,
    pub completed: bool,
}

impl Flush {
    pub fn watch_progress(&self) -> WatchProgress {
        if self.completed {
            WatchProgress::finished(self.position)
        } else {
            WatchProgress::at(self.position)
        }
    }
}

/// Turns the player's time-update stream into rate limited checkpoints.
///
/// A checkpoint fires once the position is `interval` away from the last
/// successfully flushed mark, so sample frequency does not matter. Only one
/// checkpoint is in flight at a time; a failed one leaves the mark where it
/// was and the next sample retries. A checkpoint that never settles is given
/// up once playback has moved a full interval past it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackTracker {
    interval: u64,
    declared_duration: u64,
    sampled_duration: Option<u64>,
    position: Option<u64>,
    flushed_mark: u64,
    in_flight: Option<Flush>,
}

fn whole_seconds(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0).then(|| value.floor() as u64)
}

impl PlaybackTracker {
    /// `resume_from` is what the backend already knows, so it seeds the mark.
    pub fn new(interval: Duration, declared_duration: u64, resume_from: u64) -> Self {
        Self {
            interval: interval.as_secs().max(1),
            declared_duration,
            sampled_duration: None,
            position: None,
            flushed_mark: resume_from,
            in_flight: None,
        }
    }

    pub fn position(&self) -> Option<u64> {
        self.position
    }

    pub fn flushed_mark(&self) -> u64 {
        self.flushed_mark
    }

    pub fn in_flight(&self) -> Option<Flush> {
        self.in_flight
    }

    /// Duration reported by the player, else the lesson's declared one.
    pub fn duration(&self) -> Option<u64> {
        self.sampled_duration
            .or(Some(self.declared_duration))
            .filter(|d| *d > 0)
    }

    pub fn on_time_update(&mut self, current_time: f64, total_duration: f64) -> Option<Flush> {
        let position = whole_seconds(current_time)?;
        if let Some(total) = whole_seconds(total_duration).filter(|d| *d > 0) {
            self.sampled_duration = Some(total);
        }

        let position = self.duration().map_or(position, |d| position.min(d));
        self.position = Some(position);

        if let Some(stalled) = self.in_flight {
            if position.abs_diff(stalled.position) < self.interval {
                return None;
            }
            tracing::debug!(stalled = stalled.position, position, "giving up on unsettled flush");
            self.in_flight = None;
        }

        if position.abs_diff(self.flushed_mark) < self.interval {
            return None;
        }

        tracing::trace!(position, mark = self.flushed_mark, "checkpoint due");
        Some(self.begin(position, false))
    }

    /// Terminal flush. Bypasses throttling and any checkpoint in flight.
    pub fn on_ended(&mut self) -> Flush {
        let position = self
            .duration()
            .or(self.position)
            .unwrap_or(self.flushed_mark);

        self.position = Some(position);
        self.begin(position, true)
    }

    /// The last known position if it has not been flushed yet. Used when the
    /// lesson is abandoned mid-playback.
    pub fn take_pending(&mut self) -> Option<Flush> {
        let position = self.position?;
        let already_sent = position == self.flushed_mark
            || self.in_flight.is_some_and(|f| f.position == position);

        if already_sent {
            return None;
        }

        Some(self.begin(position, false))
    }

    /// Settles the in-flight flush. Acks for a flush that was superseded
    /// (a checkpoint overtaken by the final flush) leave the mark alone.
    pub fn acknowledge(&mut self, flush: Flush, succeeded: bool) {
        if self.in_flight != Some(flush) {
            return;
        }

        self.in_flight = None;
        if succeeded {
            self.flushed_mark = flush.position;
        }
    }

    fn begin(&mut self, position: u64, completed: bool) -> Flush {
        let flush = Flush {
            position,
            completed,
        };
        self.in_flight = Some(flush);
        flush
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn tracker() -> PlaybackTracker {
        PlaybackTracker::new(Duration::from_secs(5), 600, 0)
    }

    #[test]
    fn ten_samples_per_second_for_twelve_seconds() {
        let mut tracker = tracker();
        let mut flushes = Vec::new();

        for tick in 1..=120 {
            let now = tick as f64 / 10.0;
            if let Some(flush) = tracker.on_time_update(now, 600.0) {
                tracker.acknowledge(flush, true);
                flushes.push(flush.position);
            }
        }

        assert_eq!(flushes, vec![5, 10]);
        assert_eq!(tracker.flushed_mark(), 10);
        assert_eq!(tracker.position(), Some(12));
    }

    #[test]
    fn no_checkpoint_while_one_is_in_flight() {
        let mut tracker = tracker();

        let first = tracker.on_time_update(5.2, 600.0).unwrap();
        assert_eq!(tracker.on_time_update(8.0, 600.0), None);
        assert_eq!(tracker.on_time_update(9.9, 600.0), None);

        tracker.acknowledge(first, true);
        assert_eq!(tracker.on_time_update(10.1, 600.0).map(|f| f.position), Some(10));
    }

    #[test]
    fn unsettled_checkpoint_is_abandoned_after_a_window() {
        let mut tracker = tracker();

        let stuck = tracker.on_time_update(5.0, 600.0).unwrap();
        let next = tracker.on_time_update(10.0, 600.0).unwrap();
        assert_eq!(next.position, 10);
        assert_eq!(tracker.in_flight(), Some(next));

        // the stuck call settling late does not touch the mark
        tracker.acknowledge(stuck, true);
        assert_eq!(tracker.flushed_mark(), 0);

        tracker.acknowledge(next, true);
        assert_eq!(tracker.flushed_mark(), 10);
    }

    #[test]
    fn failed_checkpoint_retries_on_next_sample() {
        let mut tracker = tracker();

        let first = tracker.on_time_update(5.0, 600.0).unwrap();
        tracker.acknowledge(first, false);
        assert_eq!(tracker.flushed_mark(), 0);

        let retry = tracker.on_time_update(5.3, 600.0).unwrap();
        assert_eq!(retry.position, 5);
    }

    #[test]
    fn resume_position_seeds_the_mark() {
        let mut tracker = PlaybackTracker::new(Duration::from_secs(5), 600, 120);

        assert_eq!(tracker.on_time_update(121.0, 600.0), None);
        assert_eq!(tracker.on_time_update(125.0, 600.0).map(|f| f.position), Some(125));
    }

    #[test]
    fn backward_seek_checkpoints_once_far_enough() {
        let mut tracker = PlaybackTracker::new(Duration::from_secs(5), 600, 100);

        assert_eq!(tracker.on_time_update(97.0, 600.0), None);
        assert_eq!(tracker.on_time_update(20.0, 600.0).map(|f| f.position), Some(20));
    }

    #[test]
    fn ended_uses_sampled_or_declared_duration() {
        let mut sampled = tracker();
        sampled.on_time_update(30.0, 312.7);
        assert_eq!(
            sampled.on_ended(),
            Flush {
                position: 312,
                completed: true
            }
        );

        let mut declared = tracker();
        declared.on_time_update(30.0, f64::NAN);
        assert_eq!(declared.on_ended().position, 600);
    }

    #[test]
    fn ended_bypasses_in_flight_checkpoint() {
        let mut tracker = tracker();
        let checkpoint = tracker.on_time_update(595.0, 600.0).unwrap();
        let last = tracker.on_ended();

        assert!(last.completed);
        tracker.acknowledge(last, true);
        tracker.acknowledge(checkpoint, true);
        assert_eq!(tracker.flushed_mark(), 600);
        assert_eq!(tracker.take_pending(), None);
    }

    #[test]
    fn replay_after_completion_checkpoints_normally() {
        let mut tracker = PlaybackTracker::new(Duration::from_secs(5), 60, 0);
        let last = tracker.on_ended();
        tracker.acknowledge(last, true);

        let replay = tracker.on_time_update(10.0, 60.0).unwrap();
        tracker.acknowledge(replay, true);
        assert_eq!(tracker.flushed_mark(), 10);
        assert_eq!(tracker.on_time_update(11.0, 60.0), None);
    }

    #[test]
    fn pending_only_when_unflushed() {
        let mut tracker = tracker();
        assert_eq!(tracker.take_pending(), None);

        let checkpoint = tracker.on_time_update(35.0, 600.0).unwrap();
        tracker.acknowledge(checkpoint, true);
        assert_eq!(tracker.take_pending(), None);

        tracker.on_time_update(37.4, 600.0);
        assert_eq!(tracker.take_pending().map(|f| f.position), Some(37));
        assert_eq!(tracker.take_pending(), None);
    }

    #[test]
    fn garbage_samples_are_ignored() {
        let mut tracker = tracker();
        assert_eq!(tracker.on_time_update(f64::NAN, 600.0), None);
        assert_eq!(tracker.on_time_update(-4.0, 600.0), None);
        assert_eq!(tracker.position(), None);
    }
}
