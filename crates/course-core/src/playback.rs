//! Free-Preview Playback Gate
//!
//! Tracks elapsed watch time for one video against the free-preview
//! threshold. A viewer without entitlement is cut off the first time the
//! play head reaches the threshold; the transition happens once per session
//! and is reported back to the caller as a [`GateEvent`] so the view can
//! pause the media element and show the paywall.
//!
//! ```text
//!   0s                 threshold                       duration
//!   ├────── free ──────────┤────────── locked ────────────┤
//!                          ▲
//!                 PaywallTriggered (once)
//! ```
//!
//! The gate is inert until the real duration is known, and never fires when
//! the threshold covers the whole video.

use serde::{Deserialize, Serialize};

use crate::config::PlayerConfig;

/// Side effect requested by the gate
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GateEvent {
    /// Playback must pause and the paywall must be shown
    PaywallTriggered { at: f64 },
}

/// Why a seek was refused
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeekRejection {
    /// The session is locked; the play head stays where it is
    Locked,
    /// Target lies at or past the free-preview boundary
    BeyondPreview,
    /// Target is negative or not a number
    OutOfRange,
}

/// Outcome of a seek request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeekDecision {
    Allowed,
    Rejected(SeekRejection),
}

impl SeekDecision {
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Whether a duration reported by the media source is usable
fn duration_known(total_duration: f64) -> bool {
    total_duration.is_finite() && total_duration > 0.0
}

/// Pure lock predicate.
///
/// True exactly when a non-entitled, not yet locked session with a known
/// duration has reached a threshold that lies inside the video.
pub fn should_lock(
    elapsed: f64,
    total_duration: f64,
    free_threshold: f64,
    entitled: bool,
    already_locked: bool,
) -> bool {
    if entitled || already_locked {
        return false;
    }
    if !duration_known(total_duration) || free_threshold >= total_duration {
        return false;
    }
    elapsed >= free_threshold
}

/// Playback state for one video in one view
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlaybackSession {
    elapsed: f64,
    total_duration: f64,
    free_threshold: f64,
    locked: bool,
    entitled: bool,
    /// An elapsed position has been reported at least once
    progress_seen: bool,
}

impl PlaybackSession {
    /// Create a session; entitled viewers may pass `f64::INFINITY`.
    pub fn new(free_threshold: f64, entitled: bool) -> Self {
        // An unusable threshold closes the gate rather than opening it.
        let free_threshold = if free_threshold.is_nan() { 0.0 } else { free_threshold };

        Self {
            elapsed: 0.0,
            total_duration: 0.0,
            free_threshold,
            locked: false,
            entitled,
            progress_seen: false,
        }
    }

    /// Create from player configuration
    pub fn from_config(config: &PlayerConfig, entitled: bool) -> Self {
        Self::new(config.threshold_for(entitled), entitled)
    }

    pub const fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub const fn total_duration(&self) -> f64 {
        self.total_duration
    }

    pub const fn is_entitled(&self) -> bool {
        self.entitled
    }

    /// Locked and still without entitlement
    pub const fn is_locked(&self) -> bool {
        self.locked && !self.entitled
    }

    /// Whether the paywall has ever fired in this session
    pub const fn paywall_fired(&self) -> bool {
        self.locked
    }

    /// Threshold actually enforced right now
    pub const fn effective_threshold(&self) -> f64 {
        if self.entitled {
            f64::INFINITY
        } else {
            self.free_threshold
        }
    }

    /// The media source reported its real duration.
    ///
    /// Only catches up on elapsed time already reported; metadata alone
    /// never locks.
    pub fn set_duration(&mut self, total_duration: f64) -> Option<GateEvent> {
        self.total_duration = if total_duration.is_finite() && total_duration > 0.0 {
            total_duration
        } else {
            0.0
        };
        if !self.progress_seen {
            return None;
        }
        self.evaluate()
    }

    /// Feed one elapsed-time update from the media source.
    pub fn on_time_update(&mut self, elapsed: f64) -> Option<GateEvent> {
        if !elapsed.is_finite() {
            return None;
        }
        self.elapsed = elapsed.max(0.0);
        self.progress_seen = true;
        self.evaluate()
    }

    /// Ask to move the play head.
    pub fn request_seek(&mut self, target: f64) -> SeekDecision {
        if !target.is_finite() || target < 0.0 {
            return SeekDecision::Rejected(SeekRejection::OutOfRange);
        }
        if self.is_locked() {
            tracing::debug!(target, "Seek ignored, playback locked");
            return SeekDecision::Rejected(SeekRejection::Locked);
        }
        if !self.entitled && self.gate_active() && target >= self.free_threshold {
            tracing::debug!(target, threshold = self.free_threshold, "Seek past free preview rejected");
            return SeekDecision::Rejected(SeekRejection::BeyondPreview);
        }

        self.elapsed = target;
        self.progress_seen = true;
        SeekDecision::Allowed
    }

    /// Whether the play button may resume playback
    pub const fn can_play(&self) -> bool {
        !self.is_locked()
    }

    /// Viewer became entitled. One-way: the threshold is gone for good.
    pub fn grant_entitlement(&mut self) {
        if self.entitled {
            return;
        }
        self.entitled = true;
        tracing::info!(was_locked = self.locked, "Playback unlocked by entitlement");
    }

    /// Played fraction for the progress bar, 0 while the duration is unknown.
    pub fn progress_fraction(&self) -> f64 {
        if duration_known(self.total_duration) {
            (self.elapsed / self.total_duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Position of the free-preview marker on the progress bar.
    ///
    /// `None` for entitled viewers, who see no marker.
    pub fn free_marker_fraction(&self) -> Option<f64> {
        if self.entitled {
            return None;
        }
        if !duration_known(self.total_duration) {
            return Some(0.0);
        }
        Some((self.free_threshold / self.total_duration).clamp(0.0, 1.0))
    }

    /// Seconds of preview left, when a preview limit applies at all.
    pub fn remaining_preview(&self) -> Option<f64> {
        if self.entitled || !self.gate_active() {
            return None;
        }
        Some((self.free_threshold - self.elapsed).max(0.0))
    }

    /// The gate can fire for this video
    fn gate_active(&self) -> bool {
        duration_known(self.total_duration) && self.free_threshold < self.total_duration
    }

    fn evaluate(&mut self) -> Option<GateEvent> {
        if !should_lock(
            self.elapsed,
            self.total_duration,
            self.free_threshold,
            self.entitled,
            self.locked,
        ) {
            return None;
        }

        self.locked = true;
        tracing::info!(
            elapsed = self.elapsed,
            threshold = self.free_threshold,
            duration = self.total_duration,
            "Free preview exhausted, paywall triggered"
        );

        Some(GateEvent::PaywallTriggered { at: self.elapsed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn locked_session() -> PlaybackSession {
        let mut session = PlaybackSession::new(30.0, false);
        session.set_duration(120.0);
        assert!(session.on_time_update(31.0).is_some());
        session
    }

    #[test]
    fn test_free_window_then_single_paywall() {
        let mut session = PlaybackSession::new(30.0, false);
        assert_eq!(session.set_duration(120.0), None);

        for second in 0..=29 {
            assert_eq!(session.on_time_update(f64::from(second)), None);
            assert!(!session.is_locked());
        }
        assert_eq!(session.free_marker_fraction(), Some(0.25));

        assert_eq!(
            session.on_time_update(31.0),
            Some(GateEvent::PaywallTriggered { at: 31.0 })
        );
        assert!(session.is_locked());
        assert!(!session.can_play());

        assert_eq!(session.on_time_update(32.0), None);
        assert_eq!(session.on_time_update(90.0), None);
        assert!(session.is_locked());
    }

    #[test]
    fn test_unknown_duration_never_fires() {
        let mut session = PlaybackSession::new(30.0, false);
        assert_eq!(session.on_time_update(45.0), None);
        assert!((session.progress_fraction()).abs() < f64::EPSILON);
        assert_eq!(session.free_marker_fraction(), Some(0.0));

        // Once the real duration arrives the gate catches up.
        assert_eq!(
            session.set_duration(120.0),
            Some(GateEvent::PaywallTriggered { at: 45.0 })
        );
    }

    #[test]
    fn test_threshold_covering_whole_video_never_fires() {
        let mut session = PlaybackSession::new(120.0, false);
        session.set_duration(120.0);
        assert_eq!(session.on_time_update(120.0), None);
        assert_eq!(session.remaining_preview(), None);
        assert!(session.request_seek(119.0).is_allowed());
    }

    #[test]
    fn test_zero_threshold_waits_for_first_time_update() {
        let mut session = PlaybackSession::new(0.0, false);
        assert_eq!(session.set_duration(60.0), None);
        assert!(!session.is_locked());

        assert_eq!(
            session.on_time_update(0.0),
            Some(GateEvent::PaywallTriggered { at: 0.0 })
        );
        assert!(session.is_locked());
        assert_eq!(session.on_time_update(0.5), None);
    }

    #[test]
    fn test_seek_rules() {
        let mut session = PlaybackSession::new(30.0, false);
        session.set_duration(120.0);
        session.on_time_update(20.0);

        assert!(session.request_seek(5.0).is_allowed());
        assert_eq!(
            session.request_seek(30.0),
            SeekDecision::Rejected(SeekRejection::BeyondPreview)
        );
        assert_eq!(
            session.request_seek(-1.0),
            SeekDecision::Rejected(SeekRejection::OutOfRange)
        );
        assert!((session.elapsed() - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_seek_while_locked_is_noop() {
        let mut session = locked_session();
        assert_eq!(
            session.request_seek(10.0),
            SeekDecision::Rejected(SeekRejection::Locked)
        );
        assert!((session.elapsed() - 31.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_grant_lifts_lock() {
        let mut session = locked_session();
        session.grant_entitlement();

        assert!(!session.is_locked());
        assert!(session.paywall_fired());
        assert!(session.effective_threshold().is_infinite());
        assert_eq!(session.free_marker_fraction(), None);
        assert!(session.request_seek(100.0).is_allowed());
        assert_eq!(session.on_time_update(110.0), None);
    }

    #[test]
    fn test_progress_fraction() {
        let mut session = PlaybackSession::new(f64::INFINITY, true);
        session.set_duration(200.0);
        session.on_time_update(50.0);
        assert!((session.progress_fraction() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_from_config() {
        let config = PlayerConfig::new(10.0);
        let session = PlaybackSession::from_config(&config, false);
        assert!((session.effective_threshold() - 10.0).abs() < f64::EPSILON);
    }

    proptest! {
        #[test]
        fn prop_non_positive_threshold_locks_on_first_update(
            threshold in -100.0f64..=0.0,
            duration in 1.0f64..10_000.0,
            elapsed in 0.0f64..10_000.0,
        ) {
            let mut session = PlaybackSession::new(threshold, false);
            session.set_duration(duration);
            let event = session.on_time_update(elapsed);
            prop_assert!(event.is_some());
            prop_assert!(session.is_locked());
        }

        #[test]
        fn prop_entitled_never_locks(
            threshold in -100.0f64..10_000.0,
            duration in 0.0f64..10_000.0,
            updates in prop::collection::vec(0.0f64..10_000.0, 1..50),
        ) {
            let mut session = PlaybackSession::new(threshold, true);
            prop_assert!(session.set_duration(duration).is_none());
            for elapsed in updates {
                prop_assert!(session.on_time_update(elapsed).is_none());
                prop_assert!(!session.is_locked());
            }
        }

        #[test]
        fn prop_paywall_fires_at_most_once(
            threshold in 0.0f64..100.0,
            updates in prop::collection::vec(0.0f64..200.0, 1..100),
        ) {
            let mut session = PlaybackSession::new(threshold, false);
            session.set_duration(200.0);
            let fired = updates
                .into_iter()
                .filter_map(|elapsed| session.on_time_update(elapsed))
                .count();
            prop_assert!(fired <= 1);
            prop_assert_eq!(fired == 1, session.paywall_fired());
        }
    }
}
