//! Headless gesture state machines for list rows.
//!
//! Rendering and animation belong to the UI toolkit. What lives here is the decision
//! logic: when a drag is captured, how far the row has moved, whether a release
//! deletes or snaps back, and when exactly one delete intent is emitted. Every row
//! owns its own [`SwipeGesture`] and every press target its own [`LongPress`], so no
//! timing state is shared between instances.

use std::time::{Duration, Instant};

/// Parameters of the swipe-to-delete behaviour
#[derive(Debug, Clone, PartialEq)]
pub struct SwipeConfig {
    /// Width of the viewport in points
    pub viewport_width: f64,
    /// Fraction of the viewport a release must exceed to delete
    pub delete_threshold: f64,
    /// Leftward distance before a drag is treated as a swipe rather than a tap
    pub activation_distance: f64,
    /// Play a short nudge when the row first appears, hinting that it can be swiped
    pub nudge_on_load: bool,
    /// How long the exit animation runs before the delete intent is emitted
    pub settle_delay: Duration,
}

impl SwipeConfig {
    /// Set the viewport width
    #[must_use]
    pub const fn with_viewport_width(mut self, width: f64) -> Self {
        self.viewport_width = width;
        self
    }

    /// Set the delete threshold fraction
    #[must_use]
    pub const fn with_delete_threshold(mut self, threshold: f64) -> Self {
        self.delete_threshold = threshold;
        self
    }

    /// Enable or disable the on-load nudge
    #[must_use]
    pub const fn with_nudge_on_load(mut self, nudge: bool) -> Self {
        self.nudge_on_load = nudge;
        self
    }

    /// Distance past which a release deletes
    #[must_use]
    pub fn delete_distance(&self) -> f64 {
        self.viewport_width * self.delete_threshold
    }
}

impl Default for SwipeConfig {
    fn default() -> Self {
        Self {
            viewport_width: 375.0,
            delete_threshold: 0.4,
            activation_distance: 5.0,
            nudge_on_load: false,
            settle_delay: Duration::from_millis(400),
        }
    }
}

/// Where a row is in its swipe lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipePhase {
    /// At rest
    Idle,
    /// Following the finger
    Dragging,
    /// Returning to rest after a short swipe
    SnappingBack,
    /// Sliding off screen after a long swipe
    Exiting,
    /// Delete intent emitted; the row is gone
    Deleted,
}

/// Result of releasing a drag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeOutcome {
    /// The swipe passed the threshold; the row animates out
    Delete,
    /// The swipe fell short; the row returns to rest
    SnapBack,
}

/// Events a swipe emits to the owner of the row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeEvent {
    /// The user swiped the row away
    DeleteIntent,
}

/// Implemented by whatever owns a swipeable row
///
/// The UI layer implements this for its row widget; the gesture logic stays the same
/// whatever the row renders.
pub trait Swipeable {
    /// Called once per completed delete swipe, after the exit animation settled
    fn on_delete_intent(&mut self);
}

/// Adapts a closure into a [`Swipeable`]
pub struct OnDelete<F>(pub F);

impl<F: FnMut()> Swipeable for OnDelete<F> {
    fn on_delete_intent(&mut self) {
        (self.0)();
    }
}

/// Swipe-to-delete state machine for one row
#[derive(Debug, Clone)]
pub struct SwipeGesture {
    config: SwipeConfig,
    offset: f64,
    phase: SwipePhase,
}

impl SwipeGesture {
    /// Creates an idle gesture
    #[must_use]
    pub const fn new(config: SwipeConfig) -> Self {
        Self {
            config,
            offset: 0.0,
            phase: SwipePhase::Idle,
        }
    }

    /// Configuration this gesture was created with
    #[must_use]
    pub const fn config(&self) -> &SwipeConfig {
        &self.config
    }

    /// Current horizontal offset of the row (zero or negative)
    #[must_use]
    pub const fn offset(&self) -> f64 {
        self.offset
    }

    /// Current phase
    #[must_use]
    pub const fn phase(&self) -> SwipePhase {
        self.phase
    }

    /// Starts tracking a new touch; ignored once the row is exiting or deleted
    pub fn begin(&mut self) {
        if matches!(self.phase, SwipePhase::Idle | SwipePhase::SnappingBack) {
            self.offset = 0.0;
            self.phase = SwipePhase::Idle;
        }
    }

    /// Whether a move with horizontal delta `dx` should be claimed as a swipe
    ///
    /// Taps and rightward moves are left to the row's own controls.
    #[must_use]
    pub fn should_capture(&self, dx: f64) -> bool {
        matches!(self.phase, SwipePhase::Idle | SwipePhase::Dragging)
            && dx < -self.config.activation_distance
    }

    /// Follows the finger; only leftward movement moves the row
    pub fn drag(&mut self, dx: f64) {
        if !matches!(self.phase, SwipePhase::Idle | SwipePhase::Dragging) {
            return;
        }
        if dx < 0.0 {
            self.offset = dx.floor();
            self.phase = SwipePhase::Dragging;
        }
    }

    /// Ends the drag at horizontal delta `dx`
    ///
    /// Releasing or terminating the gesture behave the same. Only a leftward
    /// release past the threshold deletes; a rightward release of the same length
    /// snaps back, unlike a plain `|dx|` comparison. Rows only ever follow leftward
    /// drags, so the two agree for every drag the row actually showed.
    pub fn release(&mut self, dx: f64) -> SwipeOutcome {
        if -dx > self.config.delete_distance() {
            self.offset = -self.config.viewport_width;
            self.phase = SwipePhase::Exiting;
            SwipeOutcome::Delete
        } else {
            self.offset = 0.0;
            self.phase = SwipePhase::SnappingBack;
            SwipeOutcome::SnapBack
        }
    }

    /// Marks the running animation as finished
    ///
    /// Returns [`SwipeEvent::DeleteIntent`] exactly once after a deleting release.
    pub fn settle(&mut self) -> Option<SwipeEvent> {
        match self.phase {
            SwipePhase::Exiting => {
                self.phase = SwipePhase::Deleted;
                tracing::debug!("swipe settled, emitting delete intent");
                Some(SwipeEvent::DeleteIntent)
            },
            SwipePhase::SnappingBack => {
                self.phase = SwipePhase::Idle;
                None
            },
            SwipePhase::Idle | SwipePhase::Dragging | SwipePhase::Deleted => None,
        }
    }

    /// Settles the gesture and forwards a delete intent to `target`
    ///
    /// Returns whether the target was notified.
    pub fn drive<S: Swipeable + ?Sized>(&mut self, target: &mut S) -> bool {
        match self.settle() {
            Some(SwipeEvent::DeleteIntent) => {
                target.on_delete_intent();
                true
            },
            None => false,
        }
    }

    /// Scale of the "Delete" label: grows from 0.5 to 1.0 over the first quarter width
    #[must_use]
    pub fn label_scale(&self) -> f64 {
        let w = self.config.viewport_width;
        interpolate(self.offset, (-0.25 * w, 0.0), (1.0, 0.5))
    }

    /// Horizontal shift of the "Delete" label so it travels with the row past the threshold
    #[must_use]
    pub fn label_translate(&self) -> f64 {
        let w = self.config.viewport_width;
        interpolate(
            self.offset,
            (-w, -self.config.delete_threshold * w),
            (-0.5 * w, 0.0),
        )
    }

    /// Offsets the on-load nudge animates through, empty when disabled
    #[must_use]
    pub fn nudge_keyframes(&self) -> Vec<f64> {
        if self.config.nudge_on_load {
            vec![-0.25 * self.config.viewport_width, 0.0]
        } else {
            Vec::new()
        }
    }
}

/// Linear interpolation of `x` from `input` to `output`, clamped at both ends
fn interpolate(x: f64, input: (f64, f64), output: (f64, f64)) -> f64 {
    let (in_lo, in_hi) = input;
    if (in_hi - in_lo).abs() < f64::EPSILON {
        return output.0;
    }
    let t = ((x - in_lo) / (in_hi - in_lo)).clamp(0.0, 1.0);
    output.0 + t * (output.1 - output.0)
}

/// Parameters of a multi-touch long press
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongPressConfig {
    /// Number of fingers that must be down
    pub touches: usize,
    /// How long they must be held
    pub delay: Duration,
    /// Development builds only
    pub enabled: bool,
}

impl Default for LongPressConfig {
    fn default() -> Self {
        Self {
            touches: 2,
            delay: Duration::from_millis(1000),
            enabled: cfg!(debug_assertions),
        }
    }
}

/// Long-press detector
///
/// Holds its own press start, so separate targets never observe each other's presses.
#[derive(Debug, Clone, Default)]
pub struct LongPress {
    config: LongPressConfig,
    started_at: Option<Instant>,
}

impl LongPress {
    /// Creates a detector with no press in progress
    #[must_use]
    pub const fn new(config: LongPressConfig) -> Self {
        Self {
            config,
            started_at: None,
        }
    }

    /// A touch began with `touches` fingers; returns whether the press is tracked
    pub fn press(&mut self, touches: usize, at: Instant) -> bool {
        if self.config.enabled && touches == self.config.touches {
            self.started_at = Some(at);
            true
        } else {
            self.started_at = None;
            false
        }
    }

    /// The touch ended; returns whether it counts as a long press
    pub fn release(&mut self, at: Instant) -> bool {
        let fired = self
            .started_at
            .take()
            .is_some_and(|start| at.saturating_duration_since(start) > self.config.delay);
        if fired {
            tracing::debug!(touches = self.config.touches, "long press detected");
        }
        fired
    }

    /// Whether a press is currently tracked
    #[must_use]
    pub const fn is_pressed(&self) -> bool {
        self.started_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gesture() -> SwipeGesture {
        SwipeGesture::new(SwipeConfig::default().with_viewport_width(400.0))
    }

    #[test]
    fn taps_and_right_swipes_are_not_captured() {
        let g = gesture();
        assert!(!g.should_capture(-3.0));
        assert!(!g.should_capture(40.0));
        assert!(g.should_capture(-6.0));
    }

    #[test]
    fn rightward_release_past_threshold_snaps_back() {
        let mut g = gesture();
        g.begin();
        assert_eq!(g.release(300.0), SwipeOutcome::SnapBack);
        assert!(g.offset().abs() < f64::EPSILON);
        assert_eq!(g.settle(), None);
    }

    #[test]
    fn drag_tracks_only_leftward_movement() {
        let mut g = gesture();
        g.drag(-42.7);
        assert!((g.offset() - -43.0).abs() < f64::EPSILON);
        g.drag(15.0);
        assert!((g.offset() - -43.0).abs() < f64::EPSILON);
        assert_eq!(g.phase(), SwipePhase::Dragging);
    }

    #[test]
    fn long_swipe_emits_exactly_one_delete_intent() {
        let mut g = gesture();
        g.drag(-200.0);
        assert_eq!(g.release(-200.0), SwipeOutcome::Delete);
        assert!((g.offset() - -400.0).abs() < f64::EPSILON);

        assert_eq!(g.settle(), Some(SwipeEvent::DeleteIntent));
        assert_eq!(g.settle(), None);
        assert_eq!(g.phase(), SwipePhase::Deleted);

        g.begin();
        g.drag(-300.0);
        assert_eq!(g.phase(), SwipePhase::Deleted);
    }

    #[test]
    fn threshold_is_exclusive() {
        let mut g = gesture();
        assert_eq!(g.release(-160.0), SwipeOutcome::SnapBack);
        assert_eq!(g.settle(), None);
        assert_eq!(g.phase(), SwipePhase::Idle);

        assert_eq!(g.release(-160.5), SwipeOutcome::Delete);
    }

    #[test]
    fn drive_notifies_swipeable_once() {
        let mut deletes = 0;
        {
            let mut row = OnDelete(|| deletes += 1);
            let mut g = gesture();
            g.release(-390.0);
            assert!(g.drive(&mut row));
            assert!(!g.drive(&mut row));
        }
        assert_eq!(deletes, 1);
    }

    #[test]
    fn short_swipe_never_notifies() {
        let mut deletes = 0;
        {
            let mut row = OnDelete(|| deletes += 1);
            let mut g = gesture();
            g.drag(-100.0);
            g.release(-100.0);
            assert!(!g.drive(&mut row));
        }
        assert_eq!(deletes, 0);
    }

    #[test]
    fn label_interpolations_clamp() {
        let mut g = gesture();
        assert!((g.label_scale() - 0.5).abs() < 1e-9);
        g.drag(-50.0);
        assert!((g.label_scale() - 0.75).abs() < 1e-9);
        g.drag(-300.0);
        assert!((g.label_scale() - 1.0).abs() < 1e-9);

        g.drag(-400.0);
        assert!((g.label_translate() - -200.0).abs() < 1e-9);
        g.drag(-280.0);
        assert!((g.label_translate() - -100.0).abs() < 1e-9);
        g.drag(-100.0);
        assert!(g.label_translate().abs() < 1e-9);
    }

    #[test]
    fn nudge_only_when_enabled() {
        assert!(gesture().nudge_keyframes().is_empty());
        let g = SwipeGesture::new(
            SwipeConfig::default()
                .with_viewport_width(400.0)
                .with_nudge_on_load(true),
        );
        assert_eq!(g.nudge_keyframes(), vec![-100.0, 0.0]);
    }

    fn enabled() -> LongPressConfig {
        LongPressConfig {
            enabled: true,
            ..LongPressConfig::default()
        }
    }

    #[test]
    fn long_press_requires_touch_count_and_duration() {
        let start = Instant::now();
        let mut press = LongPress::new(enabled());

        assert!(!press.press(1, start));
        assert!(!press.release(start + Duration::from_secs(5)));

        assert!(press.press(2, start));
        assert!(!press.release(start + Duration::from_millis(1000)));

        assert!(press.press(2, start));
        assert!(press.release(start + Duration::from_millis(1001)));
        assert!(!press.is_pressed());
    }

    #[test]
    fn long_press_state_is_per_instance() {
        let start = Instant::now();
        let mut first = LongPress::new(enabled());
        let mut second = LongPress::new(enabled());

        assert!(first.press(2, start));
        assert!(!second.release(start + Duration::from_secs(2)));
        assert!(first.release(start + Duration::from_secs(2)));
    }

    #[test]
    fn disabled_long_press_never_fires() {
        let start = Instant::now();
        let mut press = LongPress::new(LongPressConfig {
            enabled: false,
            ..LongPressConfig::default()
        });
        assert!(!press.press(2, start));
        assert!(!press.release(start + Duration::from_secs(10)));
    }
}
