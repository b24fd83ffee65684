use std::fmt;
use std::time::Duration;

use glam::Vec3;

type Listener = Box<dyn FnOnce()>;

/// Signal that notifies its listeners once, then stays fired.
///
/// Subscribing to a fired signal runs the listener immediately so callers
/// never miss a completion that happened before they subscribed.
#[derive(Default)]
pub struct OnceSignal {
    listeners: Vec<Listener>,
    fired: bool,
}

impl OnceSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a signal that has already fired.
    pub fn fired() -> Self {
        Self {
            listeners: Vec::new(),
            fired: true,
        }
    }

    pub fn is_fired(&self) -> bool {
        self.fired
    }

    pub fn subscribe(&mut self, listener: impl FnOnce() + 'static) {
        if self.fired {
            listener();
        } else {
            self.listeners.push(Box::new(listener));
        }
    }

    pub fn fire(&mut self) {
        if self.fired {
            return;
        }
        self.fired = true;
        for listener in self.listeners.drain(..) {
            listener();
        }
    }
}

impl fmt::Debug for OnceSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnceSignal")
            .field("listeners", &self.listeners.len())
            .field("fired", &self.fired)
            .finish()
    }
}

/// Interpolated values for one frame of an animator.
#[derive(Debug)]
pub struct AnimationFrame {
    pub position: Option<Vec3>,
    pub rotation: Option<Vec3>,
    /// Signals of the tracks that completed on this frame.
    pub ended: Vec<OnceSignal>,
}

#[derive(Debug)]
struct Track {
    from: Vec3,
    to: Vec3,
    elapsed: Duration,
    duration: Duration,
    ended: OnceSignal,
}

impl Track {
    fn new(from: Vec3, to: Vec3, duration: Duration) -> Self {
        Self {
            from,
            to,
            elapsed: Duration::ZERO,
            duration,
            ended: OnceSignal::new(),
        }
    }

    /// Value after `elapsed` more time, and whether the track is done.
    fn step(&mut self, elapsed: Duration) -> (Vec3, bool) {
        self.elapsed += elapsed;
        if self.duration.is_zero() || self.elapsed >= self.duration {
            return (self.to, true);
        }
        let progress = self.elapsed.as_secs_f32() / self.duration.as_secs_f32();
        (self.from.lerp(self.to, ease_in_out(progress)), false)
    }
}

/// Drives the in-flight motions of an animated behavior.
///
/// Position and rotation are separate tracks: starting a move only
/// supersedes a running move, starting a rotation only a running rotation.
#[derive(Debug, Default)]
pub struct Animator {
    position: Option<Track>,
    rotation: Option<Track>,
}

impl Clone for Animator {
    /// Clones are always idle: an in-flight motion belongs to its mesh.
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl Animator {
    pub fn is_animating(&self) -> bool {
        self.position.is_some() || self.rotation.is_some()
    }

    /// Position the running move ends at.
    pub fn target_position(&self) -> Option<Vec3> {
        self.position.as_ref().map(|track| track.to)
    }

    /// Rotation the running rotation ends at.
    pub fn target_rotation(&self) -> Option<Vec3> {
        self.rotation.as_ref().map(|track| track.to)
    }

    /// Starts moving between two positions and returns the move-ended signal.
    pub fn move_to(&mut self, from: Vec3, to: Vec3, duration: Duration) -> &mut OnceSignal {
        start(&mut self.position, Track::new(from, to, duration))
    }

    /// Starts rotating between two euler angles and returns the ended signal.
    pub fn rotate_to(&mut self, from: Vec3, to: Vec3, duration: Duration) -> &mut OnceSignal {
        start(&mut self.rotation, Track::new(from, to, duration))
    }

    /// Advances the running tracks, if any, by `elapsed`.
    pub fn advance(&mut self, elapsed: Duration) -> Option<AnimationFrame> {
        if !self.is_animating() {
            return None;
        }
        let mut ended = Vec::new();
        let position = advance_track(&mut self.position, elapsed, &mut ended);
        let rotation = advance_track(&mut self.rotation, elapsed, &mut ended);
        Some(AnimationFrame {
            position,
            rotation,
            ended,
        })
    }
}

fn start(slot: &mut Option<Track>, track: Track) -> &mut OnceSignal {
    if let Some(mut previous) = slot.take() {
        previous.ended.fire();
    }
    &mut slot.insert(track).ended
}

fn advance_track(
    slot: &mut Option<Track>,
    elapsed: Duration,
    ended: &mut Vec<OnceSignal>,
) -> Option<Vec3> {
    let (value, done) = slot.as_mut()?.step(elapsed);
    if done {
        ended.extend(slot.take().map(|track| track.ended));
    }
    Some(value)
}

fn ease_in_out(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}
