//! Animatable scalar properties.
//!
//! A [`Property`] is a shared `f64` with change listeners and an optional
//! keyframe animator. Control threads set values or configure animation;
//! the animator itself runs as a graph dependent, interpolating against
//! the sample-derived nanosecond clock so parameter motion is locked to
//! audio time, not wall time.
//!
//! Segment overrun is carried forward: when a segment completes partway
//! through a block, the next segment starts shifted by the excess, so a
//! chain of segments (or a re-armed animation in a
//! [`when_done`](Animator::when_done) consumer) keeps tempo without
//! drift.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::graph::{Dependent, SampleClock};

/// Interpolation curve for one animation segment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Easing {
    /// Constant-rate interpolation.
    #[default]
    Linear,
    /// Quadratic acceleration from rest.
    QuadIn,
    /// Quadratic deceleration to rest.
    QuadOut,
    /// Quadratic ease on both ends.
    QuadInOut,
    /// Cubic acceleration from rest.
    CubicIn,
    /// Cubic deceleration to rest.
    CubicOut,
}

impl Easing {
    /// Maps linear progress `t` in `[0, 1]` onto the eased curve.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::QuadIn => t * t,
            Easing::QuadOut => t * (2.0 - t),
            Easing::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    let u = t - 1.0;
                    1.0 - 2.0 * u * u
                }
            }
            Easing::CubicIn => t * t * t,
            Easing::CubicOut => {
                let u = t - 1.0;
                1.0 + u * u * u
            }
        }
    }
}

type LinkFn = Box<dyn FnMut(f64) + Send>;
type DoneFn = Box<dyn FnOnce(f64) + Send>;

struct Animation {
    targets: Vec<f64>,
    /// Per-segment durations in seconds, cycled modulo length.
    durations: Vec<f64>,
    /// Per-segment easing, cycled modulo length.
    easings: Vec<Easing>,
    segment: usize,
    /// Graph-nanosecond start of the current segment; `None` until the
    /// first block after arming.
    segment_start: Option<i64>,
    segment_from: f64,
    done: Option<DoneFn>,
}

impl Animation {
    fn new(from: f64) -> Self {
        Self {
            targets: Vec::new(),
            durations: vec![0.0],
            easings: vec![Easing::Linear],
            segment: 0,
            segment_start: None,
            segment_from: from,
            done: None,
        }
    }
}

struct PropertyInner {
    value: AtomicU64,
    links: Mutex<Vec<LinkFn>>,
    animation: Mutex<Option<Animation>>,
}

impl PropertyInner {
    fn get(&self) -> f64 {
        f64::from_bits(self.value.load(Ordering::Acquire))
    }

    fn store_and_notify(&self, value: f64) {
        self.value.store(value.to_bits(), Ordering::Release);
        let mut links = self.links.lock();
        for link in links.iter_mut() {
            link(value);
        }
    }
}

impl Dependent for PropertyInner {
    fn update(&self, clock: &SampleClock) {
        let now = clock.nanos();
        let mut new_value = None;
        let mut finished: Option<(Option<DoneFn>, f64)> = None;

        {
            let mut guard = self.animation.lock();
            if let Some(anim) = guard.as_mut()
                && anim.segment < anim.targets.len()
            {
                let start = *anim.segment_start.get_or_insert(now);
                let target = anim.targets[anim.segment];
                let duration = anim.durations[anim.segment % anim.durations.len()];
                let easing = anim.easings[anim.segment % anim.easings.len()];
                let elapsed = (now - start) as f64 / 1e9;

                if duration <= 0.0 || elapsed >= duration {
                    let overrun = (elapsed - duration).max(0.0);
                    new_value = Some(target);
                    anim.segment += 1;
                    if anim.segment >= anim.targets.len() {
                        finished = Some((anim.done.take(), overrun));
                    } else {
                        anim.segment_from = target;
                        anim.segment_start = Some(now - (overrun * 1e9).round() as i64);
                    }
                } else {
                    let eased = easing.apply(elapsed / duration);
                    new_value = Some(anim.segment_from + eased * (target - anim.segment_from));
                }
            }
            if finished.is_some() {
                *guard = None;
            }
        }

        if let Some(value) = new_value {
            self.store_and_notify(value);
        }
        if let Some((done, overrun)) = finished
            && let Some(done) = done
        {
            done(overrun);
        }
    }
}

/// A shared scalar value with listeners and sample-locked animation.
///
/// Cloning the handle shares the value. Register the property with a
/// graph (`graph.add_dependent(prop.dependent())`) to drive its
/// animator.
#[derive(Clone)]
pub struct Property {
    inner: Arc<PropertyInner>,
}

impl Property {
    /// Creates a property holding `initial`.
    pub fn new(initial: f64) -> Self {
        Self {
            inner: Arc::new(PropertyInner {
                value: AtomicU64::new(initial.to_bits()),
                links: Mutex::new(Vec::new()),
                animation: Mutex::new(None),
            }),
        }
    }

    /// Current value.
    pub fn get(&self) -> f64 {
        self.inner.get()
    }

    /// Sets the value, cancelling any active animation, and notifies
    /// listeners.
    pub fn set(&self, value: f64) {
        *self.inner.animation.lock() = None;
        self.inner.store_and_notify(value);
    }

    /// Registers a change listener and fires it immediately with the
    /// current value.
    pub fn link(&self, mut consumer: impl FnMut(f64) + Send + 'static) {
        consumer(self.get());
        self.inner.links.lock().push(Box::new(consumer));
    }

    /// Starts (or reconfigures) the animator.
    ///
    /// The returned [`Animator`] is a fluent handle; animation begins at
    /// the next block once targets are set.
    pub fn animator(&self) -> Animator {
        let mut guard = self.inner.animation.lock();
        if guard.is_none() {
            *guard = Some(Animation::new(self.get()));
        }
        Animator {
            inner: self.inner.clone(),
        }
    }

    /// Whether an animation is currently armed.
    pub fn is_animating(&self) -> bool {
        self.inner
            .animation
            .lock()
            .as_ref()
            .is_some_and(|a| a.segment < a.targets.len())
    }

    /// This property's graph-dependent view, for
    /// [`Graph::add_dependent`](crate::graph::Graph::add_dependent).
    pub fn dependent(&self) -> Arc<dyn Dependent> {
        self.inner.clone()
    }
}

/// Fluent configuration handle returned by [`Property::animator`].
pub struct Animator {
    inner: Arc<PropertyInner>,
}

impl Animator {
    fn configure(self, f: impl FnOnce(&mut Animation, f64)) -> Self {
        let current = self.inner.get();
        let mut guard = self.inner.animation.lock();
        let anim = guard.get_or_insert_with(|| Animation::new(current));
        f(anim, current);
        drop(guard);
        self
    }

    /// Sets the target keyframes and re-arms the animation from the
    /// property's current value.
    pub fn to(self, targets: &[f64]) -> Self {
        self.configure(|anim, current| {
            anim.targets = targets.to_vec();
            anim.segment = 0;
            anim.segment_start = None;
            anim.segment_from = current;
        })
    }

    /// Sets per-segment durations in seconds, cycled over segments.
    /// An empty slice resets to instant transitions.
    pub fn over(self, durations: &[f64]) -> Self {
        self.configure(|anim, _| {
            anim.durations = if durations.is_empty() {
                vec![0.0]
            } else {
                durations.to_vec()
            };
        })
    }

    /// Sets per-segment easing curves, cycled over segments.
    pub fn easing(self, easings: &[Easing]) -> Self {
        self.configure(|anim, _| {
            anim.easings = if easings.is_empty() {
                vec![Easing::Linear]
            } else {
                easings.to_vec()
            };
        })
    }

    /// Shorthand for all-linear interpolation.
    pub fn linear(self) -> Self {
        self.easing(&[Easing::Linear])
    }

    /// Registers a consumer invoked once when the last segment
    /// completes, receiving the overrun in seconds so it can re-arm
    /// without drift.
    pub fn when_done(self, consumer: impl FnOnce(f64) + Send + 'static) -> Self {
        self.configure(|anim, _| {
            anim.done = Some(Box::new(consumer));
        })
    }
}
