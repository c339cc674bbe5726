//! Keyframe tween engine.
//!
//! Every active [`AnimationSequence`] lives in the [`AnimationRegistry`] and
//! is advanced once per frame by [`AnimationRegistry::tick`]. Values reach
//! their targets through a [`ChannelSink`], which lets the same engine drive
//! live menu elements and global effect parameters.

use crate::action::ActionList;
use crate::easing::Easing;
use crate::stage::ElementKey;
use glam::Vec4;
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TrackValue {
    Scalar(f32),
    Color(Vec4),
}

impl TrackValue {
    pub fn zero_like(self) -> Self {
        match self {
            TrackValue::Scalar(_) => TrackValue::Scalar(0.0),
            TrackValue::Color(_) => TrackValue::Color(Vec4::ZERO),
        }
    }

    /// Component-wise sum; mismatched kinds keep `self`.
    pub fn offset_by(self, base: TrackValue) -> Self {
        match (self, base) {
            (TrackValue::Scalar(v), TrackValue::Scalar(b)) => TrackValue::Scalar(v + b),
            (TrackValue::Color(v), TrackValue::Color(b)) => TrackValue::Color(v + b),
            (value, _) => value,
        }
    }

    pub fn lerp(self, end: TrackValue, t: f32) -> Self {
        match (self, end) {
            (TrackValue::Scalar(a), TrackValue::Scalar(b)) => TrackValue::Scalar(a + (b - a) * t),
            (TrackValue::Color(a), TrackValue::Color(b)) => TrackValue::Color(a.lerp(b, t)),
            (start, _) => start,
        }
    }

    pub fn as_scalar(self) -> Option<f32> {
        match self {
            TrackValue::Scalar(v) => Some(v),
            TrackValue::Color(_) => None,
        }
    }

    pub fn as_color(self) -> Option<Vec4> {
        match self {
            TrackValue::Color(v) => Some(v),
            TrackValue::Scalar(_) => None,
        }
    }
}

/// Animatable property of a live element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    PositionX,
    PositionY,
    Width,
    Height,
    Rotation,
    Scale,
    ScaleX,
    ScaleY,
    Opacity,
    Color,
    Reveal,
}

impl Channel {
    pub fn from_name(name: &str) -> Option<Self> {
        let channel = match name.trim().to_ascii_lowercase().as_str() {
            "x" | "posx" | "pos_x" | "positionx" | "position_x" => Channel::PositionX,
            "y" | "posy" | "pos_y" | "positiony" | "position_y" => Channel::PositionY,
            "width" | "w" | "sizex" | "size_x" => Channel::Width,
            "height" | "h" | "sizey" | "size_y" => Channel::Height,
            "rotation" | "rot" | "angle" => Channel::Rotation,
            "scale" => Channel::Scale,
            "scalex" | "scale_x" => Channel::ScaleX,
            "scaley" | "scale_y" => Channel::ScaleY,
            "opacity" | "alpha" => Channel::Opacity,
            "color" | "colour" => Channel::Color,
            "reveal" | "text_reveal" => Channel::Reveal,
            _ => return None,
        };
        Some(channel)
    }

    pub fn is_color(self) -> bool {
        matches!(self, Channel::Color)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ChannelTarget {
    Element { key: ElementKey, channel: Channel },
    Effect(String),
}

impl ChannelTarget {
    pub fn element(&self) -> Option<ElementKey> {
        match self {
            ChannelTarget::Element { key, .. } => Some(*key),
            ChannelTarget::Effect(_) => None,
        }
    }
}

/// Where interpolated values are read from and written to.
pub trait ChannelSink {
    fn read(&self, target: &ChannelTarget) -> Option<TrackValue>;
    fn write(&mut self, target: &ChannelTarget, value: TrackValue);
}

#[derive(Clone, Debug, PartialEq)]
pub struct Keyframe<T> {
    pub time: f32,
    pub value: T,
    pub easing: Easing,
    pub relative: bool,
}

impl<T> Keyframe<T> {
    pub fn new(time: f32, value: T) -> Self {
        Self { time, value, easing: Easing::LINEAR, relative: false }
    }

    pub fn eased(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn relative(mut self, relative: bool) -> Self {
        self.relative = relative;
        self
    }
}

/// Absolute values for a keyframe chain in definition order.
///
/// A relative keyframe offsets the previous keyframe's resolved value; the
/// first keyframe offsets the live value of the channel instead.
pub fn resolve_chain(keyframes: &[Keyframe<TrackValue>], current: Option<TrackValue>) -> Vec<TrackValue> {
    let mut resolved: Vec<TrackValue> = Vec::with_capacity(keyframes.len());
    for frame in keyframes {
        let value = if frame.relative {
            let base = match resolved.last() {
                Some(previous) => *previous,
                None => current.unwrap_or_else(|| frame.value.zero_like()),
            };
            frame.value.offset_by(base)
        } else {
            frame.value
        };
        resolved.push(value);
    }
    resolved
}

#[derive(Clone, Debug)]
pub struct AnimationTrack {
    pub target: ChannelTarget,
    keyframes: Vec<Keyframe<TrackValue>>,
    samples: Vec<(f32, TrackValue, Easing)>,
}

impl AnimationTrack {
    pub fn new(target: ChannelTarget, keyframes: Vec<Keyframe<TrackValue>>) -> Self {
        Self { target, keyframes, samples: Vec::new() }
    }

    pub fn keyframes(&self) -> &[Keyframe<TrackValue>] {
        &self.keyframes
    }

    /// Resolved absolute values, sorted by time.
    pub fn resolved_values(&self) -> impl Iterator<Item = TrackValue> + '_ {
        self.samples.iter().map(|(_, value, _)| *value)
    }

    pub fn duration(&self) -> f32 {
        self.samples.last().map(|(time, _, _)| *time).unwrap_or(0.0)
    }

    fn resolve(&mut self, current: Option<TrackValue>) {
        let values = resolve_chain(&self.keyframes, current);
        let mut samples: Vec<(f32, TrackValue, Easing)> = self
            .keyframes
            .iter()
            .zip(values)
            .filter(|(frame, _)| frame.time.is_finite())
            .map(|(frame, value)| (frame.time.max(0.0), value, frame.easing))
            .collect();
        samples.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
        self.samples = samples;
    }

    /// Interpolated value at `time`; the destination keyframe's easing
    /// shapes each segment.
    pub fn sample(&self, time: f32) -> Option<TrackValue> {
        let first = self.samples.first()?;
        if time <= first.0 {
            return Some(first.1);
        }
        for window in self.samples.windows(2) {
            let (start, end) = (&window[0], &window[1]);
            if time < end.0 {
                let span = (end.0 - start.0).max(f32::EPSILON);
                let progress = ((time - start.0) / span).clamp(0.0, 1.0);
                return Some(start.1.lerp(end.1, end.2.apply(progress)));
            }
        }
        self.samples.last().map(|(_, value, _)| *value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SequenceId(u64);

impl SequenceId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// A named bundle of tracks. `owner` is the menu session that started it,
/// `None` for global sequences that survive menu changes.
#[derive(Clone, Debug)]
pub struct AnimationSequence {
    pub name: String,
    pub owner: Option<u64>,
    pub context: Option<ElementKey>,
    pub tracks: SmallVec<[AnimationTrack; 4]>,
    pub looped: bool,
    pub on_complete: ActionList,
    elapsed: f32,
    duration: f32,
}

impl AnimationSequence {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: None,
            context: None,
            tracks: SmallVec::new(),
            looped: false,
            on_complete: ActionList::default(),
            elapsed: 0.0,
            duration: 0.0,
        }
    }

    pub fn with_track(mut self, track: AnimationTrack) -> Self {
        self.tracks.push(track);
        self
    }

    pub fn looped(mut self, looped: bool) -> Self {
        self.looped = looped;
        self
    }

    pub fn on_complete(mut self, actions: ActionList) -> Self {
        self.on_complete = actions;
        self
    }

    pub fn owned_by(mut self, owner: Option<u64>) -> Self {
        self.owner = owner;
        self
    }

    pub fn with_context(mut self, context: Option<ElementKey>) -> Self {
        self.context = context;
        self
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn targets(&self, key: ElementKey) -> bool {
        self.context == Some(key) || self.tracks.iter().any(|track| track.target.element() == Some(key))
    }

    fn apply(&self, time: f32, sink: &mut dyn ChannelSink) {
        for track in &self.tracks {
            if let Some(value) = track.sample(time) {
                sink.write(&track.target, value);
            }
        }
    }
}

/// Follow-up work produced when a sequence finishes (or loops).
#[derive(Clone, Debug)]
pub struct Completion {
    pub id: SequenceId,
    pub name: String,
    pub owner: Option<u64>,
    pub context: Option<ElementKey>,
    pub actions: ActionList,
}

#[cfg(feature = "anim_stats")]
#[derive(Clone, Copy, Debug, Default)]
pub struct AnimationStats {
    pub ticks: u64,
    pub samples: u64,
    pub completed: u64,
}

#[derive(Default)]
pub struct AnimationRegistry {
    active: BTreeMap<SequenceId, AnimationSequence>,
    next_id: u64,
    #[cfg(feature = "anim_stats")]
    stats: AnimationStats,
}

impl AnimationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn get(&self, id: SequenceId) -> Option<&AnimationSequence> {
        self.active.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SequenceId, &AnimationSequence)> {
        self.active.iter().map(|(id, sequence)| (*id, sequence))
    }

    pub fn find(&self, context: ElementKey, name: &str) -> Option<SequenceId> {
        self.active
            .iter()
            .find(|(_, sequence)| sequence.context == Some(context) && sequence.name == name)
            .map(|(id, _)| *id)
    }

    #[cfg(feature = "anim_stats")]
    pub fn stats(&self) -> AnimationStats {
        self.stats
    }

    /// Resolves relative chains against the live channel values, writes the
    /// first frame and registers the sequence.
    pub fn play(&mut self, mut sequence: AnimationSequence, sink: &mut dyn ChannelSink) -> SequenceId {
        for track in sequence.tracks.iter_mut() {
            let current = sink.read(&track.target);
            track.resolve(current);
        }
        sequence.duration = sequence.tracks.iter().map(AnimationTrack::duration).fold(0.0, f32::max);
        sequence.elapsed = 0.0;
        sequence.apply(0.0, sink);
        let id = SequenceId(self.next_id);
        self.next_id += 1;
        tracing::debug!(
            "animation '{}' registered as #{} ({} tracks, {:.3}s)",
            sequence.name,
            id.0,
            sequence.tracks.len(),
            sequence.duration
        );
        self.active.insert(id, sequence);
        id
    }

    /// Deregisters `id`. With `invoke_completion` the sequence's completion
    /// is handed back for immediate execution.
    pub fn stop(&mut self, id: SequenceId, invoke_completion: bool) -> Option<Completion> {
        let sequence = self.active.remove(&id)?;
        if !invoke_completion || sequence.on_complete.is_empty() {
            return None;
        }
        Some(completion_of(id, &sequence))
    }

    /// Stops every sequence owned by a menu session without completions.
    pub fn stop_owned(&mut self, owner: u64) -> usize {
        let before = self.active.len();
        self.active.retain(|_, sequence| sequence.owner != Some(owner));
        before - self.active.len()
    }

    pub fn sequences_targeting(&self, key: ElementKey) -> Vec<SequenceId> {
        self.active.iter().filter(|(_, sequence)| sequence.targets(key)).map(|(id, _)| *id).collect()
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }

    /// Advances every sequence by `dt` and returns completions in
    /// registration order.
    pub fn tick(&mut self, dt: f32, sink: &mut dyn ChannelSink) -> Vec<Completion> {
        let mut completions = Vec::new();
        let mut finished = Vec::new();
        #[cfg(feature = "anim_stats")]
        {
            self.stats.ticks += 1;
        }
        for (id, sequence) in self.active.iter_mut() {
            sequence.elapsed += dt.max(0.0);
            let duration = sequence.duration;
            if sequence.elapsed < duration {
                sequence.apply(sequence.elapsed, sink);
                #[cfg(feature = "anim_stats")]
                {
                    self.stats.samples += sequence.tracks.len() as u64;
                }
                continue;
            }
            sequence.apply(duration, sink);
            if !sequence.on_complete.is_empty() {
                completions.push(completion_of(*id, sequence));
            }
            if sequence.looped {
                sequence.elapsed = if duration > 0.0 { sequence.elapsed % duration } else { 0.0 };
            } else {
                finished.push(*id);
            }
        }
        for id in finished {
            self.active.remove(&id);
            #[cfg(feature = "anim_stats")]
            {
                self.stats.completed += 1;
            }
        }
        completions
    }
}

fn completion_of(id: SequenceId, sequence: &AnimationSequence) -> Completion {
    Completion {
        id,
        name: sequence.name.clone(),
        owner: sequence.owner,
        context: sequence.context,
        actions: sequence.on_complete.clone(),
    }
}
