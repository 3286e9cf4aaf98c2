/// Converts externally supplied time deltas into discrete beat ticks.
///
/// The clock never reads a wall clock. Feeding it the same sequence of
/// deltas always produces the same beat positions.
#[derive(Debug, Clone)]
pub struct BeatClock {
    bpm: f32,
    beats: u32,
    speed: f32,
    beat_duration: f32,
    accumulated: f32,
    beat: u32,
    triggered: bool,
}

impl BeatClock {
    /// Creates a clock running at `bpm` with `beats` beats per encounter and
    /// a speed multiplier of `1.0`.
    pub fn new(bpm: f32, beats: u32) -> Self {
        Self {
            bpm,
            beats: beats.max(1),
            speed: 1.0,
            beat_duration: 60.0 / bpm,
            accumulated: 0.0,
            beat: 0,
            triggered: false,
        }
    }

    pub fn beat_index(&self) -> u32 {
        self.beat
    }

    /// Whether the most recent update crossed at least one beat boundary or
    /// the clock was re-synchronised since then.
    pub fn triggered(&self) -> bool {
        self.triggered
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Seconds per beat at the current speed. Holds the last valid value
    /// while the clock is paused.
    pub fn beat_duration(&self) -> f32 {
        self.beat_duration
    }

    /// Time carried over since the last beat boundary.
    pub fn accumulated(&self) -> f32 {
        self.accumulated
    }

    pub fn is_paused(&self) -> bool {
        self.speed <= 0.0
    }

    /// Changes the speed multiplier. Negative values are treated as `0`,
    /// which pauses the clock. Accumulated time is kept.
    pub fn set_speed(&mut self, speed: f32) {
        let speed = speed.max(0.0);
        if self.speed == speed {
            return;
        }
        self.speed = speed;
        if speed > 0.0 {
            self.beat_duration = 60.0 / (self.bpm * speed);
        }
    }

    /// Advances the clock by `delta` seconds and returns whether a beat fired.
    ///
    /// Crossing several boundaries in one update moves the beat index by the
    /// number of crossings but still fires a single event. Non-finite deltas
    /// are ignored.
    pub fn advance(&mut self, delta: f32) -> bool {
        self.triggered = false;
        if self.is_paused() || !delta.is_finite() {
            return false;
        }

        self.accumulated += delta.max(0.0);
        if self.accumulated >= self.beat_duration {
            let crossed = (self.accumulated / self.beat_duration).floor();
            let steps = crossed as u64 % self.beats as u64;
            self.beat = ((self.beat as u64 + steps) % self.beats as u64) as u32;
            self.accumulated = self.accumulated.rem_euclid(self.beat_duration);
            self.triggered = true;
        }
        self.triggered
    }

    /// Forces re-synchronisation to beat zero and fires a beat event for the
    /// current update.
    pub fn reset(&mut self) {
        self.accumulated = 0.0;
        self.beat = 0;
        self.triggered = true;
    }

    /// Drops a pending beat event without moving the clock.
    pub fn clear_trigger(&mut self) {
        self.triggered = false;
    }
}
