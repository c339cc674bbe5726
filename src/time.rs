/// Simulated clock advanced by the runtime's `tick(dt)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Clock {
    elapsed: f64,
    delta: f32,
    frame: u64,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self, dt: f32) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.delta = dt;
        self.elapsed += dt as f64;
        self.frame += 1;
    }

    pub fn delta_seconds(&self) -> f32 {
        self.delta
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_and_nan_steps_are_ignored() {
        let mut clock = Clock::new();
        clock.tick(0.5);
        clock.tick(-1.0);
        clock.tick(f32::NAN);
        assert_eq!(clock.elapsed_seconds(), 0.5);
        assert_eq!(clock.frame(), 3);
        assert_eq!(clock.delta_seconds(), 0.0);
    }
}
