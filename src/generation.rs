//! Cooperative element generation.
//!
//! A [`Generation`] is the explicit state of one menu session's build: a
//! cursor into the element list, the time at which a suspended build may
//! resume, and the frame it was opened on. The runtime drives it once per
//! tick and re-checks the session token before each element.

use crate::descriptor::GenerationState;

#[derive(Clone, Debug)]
pub struct Generation {
    session: u64,
    state: GenerationState,
    cursor: usize,
    resume_at: f64,
    opened_frame: u64,
}

/// What the runtime should do next for this session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenerationStep {
    /// Not started yet, or suspended.
    Idle,
    /// Process the element at this index.
    Element(usize),
    /// Every element has been processed.
    Finished,
}

impl Generation {
    pub fn new(session: u64, opened_frame: u64) -> Self {
        Self { session, state: GenerationState::NotStarted, cursor: 0, resume_at: 0.0, opened_frame }
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn state(&self) -> GenerationState {
        self.state
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_suspended(&self, now: f64) -> bool {
        self.state == GenerationState::Generating && now + 1e-6 < self.resume_at
    }

    /// Next step at clock time `now` on `frame`, given `len` elements.
    /// A session opened on the current frame starts on the next one.
    pub fn next(&mut self, now: f64, frame: u64, len: usize) -> GenerationStep {
        match self.state {
            GenerationState::NotStarted => {
                if frame <= self.opened_frame {
                    return GenerationStep::Idle;
                }
                self.state = GenerationState::Generating;
            }
            GenerationState::Generating => {}
            GenerationState::Open | GenerationState::Closed => return GenerationStep::Idle,
        }
        if self.is_suspended(now) {
            return GenerationStep::Idle;
        }
        if self.cursor >= len {
            self.state = GenerationState::Open;
            return GenerationStep::Finished;
        }
        let index = self.cursor;
        self.cursor += 1;
        GenerationStep::Element(index)
    }

    /// Holds the build until `now + seconds`. Non-finite lengths never
    /// resume.
    pub fn suspend(&mut self, now: f64, seconds: f32) {
        if seconds > 0.0 {
            self.resume_at = if seconds.is_finite() { now + seconds as f64 } else { f64::INFINITY };
        }
    }

    /// Keeps the cursor on the same pending element after the descriptor
    /// list lost the entry at `index`.
    pub fn element_removed(&mut self, index: usize) {
        if index < self.cursor {
            self.cursor -= 1;
        }
    }

    pub fn close(&mut self) {
        self.state = GenerationState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_on_the_frame_after_open() {
        let mut generation = Generation::new(1, 4);
        assert_eq!(generation.next(0.0, 4, 2), GenerationStep::Idle);
        assert_eq!(generation.state(), GenerationState::NotStarted);
        assert_eq!(generation.next(0.1, 5, 2), GenerationStep::Element(0));
        assert_eq!(generation.state(), GenerationState::Generating);
    }

    #[test]
    fn suspension_holds_until_resume_time() {
        let mut generation = Generation::new(1, 0);
        assert_eq!(generation.next(0.25, 1, 2), GenerationStep::Element(0));
        generation.suspend(0.25, 0.5);
        assert_eq!(generation.next(0.5, 2, 2), GenerationStep::Idle);
        assert_eq!(generation.next(0.75, 3, 2), GenerationStep::Element(1));
        assert_eq!(generation.next(0.75, 3, 2), GenerationStep::Finished);
        assert_eq!(generation.state(), GenerationState::Open);
        assert_eq!(generation.next(1.0, 4, 2), GenerationStep::Idle);
    }

    #[test]
    fn removal_behind_the_cursor_keeps_the_next_element() {
        let mut generation = Generation::new(1, 0);
        assert_eq!(generation.next(0.0, 1, 4), GenerationStep::Element(0));
        assert_eq!(generation.next(0.0, 1, 4), GenerationStep::Element(1));
        generation.element_removed(0);
        assert_eq!(generation.next(0.0, 1, 3), GenerationStep::Element(1));
        generation.element_removed(2);
        assert_eq!(generation.next(0.0, 1, 2), GenerationStep::Finished);
    }

    #[test]
    fn infinite_length_never_resumes() {
        let mut generation = Generation::new(1, 0);
        generation.next(0.0, 1, 2);
        generation.suspend(0.0, f32::INFINITY);
        assert_eq!(generation.next(1.0e9, 2, 2), GenerationStep::Idle);
    }
}
