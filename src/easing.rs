use std::f32::consts::{FRAC_PI_2, PI};
use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EasingStyle {
    #[default]
    Linear,
    Step,
    Sine,
    Quad,
    Cubic,
    Quart,
    Quint,
    Expo,
    Circ,
    Back,
    Elastic,
    Bounce,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EasingDirection {
    In,
    #[default]
    Out,
    InOut,
}

/// Named easing curve, e.g. `"OutQuad"`, `"EaseInOutBack"`, `"Linear"`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Easing {
    pub style: EasingStyle,
    pub direction: EasingDirection,
}

impl Easing {
    pub const LINEAR: Easing = Easing { style: EasingStyle::Linear, direction: EasingDirection::Out };

    pub fn new(style: EasingStyle, direction: EasingDirection) -> Self {
        Self { style, direction }
    }

    /// Parses a curve identifier. Unknown names fall back to linear.
    pub fn from_name(name: &str) -> Self {
        Self::parse(name).unwrap_or_else(|| {
            tracing::debug!("unknown easing '{name}', using Linear");
            Self::LINEAR
        })
    }

    pub fn parse(name: &str) -> Option<Self> {
        let trimmed = name.trim();
        let lowered = trimmed.to_ascii_lowercase();
        let mut rest = lowered.strip_prefix("ease").unwrap_or(&lowered);
        rest = rest.trim_start_matches(|ch: char| ch == '_' || ch == '-');
        let direction = if let Some(tail) = rest.strip_prefix("inout") {
            rest = tail;
            EasingDirection::InOut
        } else if let Some(tail) = rest.strip_prefix("in") {
            rest = tail;
            EasingDirection::In
        } else if let Some(tail) = rest.strip_prefix("out") {
            rest = tail;
            EasingDirection::Out
        } else {
            EasingDirection::Out
        };
        let style = match rest.trim_start_matches(|ch: char| ch == '_' || ch == '-') {
            "" | "linear" => EasingStyle::Linear,
            "step" | "constant" => EasingStyle::Step,
            "sine" => EasingStyle::Sine,
            "quad" => EasingStyle::Quad,
            "cubic" => EasingStyle::Cubic,
            "quart" => EasingStyle::Quart,
            "quint" => EasingStyle::Quint,
            "expo" | "exponential" => EasingStyle::Expo,
            "circ" | "circular" => EasingStyle::Circ,
            "back" => EasingStyle::Back,
            "elastic" => EasingStyle::Elastic,
            "bounce" => EasingStyle::Bounce,
            _ => return None,
        };
        Some(Self { style, direction })
    }

    /// Maps progress `t` in `[0, 1]` through the curve.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self.style {
            EasingStyle::Linear => return t,
            EasingStyle::Step => return if t >= 1.0 { 1.0 } else { 0.0 },
            _ => {}
        }
        match self.direction {
            EasingDirection::In => ease_in(t, self.style),
            EasingDirection::Out => 1.0 - ease_in(1.0 - t, self.style),
            EasingDirection::InOut => {
                if t < 0.5 {
                    ease_in(t * 2.0, self.style) / 2.0
                } else {
                    1.0 - ease_in((1.0 - t) * 2.0, self.style) / 2.0
                }
            }
        }
    }
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.style {
            EasingStyle::Linear => write!(f, "Linear"),
            EasingStyle::Step => write!(f, "Step"),
            style => write!(f, "{:?}{:?}", self.direction, style),
        }
    }
}

fn ease_in(t: f32, style: EasingStyle) -> f32 {
    match style {
        EasingStyle::Linear => t,
        EasingStyle::Step => {
            if t >= 1.0 {
                1.0
            } else {
                0.0
            }
        }
        EasingStyle::Sine => 1.0 - (t * FRAC_PI_2).cos(),
        EasingStyle::Quad => t * t,
        EasingStyle::Cubic => t * t * t,
        EasingStyle::Quart => t * t * t * t,
        EasingStyle::Quint => t * t * t * t * t,
        EasingStyle::Expo => {
            if t == 0.0 {
                0.0
            } else {
                2.0_f32.powf(10.0 * (t - 1.0))
            }
        }
        EasingStyle::Circ => 1.0 - (1.0 - t * t).max(0.0).sqrt(),
        EasingStyle::Back => t * t * (2.70158 * t - 1.70158),
        EasingStyle::Elastic => {
            if t == 0.0 || t == 1.0 {
                t
            } else {
                -(2.0_f32.powf(10.0 * (t - 1.0))) * ((t - 1.1) * 5.0 * PI).sin()
            }
        }
        EasingStyle::Bounce => 1.0 - bounce_out(1.0 - t),
    }
}

fn bounce_out(t: f32) -> f32 {
    if t < 1.0 / 2.75 {
        7.5625 * t * t
    } else if t < 2.0 / 2.75 {
        let t = t - 1.5 / 2.75;
        7.5625 * t * t + 0.75
    } else if t < 2.5 / 2.75 {
        let t = t - 2.25 / 2.75;
        7.5625 * t * t + 0.9375
    } else {
        let t = t - 2.625 / 2.75;
        7.5625 * t * t + 0.984375
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefixed_and_bare_names() {
        assert_eq!(Easing::from_name("OutQuad"), Easing::new(EasingStyle::Quad, EasingDirection::Out));
        assert_eq!(Easing::from_name("EaseInOutBack"), Easing::new(EasingStyle::Back, EasingDirection::InOut));
        assert_eq!(Easing::from_name("in_cubic"), Easing::new(EasingStyle::Cubic, EasingDirection::In));
        assert_eq!(Easing::from_name("Linear").style, EasingStyle::Linear);
        assert_eq!(Easing::from_name("wobble"), Easing::LINEAR);
    }

    #[test]
    fn curves_hit_endpoints() {
        for name in ["InQuad", "OutCubic", "InOutSine", "OutBounce", "InExpo", "OutElastic", "InOutCirc"] {
            let easing = Easing::from_name(name);
            assert!(easing.apply(0.0).abs() < 1e-4, "{name} should start at 0");
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-4, "{name} should end at 1");
        }
    }

    #[test]
    fn step_holds_until_the_end() {
        let step = Easing::from_name("Step");
        assert_eq!(step.apply(0.99), 0.0);
        assert_eq!(step.apply(1.0), 1.0);
    }
}
