use serde::{Deserialize, Serialize};

/// Week-over-week direction of a training volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeTrend {
    /// No previous value to compare against.
    None,
    Up,
    Down,
    Flat,
}

impl VolumeTrend {
    pub fn symbol(self) -> &'static str {
        match self {
            VolumeTrend::None => "",
            VolumeTrend::Up => "\u{25B2}",
            VolumeTrend::Down => "\u{25BC}",
            VolumeTrend::Flat => "\u{2013}",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            VolumeTrend::None => "",
            VolumeTrend::Up => "up",
            VolumeTrend::Down => "down",
            VolumeTrend::Flat => "flat",
        }
    }
}

/// Compare the current volume against last week's.
pub fn classify(current: f64, previous: Option<f64>) -> VolumeTrend {
    match previous {
        None => VolumeTrend::None,
        Some(p) if current > p => VolumeTrend::Up,
        Some(p) if current < p => VolumeTrend::Down,
        Some(_) => VolumeTrend::Flat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_examples() {
        assert_eq!(classify(480.0, Some(450.0)), VolumeTrend::Up);
        assert_eq!(classify(420.0, Some(480.0)), VolumeTrend::Down);
        assert_eq!(classify(480.0, Some(480.0)), VolumeTrend::Flat);
        assert_eq!(classify(480.0, None), VolumeTrend::None);
    }

    #[test]
    fn zero_previous_is_a_real_value() {
        assert_eq!(classify(0.0, Some(0.0)), VolumeTrend::Flat);
        assert_eq!(classify(10.0, Some(0.0)), VolumeTrend::Up);
    }

    #[test]
    fn symbols_match_direction() {
        assert_eq!(VolumeTrend::None.symbol(), "");
        assert_eq!(VolumeTrend::Up.symbol(), "\u{25B2}");
        assert_eq!(VolumeTrend::Down.label(), "down");
    }
}
