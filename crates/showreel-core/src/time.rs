use serde::{Deserialize, Serialize};
use std::fmt;

/// A timer delay in whole milliseconds, the unit browser timers take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Delay {
    millis: u32,
}

impl Delay {
    /// Create a delay from milliseconds.
    pub const fn from_millis(millis: u32) -> Self {
        Self { millis }
    }

    /// Get the delay as milliseconds.
    pub const fn as_millis(&self) -> u32 {
        self.millis
    }
}

impl fmt::Display for Delay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.millis < 1000 {
            write!(f, "{}ms", self.millis)
        } else {
            write!(f, "{:.2}s", f64::from(self.millis) / 1000.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_display() {
        assert_eq!(format!("{}", Delay::from_millis(600)), "600ms");
        assert_eq!(format!("{}", Delay::from_millis(3500)), "3.50s");
    }

    #[test]
    fn test_delay_serde_is_plain_number() {
        let d: Delay = serde_json::from_str("1600").unwrap();
        assert_eq!(d, Delay::from_millis(1600));
        assert_eq!(serde_json::to_string(&d).unwrap(), "1600");
    }
}
