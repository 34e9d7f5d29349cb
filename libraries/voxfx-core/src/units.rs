//! Display units for catalog parameters
//!
//! Every parameter carries a unit tag that decides how its value is shown
//! to a control surface. Formatting is the only thing a unit does.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unit tag attached to a [`ParameterDescriptor`](crate::ParameterDescriptor)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    /// 0.0-1.0 shown as a whole percentage
    Percentage,
    /// Seconds, shown in ms below one second
    Time,
    /// Hertz, shown in kHz from 1000 up
    Frequency,
    /// Plain number with two decimals
    Decimal,
    /// Rate multiplier such as playback speed
    Multiplier,
}

impl Unit {
    /// Format a raw value for display
    ///
    /// ```
    /// use voxfx_core::Unit;
    ///
    /// assert_eq!(Unit::Percentage.format(0.3), "30%");
    /// assert_eq!(Unit::Time.format(0.25), "250ms");
    /// assert_eq!(Unit::Time.format(1.5), "1.50s");
    /// assert_eq!(Unit::Frequency.format(440.0), "440Hz");
    /// assert_eq!(Unit::Frequency.format(12_500.0), "12.5kHz");
    /// assert_eq!(Unit::Multiplier.format(1.5), "1.50x");
    /// ```
    pub fn format(self, value: f64) -> String {
        match self {
            Unit::Percentage => format!("{}%", (value * 100.0).round()),
            Unit::Time => {
                if value < 1.0 {
                    format!("{}ms", (value * 1000.0).round())
                } else {
                    format!("{:.2}s", value)
                }
            }
            Unit::Frequency => {
                if value >= 1000.0 {
                    format!("{:.1}kHz", value / 1000.0)
                } else {
                    format!("{}Hz", value.round())
                }
            }
            Unit::Decimal => format!("{:.2}", value),
            Unit::Multiplier => format!("{:.2}x", value),
        }
    }

    /// Tag as it appears in catalog JSON
    pub fn as_str(self) -> &'static str {
        match self {
            Unit::Percentage => "percentage",
            Unit::Time => "time",
            Unit::Frequency => "frequency",
            Unit::Decimal => "decimal",
            Unit::Multiplier => "multiplier",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_rounds_to_whole_numbers() {
        assert_eq!(Unit::Percentage.format(0.0), "0%");
        assert_eq!(Unit::Percentage.format(0.4), "40%");
        assert_eq!(Unit::Percentage.format(0.956), "96%");
        assert_eq!(Unit::Percentage.format(1.0), "100%");
    }

    #[test]
    fn test_time_switches_to_seconds_at_one() {
        assert_eq!(Unit::Time.format(0.0), "0ms");
        assert_eq!(Unit::Time.format(0.3), "300ms");
        assert_eq!(Unit::Time.format(0.999), "999ms");
        assert_eq!(Unit::Time.format(1.0), "1.00s");
        assert_eq!(Unit::Time.format(4.2), "4.20s");
    }

    #[test]
    fn test_frequency_switches_to_khz_at_1000() {
        assert_eq!(Unit::Frequency.format(100.0), "100Hz");
        assert_eq!(Unit::Frequency.format(999.4), "999Hz");
        assert_eq!(Unit::Frequency.format(1000.0), "1.0kHz");
        assert_eq!(Unit::Frequency.format(20_000.0), "20.0kHz");
    }

    #[test]
    fn test_decimal_and_multiplier() {
        assert_eq!(Unit::Decimal.format(0.5), "0.50");
        assert_eq!(Unit::Decimal.format(3.0), "3.00");
        assert_eq!(Unit::Multiplier.format(1.0), "1.00x");
        assert_eq!(Unit::Multiplier.format(0.75), "0.75x");
    }

    #[test]
    fn test_unit_serde_uses_lowercase_tags() {
        let unit: Unit = serde_json::from_str("\"frequency\"").unwrap();
        assert_eq!(unit, Unit::Frequency);
        assert_eq!(serde_json::to_string(&Unit::Multiplier).unwrap(), "\"multiplier\"");
        assert_eq!(Unit::Time.to_string(), "time");
    }
}
