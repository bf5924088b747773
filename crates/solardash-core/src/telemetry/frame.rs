//! Telemetry frame
//!
//! Latest raw value per recognized channel, kept in the configured channel
//! order so the display string is stable regardless of arrival order.

use serde::{Deserialize, Serialize};

use super::NOT_AVAILABLE;

/// Display scaling applied to one channel (e.g. millivolts to volts)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelScale {
    /// Channel tag the rule applies to
    pub channel: String,
    /// Raw value is divided by this before display
    pub divisor: f64,
}

impl ChannelScale {
    /// Create a scaling rule
    pub fn new(channel: impl Into<String>, divisor: f64) -> Self {
        Self {
            channel: channel.into(),
            divisor,
        }
    }

    fn apply(&self, raw: &str) -> Option<f64> {
        raw.trim().parse::<f64>().ok().map(|v| v / self.divisor)
    }
}

/// Raw values keyed by recognized channel tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryFrame {
    entries: Vec<(String, Option<String>)>,
}

impl TelemetryFrame {
    /// Create a frame recognizing `channels`, in that display order
    ///
    /// Duplicate tags are ignored after their first occurrence.
    pub fn new<I, S>(channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut entries: Vec<(String, Option<String>)> = Vec::new();
        for tag in channels {
            let tag = tag.into();
            if !entries.iter().any(|(t, _)| *t == tag) {
                entries.push((tag, None));
            }
        }
        Self { entries }
    }

    /// Whether `tag` is one of the recognized channels
    pub fn is_recognized(&self, tag: &str) -> bool {
        self.entries.iter().any(|(t, _)| t == tag)
    }

    /// Recognized channel tags in display order
    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(t, _)| t.as_str())
    }

    /// Raw value of a channel
    ///
    /// Returns `None` for unrecognized tags and the "not available" marker
    /// for recognized channels that have not been received yet.
    pub fn get(&self, tag: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(t, _)| t == tag)
            .map(|(_, v)| v.as_deref().unwrap_or(NOT_AVAILABLE))
    }

    /// Overwrite a channel value; returns false (and stores nothing) for
    /// unrecognized tags
    pub fn set(&mut self, tag: &str, value: impl Into<String>) -> bool {
        match self.entries.iter_mut().find(|(t, _)| t == tag) {
            Some((_, slot)) => {
                *slot = Some(value.into());
                true
            }
            None => false,
        }
    }

    /// Channel value after display scaling, if numeric
    pub fn scaled_value(&self, tag: &str, scale: Option<&ChannelScale>) -> Option<f64> {
        let raw = self.entries.iter().find(|(t, _)| t == tag)?.1.as_deref()?;
        match scale {
            Some(scale) if scale.channel == tag => scale.apply(raw),
            _ => raw.trim().parse().ok(),
        }
    }

    /// Render every channel as `TAG: value | ` in display order
    pub fn display_string(&self, scale: Option<&ChannelScale>) -> String {
        let mut out = String::new();
        for (tag, value) in &self.entries {
            let shown = match (value.as_deref(), scale) {
                (None, _) => NOT_AVAILABLE.to_string(),
                (Some(raw), Some(scale)) if scale.channel == *tag => match scale.apply(raw) {
                    Some(v) => format!("{v:?}"),
                    None => raw.to_string(),
                },
                (Some(raw), _) => raw.to_string(),
            };
            out.push_str(&format!("{tag}: {shown} | "));
        }
        out
    }

    /// Forget all received values
    pub fn clear(&mut self) {
        for (_, value) in &mut self.entries {
            *value = None;
        }
    }
}

impl Default for TelemetryFrame {
    fn default() -> Self {
        Self::new(super::DEFAULT_CHANNELS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unset_channels_not_available() {
        let frame = TelemetryFrame::default();
        assert_eq!(frame.get("V"), Some("NA"));
        assert_eq!(frame.get("X"), None);
        assert_eq!(frame.display_string(None), "V: NA | I: NA | PPV: NA | ");
    }

    #[test]
    fn test_fixed_display_order() {
        let mut frame = TelemetryFrame::new(["V", "I", "PPV"]);
        frame.set("PPV", "42");
        frame.set("I", "-150");
        frame.set("V", "12650");

        let scale = ChannelScale::new("V", 1000.0);
        assert_eq!(
            frame.display_string(Some(&scale)),
            "V: 12.65 | I: -150 | PPV: 42 | "
        );
    }

    #[test]
    fn test_scaled_value_keeps_fraction() {
        let mut frame = TelemetryFrame::default();
        frame.set("V", "12000");
        let scale = ChannelScale::new("V", 1000.0);

        assert_eq!(frame.scaled_value("V", Some(&scale)), Some(12.0));
        assert!(frame.display_string(Some(&scale)).starts_with("V: 12.0 | "));
    }

    #[test]
    fn test_non_numeric_scaled_channel_shown_raw() {
        let mut frame = TelemetryFrame::default();
        frame.set("V", "---");
        let scale = ChannelScale::new("V", 1000.0);

        assert!(frame.display_string(Some(&scale)).starts_with("V: --- | "));
        assert_eq!(frame.scaled_value("V", Some(&scale)), None);
    }

    #[test]
    fn test_unrecognized_set_is_dropped() {
        let mut frame = TelemetryFrame::default();
        assert!(!frame.set("SER#", "HQ1234"));
        assert_eq!(frame, TelemetryFrame::default());
    }

    #[test]
    fn test_duplicate_channels_collapse() {
        let frame = TelemetryFrame::new(["V", "V", "I"]);
        assert_eq!(frame.channels().collect::<Vec<_>>(), vec!["V", "I"]);
    }
}
