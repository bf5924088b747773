//! Telemetry line ingest

use super::{ChannelScale, ParseError, TelemetryFrame, SEPARATOR};

/// One successfully parsed `TAG<TAB>VALUE` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryRecord {
    /// Channel tag
    pub tag: String,
    /// Raw value text
    pub value: String,
    /// Whether the tag is recognized and the frame was updated
    pub stored: bool,
}

/// Split a telemetry line into tag and value
///
/// Surrounding whitespace (including the line terminator) is removed first.
/// The line must contain exactly one separator.
pub fn parse_line(line: &str) -> Result<(&str, &str), ParseError> {
    let trimmed = line.trim();
    let mut parts = trimmed.split(SEPARATOR);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(tag), Some(value), None) => Ok((tag, value)),
        _ => Err(ParseError::MalformedFrame(trimmed.to_string())),
    }
}

/// Assembles the telemetry frame from incoming lines
#[derive(Debug, Clone)]
pub struct TelemetryIngest {
    frame: TelemetryFrame,
    scale: Option<ChannelScale>,
}

impl TelemetryIngest {
    /// Create an ingest over an empty frame
    pub fn new(frame: TelemetryFrame, scale: Option<ChannelScale>) -> Self {
        Self { frame, scale }
    }

    /// Parse one line and update the frame
    ///
    /// Malformed lines fail and leave the frame untouched. Lines with an
    /// unrecognized tag parse fine but are dropped.
    pub fn ingest(&mut self, line: &str) -> Result<TelemetryRecord, ParseError> {
        let (tag, value) = parse_line(line)?;
        let stored = self.frame.set(tag, value);
        Ok(TelemetryRecord {
            tag: tag.to_string(),
            value: value.to_string(),
            stored,
        })
    }

    /// Current frame
    pub fn frame(&self) -> &TelemetryFrame {
        &self.frame
    }

    /// Display scaling rule
    pub fn scale(&self) -> Option<&ChannelScale> {
        self.scale.as_ref()
    }

    /// Render the frame for display
    pub fn display_string(&self) -> String {
        self.frame.display_string(self.scale.as_ref())
    }
}

impl Default for TelemetryIngest {
    fn default() -> Self {
        Self::new(
            TelemetryFrame::default(),
            Some(ChannelScale::new(super::DEFAULT_SCALED_CHANNEL, super::DEFAULT_SCALE_DIVISOR)),
        )
    }
}
