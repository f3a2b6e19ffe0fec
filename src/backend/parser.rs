//! Telemetry line parser
//!
//! The device interleaves structured telemetry and free diagnostic text on a
//! single stream. A line is telemetry if and only if it starts with a known
//! channel marker (`Accel:`, `Gyro:`, `Enc:`); everything else is passed
//! through untouched as informational text.
//!
//! # Line Format
//!
//! ```text
//! Accel: [12,-5,300]; Gyro: [0,1,-1]
//! ```
//!
//! Segments are separated by `;`. Each segment holds exactly one bracketed,
//! comma-separated group of signed integers whose length matches the
//! channel's axis count. A telemetry line is accepted whole or rejected
//! whole: one bad segment discards the line.

use crate::error::ParseError;
use crate::types::{ParsedSample, Reading, SensorChannel, AXIS_COUNT};

/// Separator between channel segments on one line
pub const SEGMENT_DELIMITER: char = ';';

/// Separator between a channel marker and its values
pub const MARKER_DELIMITER: char = ':';

/// Result of classifying one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// A telemetry line with every selected channel present
    Sample(ParsedSample),
    /// Free text without a channel marker
    Info(String),
}

/// Parses telemetry lines against a fixed channel schema
#[derive(Debug, Clone)]
pub struct SampleParser {
    schema: Vec<SensorChannel>,
}

impl SampleParser {
    /// Create a parser that requires the given channels, in this order
    ///
    /// Duplicates in `channels` are dropped, keeping the first occurrence.
    pub fn new(channels: &[SensorChannel]) -> Self {
        let mut schema = Vec::with_capacity(channels.len());
        for channel in channels {
            if !schema.contains(channel) {
                schema.push(*channel);
            }
        }
        Self { schema }
    }

    /// Channels every telemetry line must carry, in column order
    pub fn schema(&self) -> &[SensorChannel] {
        &self.schema
    }

    /// Whether the line starts with a known channel marker
    pub fn is_telemetry(line: &str) -> bool {
        line.trim_start()
            .split_once(MARKER_DELIMITER)
            .is_some_and(|(prefix, _)| SensorChannel::from_prefix(prefix.trim()).is_some())
    }

    /// Classify and parse one decoded line
    pub fn parse(&self, line: &str) -> Result<ParsedLine, ParseError> {
        if !Self::is_telemetry(line) {
            return Ok(ParsedLine::Info(line.to_string()));
        }

        let mut slots: Vec<Option<[i32; AXIS_COUNT]>> = vec![None; self.schema.len()];

        for segment in line.split(SEGMENT_DELIMITER) {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }

            let (channel, values) = parse_segment(segment)?;

            // Channels the device reports but the operator did not select are
            // validated, then dropped.
            let Some(slot) = self.schema.iter().position(|c| *c == channel) else {
                continue;
            };
            if slots[slot].is_some() {
                return Err(ParseError::DuplicateChannel(channel));
            }
            slots[slot] = Some(values);
        }

        let mut readings = Vec::with_capacity(self.schema.len());
        for (channel, slot) in self.schema.iter().zip(slots) {
            match slot {
                Some(values) => readings.push(Reading::new(*channel, values)),
                None => return Err(ParseError::MissingChannel(*channel)),
            }
        }

        Ok(ParsedLine::Sample(ParsedSample::new(readings)))
    }
}

/// Parse `<prefix>: [v0,v1,v2]`
fn parse_segment(segment: &str) -> Result<(SensorChannel, [i32; AXIS_COUNT]), ParseError> {
    let malformed = || ParseError::MalformedSegment {
        segment: segment.to_string(),
    };

    let (prefix, body) = segment.split_once(MARKER_DELIMITER).ok_or_else(malformed)?;
    let channel = SensorChannel::from_prefix(prefix.trim()).ok_or_else(malformed)?;

    let body = body.trim();
    let inner = body
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(malformed)?;
    if inner.contains(['[', ']']) {
        return Err(malformed());
    }

    let tokens: Vec<&str> = if inner.trim().is_empty() {
        Vec::new()
    } else {
        inner.split(',').map(str::trim).collect()
    };

    if tokens.len() != channel.axis_count() {
        return Err(ParseError::AxisCountMismatch {
            channel,
            expected: channel.axis_count(),
            actual: tokens.len(),
        });
    }

    let mut values = [0i32; AXIS_COUNT];
    for (value, token) in values.iter_mut().zip(tokens) {
        *value = token.parse().map_err(|_| ParseError::NumericFormat {
            token: token.to_string(),
        })?;
    }

    Ok((channel, values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseErrorKind;

    fn accel_parser() -> SampleParser {
        SampleParser::new(&[SensorChannel::Accelerometer])
    }

    fn expect_sample(parser: &SampleParser, line: &str) -> ParsedSample {
        match parser.parse(line) {
            Ok(ParsedLine::Sample(sample)) => sample,
            other => panic!("expected sample for {:?}, got {:?}", line, other),
        }
    }

    fn expect_error(parser: &SampleParser, line: &str) -> ParseErrorKind {
        match parser.parse(line) {
            Err(e) => e.kind(),
            other => panic!("expected error for {:?}, got {:?}", line, other),
        }
    }

    #[test]
    fn test_single_channel_line() {
        let sample = expect_sample(&accel_parser(), "Accel: [12,-5,300]");
        assert_eq!(
            sample.readings,
            vec![Reading::new(SensorChannel::Accelerometer, [12, -5, 300])]
        );
    }

    #[test]
    fn test_whitespace_tolerance() {
        let sample = expect_sample(&accel_parser(), "  Accel :[ 1 , 2,3 ]  ");
        assert_eq!(sample.readings[0].values, [1, 2, 3]);
    }

    #[test]
    fn test_multi_channel_line_follows_schema_order() {
        let parser = SampleParser::new(&[SensorChannel::Gyroscope, SensorChannel::Accelerometer]);
        let sample = expect_sample(&parser, "Accel: [1,2,3]; Gyro: [4,5,6]");
        let channels: Vec<_> = sample.channels().collect();
        assert_eq!(channels, vec![SensorChannel::Gyroscope, SensorChannel::Accelerometer]);
        assert_eq!(sample.reading(SensorChannel::Gyroscope).unwrap().values, [4, 5, 6]);
    }

    #[test]
    fn test_unselected_channel_is_ignored() {
        let sample = expect_sample(&accel_parser(), "Accel: [1,2,3]; Enc: [7,8,9]");
        assert_eq!(sample.readings.len(), 1);
    }

    #[test]
    fn test_free_text_is_info() {
        let parser = accel_parser();
        assert_eq!(
            parser.parse("Gibberish text").unwrap(),
            ParsedLine::Info("Gibberish text".into())
        );
        assert_eq!(
            parser.parse("Note: calibrating [done]").unwrap(),
            ParsedLine::Info("Note: calibrating [done]".into())
        );
        assert_eq!(parser.parse("").unwrap(), ParsedLine::Info(String::new()));
    }

    #[test]
    fn test_missing_brackets() {
        let parser = accel_parser();
        assert_eq!(expect_error(&parser, "Accel: 1,2,3"), ParseErrorKind::MalformedSegment);
        assert_eq!(expect_error(&parser, "Accel: [1,2,3"), ParseErrorKind::MalformedSegment);
        assert_eq!(
            expect_error(&parser, "Accel: [1,2,3]; Gyro 4,5,6"),
            ParseErrorKind::MalformedSegment
        );
        assert_eq!(
            expect_error(&parser, "Accel: [[1,2,3]]"),
            ParseErrorKind::MalformedSegment
        );
    }

    #[test]
    fn test_unknown_prefix_inside_telemetry_line() {
        assert_eq!(
            expect_error(&accel_parser(), "Accel: [1,2,3]; Mag: [1,2,3]"),
            ParseErrorKind::MalformedSegment
        );
    }

    #[test]
    fn test_axis_count_mismatch() {
        let parser = accel_parser();
        match parser.parse("Accel: [1,2]") {
            Err(ParseError::AxisCountMismatch {
                channel,
                expected,
                actual,
            }) => {
                assert_eq!(channel, SensorChannel::Accelerometer);
                assert_eq!(expected, 3);
                assert_eq!(actual, 2);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(expect_error(&parser, "Accel: []"), ParseErrorKind::AxisCountMismatch);
        assert_eq!(
            expect_error(&parser, "Accel: [1,2,3,4]"),
            ParseErrorKind::AxisCountMismatch
        );
    }

    #[test]
    fn test_numeric_format() {
        let parser = accel_parser();
        match parser.parse("Accel: [1,2.5,3]") {
            Err(ParseError::NumericFormat { token }) => assert_eq!(token, "2.5"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(expect_error(&parser, "Accel: [1,,3]"), ParseErrorKind::NumericFormat);
        assert_eq!(
            expect_error(&parser, "Accel: [1,2,99999999999]"),
            ParseErrorKind::NumericFormat
        );
    }

    #[test]
    fn test_bad_unselected_segment_still_discards_line() {
        assert_eq!(
            expect_error(&accel_parser(), "Accel: [1,2,3]; Gyro: [x,2,3]"),
            ParseErrorKind::NumericFormat
        );
    }

    #[test]
    fn test_missing_and_duplicate_channels() {
        let parser = SampleParser::new(&[SensorChannel::Accelerometer, SensorChannel::Gyroscope]);
        assert_eq!(expect_error(&parser, "Accel: [1,2,3]"), ParseErrorKind::MissingChannel);
        assert_eq!(
            expect_error(&parser, "Gyro: [1,2,3]; Gyro: [1,2,3]; Accel: [1,2,3]"),
            ParseErrorKind::DuplicateChannel
        );
    }

    #[test]
    fn test_trailing_delimiter_allowed() {
        let sample = expect_sample(&accel_parser(), "Accel: [1,2,3];");
        assert_eq!(sample.readings[0].values, [1, 2, 3]);
    }

    #[test]
    fn test_schema_dedup() {
        let parser = SampleParser::new(&[
            SensorChannel::Encoders,
            SensorChannel::Encoders,
            SensorChannel::Gyroscope,
        ]);
        assert_eq!(parser.schema(), &[SensorChannel::Encoders, SensorChannel::Gyroscope]);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn channel_strategy() -> impl Strategy<Value = SensorChannel> {
            prop::sample::select(SensorChannel::all().to_vec())
        }

        proptest! {
            #[test]
            fn valid_lines_parse_to_their_values(
                channel in channel_strategy(),
                values in prop::array::uniform3(any::<i32>()),
            ) {
                let parser = SampleParser::new(&[channel]);
                let line = format!(
                    "{}: [{},{},{}]",
                    channel.prefix(), values[0], values[1], values[2]
                );
                let parsed = parser.parse(&line).unwrap();
                prop_assert_eq!(
                    parsed,
                    ParsedLine::Sample(ParsedSample::new(vec![Reading::new(channel, values)]))
                );
            }

            #[test]
            fn wrong_axis_counts_are_rejected(
                values in prop::collection::vec(any::<i32>(), 0..8)
                    .prop_filter("not three", |v| v.len() != AXIS_COUNT),
            ) {
                let body: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                let line = format!("Accel: [{}]", body.join(","));
                let err = accel_parser().parse(&line).unwrap_err();
                prop_assert_eq!(err.kind(), ParseErrorKind::AxisCountMismatch);
            }

            #[test]
            fn text_without_marker_is_info(text in "[a-z ]{0,40}") {
                let parsed = accel_parser().parse(&text).unwrap();
                prop_assert_eq!(parsed, ParsedLine::Info(text));
            }
        }
    }
}
