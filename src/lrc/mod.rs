//! LRC format parser and timed lookup
//!
//! Parses synchronized lyrics in LRC format:
//! [mm:ss.xx] Lyrics line here
//!
//! A line may carry several time tags:
//! [00:12.50][00:45.00] Hello world
//!
//! Lookups are cursor-accelerated: a playback clock polls with a
//! forward-moving position, so the common case is answered in O(1) by
//! checking the interval around the previously returned line.

use std::time::Duration;

/// A single line of lyrics with the moment it becomes active.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Line {
    /// Offset from the start of the track.
    pub timestamp: Duration,
    /// The lyrics text, HTML-entity-decoded and trimmed.
    pub text: String,
}

impl Line {
    pub fn new(timestamp: Duration, text: String) -> Self {
        Self { timestamp, text }
    }
}

/// Parsed lyrics, sorted ascending by timestamp. Immutable once built.
#[derive(Debug, Default)]
pub struct Timeline {
    lines: Vec<Line>,
}

/// Lookup accelerator for sequential queries against one [`Timeline`].
///
/// The cursor is owned by the caller rather than the timeline, so a shared
/// `Arc<Timeline>` stays read-only; each polling consumer keeps its own
/// cursor. Resetting it is always safe and only costs a binary search on the
/// next query.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cursor {
    last_index: usize,
}

impl Timeline {
    /// Parse LRC formatted lyrics.
    ///
    /// Malformed content never fails: lines without leading time tags
    /// (metadata like `[ar:Artist]`, plain text) are skipped, and a tag whose
    /// numeric field does not parse is dropped on its own.
    pub fn parse(content: &str) -> Self {
        let mut lines = Vec::new();
        for raw in content.lines() {
            parse_line(raw, &mut lines);
        }
        // Stable: parse order breaks timestamp ties.
        lines.sort_by_key(|l| l.timestamp);
        Self { lines }
    }

    /// The active line at `position`: the last line whose timestamp is
    /// `<= position`. Returns an empty line when nothing is active yet or
    /// the timeline is empty.
    pub fn line_at(&self, cursor: &mut Cursor, position: Duration) -> Line {
        let n = self.lines.len();
        if cursor.last_index < n {
            // Fast path: position still inside the interval returned last time.
            let low = &self.lines[cursor.last_index];
            let high = &self.lines[(cursor.last_index + 1).min(n - 1)];
            if low.timestamp <= position && position < high.timestamp {
                return low.clone();
            }
        }
        let i = self.lines.partition_point(|l| l.timestamp <= position);
        if i == 0 {
            cursor.last_index = 0;
            return Line::default();
        }
        cursor.last_index = i - 1;
        self.lines[i - 1].clone()
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }
}

/// Parse one input line like `[00:12.34]Lyrics` or `[00:12.34][00:15.00]Lyrics`.
///
/// A line contributes only if it starts with one or more well-formed time
/// tags; the remainder after the last tag is the text shared by all of them.
fn parse_line(raw: &str, out: &mut Vec<Line>) {
    let mut rest = raw.trim_end_matches('\r');
    let mut timestamps = Vec::new();
    while let Some((tag, after)) = split_leading_tag(rest) {
        if let Some(timestamp) = decode_tag(tag) {
            timestamps.push(timestamp);
        }
        rest = after;
    }
    if timestamps.is_empty() {
        return;
    }
    let text = html_escape::decode_html_entities(rest).trim().to_string();
    out.extend(
        timestamps
            .into_iter()
            .map(|timestamp| Line::new(timestamp, text.clone())),
    );
}

/// Split a leading `[MM:SS.hh]` tag off `s`, requiring each numeric field to
/// be two or more ASCII digits. Returns the tag body and the remainder.
fn split_leading_tag(s: &str) -> Option<(&str, &str)> {
    let body = s.strip_prefix('[')?;
    let end = body.find(']')?;
    let tag = &body[..end];
    if !tag_shape_ok(tag) {
        return None;
    }
    Some((tag, &body[end + 1..]))
}

fn tag_shape_ok(tag: &str) -> bool {
    let Some((minutes, rest)) = tag.split_once(':') else {
        return false;
    };
    let Some((seconds, hundredths)) = rest.split_once('.') else {
        return false;
    };
    is_digits(minutes) && is_digits(seconds) && is_digits(hundredths)
}

fn is_digits(s: &str) -> bool {
    s.len() >= 2 && s.bytes().all(|b| b.is_ascii_digit())
}

/// Decode `MM:SS.hh` to a duration. Only the first two fractional digits are
/// significant; extra digits are truncated, not rounded. A field that fails
/// to parse as an integer drops this tag.
fn decode_tag(tag: &str) -> Option<Duration> {
    let (minutes, rest) = tag.split_once(':')?;
    let (seconds, hundredths) = rest.split_once('.')?;
    let minutes: u64 = minutes.parse().ok()?;
    let seconds: u64 = seconds.parse().ok()?;
    let hundredths: u64 = hundredths[..2].parse().ok()?;
    let secs = minutes.checked_mul(60)?.checked_add(seconds)?;
    Some(Duration::from_secs(secs) + Duration::from_millis(hundredths * 10))
}
