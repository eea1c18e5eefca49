//! Context previews for the matches found in a single file.
//!
//! A preview shows every line holding part of a match plus two lines of
//! context on each side. Windows that touch or overlap are merged; separate
//! windows are divided by one blank line.

use crate::patterns::MatchSpan;
use std::collections::BTreeSet;

/// Line terminator used when rendering a preview.
#[cfg(windows)]
pub const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_ENDING: &str = "\n";

/// Lines of context shown above and below a match.
const CONTEXT_LINES: usize = 2;

/// A file's content split into lines, with the byte offset each line starts at.
///
/// Lines end at `\n`; a `\r` right before it belongs to the separator, so
/// LF and CRLF files (or a mix of both) map offsets to the same lines the
/// matcher saw.
pub struct LineIndex<'a> {
    lines: Vec<&'a str>,
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(content: &'a str) -> Self {
        let mut lines = Vec::new();
        let mut starts = Vec::new();
        let mut start = 0;

        for raw in content.split('\n') {
            starts.push(start);
            start += raw.len() + 1;
            lines.push(raw.strip_suffix('\r').unwrap_or(raw));
        }

        Self { lines, starts }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, index: usize) -> &'a str {
        self.lines[index]
    }

    /// Zero-based index of the line containing byte `offset`.
    ///
    /// Offsets inside a separator belong to the line the separator ends;
    /// offsets at or past the end of the content belong to the last line.
    pub fn line_of(&self, offset: usize) -> usize {
        self.starts.partition_point(|&start| start <= offset).saturating_sub(1)
    }

    /// Inclusive range of lines to show for one match, clipped to the file.
    pub fn window(&self, span: &MatchSpan) -> (usize, usize) {
        let first = self.line_of(span.offset).saturating_sub(CONTEXT_LINES);
        let last = (self.line_of(span.end()) + CONTEXT_LINES).min(self.line_count() - 1);
        (first, last)
    }
}

/// Collects the sorted, deduplicated line indices covered by `matches`.
pub fn preview_lines(index: &LineIndex<'_>, matches: &[MatchSpan]) -> Vec<usize> {
    let mut lines = BTreeSet::new();
    for span in matches {
        let (first, last) = index.window(span);
        lines.extend(first..=last);
    }
    lines.into_iter().collect()
}

/// Builds the preview text for `matches` found in `content`.
///
/// Returns an empty string when there are no matches.
pub fn build_preview(content: &str, matches: &[MatchSpan]) -> String {
    if matches.is_empty() {
        return String::new();
    }

    let index = LineIndex::new(content);
    let mut rendered: Vec<&str> = Vec::new();
    let mut previous: Option<usize> = None;

    for line in preview_lines(&index, matches) {
        if previous.is_some_and(|prev| line - prev > 1) {
            rendered.push("");
        }
        rendered.push(index.line(line));
        previous = Some(line);
    }

    rendered.join(LINE_ENDING)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::find_all;

    fn numbered(count: usize) -> String {
        (0..count).map(|i| format!("line{i}")).collect::<Vec<_>>().join("\n")
    }

    fn lines(items: &[&str]) -> String {
        items.join(LINE_ENDING)
    }

    #[test]
    fn test_single_match_shows_two_lines_each_side() {
        let content = numbered(10);
        let spans = find_all(&content, "line5", true, false).unwrap();
        assert_eq!(
            build_preview(&content, &spans),
            lines(&["line3", "line4", "line5", "line6", "line7"])
        );
    }

    #[test]
    fn test_window_clipped_at_file_edges() {
        let content = numbered(10);
        let spans = find_all(&content, "line0", true, false).unwrap();
        assert_eq!(build_preview(&content, &spans), lines(&["line0", "line1", "line2"]));

        let spans = find_all(&content, "line9", true, false).unwrap();
        assert_eq!(build_preview(&content, &spans), lines(&["line7", "line8", "line9"]));
    }

    #[test]
    fn test_short_file_shows_every_line() {
        let content = "a\nfoo\nb";
        let spans = find_all(content, "foo", true, false).unwrap();
        assert_eq!(build_preview(content, &spans), lines(&["a", "foo", "b"]));
    }

    #[test]
    fn test_distant_matches_are_separated_by_blank_line() {
        let content = numbered(20);
        let spans = find_all(&content, r"line(2|15)\b", true, true).unwrap();
        assert_eq!(spans.len(), 2);
        assert_eq!(
            build_preview(&content, &spans),
            lines(&[
                "line0", "line1", "line2", "line3", "line4", "", "line13", "line14", "line15",
                "line16", "line17",
            ])
        );
    }

    #[test]
    fn test_overlapping_windows_merge() {
        let content = numbered(20);
        let spans = find_all(&content, r"line(5|8)\b", true, true).unwrap();
        assert_eq!(
            build_preview(&content, &spans),
            lines(&["line3", "line4", "line5", "line6", "line7", "line8", "line9", "line10"])
        );
    }

    #[test]
    fn test_adjacent_windows_have_no_separator() {
        // Windows 0..=4 and 5..=9 touch without overlapping.
        let content = numbered(12);
        let spans = find_all(&content, r"line(2|7)\b", true, true).unwrap();
        let preview = build_preview(&content, &spans);
        assert!(!preview.contains(&format!("{LINE_ENDING}{LINE_ENDING}")));
        assert_eq!(preview.split(LINE_ENDING).count(), 10);
    }

    #[test]
    fn test_multi_line_match_extends_window() {
        let content = numbered(12);
        let spans = find_all(&content, r"line4\nline5\nline6", true, true).unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(
            build_preview(&content, &spans),
            lines(&["line2", "line3", "line4", "line5", "line6", "line7", "line8"])
        );
    }

    #[test]
    fn test_crlf_content_maps_to_same_lines() {
        let content = "zero\r\none\r\ntwo\r\nthree foo\r\nfour\r\nfive\r\nsix";
        let spans = find_all(content, "foo", true, false).unwrap();
        assert_eq!(
            build_preview(content, &spans),
            lines(&["one", "two", "three foo", "four", "five"])
        );
    }

    #[test]
    fn test_line_of_boundaries() {
        let index = LineIndex::new("ab\ncd\n");
        assert_eq!(index.line_count(), 3);
        assert_eq!(index.line_of(0), 0);
        assert_eq!(index.line_of(2), 0);
        assert_eq!(index.line_of(3), 1);
        assert_eq!(index.line_of(6), 2);
        assert_eq!(index.line_of(100), 2);
    }

    #[test]
    fn test_no_matches_gives_empty_preview() {
        assert_eq!(build_preview("anything", &[]), "");
    }
}
