use crate::controller::RunMode;
use crate::errors::Result;
use crate::preview::build_preview;
use crate::scanner::{read_text, FileOutcome};
use crate::stats::Stats;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

/// Defines the possible output formats for run results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// A simple, human-readable text format.
    Text,
    /// One JSON object per line, suitable for machine processing.
    Json,
    /// Comma-Separated Values format.
    Csv,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "csv" => OutputFormat::Csv,
            _ => OutputFormat::Text,
        }
    }
}

/// Whether a result row is worth showing: it matched something or failed.
pub fn should_display(outcome: &FileOutcome) -> bool {
    outcome.num_matches > 0 || outcome.has_error()
}

/// Renders the match preview for a finished file by reading it again.
///
/// Only meaningful when the file is unchanged since it was scanned, which is
/// why the CLI offers previews for find runs only.
pub fn preview_for(outcome: &FileOutcome) -> Option<String> {
    if !outcome.is_success || outcome.num_matches == 0 {
        return None;
    }
    let content = read_text(&outcome.absolute_path).ok()?;
    Some(build_preview(&content, &outcome.matches))
}

/// Streams result rows and the final statistics to a writer.
pub struct OutputFormatter {
    format: OutputFormat,
    mode: RunMode,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum JsonRecord<'a> {
    File {
        file_name: &'a str,
        path: &'a str,
        matches: usize,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        replaced: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<&'a str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        preview: Option<&'a str>,
    },
    Summary {
        finished_at: DateTime<Utc>,
        #[serde(flatten)]
        stats: &'a Stats,
    },
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, mode: RunMode) -> Self {
        Self { format, mode }
    }

    fn is_replace(&self) -> bool {
        self.mode == RunMode::Replace
    }

    /// Writes the column header, if the format has one.
    pub fn write_header<W: Write>(&self, writer: &mut W) -> Result<()> {
        if self.format != OutputFormat::Csv {
            return Ok(());
        }
        let mut header = vec!["Filename", "Path", "Matches"];
        if self.is_replace() {
            header.push("Replaced");
        }
        header.push("Error");
        writer.write_all(csv_line(&header)?.as_bytes())?;
        Ok(())
    }

    /// Writes one result row.
    pub fn write_outcome<W: Write>(
        &self,
        writer: &mut W,
        outcome: &FileOutcome,
        preview: Option<&str>,
    ) -> Result<()> {
        let output = match self.format {
            OutputFormat::Text => self.format_text(outcome, preview),
            OutputFormat::Json => self.format_json(outcome, preview)?,
            OutputFormat::Csv => self.format_csv(outcome)?,
        };
        writer.write_all(output.as_bytes())?;
        Ok(())
    }

    /// Writes the closing statistics block.
    pub fn write_summary<W: Write>(&self, writer: &mut W, stats: &Stats) -> Result<()> {
        let output = match self.format {
            OutputFormat::Text => self.format_summary(stats),
            OutputFormat::Json => {
                let record = JsonRecord::Summary {
                    finished_at: Utc::now(),
                    stats,
                };
                format!("{}\n", serde_json::to_string(&record)?)
            }
            // CSV stays a plain table; the summary would break parsers.
            OutputFormat::Csv => return Ok(()),
        };
        writer.write_all(output.as_bytes())?;
        Ok(())
    }

    fn format_text(&self, outcome: &FileOutcome, preview: Option<&str>) -> String {
        let mut line = format!("{}  matches: {}", outcome.relative_path, outcome.num_matches);
        if let Some(replaced) = outcome.wrote_successfully.filter(|_| self.is_replace()) {
            line.push_str(if replaced { "  replaced: yes" } else { "  replaced: no" });
        }
        if !outcome.error_message.is_empty() {
            line.push_str(&format!("  error: {}", outcome.error_message));
        }
        line.push('\n');

        if let Some(preview) = preview {
            for preview_line in preview.lines() {
                line.push_str(&format!("    | {preview_line}\n"));
            }
        }
        line
    }

    fn format_json(&self, outcome: &FileOutcome, preview: Option<&str>) -> Result<String> {
        let record = JsonRecord::File {
            file_name: &outcome.file_name,
            path: &outcome.relative_path,
            matches: outcome.num_matches,
            success: outcome.is_success,
            replaced: outcome.wrote_successfully.filter(|_| self.is_replace()),
            error: (!outcome.error_message.is_empty()).then_some(outcome.error_message.as_str()),
            preview,
        };
        Ok(format!("{}\n", serde_json::to_string(&record)?))
    }

    fn format_csv(&self, outcome: &FileOutcome) -> Result<String> {
        let matches = outcome.num_matches.to_string();
        let mut record = vec![
            outcome.file_name.as_str(),
            outcome.relative_path.as_str(),
            matches.as_str(),
        ];
        if self.is_replace() {
            record.push(match outcome.wrote_successfully {
                Some(true) => "Yes",
                Some(false) => "No",
                None => "",
            });
        }
        record.push(&outcome.error_message);
        csv_line(&record)
    }

    /// The statistics block shown at the end of a run. Write counters only
    /// appear for replace runs.
    fn format_summary(&self, stats: &Stats) -> String {
        let mut summary = String::new();
        summary.push_str(&format!("\n{} Summary {}\n", "=".repeat(20), "=".repeat(20)));
        summary.push_str("Files:\n");
        summary.push_str(&format!("- Total: {}\n", stats.total_files));
        summary.push_str(&format!("- Processed: {}\n", stats.processed_files));
        summary.push_str(&format!("- With Matches: {}\n", stats.files_with_matches));
        summary.push_str(&format!("- Without Matches: {}\n", stats.files_without_matches));
        summary.push_str(&format!("- Failed to Open: {}\n", stats.failed_to_open));
        if self.is_replace() {
            summary.push_str(&format!("- Failed to Write: {}\n", stats.failed_to_write));
        }
        summary.push_str("\nMatches:\n");
        summary.push_str(&format!("- Found: {}\n", stats.total_matches));
        if self.is_replace() {
            summary.push_str(&format!("- Replaced: {}\n", stats.total_replaces));
        }
        summary
    }
}

fn csv_line(fields: &[&str]) -> Result<String> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(vec![]);
    wtr.write_record(fields)?;
    let data = wtr.into_inner().map_err(|e| format!("CSV writer error: {}", e))?;
    Ok(String::from_utf8_lossy(&data).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::MatchSpan;
    use std::path::PathBuf;

    fn outcome(num_matches: usize, error: &str, wrote: Option<bool>) -> FileOutcome {
        FileOutcome {
            file_name: "a.txt".to_string(),
            relative_path: "./a.txt".to_string(),
            absolute_path: PathBuf::from("/tmp/a.txt"),
            matches: vec![MatchSpan { offset: 0, length: 3 }; num_matches],
            num_matches,
            is_success: error.is_empty() || wrote.is_some(),
            error_message: error.to_string(),
            wrote_successfully: wrote,
        }
    }

    fn render(formatter: &OutputFormatter, outcome: &FileOutcome, preview: Option<&str>) -> String {
        let mut out = Vec::new();
        formatter.write_outcome(&mut out, outcome, preview).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_display_policy() {
        assert!(should_display(&outcome(2, "", None)));
        assert!(should_display(&outcome(0, "binary file", None)));
        assert!(should_display(&outcome(1, "read-only", Some(false))));
        assert!(!should_display(&outcome(0, "", None)));
    }

    #[test]
    fn test_text_row_with_preview() {
        let formatter = OutputFormatter::new(OutputFormat::Text, RunMode::Find);
        let text = render(&formatter, &outcome(2, "", None), Some("foo\nbar"));
        assert_eq!(text, "./a.txt  matches: 2\n    | foo\n    | bar\n");
    }

    #[test]
    fn test_text_row_replace_failure() {
        let formatter = OutputFormatter::new(OutputFormat::Text, RunMode::Replace);
        let text = render(&formatter, &outcome(1, "file is read-only", Some(false)), None);
        assert_eq!(text, "./a.txt  matches: 1  replaced: no  error: file is read-only\n");
    }

    #[test]
    fn test_json_rows() {
        let formatter = OutputFormatter::new(OutputFormat::Json, RunMode::Replace);
        let text = render(&formatter, &outcome(3, "", Some(true)), None);
        let parsed: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(parsed["type"], "file");
        assert_eq!(parsed["matches"], 3);
        assert_eq!(parsed["replaced"], true);
        assert!(parsed.get("error").is_none());

        let mut out = Vec::new();
        formatter.write_summary(&mut out, &Stats::new(4)).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed["type"], "summary");
        assert_eq!(parsed["total_files"], 4);
        assert!(parsed["finished_at"].is_string());
    }

    #[test]
    fn test_csv_rows() {
        let formatter = OutputFormatter::new(OutputFormat::Csv, RunMode::Replace);
        let mut out = Vec::new();
        formatter.write_header(&mut out).unwrap();
        formatter.write_outcome(&mut out, &outcome(1, "disk, full", Some(false)), None).unwrap();

        let mut rdr = csv::Reader::from_reader(out.as_slice());
        assert_eq!(rdr.headers().unwrap().get(3), Some("Replaced"));
        let records: Vec<_> = rdr
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get(4), Some("disk, full"));
    }

    #[test]
    fn test_summary_sections_depend_on_mode() {
        let mut stats = Stats::new(3);
        stats.record_success(true, 2);
        stats.record_replaces(2);

        let find = OutputFormatter::new(OutputFormat::Text, RunMode::Find);
        let find = find.format_summary(&stats);
        assert!(find.contains("- Found: 2"));
        assert!(!find.contains("Replaced"));
        assert!(!find.contains("Failed to Write"));

        let replace = OutputFormatter::new(OutputFormat::Text, RunMode::Replace);
        let replace = replace.format_summary(&stats);
        assert!(replace.contains("- Replaced: 2"));
        assert!(replace.contains("- Failed to Write: 0"));
    }
}
