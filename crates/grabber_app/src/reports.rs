//! End-of-run report files: JSON summary and failed-items CSV.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use grabber_core::{FailedItem, RunSummary};
use grabber_engine::AtomicFileWriter;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct SummaryDocument<'a> {
    #[serde(flatten)]
    summary: RunSummary,
    total: usize,
    output_dir: &'a Path,
    finished_utc: &'a str,
}

pub fn summary_json(
    summary: RunSummary,
    output_dir: &Path,
    finished_utc: &str,
) -> anyhow::Result<String> {
    let doc = SummaryDocument {
        summary,
        total: summary.total(),
        output_dir,
        finished_utc,
    };
    serde_json::to_string_pretty(&doc).context("serializing run summary")
}

/// Failed rows as CSV. The first two columns are `url,label`, so the file can
/// be fed back as input.
pub fn failed_csv(failures: &[FailedItem]) -> String {
    let mut out = String::from("url,label,stage,reason\n");
    for failure in failures {
        let stage = failure.stage.to_string();
        let row = [
            failure.url.as_str(),
            failure.label.as_str(),
            stage.as_str(),
            failure.reason.as_str(),
        ]
        .map(csv_field)
        .join(",");
        out.push_str(&row);
        out.push('\n');
    }
    out
}

fn csv_field(value: &str) -> String {
    let single_line = value.replace(['\r', '\n'], " ");
    if single_line.contains([',', '"']) {
        format!("\"{}\"", single_line.replace('"', "\"\""))
    } else {
        single_line
    }
}

/// Atomically write `content` to `path`, creating its directory if needed.
pub fn write_report_file(path: &Path, content: &str) -> anyhow::Result<PathBuf> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("report path {path:?} has no file name"))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    AtomicFileWriter::new(dir)
        .write(file_name, content)
        .with_context(|| format!("writing {path:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use grabber_core::{parse_work_items, ItemStage, WorkItem};
    use pretty_assertions::assert_eq;

    fn failure(url: &str, label: &str, reason: &str) -> FailedItem {
        FailedItem {
            url: url.to_string(),
            label: label.to_string(),
            stage: ItemStage::Fetching,
            reason: reason.to_string(),
        }
    }

    #[test]
    fn summary_json_has_counts_and_total() {
        let summary = RunSummary {
            saved: 2,
            skipped: 1,
            failed: 1,
        };
        let json = summary_json(summary, Path::new("out"), "2026-01-01T00:00:00Z").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["saved"], 2);
        assert_eq!(value["skipped"], 1);
        assert_eq!(value["failed"], 1);
        assert_eq!(value["total"], 4);
        assert_eq!(value["output_dir"], "out");
        assert_eq!(value["finished_utc"], "2026-01-01T00:00:00Z");
    }

    #[test]
    fn failed_csv_quotes_awkward_fields() {
        let csv = failed_csv(&[failure(
            "http://x/a.jpg",
            "Rosa, \"dog\"",
            "fetch failed:\nhttp status 404",
        )]);
        assert_eq!(
            csv,
            "url,label,stage,reason\nhttp://x/a.jpg,\"Rosa, \"\"dog\"\"\",fetching,fetch failed: http status 404\n"
        );
    }

    #[test]
    fn failed_csv_can_be_reloaded_as_input() {
        let failures = [
            failure("http://x/a.jpg", "Rosa canina", "timeout"),
            failure("http://x/b.jpg", "Bellis, perennis", "http status 404"),
        ];
        let items = parse_work_items(&failed_csv(&failures), true);
        assert_eq!(
            items,
            vec![
                WorkItem::new("http://x/a.jpg", "Rosa canina"),
                WorkItem::new("http://x/b.jpg", "Bellis, perennis"),
            ]
        );
    }

    #[test]
    fn report_file_is_written_into_missing_directory() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("reports").join("summary.json");
        let written = write_report_file(&path, "{}").unwrap();
        assert_eq!(written, path);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }
}
