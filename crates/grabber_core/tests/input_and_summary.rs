use grabber_core::{parse_work_items, ItemOutcome, RunSummary, WorkItem};
use pretty_assertions::assert_eq;

#[test]
fn header_row_is_skipped_and_blank_rows_ignored() {
    let csv = "image_url,label\n\nhttp://x/a.jpg,Rosa canina\r\n  \nhttp://x/b.jpg,Rosa canina\n";
    let items = parse_work_items(csv, true);
    assert_eq!(
        items,
        vec![
            WorkItem::new("http://x/a.jpg", "Rosa canina"),
            WorkItem::new("http://x/b.jpg", "Rosa canina"),
        ]
    );
}

#[test]
fn without_header_the_first_row_is_data() {
    let items = parse_work_items("http://x/a.jpg,Bellis\n", false);
    assert_eq!(items, vec![WorkItem::new("http://x/a.jpg", "Bellis")]);
}

#[test]
fn incomplete_rows_are_dropped() {
    let csv = "url,label\nhttp://x/a.jpg\n,Rosa\nhttp://x/b.jpg, \nhttp://x/c.jpg,Bellis,extra\n";
    let items = parse_work_items(csv, true);
    assert_eq!(items, vec![WorkItem::new("http://x/c.jpg", "Bellis")]);
}

#[test]
fn quoted_labels_may_contain_commas() {
    let csv = "url,label\n\"http://x/a.jpg\",\"Rosa canina, dog rose\"\n";
    let items = parse_work_items(csv, true);
    assert_eq!(items[0].label, "Rosa canina, dog rose");
}

#[test]
fn summary_counts_every_outcome() {
    let mut summary = RunSummary::default();
    for outcome in [
        ItemOutcome::Saved,
        ItemOutcome::Saved,
        ItemOutcome::Skipped,
        ItemOutcome::Failed,
    ] {
        summary.record(outcome);
    }
    assert_eq!(
        summary,
        RunSummary {
            saved: 2,
            skipped: 1,
            failed: 1
        }
    );
    assert_eq!(summary.total(), 4);
}

#[test]
fn merged_summaries_add_up() {
    let mut left = RunSummary {
        saved: 1,
        skipped: 2,
        failed: 3,
    };
    left.merge(RunSummary {
        saved: 4,
        skipped: 0,
        failed: 1,
    });
    assert_eq!(left.total(), 11);
    assert_eq!(left.failed, 4);
}
