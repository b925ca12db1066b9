use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use grabber_core::{slugify, target_file_name, SlugIndexer, FIRST_INDEX};
use pretty_assertions::assert_eq;

#[test]
fn equal_labels_give_equal_slugs() {
    let labels = ["Rosa canina", "Bellis perennis", "", "Ünïcödé", "x/y\\z"];
    for label in labels {
        assert_eq!(slugify(label), slugify(&label.to_string()));
    }
}

#[test]
fn slugs_are_never_empty_and_filesystem_safe() {
    for label in ["", " ", "...", "日本語", "CON", "a/../b", "tab\tseparated"] {
        let slug = slugify(label);
        assert!(!slug.is_empty(), "empty slug for {label:?}");
        assert!(
            slug.chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-'),
            "unsafe slug {slug:?} for {label:?}"
        );
    }
}

#[test]
fn indices_start_at_first_index_and_are_per_slug() {
    let indexer = SlugIndexer::new();
    assert_eq!(indexer.next_index("rosa"), FIRST_INDEX);
    assert_eq!(indexer.next_index("rosa"), FIRST_INDEX + 1);
    assert_eq!(indexer.next_index("bellis"), FIRST_INDEX);
    assert_eq!(indexer.slug_count(), 2);
}

#[test]
fn concurrent_reservations_never_collide() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 250;

    let indexer = Arc::new(SlugIndexer::new());
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let indexer = Arc::clone(&indexer);
            thread::spawn(move || {
                (0..PER_THREAD)
                    .map(|_| indexer.next_index("shared"))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for index in handle.join().unwrap() {
            assert!(seen.insert(index), "index {index} handed out twice");
        }
    }
    assert_eq!(seen.len(), THREADS * PER_THREAD);
    let max = FIRST_INDEX + (THREADS * PER_THREAD) as u64 - 1;
    assert!(seen.iter().all(|i| (FIRST_INDEX..=max).contains(i)));
}

#[test]
fn same_label_items_get_sequential_file_names() {
    let indexer = SlugIndexer::new();
    let names: Vec<_> = ["Rosa canina", "Rosa canina"]
        .iter()
        .map(|label| {
            let slug = slugify(label);
            let index = indexer.next_index(&slug);
            target_file_name(&slug, index)
        })
        .collect();
    assert_eq!(names, vec!["rosa_canina_1.jpg", "rosa_canina_2.jpg"]);
}
