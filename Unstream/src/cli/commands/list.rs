//! CLI command for listing archive contents

use std::path::Path;

use crate::container::{Archive, Entry};
use crate::export::ExportType;

/// Simple glob pattern matching (supports * and ?)
pub(crate) fn matches_glob(pattern: &str, text: &str) -> bool {
    let pattern_chars: Vec<char> = pattern.chars().collect();
    let text_chars: Vec<char> = text.chars().collect();
    matches_glob_recursive(&pattern_chars, &text_chars, 0, 0)
}

fn matches_glob_recursive(pattern: &[char], text: &[char], pi: usize, ti: usize) -> bool {
    if pi == pattern.len() {
        return ti == text.len();
    }

    match pattern[pi] {
        '*' => (ti..=text.len()).any(|i| matches_glob_recursive(pattern, text, pi + 1, i)),
        '?' => ti < text.len() && matches_glob_recursive(pattern, text, pi + 1, ti + 1),
        c => {
            ti < text.len()
                && text[ti].eq_ignore_ascii_case(&c)
                && matches_glob_recursive(pattern, text, pi + 1, ti + 1)
        }
    }
}

/// Match a pattern against an entry's file name or full name.
pub(crate) fn entry_matches(pattern: &str, entry: &Entry) -> bool {
    let file_name = entry.name.rsplit(['/', '\\']).next().unwrap_or(&entry.name);
    matches_glob(pattern, file_name) || matches_glob(pattern, &entry.name)
}

/// Format byte size for human-readable output
pub(crate) fn format_size(bytes: u64) -> String {
    if bytes >= 1_048_576 {
        format!("{:.1}M", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1}K", bytes as f64 / 1024.0)
    } else {
        format!("{bytes}")
    }
}

pub fn execute(source: &Path, detailed: bool, filter: Option<&str>, count: bool) -> anyhow::Result<()> {
    let archive = Archive::open(source)?;

    let filtered: Vec<&Entry> = archive
        .entries
        .iter()
        .filter(|e| filter.is_none_or(|pattern| entry_matches(pattern, e)))
        .collect();

    if count {
        println!("{}", filtered.len());
        return Ok(());
    }

    if !detailed {
        for entry in filtered {
            println!("{}", entry.name);
        }
        return Ok(());
    }

    println!(
        "{:>10}  {:>10}  {:>5}  {:<15}  {:<20}  NAME",
        "SIZE", "STORED", "VER", "EXPORT", "TYPE"
    );
    for entry in &filtered {
        println!(
            "{:>10}  {:>10}  {:>5}  {:<15}  {:<20}  {}",
            format_size(entry.data_size_uncompressed),
            format_size(entry.data_size),
            entry.version,
            ExportType::of(entry).as_str(),
            entry.type_name,
            entry.name
        );
    }

    let total: u64 = filtered.iter().map(|e| e.data_size_uncompressed).sum();
    let stored: u64 = filtered.iter().map(|e| e.data_size).sum();
    let empty = filtered.iter().filter(|e| e.is_empty()).count();

    println!();
    println!(
        "{} entries ({} empty), {} total ({} stored) in {} archive",
        filtered.len(),
        empty,
        format_size(total),
        format_size(stored),
        archive.kind.as_str()
    );

    Ok(())
}
