//! Terminal display utilities for CLI output.

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use unicode_width::UnicodeWidthChar;

use crate::models::{Book, BookRecord};

/// Width used for title columns
const TITLE_WIDTH: usize = 48;

/// Width used for author columns
const AUTHOR_WIDTH: usize = 32;

/// Truncate text to fit within the specified width using unicode-aware truncation.
///
/// # Examples
///
/// ```
/// use bookfinder::utils::truncate_with_ellipsis;
///
/// assert_eq!(truncate_with_ellipsis("Hello World", 8), "Hello...");
/// assert_eq!(truncate_with_ellipsis("Hi", 8), "Hi");
/// ```
pub fn truncate_with_ellipsis(text: &str, max_width: usize) -> String {
    let total: usize = text.chars().map(|c| c.width().unwrap_or(1)).sum();
    if total <= max_width {
        return text.to_string();
    }

    let budget = max_width.saturating_sub(3);
    let mut width = 0;
    let mut out = String::new();
    for c in text.chars() {
        let w = c.width().unwrap_or(1);
        if width + w > budget {
            break;
        }
        width += w;
        out.push(c);
    }

    let mut out = out.trim_end().to_string();
    out.push_str("...");
    out
}

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    table
}

/// Render search records as a table
pub fn records_table(records: &[BookRecord]) -> Table {
    let mut table = new_table(&["#", "Title", "Authors", "ISBN", "Year", "Source"]);

    for (i, record) in records.iter().enumerate() {
        let year = record
            .published_date
            .as_deref()
            .and_then(|d| d.get(..4))
            .unwrap_or("");
        table.add_row(vec![
            (i + 1).to_string(),
            truncate_with_ellipsis(&record.title, TITLE_WIDTH),
            truncate_with_ellipsis(&record.author_line(), AUTHOR_WIDTH),
            record.isbn.clone().unwrap_or_default(),
            year.to_string(),
            record.source.clone(),
        ]);
    }

    table
}

/// Render stored books as a table
pub fn books_table(books: &[Book]) -> Table {
    let mut table = new_table(&["ID", "Title", "Author", "ISBN", "Year", "Source"]);

    for book in books {
        table.add_row(vec![
            book.id.to_string(),
            truncate_with_ellipsis(book.title(), TITLE_WIDTH),
            truncate_with_ellipsis(book.author(), AUTHOR_WIDTH),
            book.isbn().unwrap_or_default().to_string(),
            book.fields
                .publication_year
                .map(|y| y.to_string())
                .unwrap_or_default(),
            book.source().to_string(),
        ]);
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_wide_chars() {
        // Each CJK character is two columns wide
        assert_eq!(truncate_with_ellipsis("吾輩は猫である", 9), "吾輩は...");
        assert_eq!(truncate_with_ellipsis("abc", 3), "abc");
    }

    #[test]
    fn test_records_table_rows() {
        let records = vec![
            BookRecord::new("Dune", "google_books"),
            BookRecord::new("Emma", "open_library"),
        ];
        let rendered = records_table(&records).to_string();
        assert!(rendered.contains("Dune"));
        assert!(rendered.contains("open_library"));
    }
}
