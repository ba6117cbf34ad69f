//! ISBN cleaning and selection.

/// Strip separators from an ISBN
///
/// Keeps ASCII digits and the `X` check character (uppercased); anything
/// else (hyphens, spaces, prefixes such as `ISBN:`) is dropped.
pub fn clean_isbn(raw: &str) -> String {
    raw.chars()
        .filter_map(|c| match c {
            '0'..='9' => Some(c),
            'x' | 'X' => Some('X'),
            _ => None,
        })
        .collect()
}

/// Pick the identifier to store, preferring ISBN-13 over ISBN-10
///
/// Candidates that clean to an empty string are skipped.
pub fn preferred_isbn<'a>(
    isbn13: impl IntoIterator<Item = &'a str>,
    isbn10: impl IntoIterator<Item = &'a str>,
) -> Option<String> {
    isbn13
        .into_iter()
        .chain(isbn10)
        .map(clean_isbn)
        .find(|isbn| !isbn.is_empty())
}
