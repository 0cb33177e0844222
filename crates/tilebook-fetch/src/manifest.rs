// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Book manifest extraction.
//
// The book page is HTML with the manifest inlined as script variables:
//
//     var bookId = "...";
//     var pages = ["a.jpg", "b.jpg", ...];
//     var pageIds = ["101", "102", ...];
//
// A pattern only locates each literal; the arrays are then parsed as JSON so
// quoting and escapes are handled properly.

use regex::Regex;
use tilebook_core::BookManifest;
use tilebook_core::error::{Result, TilebookError};

/// Extract the manifest embedded in a book page.
pub fn parse_book_page(html: &str) -> Result<BookManifest> {
    let pages = string_array(html, "pages")?;
    let page_ids = string_array(html, "pageIds")?;
    let book_id = string_literal(html, "bookId")?;
    BookManifest::new(book_id, pages, page_ids)
}

fn string_array(html: &str, name: &str) -> Result<Vec<String>> {
    let pattern = format!(r"var\s+{}\s*=\s*(\[[^\]]*\])", regex::escape(name));
    let literal = capture(html, &pattern, name)?;
    serde_json::from_str(&literal).map_err(|e| {
        TilebookError::ManifestMalformed(format!("`{name}` is not a string array: {e}"))
    })
}

fn string_literal(html: &str, name: &str) -> Result<String> {
    let pattern = format!(r#"var\s+{}\s*=\s*("(?:[^"\\]|\\.)*")"#, regex::escape(name));
    let literal = capture(html, &pattern, name)?;
    serde_json::from_str(&literal).map_err(|e| {
        TilebookError::ManifestMalformed(format!("`{name}` is not a string: {e}"))
    })
}

fn capture(html: &str, pattern: &str, name: &str) -> Result<String> {
    let re = Regex::new(pattern)
        .map_err(|e| TilebookError::ManifestMalformed(format!("bad pattern for `{name}`: {e}")))?;
    re.captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| {
            TilebookError::ManifestMalformed(format!(
                "`var {name}` not found; is this a book page URL?"
            ))
        })
}
