//! HTML code-table extraction shared by the site adapters
//!
//! Gift-code listings on the supported sites are plain two-column tables:
//! code in the first cell, reward text in the second. Some sites embed an
//! explicit expiry ("Valid until June 30, 2025") in the reward cell.

use chrono::{DateTime, NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::ParseError;

// Helper macro to parse selectors safely at compile time
macro_rules! parse_selector {
    ($s:expr) => {
        Selector::parse($s).expect(concat!("Invalid CSS selector: ", $s))
    };
}

lazy_static! {
    /// WordPress figure-wrapped table (axeetech layout)
    static ref FIGURE_TABLE: Selector = parse_selector!("figure.wp-block-table table");

    /// First table anywhere in the document (boostbot layout)
    static ref ANY_TABLE: Selector = parse_selector!("table");

    static ref ROW: Selector = parse_selector!("tr");
    static ref CELL: Selector = parse_selector!("td");

    /// "Valid until June 30, 2025" in a reward cell
    static ref VALID_UNTIL: Regex =
        Regex::new(r"Valid until\s+([A-Za-z]+)\s+(\d{1,2}),?\s*(\d{4})").unwrap();
}

/// Which table in the page holds the codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableScope {
    /// Table wrapped in a `figure.wp-block-table` element
    FigureWrapped,
    /// First bare `<table>` in the document
    FirstTable,
}

/// One raw code row lifted out of the table
#[derive(Debug, Clone, PartialEq)]
pub struct CodeRow {
    pub code: String,
    pub reward_text: String,
}

/// Extract code rows from the first matching table
///
/// The header row is skipped; rows with fewer than two cells are ignored.
///
/// # Errors
///
/// `ParseError::TableNotFound` if no table matches the scope,
/// `ParseError::NoRows` if the table has no usable code rows.
pub fn extract_rows(html: &str, scope: TableScope) -> Result<Vec<CodeRow>, ParseError> {
    let document = Html::parse_document(html);

    let selector: &Selector = match scope {
        TableScope::FigureWrapped => &FIGURE_TABLE,
        TableScope::FirstTable => &ANY_TABLE,
    };

    let table = document
        .select(selector)
        .next()
        .ok_or(ParseError::TableNotFound)?;

    let mut rows = Vec::new();
    // First row is the header
    for row in table.select(&ROW).skip(1) {
        let cells: Vec<String> = row.select(&CELL).map(cell_text).collect();
        if cells.len() < 2 {
            continue;
        }

        let code = cells[0].split_whitespace().collect::<Vec<_>>().join("");
        if code.is_empty() {
            continue;
        }

        rows.push(CodeRow {
            code,
            reward_text: cells[1].clone(),
        });
    }

    if rows.is_empty() {
        return Err(ParseError::NoRows);
    }

    Ok(rows)
}

/// Parse an explicit expiry date out of a reward cell
///
/// Recognizes "Valid until <Month> <day>[,] <year>" and returns midnight UTC
/// of that date; `None` when the cell carries no parseable date.
pub fn parse_valid_until(reward_text: &str) -> Option<DateTime<Utc>> {
    let captures = VALID_UNTIL.captures(reward_text)?;

    let month = month_number(&captures[1])?;
    let day: u32 = captures[2].parse().ok()?;
    let year: i32 = captures[3].parse().ok()?;

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

fn month_number(name: &str) -> Option<u32> {
    let month = match name.to_lowercase().as_str() {
        "january" | "jan" => 1,
        "february" | "feb" => 2,
        "march" | "mar" => 3,
        "april" | "apr" => 4,
        "may" => 5,
        "june" | "jun" => 6,
        "july" | "jul" => 7,
        "august" | "aug" => 8,
        "september" | "sep" => 9,
        "october" | "oct" => 10,
        "november" | "nov" => 11,
        "december" | "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn cell_text(cell: ElementRef<'_>) -> String {
    let text: String = cell.text().collect::<Vec<_>>().join(" ");
    // Some sites double-encode entities in reward cells
    let decoded = html_escape::decode_html_entities(&text);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    const FIGURE_HTML: &str = r#"
        <html><body>
        <figure class="wp-block-table"><table>
            <tr><th>Code</th><th>Rewards</th></tr>
            <tr><td><strong>KINGSHOT24</strong></td><td>1000 coins, Valid until June 30, 2025</td></tr>
            <tr><td>NEWHERO</td><td>Starter pack</td></tr>
        </table></figure>
        </body></html>
    "#;

    const BARE_HTML: &str = r#"
        <html><body>
        <p>Latest codes:</p>
        <table>
            <tr><th>Code</th><th>Reward</th></tr>
            <tr><td>WELCOME&amp;MORE</td><td>500 gems</td></tr>
        </table>
        </body></html>
    "#;

    #[test]
    fn test_extract_figure_wrapped_rows() {
        let rows = extract_rows(FIGURE_HTML, TableScope::FigureWrapped).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].code, "KINGSHOT24");
        assert!(rows[0].reward_text.contains("1000 coins"));
        assert_eq!(rows[1].code, "NEWHERO");
    }

    #[test]
    fn test_extract_first_table_rows() {
        let rows = extract_rows(BARE_HTML, TableScope::FirstTable).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].code, "WELCOME&MORE");
        assert_eq!(rows[0].reward_text, "500 gems");
    }

    #[test]
    fn test_figure_scope_rejects_bare_table() {
        let err = extract_rows(BARE_HTML, TableScope::FigureWrapped).unwrap_err();
        assert!(matches!(err, ParseError::TableNotFound));
    }

    #[test]
    fn test_table_without_code_rows() {
        let html = "<table><tr><th>Code</th><th>Reward</th></tr></table>";
        let err = extract_rows(html, TableScope::FirstTable).unwrap_err();
        assert!(matches!(err, ParseError::NoRows));
    }

    #[test]
    fn test_parse_valid_until() {
        let parsed = parse_valid_until("1000 coins, Valid until June 30, 2025").unwrap();
        assert_eq!(parsed.year(), 2025);
        assert_eq!(parsed.month(), 6);
        assert_eq!(parsed.day(), 30);
    }

    #[test]
    fn test_parse_valid_until_without_comma() {
        let parsed = parse_valid_until("Valid until March 5 2026").unwrap();
        assert_eq!(parsed.year(), 2026);
        assert_eq!(parsed.month(), 3);
        assert_eq!(parsed.day(), 5);
    }

    #[test]
    fn test_parse_valid_until_absent() {
        assert!(parse_valid_until("Starter pack").is_none());
        assert!(parse_valid_until("Valid until someday").is_none());
    }

    #[test]
    fn test_code_strips_internal_whitespace() {
        let html = r#"<table>
            <tr><th>Code</th><th>Reward</th></tr>
            <tr><td> KING SHOT </td><td>gems</td></tr>
        </table>"#;
        let rows = extract_rows(html, TableScope::FirstTable).unwrap();
        assert_eq!(rows[0].code, "KINGSHOT");
    }
}
