//! Document numbering
//!
//! Numbers look like `INV-2025-007`: a prefix, the calendar year and a
//! per-year sequence padded to three digits.

/// Prefix for invoice numbers
pub const INVOICE_PREFIX: &str = "INV";
/// Prefix for job numbers
pub const JOB_PREFIX: &str = "JOB";

/// Returns the next number for `prefix` in `year`
///
/// The sequence is one more than the highest found among `existing` for the
/// same prefix and year. Numbers from other years and anything not in the
/// expected shape are ignored. Sequences past 999 simply grow wider.
pub fn next_document_number<'a, I>(prefix: &str, year: i32, existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let highest = existing
        .into_iter()
        .filter_map(|number| parse_sequence(prefix, year, number))
        .max()
        .unwrap_or(0);

    format_document_number(prefix, year, highest + 1)
}

/// Formats a document number
pub fn format_document_number(prefix: &str, year: i32, sequence: u32) -> String {
    format!("{}-{}-{:03}", prefix, year, sequence)
}

fn parse_sequence(prefix: &str, year: i32, number: &str) -> Option<u32> {
    let mut parts = number.splitn(3, '-');
    if parts.next()? != prefix {
        return None;
    }
    if parts.next()?.parse::<i32>().ok()? != year {
        return None;
    }
    let sequence = parts.next()?;
    if sequence.len() < 3 || !sequence.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    sequence.parse().ok()
}
