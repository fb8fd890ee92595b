use super::error::RangeError;

/// Which records of a container should be studied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordSelection {
    /// A range expression such as `0,2-5,9`
    Range(String),
    /// Every record in the container
    All,
}

impl Default for RecordSelection {
    fn default() -> Self {
        Self::Range(String::from("0"))
    }
}

/// Parse a range expression into the list of record indices it names.
///
/// Tokens are separated by `,` and are either a single index or an inclusive
/// `lo-hi` pair. The output keeps the token order and is neither sorted nor
/// deduplicated.
///
/// An expression containing any letter selects nothing and returns an empty
/// list rather than an error. A token with more than one `-` uses its first
/// and last parts as the bounds; the parts in between are ignored.
pub fn parse_record_range(expression: &str) -> Result<Vec<usize>, RangeError> {
    parse_tokens(expression, None)
}

/// Parse a range expression against a listing of `count` records.
///
/// Every index is checked before any range is expanded, so an index at or past `count` fails
/// with `RangeError::OutOfRange` without building the list.
pub fn parse_record_range_within(
    expression: &str,
    count: usize,
) -> Result<Vec<usize>, RangeError> {
    parse_tokens(expression, Some(count))
}

fn check_bound(index: usize, limit: Option<usize>) -> Result<usize, RangeError> {
    match limit {
        Some(count) if index >= count => Err(RangeError::OutOfRange { index, count }),
        _ => Ok(index),
    }
}

fn parse_tokens(expression: &str, limit: Option<usize>) -> Result<Vec<usize>, RangeError> {
    let mut indices: Vec<usize> = Vec::new();
    if expression.chars().any(|c| c.is_alphabetic()) {
        log::debug!("Record range '{expression}' contains letters, no records selected");
        return Ok(indices);
    }

    for token in expression.split(',') {
        let parts: Vec<&str> = token.split('-').collect();
        let lo = parse_index(parts[0], token)?;
        if parts.len() == 1 {
            indices.push(check_bound(lo, limit)?);
        } else {
            let hi = parse_index(parts[parts.len() - 1], token)?;
            if lo <= hi {
                check_bound(hi, limit)?;
            }
            indices.extend(lo..=hi);
        }
    }

    log::debug!("Records to study: {indices:?}");
    Ok(indices)
}

fn parse_index(part: &str, token: &str) -> Result<usize, RangeError> {
    part.trim()
        .parse::<usize>()
        .map_err(|source| RangeError::BadToken {
            token: token.to_string(),
            source,
        })
}
