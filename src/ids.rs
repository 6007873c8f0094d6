use std::collections::BTreeSet;

use thiserror::Error;

/// Upper bound on how many numbers a single selector may expand to.
pub(crate) const MAX_SELECTED: usize = 10_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum FormatError {
    #[error("not a number: `{0}`")]
    InvalidNumber(String),
    #[error("malformed range: `{0}`")]
    InvalidRange(String),
    #[error("selector expands to more than {} numbers", MAX_SELECTED)]
    TooMany,
}

/// Parses a selector like `1,2,5-7` into the set of numbers it names.
///
/// Tokens are comma separated and trimmed; empty tokens are skipped, so blank
/// input yields an empty set. A reversed range such as `7-5` is normalized to
/// `5-7`.
pub(crate) fn parse_ids(text: &str) -> Result<BTreeSet<u32>, FormatError> {
    let mut ids = BTreeSet::new();

    for token in text.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if let Some((low, high)) = token.split_once('-') {
            let low = parse_bound(low, token)?;
            let high = parse_bound(high, token)?;
            let (low, high) = if low > high { (high, low) } else { (low, high) };
            if (high - low) as usize >= MAX_SELECTED {
                return Err(FormatError::TooMany);
            }
            ids.extend(low..=high);
        } else {
            let id = token
                .parse::<u32>()
                .map_err(|_| FormatError::InvalidNumber(token.to_string()))?;
            ids.insert(id);
        }

        if ids.len() > MAX_SELECTED {
            return Err(FormatError::TooMany);
        }
    }

    Ok(ids)
}

fn parse_bound(bound: &str, token: &str) -> Result<u32, FormatError> {
    bound
        .trim()
        .parse::<u32>()
        .map_err(|_| FormatError::InvalidRange(token.to_string()))
}
