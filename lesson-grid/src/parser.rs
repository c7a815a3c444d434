use std::collections::BTreeSet;

use chrono::Weekday;

use crate::{Error, RangeError, Result};

/// Largest week or slot number a range expression may name.
pub const MAX_RANGE_VALUE: u32 = 1000;

/// Parses a comma separated union of integers and inclusive ranges, e.g.
/// `"1-3,5,7-9"`, into its sorted, duplicate free members. Values above
/// [`MAX_RANGE_VALUE`] are rejected.
pub fn parse_ranges(expression: &str) -> Result<Vec<u32>> {
    collect_ranges(expression)
        .map(|values| values.into_iter().collect())
        .map_err(|source| Error::Range {
            expression: expression.to_string(),
            source,
        })
}

fn collect_ranges(expression: &str) -> Result<BTreeSet<u32>, RangeError> {
    let mut values = BTreeSet::new();

    for token in expression.split(',').map(str::trim) {
        if token.is_empty() {
            return Err(RangeError::EmptyToken);
        }

        match token.split_once('-') {
            Some((start, end)) => {
                let start = parse_bound(start)?;
                let end = parse_bound(end)?;

                if start > end {
                    return Err(RangeError::Reversed { start, end });
                }

                values.extend(start..=end);
            }
            None => {
                values.insert(parse_bound(token)?);
            }
        }
    }

    Ok(values)
}

fn parse_bound(raw: &str) -> Result<u32, RangeError> {
    let raw = raw.trim();
    let value = raw
        .parse::<u32>()
        .map_err(|_| RangeError::NotANumber(raw.to_string()))?;

    if value > MAX_RANGE_VALUE {
        return Err(RangeError::TooLarge {
            value,
            max: MAX_RANGE_VALUE,
        });
    }

    Ok(value)
}

/// Resolves a weekday code. Letters `M T W R F S U` and digits `1`..`7`
/// both name Monday through Sunday.
pub fn iso_weekday(code: &str) -> Result<Weekday> {
    Ok(match code {
        "M" | "1" => Weekday::Mon,
        "T" | "2" => Weekday::Tue,
        "W" | "3" => Weekday::Wed,
        "R" | "4" => Weekday::Thu,
        "F" | "5" => Weekday::Fri,
        "S" | "6" => Weekday::Sat,
        "U" | "7" => Weekday::Sun,
        _ => return Err(Error::WeekdayCode(code.to_string())),
    })
}
