//! Text rendering of numerical statistics.

use std::io::Write;

use crate::error::Result;
use crate::job::NumericalStatsResult;

/// Renders the value range and the distinct quantile boundaries.
///
/// The first line is `Value Range: [{min}, {max}]`. Each quantile follows as
/// `Value at {rank}% quantile: {value}` with its 1-based rank, skipping any
/// quantile whose value equals the one immediately before it.
///
/// ```rust
/// use dlp_risk_analysis::job::NumericalStatsResult;
/// use dlp_risk_analysis::report::format_numerical_stats;
/// use dlp_risk_analysis::value::Value;
///
/// let result = NumericalStatsResult {
///     min_value: Value::integer(1),
///     max_value: Value::integer(100),
///     quantile_values: vec![Value::integer(1), Value::integer(1), Value::integer(50)],
/// };
/// assert_eq!(
///     format_numerical_stats(&result),
///     vec![
///         "Value Range: [1, 100]".to_string(),
///         "Value at 1% quantile: 1".to_string(),
///         "Value at 3% quantile: 50".to_string(),
///     ]
/// );
/// ```
pub fn format_numerical_stats(result: &NumericalStatsResult) -> Vec<String> {
    let mut lines = vec![format!(
        "Value Range: [{}, {}]",
        result.min_value.unpack(),
        result.max_value.unpack()
    )];

    let mut last_value: Option<&str> = None;
    for (index, value) in result.quantile_values.iter().enumerate() {
        let current = value.unpack();
        if last_value != Some(current) {
            lines.push(format!("Value at {}% quantile: {}", index + 1, current));
        }
        last_value = Some(current);
    }

    lines
}

/// Writes [`format_numerical_stats`] to `out`, one line each.
pub fn write_numerical_stats<W: Write>(result: &NumericalStatsResult, out: &mut W) -> Result<()> {
    for line in format_numerical_stats(result) {
        writeln!(out, "{}", line)?;
    }
    Ok(())
}
