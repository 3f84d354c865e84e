/// Calculate the Exponentially Weighted Moving Average (EWM) of a series
///
/// Uses the span convention, alpha = 2 / (span + 1), and weights every
/// observation in the series: the point `i` sessions back carries weight
/// `(1 - alpha)^i`, normalised by the sum of all weights. Unlike a
/// SMA-seeded EMA this is defined for any non-empty series, so a short
/// history gives an under-smoothed value rather than no value.
///
/// Returns `None` for an empty series or a zero span.
pub fn calculate_ewm(prices: &[f64], span: usize) -> Option<f64> {
    if prices.is_empty() || span == 0 {
        return None;
    }

    let alpha = 2.0 / (span as f64 + 1.0);
    let decay = 1.0 - alpha;

    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for &price in prices {
        weighted_sum = price + decay * weighted_sum;
        weight_total = 1.0 + decay * weight_total;
    }

    Some(weighted_sum / weight_total)
}
