/// Calculate the trailing return over `lookback` sessions, ending `skip`
/// sessions before the most recent one
///
/// `prices[last - skip] / prices[last - skip - lookback] - 1`
///
/// Requires at least `lookback + skip + 1` prices; returns `None` otherwise.
pub fn calculate_skip_return(prices: &[f64], lookback: usize, skip: usize) -> Option<f64> {
    if lookback == 0 || prices.len() < lookback + skip + 1 {
        return None;
    }

    let end = prices.len() - 1 - skip;
    let start = end - lookback;

    Some(prices[end] / prices[start] - 1.0)
}
