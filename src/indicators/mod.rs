// Technical indicators module
// Smoothed averages for the trend filter, trailing returns for momentum ranking

pub mod moving_average;
pub mod rate_of_change;

pub use moving_average::calculate_ewm;
pub use rate_of_change::calculate_skip_return;
