pub mod chart;
pub mod lenient;
pub mod market;
pub mod preferences;
