pub mod backtrace;
pub mod chart;
pub mod forward;
