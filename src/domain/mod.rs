pub mod calendar;
pub mod review;
