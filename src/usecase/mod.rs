pub mod badness;
pub mod fetch;
