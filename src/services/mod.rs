pub mod reports;
pub mod search;
pub mod views;
