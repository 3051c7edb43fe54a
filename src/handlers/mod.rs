pub mod auth;
pub mod clients;
pub mod duty;
pub mod guards;
pub mod health;
pub mod inventory;
pub mod reports;
pub mod salary;
pub mod search;
