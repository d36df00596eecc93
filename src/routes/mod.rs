pub mod error;
pub mod health;
pub mod notification;
pub mod session;
pub mod user;
pub mod vehicle;
