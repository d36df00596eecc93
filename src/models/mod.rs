pub mod audit;
pub mod notification;
pub mod session;
pub mod smart_booking;
pub mod user;
pub mod vehicle;
