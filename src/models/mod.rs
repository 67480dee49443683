pub mod approval;
pub mod booking;
pub mod company;
pub mod notification;
pub mod quote;
pub mod role;
pub mod setting;
pub mod user;
