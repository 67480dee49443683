pub mod approvals;
pub mod health;
pub mod notifications;
pub mod settings;
pub mod users;
