pub mod actor;
pub mod app;
pub mod authz;
pub mod config;
pub mod db;
pub mod docs;
pub mod errors;
pub mod models;
pub mod notify;
pub mod routes;
pub mod settings;
pub mod store;
pub mod tenant;
pub mod utils;
pub mod workflow;

pub use app::create_app;
