pub mod aggregate;
pub mod catalog;
pub mod checklist;
pub mod db;
pub mod demand;
pub mod error;
pub mod exclusion;
pub mod format;
pub mod list;
pub mod models;
pub mod resolve;
pub mod service;
pub mod store_order;
