pub mod catalog;
pub mod config;
pub mod db;
pub mod scheduler;
pub mod station;
