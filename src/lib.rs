// Library for tests to access modules

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod geo;
pub mod ingest;
pub mod jobs;
pub mod models;
pub mod report;
pub mod report_repo;
pub mod routes;
pub mod scanner_repo;
pub mod status_monitor;
pub mod traffic_repo;
pub mod version;
