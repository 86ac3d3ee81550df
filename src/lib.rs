pub mod config;
pub mod db;
pub mod error;
pub mod generator;
pub mod models;
pub mod routes;
pub mod services;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod test_utils;
