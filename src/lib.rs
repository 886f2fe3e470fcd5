pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod migrations;
pub mod openapi;
pub mod routes;
pub mod services;
pub mod state;
pub mod time;

#[cfg(test)]
pub mod test_support;
