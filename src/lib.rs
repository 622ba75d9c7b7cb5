// Library for the binary, tests and demos

pub mod classifier;
pub mod config;
pub mod diagnosis;
pub mod inventory;
pub mod models;
pub mod orchestrator;
pub mod parser;
pub mod probe;
pub mod routes;
pub mod sink;
pub mod store;
pub mod topology;
