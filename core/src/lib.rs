pub mod assignment;
pub mod capacity;
pub mod config;
pub mod engine;
pub mod error;
pub mod import;
pub mod name_generator;
pub mod rebalance;
pub mod rng;
pub mod roster;
pub mod seed;
pub mod store;
pub mod types;
