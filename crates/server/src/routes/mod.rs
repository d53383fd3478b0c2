pub mod command;
pub mod health;
pub mod metrics;
pub mod stats;
