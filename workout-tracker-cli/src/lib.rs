// Library exports for the workout tracker CLI
// This allows testing of internal modules

pub mod commands;
pub mod config;
