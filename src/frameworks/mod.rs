// Frameworks: process bootstrap, routing and environment configuration.

pub mod config;
pub mod server;
