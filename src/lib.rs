// src/lib.rs

pub mod backup;
pub mod config;
pub mod constants;
pub mod debloat;
pub mod drivers;
pub mod engine;
pub mod errors;
pub mod hardware;
pub mod logging;
pub mod network;
pub mod orchestrator;
pub mod power;
pub mod privacy;
pub mod services;
pub mod tweaks;
pub mod utils;

#[cfg(test)]
mod testing;
