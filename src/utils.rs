// src/utils.rs

pub mod command;
pub mod registry;
pub mod services;
pub mod windows;
