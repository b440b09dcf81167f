// src/lib.rs

pub mod audit;
pub mod catalog;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod host;
pub mod os_guard;
pub mod progress;
pub mod settings;
pub mod snapshot;
pub mod tweaks;
pub mod utils;

#[cfg(test)]
mod test_support;
