// src/utils/mod.rs

pub mod powershell;
pub mod registry;
pub mod services;
pub mod windows;
