//! LxConsole CLI
//!
//! Command-line interface for inspecting how instances and profiles
//! inherit configuration and devices.

pub mod commands;
pub mod config;
pub mod output;
