pub mod commands;
pub mod listener;
