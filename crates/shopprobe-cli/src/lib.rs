pub mod args;
pub mod burst;
pub mod cache;
pub mod client;
pub mod commands;
pub mod config;
pub mod dump;
pub mod output;
pub mod scenario;
pub mod storefront;
pub mod verify;

#[cfg(test)]
mod mock;
