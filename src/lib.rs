pub mod app;
pub mod cli;
pub mod client;
pub mod config;
pub mod filter;
pub mod logging;
pub mod output;
pub mod rows;
pub mod tui;
pub mod view;

#[cfg(test)]
mod tests;
