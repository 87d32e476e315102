//! Binary support for `site-config`: argument parsing, the HTTP server and
//! the maintenance subcommands.

pub mod cli;
pub mod commands;
pub mod server;

pub use server::router;
