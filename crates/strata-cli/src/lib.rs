//! # strata-cli
//!
//! Management commands for strata.
//!
//! - [`command`] - the [`ManagementCommand`] trait and [`CommandRegistry`]
//! - [`commands`] - `makemigrations`, `migrate`, `rollback`, `showmigrations`
//!
//! ## Quick Start
//!
//! ```rust
//! use strata_cli::command::CommandRegistry;
//! use strata_cli::commands::register_builtin_commands;
//!
//! let mut registry = CommandRegistry::new();
//! register_builtin_commands(&mut registry);
//!
//! let names = registry.list_commands();
//! assert_eq!(names, vec!["makemigrations", "migrate", "rollback", "showmigrations"]);
//! ```

#![allow(clippy::result_large_err)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::unused_async)]

pub mod command;
pub mod commands;

pub use command::{load_settings, CommandRegistry, ManagementCommand};
