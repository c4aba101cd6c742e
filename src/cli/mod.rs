//! CLI module for the feedwire binary.
//!
//! ```ignore
//! use feedwire::cli::{parse_args, CliCommand};
//!
//! match parse_args(std::env::args())? {
//!     CliCommand::Version => println!("{}", version_line()),
//!     CliCommand::Help => println!("{}", USAGE),
//!     CliCommand::Run(options) => { /* subscribe */ }
//! }
//! ```

pub mod args;
pub mod version;

pub use args::{parse_args, CliCommand, RunOptions, USAGE};
pub use version::{version_line, VERSION};
