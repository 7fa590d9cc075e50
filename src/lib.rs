#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod fetch;
pub mod formats;
pub mod headless;
pub mod layout;
pub mod logging;
pub mod parse;
pub mod reader;
pub mod restore;
pub mod toc;
pub mod trigger;
pub mod window;
