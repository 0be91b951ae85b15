//! Adapters - where operator input comes from

pub mod console;

pub use console::ConsoleAdapter;
