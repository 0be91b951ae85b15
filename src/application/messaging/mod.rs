//! Message handling - turns console input into messages

pub mod parser;

pub use parser::MessageParser;
