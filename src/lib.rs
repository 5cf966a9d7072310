pub mod assistant;
pub mod config;
pub mod error;
pub mod executor;
pub mod oracle;
pub mod render;
pub mod selector;
pub mod session;
pub mod table;
pub mod tools;
pub mod viz;
pub mod warehouse;
