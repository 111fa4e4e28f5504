pub mod agent;
pub mod client;
pub mod repl;
pub mod stdio;
pub mod tooling;
