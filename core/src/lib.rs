pub mod cli;
pub mod config;
pub mod document;
pub mod errors;
pub mod handlers;
pub mod host;
pub mod interpreter;
pub mod parser;
pub mod runtime;
pub mod state;
pub mod types;

// Re-export main types
pub use types::*;

// Re-export the host-facing API for convenience
pub use config::{Config, InterpreterConfig};
pub use document::Document;
pub use errors::{ExecResult, Fault};
pub use handlers::{Handler, HandlerRegistry};
pub use host::{HostBridge, HostValue, LogLevel, MemoryHost, WidgetRef};
pub use interpreter::InvokeOutcome;
pub use runtime::Runtime;
pub use state::StateStore;
