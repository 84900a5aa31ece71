// src/lib.rs - Module organization for the SGLang launch and test toolkit

// Core modules
pub mod client;
pub mod config;
pub mod constants;
pub mod launch;
pub mod report;
pub mod utils;

// Public re-exports for easy access
pub use client::{ChatMessage, ChatRequest, CompletionRequest, GenerationOutcome, TestClient};
pub use config::{PresetValues, ServerConfig};
pub use launch::{CommandPlan, LaunchArgs, QuantPreset, ServerLauncher};
pub use report::TestReport;
pub use utils::{
    format_duration, has_thinking_markers, ClientError, ClientErrorKind, LaunchError,
    LaunchErrorKind, Logger,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
