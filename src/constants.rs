// src/constants.rs - Compiled-in defaults and static values

/// External server invocation
pub const SERVER_PROGRAM: &str = "python";
pub const SERVER_MODULE_ARGS: [&str; 2] = ["-m", "sglang.launch_server"];

/// Launcher defaults
pub const DEFAULT_CONFIG_PATH: &str = "server_config.yaml";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 30000;
pub const DEFAULT_TP_SIZE: u32 = 1;

/// "auto" means the server picks a KV cache dtype; the flag is omitted
pub const KV_CACHE_DTYPE_AUTO: &str = "auto";

/// Client defaults
pub const DEFAULT_CLIENT_HOST: &str = "localhost";
pub const DEFAULT_MODEL_NAME: &str = "default";
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 60;
pub const HEALTH_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_MAX_TOKENS: u32 = 100;
pub const PROBE_MAX_TOKENS: u32 = 200;

/// Default sampling parameter values
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_TOP_P: f64 = 0.9;

/// Parameters the server docs recommend for clean (non-thinking) output
pub const RECOMMENDED_TOP_P: f64 = 0.8;
pub const RECOMMENDED_TOP_K: u32 = 20;
pub const RECOMMENDED_PRESENCE_PENALTY: f64 = 1.5;

/// Markers the chat template emits around intermediate reasoning text
pub const THINKING_MARKERS: [&str; 2] = ["<think>", "</think>"];

/// Error messages
pub const ERROR_SERVER_UNREACHABLE: &str = "server unreachable";
pub const ERROR_MISSING_MODEL_PATH: &str =
    "no model path configured; pass --model-path or set model.model_path in the config file";
pub const ERROR_MALFORMED_RESPONSE: &str = "unexpected response shape from server";

/// How much of an error response body to keep in messages
pub const ERROR_BODY_SNIPPET_LIMIT: usize = 200;

/// Logging prefixes
pub const LOG_PREFIX_REQUEST: &str = "🔄";
pub const LOG_PREFIX_SUCCESS: &str = "✅";
pub const LOG_PREFIX_ERROR: &str = "❌";
pub const LOG_PREFIX_WARNING: &str = "⚠️";
