// src/launch.rs - CLI surface, launch command construction and subprocess execution

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, ValueEnum};
use tokio::process::Command;

use crate::config::ServerConfig;
use crate::constants::*;
use crate::utils::{LaunchError, Logger};

#[derive(Parser, Debug, Clone)]
#[command(name = "sglang-launch")]
#[command(about = "Launch an SGLang inference server from a YAML config plus CLI flags")]
pub struct LaunchArgs {
    #[arg(long, short = 'c', help = "YAML config file path")]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum, help = "Apply a predefined quantization preset")]
    pub preset: Option<QuantPreset>,

    #[arg(long, help = "Model checkpoint path")]
    pub model_path: Option<String>,

    #[arg(long, help = "Trust remote code when loading the model")]
    pub trust_remote_code: bool,

    #[arg(long, help = "Model weight dtype (auto, float16, bfloat16, float32)")]
    pub dtype: Option<String>,

    #[arg(long, help = "Server bind address")]
    pub host: Option<String>,

    #[arg(long, help = "Server port")]
    pub port: Option<u16>,

    #[arg(long, help = "TorchAO quantization config (e.g. int4wo-64)")]
    pub torchao_config: Option<String>,

    #[arg(long, help = "Legacy quantization method (fp8, awq, gptq, ...)")]
    pub quantization: Option<String>,

    #[arg(long, help = "KV cache dtype (auto, fp8_e5m2, fp8_e4m3, int8)")]
    pub kv_cache_dtype: Option<String>,

    #[arg(long, help = "Static memory pool fraction (0.8-0.9)")]
    pub mem_fraction_static: Option<f64>,

    #[arg(long, help = "Chunked prefill size")]
    pub chunked_prefill_size: Option<i64>,

    #[arg(long, help = "Maximum concurrent running requests")]
    pub max_running_requests: Option<u32>,

    #[arg(long, help = "Maximum context length")]
    pub context_length: Option<u32>,

    #[arg(long, visible_alias = "tp", help = "Tensor parallel degree")]
    pub tp_size: Option<u32>,

    #[arg(long, help = "Enable torch.compile")]
    pub enable_torch_compile: bool,

    #[arg(long, help = "Enable FlashInfer kernels")]
    pub enable_flashinfer: bool,

    #[arg(long, help = "Disable CUDA graph capture")]
    pub disable_cuda_graph: bool,

    #[arg(long, help = "Enable data-parallel attention")]
    pub enable_dp_attention: bool,

    #[arg(long, help = "Attention backend (flashinfer, triton, torch_native)")]
    pub attention_backend: Option<String>,

    #[arg(long, help = "Distributed init timeout in seconds")]
    pub dist_timeout: Option<u64>,

    #[arg(long, help = "Disable logging output")]
    pub no_log: bool,
}

/// The four shipped quantization presets
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantPreset {
    #[value(name = "high_performance")]
    HighPerformance,
    #[value(name = "balanced")]
    Balanced,
    #[value(name = "memory_optimized")]
    MemoryOptimized,
    #[value(name = "ultra_low_memory")]
    UltraLowMemory,
}

impl QuantPreset {
    /// Key under `quantization_presets` in the config document
    pub fn key(&self) -> &'static str {
        match self {
            QuantPreset::HighPerformance => "high_performance",
            QuantPreset::Balanced => "balanced",
            QuantPreset::MemoryOptimized => "memory_optimized",
            QuantPreset::UltraLowMemory => "ultra_low_memory",
        }
    }
}

/// The resolved launch invocation: the token sequence handed to the server
/// process plus the summary fields shown in the startup banner.
#[derive(Debug, Clone)]
pub struct CommandPlan {
    pub tokens: Vec<String>,
    pub model_path: Option<String>,
    pub endpoint: String,
    pub quantization: Option<String>,
    pub tp_size: u32,
    pub optimizations: Vec<&'static str>,
}

fn push_flag(tokens: &mut Vec<String>, flag: &str, value: &str) {
    tokens.push(flag.to_string());
    tokens.push(value.to_string());
}

impl CommandPlan {
    /// Merge CLI flags, the (preset-augmented) config and compiled defaults
    /// into the external server invocation. For every setting: CLI wins over
    /// config wins over default; absent at all three layers omits the flag.
    pub fn build(args: &LaunchArgs, config: &ServerConfig) -> Self {
        let mut tokens: Vec<String> = vec![SERVER_PROGRAM.to_string()];
        tokens.extend(SERVER_MODULE_ARGS.iter().map(|s| s.to_string()));

        let model_path = args
            .model_path
            .clone()
            .or_else(|| config.model.model_path.clone());
        if let Some(path) = &model_path {
            push_flag(&mut tokens, "--model-path", path);
        }

        if args.trust_remote_code || config.model.trust_remote_code.unwrap_or(false) {
            tokens.push("--trust-remote-code".to_string());
        }

        if let Some(dtype) = args.dtype.clone().or_else(|| config.model.dtype.clone()) {
            push_flag(&mut tokens, "--dtype", &dtype);
        }

        let host = args
            .host
            .clone()
            .or_else(|| config.server.host.clone())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = args.port.or(config.server.port).unwrap_or(DEFAULT_PORT);
        push_flag(&mut tokens, "--host", &host);
        push_flag(&mut tokens, "--port", &port.to_string());

        let mut quantization = None;

        let torchao = args
            .torchao_config
            .clone()
            .or_else(|| config.quantization.torchao_config.clone());
        if let Some(torchao) = &torchao {
            push_flag(&mut tokens, "--torchao-config", torchao);
            quantization = Some(format!("torchao: {}", torchao));
        }

        // the legacy flag yields whenever a TorchAO config is resolved
        if torchao.is_none() {
            if let Some(method) = args
                .quantization
                .clone()
                .or_else(|| config.quantization.method.clone())
            {
                push_flag(&mut tokens, "--quantization", &method);
                quantization = Some(format!("method: {}", method));
            }
        }

        if let Some(kv) = args
            .kv_cache_dtype
            .clone()
            .or_else(|| config.quantization.kv_cache_dtype.clone())
        {
            if kv != KV_CACHE_DTYPE_AUTO {
                push_flag(&mut tokens, "--kv-cache-dtype", &kv);
            }
        }

        if let Some(frac) = args
            .mem_fraction_static
            .or(config.memory.mem_fraction_static)
        {
            push_flag(&mut tokens, "--mem-fraction-static", &frac.to_string());
        }

        if let Some(size) = args
            .chunked_prefill_size
            .or(config.memory.chunked_prefill_size)
        {
            push_flag(&mut tokens, "--chunked-prefill-size", &size.to_string());
        }

        if let Some(max) = args
            .max_running_requests
            .or(config.memory.max_running_requests)
        {
            push_flag(&mut tokens, "--max-running-requests", &max.to_string());
        }

        if let Some(len) = args.context_length.or(config.memory.context_length) {
            push_flag(&mut tokens, "--context-length", &len.to_string());
        }

        let tp_size = args
            .tp_size
            .or(config.parallel.tp_size)
            .unwrap_or(DEFAULT_TP_SIZE);
        if tp_size > 1 {
            push_flag(&mut tokens, "--tp", &tp_size.to_string());
        }

        let mut optimizations = Vec::new();

        if args.enable_torch_compile || config.optimization.enable_torch_compile.unwrap_or(false) {
            tokens.push("--enable-torch-compile".to_string());
            optimizations.push("torch.compile");
        }

        if args.enable_flashinfer || config.optimization.enable_flashinfer.unwrap_or(false) {
            tokens.push("--enable-flashinfer".to_string());
            optimizations.push("FlashInfer");
        }

        if args.disable_cuda_graph || config.optimization.disable_cuda_graph.unwrap_or(false) {
            tokens.push("--disable-cuda-graph".to_string());
        }

        if args.enable_dp_attention || config.attention.enable_dp_attention.unwrap_or(false) {
            tokens.push("--enable-dp-attention".to_string());
            optimizations.push("DP attention");
        }

        if let Some(backend) = args
            .attention_backend
            .clone()
            .or_else(|| config.attention.attention_backend.clone())
        {
            push_flag(&mut tokens, "--attention-backend", &backend);
        }

        if let Some(timeout) = args.dist_timeout.or(config.distributed.dist_timeout) {
            push_flag(&mut tokens, "--dist-timeout", &timeout.to_string());
        }

        Self {
            tokens,
            model_path,
            endpoint: format!("http://{}:{}", host, port),
            quantization,
            tp_size,
            optimizations,
        }
    }
}

/// Loads the config, resolves the launch plan and runs the server process
/// to completion. No supervision, no restart.
pub struct ServerLauncher {
    args: LaunchArgs,
    logger: Logger,
}

impl ServerLauncher {
    pub fn new(args: LaunchArgs) -> Self {
        let logger = Logger::new(!args.no_log);
        Self { args, logger }
    }

    pub async fn run(self) -> Result<(), LaunchError> {
        let config_path = self
            .args
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut config = ServerConfig::load(&config_path, &self.logger)?;

        if let Some(preset) = self.args.preset {
            config.apply_preset(preset.key(), &self.logger);
        }

        let plan = CommandPlan::build(&self.args, &config);

        match &plan.model_path {
            None => return Err(LaunchError::model_path(ERROR_MISSING_MODEL_PATH)),
            Some(path) if !Path::new(path).exists() => {
                return Err(LaunchError::model_path(&format!(
                    "model path does not exist: {}",
                    path
                )))
            }
            Some(_) => {}
        }

        self.print_summary(&plan);
        self.spawn_and_wait(&plan).await
    }

    fn print_summary(&self, plan: &CommandPlan) {
        if !self.logger.enabled {
            return;
        }

        println!();
        println!("SGLang server launch");
        println!("------------------------------------------------------");
        println!("Model: {}", plan.model_path.as_deref().unwrap_or("<unset>"));
        println!("Endpoint: {}", plan.endpoint);
        println!(
            "Quantization: {}",
            plan.quantization.as_deref().unwrap_or("none")
        );
        println!("Tensor parallel: {}", plan.tp_size);
        if !plan.optimizations.is_empty() {
            println!("Optimizations: {}", plan.optimizations.join(", "));
        }
        println!();
        println!("Command: {}", plan.tokens.join(" "));
        println!();
    }

    async fn spawn_and_wait(&self, plan: &CommandPlan) -> Result<(), LaunchError> {
        self.logger.log("starting SGLang server...");
        let start = Instant::now();

        let mut child = Command::new(&plan.tokens[0])
            .args(&plan.tokens[1..])
            .spawn()
            .map_err(|e| {
                LaunchError::spawn(&format!("failed to start {}: {}", plan.tokens[0], e))
            })?;

        let exited = tokio::select! {
            status = child.wait() => Some(status),
            _ = tokio::signal::ctrl_c() => None,
        };

        match exited {
            Some(status) => {
                let status = status
                    .map_err(|e| LaunchError::spawn(&format!("failed to wait for server: {}", e)))?;
                match status.code() {
                    Some(0) => {
                        self.logger.log_timed(LOG_PREFIX_SUCCESS, "server exited cleanly", start);
                        Ok(())
                    }
                    Some(code) => Err(LaunchError::server_exit(code)),
                    // terminated by a signal, typically the operator's Ctrl-C
                    // reaching the whole process group
                    None => {
                        self.logger.log("server stopped by signal");
                        Ok(())
                    }
                }
            }
            None => {
                self.logger.log("interrupt received, shutting down");
                let _ = child.wait().await;
                self.logger.log_timed(LOG_PREFIX_SUCCESS, "server stopped", start);
                Ok(())
            }
        }
    }
}
