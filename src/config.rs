// src/config.rs - YAML server configuration and quantization presets

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::Deserialize;

use crate::utils::{LaunchError, Logger};

/// Parsed server configuration document.
///
/// Every field is optional; the command builder resolves each setting as
/// CLI flag > config value > compiled default and omits flags that are
/// absent at all three layers.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub model: ModelSection,
    pub server: ServerSection,
    pub quantization: QuantizationSection,
    pub memory: MemorySection,
    pub parallel: ParallelSection,
    pub optimization: OptimizationSection,
    pub attention: AttentionSection,
    pub distributed: DistributedSection,
    pub quantization_presets: BTreeMap<String, PresetValues>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModelSection {
    pub model_path: Option<String>,
    pub trust_remote_code: Option<bool>,
    pub dtype: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct QuantizationSection {
    pub torchao_config: Option<String>,
    pub method: Option<String>,
    pub kv_cache_dtype: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MemorySection {
    pub mem_fraction_static: Option<f64>,
    pub chunked_prefill_size: Option<i64>,
    pub max_running_requests: Option<u32>,
    pub context_length: Option<u32>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ParallelSection {
    pub tp_size: Option<u32>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OptimizationSection {
    pub enable_torch_compile: Option<bool>,
    pub enable_flashinfer: Option<bool>,
    pub disable_cuda_graph: Option<bool>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AttentionSection {
    pub enable_dp_attention: Option<bool>,
    pub attention_backend: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DistributedSection {
    pub dist_timeout: Option<u64>,
}

/// A named bundle of settings applied across several sections at once.
/// Keys not listed here are not preset-controllable.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PresetValues {
    pub torchao_config: Option<String>,
    pub dtype: Option<String>,
    pub kv_cache_dtype: Option<String>,
    pub mem_fraction_static: Option<f64>,
    pub chunked_prefill_size: Option<i64>,
    pub max_running_requests: Option<u32>,
    pub enable_torch_compile: Option<bool>,
    pub enable_flashinfer: Option<bool>,
    pub disable_cuda_graph: Option<bool>,
}

impl ServerConfig {
    /// Load a configuration file. A missing file is not an error (the
    /// launcher falls back to defaults); a syntax error is fatal.
    pub fn load(path: &Path, logger: &Logger) -> Result<Self, LaunchError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                logger.warn(&format!(
                    "config file {} not found, using defaults",
                    path.display()
                ));
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(LaunchError::config_parse(&format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        if text.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&text).map_err(|e| {
            LaunchError::config_parse(&format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Copy every set field of the named preset into its target section.
    /// An unknown preset name is a warning, never fatal; the configuration
    /// is left unchanged and `false` is returned.
    pub fn apply_preset(&mut self, name: &str, logger: &Logger) -> bool {
        let Some(preset) = self.quantization_presets.get(name).cloned() else {
            logger.warn(&format!(
                "quantization preset '{}' not found, using configuration as-is",
                name
            ));
            return false;
        };

        logger.log(&format!("applying quantization preset: {}", name));

        if let Some(v) = preset.torchao_config {
            self.quantization.torchao_config = Some(v);
        }
        if let Some(v) = preset.dtype {
            self.model.dtype = Some(v);
        }
        if let Some(v) = preset.kv_cache_dtype {
            self.quantization.kv_cache_dtype = Some(v);
        }
        if let Some(v) = preset.mem_fraction_static {
            self.memory.mem_fraction_static = Some(v);
        }
        if let Some(v) = preset.chunked_prefill_size {
            self.memory.chunked_prefill_size = Some(v);
        }
        if let Some(v) = preset.max_running_requests {
            self.memory.max_running_requests = Some(v);
        }
        if let Some(v) = preset.enable_torch_compile {
            self.optimization.enable_torch_compile = Some(v);
        }
        if let Some(v) = preset.enable_flashinfer {
            self.optimization.enable_flashinfer = Some(v);
        }
        if let Some(v) = preset.disable_cuda_graph {
            self.optimization.disable_cuda_graph = Some(v);
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn quiet_logger() -> Logger {
        Logger::new(false)
    }

    const SAMPLE_CONFIG: &str = r#"
model:
  model_path: /models/qwen3-14b
  trust_remote_code: true
  dtype: bfloat16
server:
  host: 127.0.0.1
  port: 8000
quantization:
  method: fp8
  kv_cache_dtype: auto
memory:
  mem_fraction_static: 0.85
  context_length: 32768
parallel:
  tp_size: 2
optimization:
  enable_flashinfer: true
distributed:
  dist_timeout: 1800
quantization_presets:
  balanced:
    dtype: bfloat16
    mem_fraction_static: 0.85
  ultra_low_memory:
    torchao_config: int4wo-64
    kv_cache_dtype: fp8_e5m2
    mem_fraction_static: 0.6
    chunked_prefill_size: 2048
    max_running_requests: 16
    disable_cuda_graph: true
"#;

    #[test]
    fn test_parse_full_document() {
        let config: ServerConfig = serde_yaml::from_str(SAMPLE_CONFIG).unwrap();

        assert_eq!(config.model.model_path.as_deref(), Some("/models/qwen3-14b"));
        assert_eq!(config.model.trust_remote_code, Some(true));
        assert_eq!(config.server.port, Some(8000));
        assert_eq!(config.quantization.method.as_deref(), Some("fp8"));
        assert_eq!(config.memory.mem_fraction_static, Some(0.85));
        assert_eq!(config.parallel.tp_size, Some(2));
        assert_eq!(config.optimization.enable_flashinfer, Some(true));
        assert_eq!(config.distributed.dist_timeout, Some(1800));
        assert_eq!(config.quantization_presets.len(), 2);
    }

    #[test]
    fn test_partial_document_leaves_rest_unset() {
        let config: ServerConfig = serde_yaml::from_str("model:\n  model_path: /m\n").unwrap();

        assert_eq!(config.model.model_path.as_deref(), Some("/m"));
        assert_eq!(config.model.dtype, None);
        assert_eq!(config.server.host, None);
        assert!(config.quantization_presets.is_empty());
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let config: ServerConfig =
            serde_yaml::from_str("model:\n  model_path: /m\n  exotic_setting: 1\n").unwrap();
        assert_eq!(config.model.model_path.as_deref(), Some("/m"));
    }

    #[test]
    fn test_load_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.yaml");

        let config = ServerConfig::load(&path, &quiet_logger()).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_load_empty_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.yaml");
        fs::write(&path, "\n").unwrap();

        let config = ServerConfig::load(&path, &quiet_logger()).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_load_syntax_error_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "model: [unclosed").unwrap();

        let result = ServerConfig::load(&path, &quiet_logger());
        assert!(result.is_err());
    }

    #[test]
    fn test_apply_unknown_preset_is_a_noop() {
        let mut config: ServerConfig = serde_yaml::from_str(SAMPLE_CONFIG).unwrap();
        let before = config.clone();

        let applied = config.apply_preset("does_not_exist", &quiet_logger());

        assert!(!applied);
        assert_eq!(config, before);
    }

    #[test]
    fn test_apply_preset_writes_into_target_sections() {
        let mut config: ServerConfig = serde_yaml::from_str(SAMPLE_CONFIG).unwrap();

        assert!(config.apply_preset("ultra_low_memory", &quiet_logger()));

        assert_eq!(config.quantization.torchao_config.as_deref(), Some("int4wo-64"));
        assert_eq!(config.quantization.kv_cache_dtype.as_deref(), Some("fp8_e5m2"));
        assert_eq!(config.memory.mem_fraction_static, Some(0.6));
        assert_eq!(config.memory.chunked_prefill_size, Some(2048));
        assert_eq!(config.memory.max_running_requests, Some(16));
        assert_eq!(config.optimization.disable_cuda_graph, Some(true));
        // untouched by this preset
        assert_eq!(config.model.dtype.as_deref(), Some("bfloat16"));
        assert_eq!(config.quantization.method.as_deref(), Some("fp8"));
    }

    #[test]
    fn test_apply_preset_populates_empty_sections() {
        // Document with presets only: target sections start out unset.
        let doc = r#"
quantization_presets:
  balanced:
    dtype: bfloat16
    mem_fraction_static: 0.85
    enable_flashinfer: true
"#;
        let mut config: ServerConfig = serde_yaml::from_str(doc).unwrap();
        assert_eq!(config.model.dtype, None);

        assert!(config.apply_preset("balanced", &quiet_logger()));

        assert_eq!(config.model.dtype.as_deref(), Some("bfloat16"));
        assert_eq!(config.memory.mem_fraction_static, Some(0.85));
        assert_eq!(config.optimization.enable_flashinfer, Some(true));
    }
}
