use crate::utils::error::ClassifierError;
use crate::Result;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Side length of the square input the model was trained on.
pub const IMG_SIZE: u32 = 224;

/// Class names in model output order. Output position `i` is label `i`;
/// this must match the label order used when the artifact was trained.
pub const CLASS_NAMES: [&str; 2] = ["cat", "dog"];

/// Per-channel (R, G, B) mean used for standardization.
pub const NORMALIZE_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Per-channel (R, G, B) standard deviation used for standardization.
pub const NORMALIZE_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Extensions accepted by the upload form.
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address
    pub bind_addr: SocketAddr,

    /// Serialized model artifact
    pub model_path: PathBuf,

    /// Where uploaded images are stored
    pub upload_dir: PathBuf,

    /// Development mode
    pub dev_mode: bool,

    /// ONNX Runtime settings
    pub onnx_config: OnnxConfig,

    /// HTTP settings
    pub server_config: ServerConfig,
}

#[derive(Debug, Clone)]
pub struct OnnxConfig {
    /// Intra-op CPU threads
    pub intra_threads: usize,

    /// Graph optimization level (0-3)
    pub optimization_level: u8,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Request timeout in seconds
    pub request_timeout: u64,

    /// Maximum request body size in bytes
    pub max_request_size: usize,

    /// Extensions accepted by the upload form (lowercase, no dot)
    pub allowed_extensions: Vec<String>,

    /// Stored uploads older than this many seconds are deleted.
    /// `None` keeps every upload on disk indefinitely.
    pub upload_retention: Option<u64>,

    /// Seconds between upload directory sweeps
    pub upload_sweep_interval: u64,
}

impl Default for OnnxConfig {
    fn default() -> Self {
        Self {
            intra_threads: (num_cpus::get() * 3 / 4).max(1),
            optimization_level: 3,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            request_timeout: 60,
            max_request_size: 16 * 1024 * 1024,
            allowed_extensions: ALLOWED_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            upload_retention: Some(24 * 60 * 60),
            upload_sweep_interval: 600, // 10 minutes
        }
    }
}

impl Config {
    pub fn new(
        bind_addr: &str,
        model_path: impl Into<PathBuf>,
        upload_dir: impl Into<PathBuf>,
        dev_mode: bool,
    ) -> Result<Self> {
        let bind_addr: SocketAddr = bind_addr.parse().map_err(|e| {
            ClassifierError::Config(format!("Invalid bind address {}: {}", bind_addr, e))
        })?;

        let server_config = ServerConfig {
            // inference on a cold CPU can be slow while developing
            request_timeout: if dev_mode { 300 } else { 60 },
            ..ServerConfig::default()
        };

        Ok(Self {
            bind_addr,
            model_path: model_path.into(),
            upload_dir: upload_dir.into(),
            dev_mode,
            onnx_config: OnnxConfig::default(),
            server_config,
        })
    }

    /// Whether `filename` carries one of the allowed extensions.
    pub fn is_allowed_file(&self, filename: &str) -> bool {
        match filename.rsplit_once('.') {
            Some((_, ext)) => {
                let ext = ext.to_ascii_lowercase();
                self.server_config.allowed_extensions.iter().any(|a| *a == ext)
            }
            None => false,
        }
    }

    /// Human-readable list of allowed extensions, e.g. "png, jpg, jpeg, gif".
    pub fn allowed_extensions_display(&self) -> String {
        self.server_config.allowed_extensions.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::new("127.0.0.1:5000", "model.onnx", "uploads", false).unwrap()
    }

    #[test]
    fn test_invalid_bind_address() {
        let err = Config::new("not-an-address", "m.onnx", "u", false).unwrap_err();
        assert!(matches!(err, ClassifierError::Config(_)));
    }

    #[test]
    fn test_dev_mode_extends_timeout() {
        let dev = Config::new("127.0.0.1:5000", "m.onnx", "u", true).unwrap();
        assert_eq!(dev.server_config.request_timeout, 300);
        assert_eq!(config().server_config.request_timeout, 60);
    }

    #[test]
    fn test_allowed_file() {
        let config = config();
        assert!(config.is_allowed_file("cat.png"));
        assert!(config.is_allowed_file("DOG.JPEG"));
        assert!(config.is_allowed_file("archive.tar.gif"));
        assert!(!config.is_allowed_file("notes.txt"));
        assert!(!config.is_allowed_file("png"));
        assert!(!config.is_allowed_file(""));
    }

    #[test]
    fn test_defaults() {
        let config = config();
        assert_eq!(config.server_config.max_request_size, 16 * 1024 * 1024);
        assert!(config.onnx_config.intra_threads >= 1);
        assert_eq!(config.allowed_extensions_display(), "png, jpg, jpeg, gif");
        assert_eq!(config.server_config.upload_retention, Some(86_400));
    }

    #[test]
    fn test_label_set_matches_binary_model() {
        assert_eq!(CLASS_NAMES, ["cat", "dog"]);
        assert_eq!(IMG_SIZE, 224);
    }
}
