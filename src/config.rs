use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "img2text-server")]
#[command(about = "OCR processing and language orchestration pipeline for the img2text bot")]
#[command(version)]
pub struct Args {
    /// Host address to bind to
    #[arg(long, env = "IMG2TEXT_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "IMG2TEXT_PORT", default_value = "9292")]
    pub port: u16,

    /// Installed language packs, comma separated (e.g. "eng,deu,fra")
    #[arg(long, env = "IMG2TEXT_LANGUAGES", default_value = "eng")]
    pub languages: String,

    /// Default language substituted for unavailable requests
    #[arg(long, env = "IMG2TEXT_DEFAULT_LANGUAGE", default_value = "eng")]
    pub default_language: String,

    /// Recognition timeout per engine invocation in milliseconds
    #[arg(long, env = "IMG2TEXT_ENGINE_TIMEOUT_MS", default_value = "30000")]
    pub engine_timeout_ms: u64,

    /// Maximum image dimension in pixels; larger images are downscaled
    #[arg(long, env = "IMG2TEXT_MAX_DIMENSION_PX", default_value = "4000")]
    pub max_image_dimension_px: u32,

    /// Maximum upload size in bytes (default: 20MB)
    #[arg(long, env = "IMG2TEXT_MAX_FILE_SIZE", default_value = "20971520")]
    pub max_file_size: usize,

    /// Path of the JSON file holding per-user usage statistics
    #[arg(long, env = "IMG2TEXT_STATS_PATH")]
    pub stats_path: Option<PathBuf>,

    /// Path to tessdata directory (uses TESSDATA_PREFIX env var if not set)
    #[arg(long, env = "TESSDATA_PREFIX")]
    pub tessdata_path: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub installed_languages: Vec<String>,
    pub default_language: String,
    pub engine_timeout_ms: u64,
    pub max_image_dimension_px: u32,
    pub max_file_size: usize,
    pub stats_path: Option<PathBuf>,
    #[allow(dead_code)]
    pub tessdata_path: Option<String>,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            installed_languages: parse_language_list(&args.languages),
            default_language: args.default_language,
            engine_timeout_ms: args.engine_timeout_ms,
            max_image_dimension_px: args.max_image_dimension_px,
            max_file_size: args.max_file_size,
            stats_path: args.stats_path,
            tessdata_path: args.tessdata_path,
        }
    }
}

/// Split a comma separated language list, dropping empty entries and
/// duplicates while preserving order.
pub fn parse_language_list(raw: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for code in raw.split(',') {
        let code = code.trim().to_lowercase();
        if !code.is_empty() && !seen.contains(&code) {
            seen.push(code);
        }
    }
    seen
}
