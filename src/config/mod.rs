// Configuration management module
// TOML settings for the embedding service, normalizer policy and ingestion runs

pub mod interactive;
pub mod settings;

#[cfg(test)]
mod tests;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{Config, ConfigError, IngestConfig, OllamaConfig};

/// Resolve the base directory, falling back to the per-user default
#[inline]
pub fn resolve_base_dir(
    base_dir: Option<std::path::PathBuf>,
) -> Result<std::path::PathBuf, ConfigError> {
    base_dir.map_or_else(Config::default_base_dir, Ok)
}
