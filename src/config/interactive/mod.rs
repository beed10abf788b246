
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};
use std::path::Path;

use super::{Config, ConfigError, IngestConfig, OllamaConfig};
use crate::normalize::{CaseFolding, NormalizationConfig, PhraseFilter};

#[inline]
pub fn run_interactive_config(base_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 Medical Ingest Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(base_dir)?;

    eprintln!("{}", style("Ollama Configuration").bold().yellow());
    eprintln!("Configure your local Ollama instance for embedding generation.");
    eprintln!();

    configure_ollama(&mut config.ollama)?;

    eprintln!();
    eprintln!("{}", style("Text Normalization").bold().yellow());
    configure_normalization(&mut config.normalization)?;

    eprintln!();
    eprintln!("{}", style("Ingestion").bold().yellow());
    configure_ingest(&mut config.ingest)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_ollama_connection(&config.ollama) {
        eprintln!("{}", style("✓ Ollama connection successful!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not connect to Ollama").yellow()
        );
        eprintln!("You can continue, but make sure Ollama is running before ingesting.");
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(base_dir: &Path) -> Result<()> {
    let config = Config::load(base_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Ollama Settings:").bold().yellow());
    eprintln!("  Host: {}", style(&config.ollama.host).cyan());
    eprintln!("  Port: {}", style(config.ollama.port).cyan());
    eprintln!("  Model: {}", style(&config.ollama.model).cyan());
    eprintln!("  Batch Size: {}", style(config.ollama.batch_size).cyan());
    eprintln!(
        "  Embedding Dimension: {}",
        style(config.ollama.embedding_dimension).cyan()
    );
    match config.ollama_url() {
        Ok(url) => eprintln!("  Ollama URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  Ollama URL: {} ({})", style("Invalid").red(), e),
    }

    eprintln!();
    eprintln!("{}", style("Normalization:").bold().yellow());
    let normalization = &config.normalization;
    eprintln!("  Case Folding: {}", style(normalization.case_folding).cyan());
    eprintln!(
        "  Title Repetitions: {}",
        style(normalization.title_repetitions).cyan()
    );
    eprintln!("  Phrase Filter: {}", style(normalization.phrase_filter).cyan());
    eprintln!(
        "  Min Phrase Length: {}",
        style(normalization.min_phrase_length).cyan()
    );
    eprintln!(
        "  Term Patterns: {}",
        style(normalization.term_patterns.len()).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Ingestion:").bold().yellow());
    eprintln!("  Collection: {}", style(&config.ingest.collection).cyan());
    if config.ingest.file_limit == 0 {
        eprintln!("  File Limit: {}", style("none").cyan());
    } else {
        eprintln!("  File Limit: {}", style(config.ingest.file_limit).cyan());
    }
    eprintln!(
        "  Skip Ingested: {}",
        style(config.ingest.skip_ingested).cyan()
    );

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );
    eprintln!("Ledger: {}", style(config.ledger_path().display()).dim());
    eprintln!(
        "Vector index: {}",
        style(config.vector_database_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config(base_dir: &Path) -> Result<Config> {
    Config::load(base_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No usable configuration found. Using defaults.").yellow()
            );
            Ok(Config::new(base_dir))
        },
        |config| {
            if config.config_file_path().exists() {
                eprintln!("{}", style("Found existing configuration.").green());
            }
            Ok(config)
        },
    )
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let protocols = &["http", "https"];
    let default_index = protocols
        .iter()
        .position(|&p| p == ollama.protocol)
        .unwrap_or(0);

    let protocol_index = Select::new()
        .with_prompt("Ollama protocol")
        .default(default_index)
        .items(protocols)
        .interact()?;

    let protocol = protocols[protocol_index].to_string();

    let host: String = Input::new()
        .with_prompt("Ollama host")
        .default(ollama.host.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            OllamaConfig {
                protocol: protocol.clone(),
                host: input.clone(),
                ..OllamaConfig::default()
            }
            .validate()
        })
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("Ollama port")
        .default(ollama.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Embedding model")
        .default(ollama.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let batch_size: u32 = Input::new()
        .with_prompt("Batch size for embedding generation")
        .default(ollama.batch_size)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Batch size must be greater than 0")
            } else if *input > 1000 {
                Err("Batch size must be 1000 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let embedding_dimension: u32 = Input::new()
        .with_prompt("Embedding dimension of the model")
        .default(ollama.embedding_dimension)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if (64..=4096).contains(input) {
                Ok(())
            } else {
                Err("Dimension must be between 64 and 4096")
            }
        })
        .interact_text()?;

    ollama.set_protocol(protocol)?;
    ollama.set_host(host)?;
    ollama.set_port(port)?;
    ollama.set_model(model)?;
    ollama.set_batch_size(batch_size)?;
    ollama.set_embedding_dimension(embedding_dimension)?;

    Ok(())
}

fn configure_normalization(normalization: &mut NormalizationConfig) -> Result<()> {
    let case_options = [CaseFolding::Preserve, CaseFolding::AcronymAware];
    let case_index = Select::new()
        .with_prompt("Case folding")
        .default(
            case_options
                .iter()
                .position(|&c| c == normalization.case_folding)
                .unwrap_or(0),
        )
        .items(&case_options)
        .interact()?;

    let filter_options = [PhraseFilter::Stopwords, PhraseFilter::Unfiltered];
    let filter_index = Select::new()
        .with_prompt("Capitalized phrase filter")
        .default(
            filter_options
                .iter()
                .position(|&f| f == normalization.phrase_filter)
                .unwrap_or(0),
        )
        .items(&filter_options)
        .interact()?;

    let title_repetitions: u8 = Input::new()
        .with_prompt("Title repetitions in embedded text")
        .default(normalization.title_repetitions)
        .validate_with(|input: &u8| -> Result<(), &str> {
            if (1..=3).contains(input) {
                Ok(())
            } else {
                Err("Title repetitions must be between 1 and 3")
            }
        })
        .interact_text()?;

    normalization.case_folding = case_options[case_index];
    normalization.phrase_filter = filter_options[filter_index];
    normalization.title_repetitions = title_repetitions;

    Ok(())
}

fn configure_ingest(ingest: &mut IngestConfig) -> Result<()> {
    let collection: String = Input::new()
        .with_prompt("Collection name")
        .default(ingest.collection.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if !input.is_empty()
                && input
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            {
                Ok(())
            } else {
                Err("Use letters, digits, '_' or '-'")
            }
        })
        .interact_text()?;

    let file_limit: usize = Input::new()
        .with_prompt("Maximum files per run (0 for no limit)")
        .default(ingest.file_limit)
        .interact_text()?;

    ingest.collection = collection;
    ingest.file_limit = file_limit;

    Ok(())
}

fn test_ollama_connection(ollama: &OllamaConfig) -> bool {
    let url = format!(
        "{}://{}:{}/api/tags",
        ollama.protocol, ollama.host, ollama.port
    );

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(&url).call() {
        Ok(_) => true,
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => true,
        Err(_) => false,
    }
}
