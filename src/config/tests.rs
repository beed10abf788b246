use super::*;
use std::fs;
use tempfile::TempDir;

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn config_file_persistence() {
        let temp_dir = TempDir::new().expect("should create TempDir successfully");

        let mut original_config = Config::new(temp_dir.path());
        original_config.ollama = OllamaConfig {
            protocol: "https".to_string(),
            host: "test-host".to_string(),
            port: 8080,
            model: "test-model".to_string(),
            batch_size: 32,
            embedding_dimension: 768,
        };
        original_config.ingest = IngestConfig {
            collection: "pubmed".to_string(),
            file_limit: 25,
            skip_ingested: true,
        };
        original_config
            .save()
            .expect("config should save successfully");

        let content = fs::read_to_string(original_config.config_file_path())
            .expect("should read from config path successfully");
        assert!(content.contains("[ollama]"));
        assert!(content.contains("[normalization]"));
        assert!(content.contains("[ingest]"));

        let loaded_config = Config::load(temp_dir.path()).expect("should load config");
        assert_eq!(original_config, loaded_config);
    }

    #[test]
    fn invalid_toml_handling() {
        let invalid_toml = r#"
            [ollama
            host = "localhost"
            port = "invalid_port"
        "#;

        let result: Result<Config, toml::de::Error> = toml::from_str(invalid_toml);
        assert!(result.is_err());
    }

    #[test]
    fn partial_config_with_defaults() {
        let partial_toml = r#"
            [ollama]
            host = "custom-host"

            [normalization]
            case_folding = "acronym_aware"
        "#;

        let config: Config = toml::from_str(partial_toml).expect("partial config should parse");
        assert_eq!(config.ollama.host, "custom-host");
        assert_eq!(config.ollama.port, 11434);
        assert_eq!(
            config.normalization.case_folding,
            crate::normalize::CaseFolding::AcronymAware
        );
        assert_eq!(config.normalization.title_repetitions, 1);
        assert_eq!(config.ingest.collection, "medical_articles");
    }

    #[test]
    fn complete_valid_config() {
        let valid_toml = r#"
            [ollama]
            protocol = "http"
            host = "localhost"
            port = 11434
            model = "all-minilm:latest"
            batch_size = 8
            embedding_dimension = 384

            [normalization]
            case_folding = "preserve"
            title_repetitions = 2
            phrase_filter = "unfiltered"
            min_phrase_length = 4
            term_patterns = ['\b[A-Z]+-[0-9]+\b']
            stopwords = ["The"]

            [ingest]
            collection = "articles"
            file_limit = 0
            skip_ingested = true
        "#;

        let config: Config = toml::from_str(valid_toml).expect("should parse toml successfully");
        assert!(config.validate().is_ok());
        assert_eq!(config.ollama.batch_size, 8);
        assert_eq!(config.normalization.title_repetitions, 2);
        assert_eq!(
            config.normalization.phrase_filter,
            crate::normalize::PhraseFilter::Unfiltered
        );
        assert_eq!(config.normalization.term_patterns, vec![r"\b[A-Z]+-[0-9]+\b"]);
        assert_eq!(config.ingest.file_limit, 0);
        assert!(config.ingest.skip_ingested);
    }

    #[test]
    fn unknown_enum_value_is_rejected() {
        let toml_str = r#"
            [normalization]
            case_folding = "lowercase"
        "#;

        let result: Result<Config, toml::de::Error> = toml::from_str(toml_str);
        assert!(result.is_err());
    }

    #[test]
    fn resolve_base_dir_prefers_explicit_path() {
        let temp_dir = TempDir::new().expect("should create TempDir successfully");
        let resolved =
            resolve_base_dir(Some(temp_dir.path().to_path_buf())).expect("path resolves");
        assert_eq!(resolved, temp_dir.path());
    }

    #[test]
    fn ollama_url_generation_with_different_hosts() {
        let configs = vec![
            ("http", "localhost", 11434, "http://localhost:11434/"),
            ("http", "127.0.0.1", 8080, "http://127.0.0.1:8080/"),
            (
                "https",
                "secure.example.com",
                443,
                "https://secure.example.com/",
            ),
        ];

        for (protocol, host, port, expected_url) in configs {
            let config = OllamaConfig {
                protocol: protocol.to_string(),
                host: host.to_string(),
                port,
                ..OllamaConfig::default()
            };

            let url = config.ollama_url().expect("ollama_url is ok");
            assert_eq!(url.as_str(), expected_url);
        }
    }

    #[test]
    fn error_display_messages() {
        let errors = vec![
            ConfigError::InvalidProtocol("ftp".to_string()),
            ConfigError::InvalidPort(0),
            ConfigError::InvalidBatchSize(0),
            ConfigError::InvalidModel(String::new()),
            ConfigError::InvalidUrl("invalid-url".to_string()),
            ConfigError::InvalidTitleRepetitions(9),
            ConfigError::InvalidCollection("a b".to_string()),
        ];

        for error in errors {
            let message = format!("{error}");
            assert!(message.len() > 10);
        }
    }
}
