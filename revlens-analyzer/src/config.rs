//! Configuration resolution for revlens-analyzer
//!
//! Priority, highest first: command line → environment → TOML → compiled default.
//! Command-line flags carry their own environment fallbacks through clap.

use crate::models::PipelineParameters;
use crate::services::openai_client::OpenAiSettings;
use clap::Parser;
use revlens_common::config::{
    default_config_path, is_valid_key, load_toml_config, RootFolderResolver, TomlConfig,
};
use revlens_common::{Error, Result};
use std::path::PathBuf;
use tracing::{info, warn};

pub const MODULE_NAME: &str = "revlens-analyzer";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_FRONTEND_ORIGIN: &str = "http://localhost:3000";

const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
const OPENAI_BASE_URL_ENV: &str = "OPENAI_BASE_URL";
const FRONTEND_ORIGIN_ENV: &str = "FRONTEND_ORIGIN";

/// Command-line arguments for revlens-analyzer
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "revlens-analyzer")]
#[command(about = "Review analytics microservice")]
#[command(version)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "REVLENS_PORT")]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(short, long, env = "REVLENS_BIND")]
    pub bind: Option<String>,

    /// TOML config file
    #[arg(short, long, value_name = "FILE", env = "REVLENS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Root data folder (reviews, checkpoints, feedback log, models)
    #[arg(short, long, value_name = "DIR", env = "REVLENS_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub port: u16,
    pub bind_address: String,
    pub root_folder: PathBuf,
    pub frontend_origin: String,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub openai: OpenAiSettings,
    pub pipeline: PipelineParameters,
}

impl AnalyzerConfig {
    pub fn resolve(args: &Args, toml_config: &TomlConfig) -> Result<Self> {
        let root_folder = RootFolderResolver::new(MODULE_NAME)
            .with_cli_arg(args.data_dir.clone())
            .with_toml(toml_config)
            .resolve();

        let port = args.port.or(toml_config.port).unwrap_or(DEFAULT_PORT);
        let bind_address = args
            .bind
            .clone()
            .or_else(|| toml_config.bind_address.clone())
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let frontend_origin = env_value(FRONTEND_ORIGIN_ENV)
            .or_else(|| toml_config.frontend_origin.clone())
            .unwrap_or_else(|| DEFAULT_FRONTEND_ORIGIN.to_string());

        Ok(Self {
            port,
            bind_address,
            root_folder,
            frontend_origin,
            log_level: toml_config.logging.level.clone(),
            log_file: toml_config.logging.file.clone(),
            openai: resolve_openai_settings(toml_config),
            pipeline: resolve_pipeline_parameters(toml_config)?,
        })
    }
}

/// Load the TOML file named by `args`, or the one at the default location
///
/// Returns the path that was consulted alongside the parsed config.
pub fn load_toml(args: &Args) -> Result<(Option<PathBuf>, TomlConfig)> {
    match args.config.clone().or_else(|| default_config_path(MODULE_NAME)) {
        Some(path) => {
            let config = load_toml_config(&path)?;
            Ok((Some(path), config))
        }
        None => Ok((None, TomlConfig::default())),
    }
}

/// OpenAI connection settings: environment → TOML → defaults
///
/// A missing API key is not an error here; jobs fail at the first stage that
/// needs the remote service.
pub fn resolve_openai_settings(toml_config: &TomlConfig) -> OpenAiSettings {
    let section = &toml_config.openai;
    let mut settings = OpenAiSettings::default();

    let env_key = env_value(OPENAI_API_KEY_ENV);
    let toml_key = section.api_key.clone().filter(|k| is_valid_key(k));
    if env_key.is_some() && toml_key.is_some() {
        warn!("OpenAI API key found in environment and TOML. Using environment (highest priority).");
    }
    settings.api_key = match (env_key, toml_key) {
        (Some(key), _) => {
            info!("OpenAI API key loaded from environment variable");
            Some(key)
        }
        (None, Some(key)) => {
            info!("OpenAI API key loaded from TOML config");
            Some(key)
        }
        (None, None) => {
            warn!("OpenAI API key not configured; embedding and aspect stages will fail");
            None
        }
    };

    if let Some(base_url) = env_value(OPENAI_BASE_URL_ENV).or_else(|| section.base_url.clone()) {
        settings.base_url = base_url;
    }
    if let Some(model) = section.embedding_model.clone() {
        settings.embedding_model = model;
    }
    if let Some(model) = section.chat_model.clone() {
        settings.chat_model = model;
    }
    if let Some(rps) = section.requests_per_second {
        settings.requests_per_second = rps;
    }

    settings
}

/// Decode the `[pipeline]` table; absent keys take their defaults
pub fn resolve_pipeline_parameters(toml_config: &TomlConfig) -> Result<PipelineParameters> {
    match &toml_config.pipeline {
        Some(table) => table
            .clone()
            .try_into()
            .map_err(|e| Error::Config(format!("Invalid [pipeline] section: {}", e))),
        None => Ok(PipelineParameters::default()),
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| is_valid_key(v))
}
