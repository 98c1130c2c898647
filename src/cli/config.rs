//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::{ModelArgs, ServerArgs};
use crate::config::{AppConfig, AppConfigBuilder};
use anyhow::{Context, Result};
use std::path::Path;

/// Merges a configuration file with command-line overrides
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build a validated [`AppConfig`]: defaults, then the file, then the flags
    pub(crate) fn from_args(
        config_file: Option<&Path>,
        server: &ServerArgs,
        model: &ModelArgs,
    ) -> Result<AppConfig> {
        let base = match config_file {
            Some(path) => AppConfig::from_file(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?,
            None => AppConfig::default(),
        };

        let mut builder = AppConfigBuilder::from_config(base);
        if let Some(host) = &server.host {
            builder = builder.host(host.clone());
        }
        if let Some(port) = server.port {
            builder = builder.port(port);
        }
        if let Some(megabytes) = server.max_upload_mb {
            builder = builder.max_upload_mb(megabytes);
        }
        if let Some(backend) = model.backend {
            builder = builder.backend(backend);
        }
        if let Some(provider) = model.execution_provider {
            builder = builder.execution_provider(provider);
        }
        if let Some(path) = &model.model {
            builder = builder.model_path(path.clone());
        }
        if let Some(url) = &model.model_url {
            builder = builder.model_url(url.clone());
        }
        if let Some(dir) = &model.cache_dir {
            builder = builder.cache_dir(dir.clone());
        }
        if let Some(threads) = model.threads {
            builder = builder.threads(threads);
        }

        builder.build().context("Invalid configuration")
    }
}
