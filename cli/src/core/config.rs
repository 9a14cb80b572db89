//! # slipstream Configuration System
//!
//! File: cli/src/core/config.rs
//!
//! ## Overview
//!
//! Loads, merges and validates the TOML configuration that supplies default
//! archive filters and pipeline tuning. Command-line flags always win over
//! anything configured here.
//!
//! ## Architecture
//!
//! Configuration sources (in order of precedence):
//! 1. An explicit `--config FILE` (replaces 2 and 3 entirely)
//! 2. Project-specific `.slipstream.toml` in the archive root, or else in the
//!    current directory or its ancestors (the search stops at a `.git` directory)
//! 3. User-specific `<config dir>/slipstream/config.toml`
//! 4. Default values defined in the code
//!
//! ```toml
//! [archive]
//! exclude = ["target/", "*.log"]
//! include = []
//! vcs = false
//!
//! [pipeline]
//! buffer_size = 4194304
//! chunk_size = 65536
//! channel_depth = 16
//! compression_level = 6
//! ```
//!
//! `[archive]` settings only apply to directory targets; a single file is
//! always archived as-is.
//!
use crate::common::archive::{compression, pipe, ArchiveOptions, PipelineSettings, DEFAULT_BUFFER_SIZE};
use crate::core::error::{ArchiveError, Result};
use anyhow::{anyhow, Context};
use directories::ProjectDirs;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

/// Represents the main configuration structure, loaded from TOML files.
#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Default filters for directory targets.
#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ArchiveConfig {
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub include: Vec<String>,
    /// Restrict archives to VCS-tracked files by default.
    #[serde(default)]
    pub vcs: bool,
}

/// Producer/consumer pipeline tuning.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Bytes buffered between the gzip sink and the pipe.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Largest chunk handed to the reader in one piece.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Chunks allowed in flight before the producer blocks.
    #[serde(default = "default_channel_depth")]
    pub channel_depth: usize,
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            chunk_size: default_chunk_size(),
            channel_depth: default_channel_depth(),
            compression_level: default_compression_level(),
        }
    }
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}
fn default_chunk_size() -> usize {
    pipe::DEFAULT_CHUNK_SIZE
}
fn default_channel_depth() -> usize {
    pipe::DEFAULT_DEPTH
}
fn default_compression_level() -> u32 {
    compression::DEFAULT_LEVEL
}

impl Config {
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            buffer_size: self.pipeline.buffer_size,
            chunk_size: self.pipeline.chunk_size,
            channel_depth: self.pipeline.channel_depth,
            compression_level: self.pipeline.compression_level,
        }
    }

    /// Archive options from config, overlaid with command-line values.
    /// Patterns given on the command line are added to the configured ones.
    pub fn archive_options(&self, exclude: &[String], include: &[String], vcs: bool) -> ArchiveOptions {
        ArchiveOptions {
            exclude: self.archive.exclude.iter().chain(exclude).cloned().collect(),
            include: self.archive.include.iter().chain(include).cloned().collect(),
            vcs: vcs || self.archive.vcs,
        }
    }
}

const PROJECT_CONFIG_FILENAME: &str = ".slipstream.toml";

/// Loads the configuration for archiving `root`.
///
/// With `explicit` set, only that file is read.
pub fn load_config(root: &Path, explicit: Option<&Path>) -> Result<Config> {
    let config = match explicit {
        Some(path) => {
            let path = expand_path(path);
            info!("Loading configuration from: {}", path.display());
            load_config_from_path(&path)?
        }
        None => {
            let user_config = load_user_config()?;
            let project_config = load_project_config(root)?;
            merge_configs(user_config.unwrap_or_default(), project_config)
        }
    };
    validate_config(&config).context("Configuration validation failed")?;
    debug!("Final loaded configuration: {:?}", config);
    Ok(config)
}

/// Expands `~` and environment variables in a user-supplied path.
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(&raw) {
        Ok(expanded) => PathBuf::from(expanded.into_owned()),
        Err(e) => {
            warn!("Cannot expand '{}': {}; using it verbatim", raw, e);
            path.to_path_buf()
        }
    }
}

fn load_user_config() -> Result<Option<Config>> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "slipstream") {
        let config_path = proj_dirs.config_dir().join("config.toml");
        if config_path.is_file() {
            info!("Loading user configuration from: {}", config_path.display());
            load_config_from_path(&config_path).map(Some)
        } else {
            debug!("User configuration file not found at {}", config_path.display());
            Ok(None)
        }
    } else {
        warn!("Could not determine user config directory.");
        Ok(None)
    }
}

fn load_project_config(root: &Path) -> Result<Option<Config>> {
    let in_root = root.join(PROJECT_CONFIG_FILENAME);
    let found = if root.is_dir() && in_root.is_file() {
        Some(in_root)
    } else {
        let current_dir = std::env::current_dir().context("Failed to get current directory")?;
        find_project_config_path(&current_dir)
    };

    match found {
        Some(path) => {
            info!("Loading project configuration from: {}", path.display());
            load_config_from_path(&path).map(Some)
        }
        None => {
            debug!("No project configuration file ({}) found.", PROJECT_CONFIG_FILENAME);
            Ok(None)
        }
    }
}

fn find_project_config_path(start: &Path) -> Option<PathBuf> {
    let mut path = start;
    loop {
        let project_config = path.join(PROJECT_CONFIG_FILENAME);
        if project_config.is_file() {
            return Some(project_config);
        }
        if path.join(".git").is_dir() {
            debug!(
                "Found .git directory at {}, stopping project config search.",
                path.display()
            );
            return None;
        }
        path = path.parent()?;
    }
}

fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse TOML from file: {}", path.display()))
}

/// Field-wise merge: a project value wins whenever it differs from the default.
fn merge_configs(user: Config, project: Option<Config>) -> Config {
    let project = match project {
        Some(p) => p,
        None => return user,
    };
    let defaults = PipelineConfig::default();
    let pick = |p: usize, u: usize, d: usize| if p != d { p } else { u };

    Config {
        archive: ArchiveConfig {
            exclude: if !project.archive.exclude.is_empty() {
                project.archive.exclude
            } else {
                user.archive.exclude
            },
            include: if !project.archive.include.is_empty() {
                project.archive.include
            } else {
                user.archive.include
            },
            vcs: project.archive.vcs || user.archive.vcs,
        },
        pipeline: PipelineConfig {
            buffer_size: pick(project.pipeline.buffer_size, user.pipeline.buffer_size, defaults.buffer_size),
            chunk_size: pick(project.pipeline.chunk_size, user.pipeline.chunk_size, defaults.chunk_size),
            channel_depth: pick(
                project.pipeline.channel_depth,
                user.pipeline.channel_depth,
                defaults.channel_depth,
            ),
            compression_level: if project.pipeline.compression_level != defaults.compression_level {
                project.pipeline.compression_level
            } else {
                user.pipeline.compression_level
            },
        },
    }
}

fn validate_config(config: &Config) -> Result<()> {
    let p = &config.pipeline;
    for (name, value) in [
        ("buffer_size", p.buffer_size),
        ("chunk_size", p.chunk_size),
        ("channel_depth", p.channel_depth),
    ] {
        if value == 0 {
            return Err(anyhow!(ArchiveError::Config(format!(
                "pipeline.{} must be greater than zero",
                name
            ))));
        }
    }
    if p.compression_level > 9 {
        return Err(anyhow!(ArchiveError::Config(format!(
            "pipeline.compression_level must be between 0 and 9, got {}",
            p.compression_level
        ))));
    }
    for pattern in config.archive.exclude.iter().chain(&config.archive.include) {
        if pattern.trim().is_empty() {
            return Err(anyhow!(ArchiveError::Config(
                "archive patterns cannot be empty".into()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_deserialize_basic_toml() {
        let toml_content = r#"
            [archive]
            exclude = ["target/", "*.log"]
            vcs = true

            [pipeline]
            chunk_size = 1024
        "#;

        let config: Config = toml::from_str(toml_content).expect("Failed to parse TOML");

        assert_eq!(config.archive.exclude, vec!["target/", "*.log"]);
        assert!(config.archive.include.is_empty());
        assert!(config.archive.vcs);
        assert_eq!(config.pipeline.chunk_size, 1024);
        assert_eq!(config.pipeline.buffer_size, DEFAULT_BUFFER_SIZE); // Default
        assert_eq!(config.pipeline.compression_level, 6); // Default
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        assert!(toml::from_str::<Config>("[archive]\nexcludes = []\n").is_err());
        assert!(toml::from_str::<Config>("[network]\n").is_err());
    }

    #[test]
    fn test_merge_project_over_user() {
        let user = Config {
            archive: ArchiveConfig {
                exclude: vec!["*.tmp".into()],
                include: vec!["docs/".into()],
                vcs: false,
            },
            pipeline: PipelineConfig {
                chunk_size: 2048,
                compression_level: 9,
                ..Default::default()
            },
        };
        let project = Config {
            archive: ArchiveConfig {
                exclude: vec!["target/".into()],
                ..Default::default()
            },
            pipeline: PipelineConfig {
                channel_depth: 4,
                ..Default::default()
            },
        };

        let merged = merge_configs(user.clone(), Some(project));
        assert_eq!(merged.archive.exclude, vec!["target/"]);
        assert_eq!(merged.archive.include, vec!["docs/"]);
        assert_eq!(merged.pipeline.chunk_size, 2048);
        assert_eq!(merged.pipeline.channel_depth, 4);
        assert_eq!(merged.pipeline.compression_level, 9);

        assert_eq!(merge_configs(user.clone(), None), user);
    }

    #[test]
    fn test_validate_rejects_zero_and_bad_level() {
        assert!(validate_config(&Config::default()).is_ok());

        let mut config = Config::default();
        config.pipeline.chunk_size = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("chunk_size"));

        let mut config = Config::default();
        config.pipeline.compression_level = 10;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.archive.exclude = vec!["  ".into()];
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_find_project_config_stops_at_git() {
        let temp_dir = tempdir().unwrap();
        let repo = temp_dir.path().join("repo");
        let nested = repo.join("a/b");
        fs::create_dir_all(&nested).unwrap();
        fs::create_dir(repo.join(".git")).unwrap();
        // above the repository, must not be found
        fs::write(temp_dir.path().join(PROJECT_CONFIG_FILENAME), "").unwrap();

        assert_eq!(find_project_config_path(&nested), None);

        fs::write(repo.join("a").join(PROJECT_CONFIG_FILENAME), "").unwrap();
        assert_eq!(
            find_project_config_path(&nested),
            Some(repo.join("a").join(PROJECT_CONFIG_FILENAME))
        );
    }

    #[test]
    fn test_load_config_prefers_root_project_file() {
        let temp_dir = tempdir().unwrap();
        fs::write(
            temp_dir.path().join(PROJECT_CONFIG_FILENAME),
            "[archive]\nexclude = [\"build/\"]\n",
        )
        .unwrap();
        let project = load_project_config(temp_dir.path()).unwrap().unwrap();
        assert_eq!(project.archive.exclude, vec!["build/"]);
    }

    #[test]
    fn test_load_config_explicit_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("custom.toml");
        fs::write(&path, "[pipeline]\ncompression_level = 1\n").unwrap();
        let config = load_config(temp_dir.path(), Some(&path)).unwrap();
        assert_eq!(config.pipeline_settings().compression_level, 1);

        fs::write(&path, "[pipeline]\nchannel_depth = 0\n").unwrap();
        assert!(load_config(temp_dir.path(), Some(&path)).is_err());
        assert!(load_config(temp_dir.path(), Some(&temp_dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn test_archive_options_overlay() {
        let config = Config {
            archive: ArchiveConfig {
                exclude: vec!["target/".into()],
                include: vec![],
                vcs: false,
            },
            ..Default::default()
        };
        let opts = config.archive_options(&["*.log".into()], &[], true);
        assert_eq!(opts.exclude, vec!["target/", "*.log"]);
        assert!(opts.vcs);
    }

    #[test]
    fn test_path_expansion() {
        let home = directories::BaseDirs::new().unwrap().home_dir().to_path_buf();
        assert_eq!(expand_path(Path::new("~/out.tgz")), home.join("out.tgz"));
        assert_eq!(expand_path(Path::new("/abs/out.tgz")), PathBuf::from("/abs/out.tgz"));
    }
}
