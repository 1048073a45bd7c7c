use crate::cli::UnwrapArgs;
use crate::error::{CliError, Result};
use pbcunwrap::core::io::dcd::DcdWriteOptions;
use pbcunwrap::engine::config::{UnwrapConfig, UnwrapConfigBuilder};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
enum PartialExecutionMode {
    Sequential,
    Parallel,
}

impl PartialExecutionMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sequential" => Some(Self::Sequential),
            "parallel" => Some(Self::Parallel),
            _ => None,
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialExecutionConfig {
    mode: Option<PartialExecutionMode>,
    workers: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialOutputConfig {
    titles: Option<Vec<String>>,
    carry_timing: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialRunConfig {
    execution: Option<PartialExecutionConfig>,
    output: Option<PartialOutputConfig>,
}

/// Fully resolved settings for one `unwrap` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub unwrap: UnwrapConfig,
    pub titles: Vec<String>,
    /// Copy start step, save interval and timestep from the input header.
    pub carry_timing: bool,
}

impl PartialRunConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Loads the file named by `--config`, or starts from an empty configuration.
    pub fn load(args: &UnwrapArgs) -> Result<Self> {
        match &args.config {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Resolves the final settings. Explicit CLI flags win over `--set` values, which
    /// win over the config file, which wins over built-in defaults.
    pub fn merge_with_cli(mut self, args: &UnwrapArgs) -> Result<RunSettings> {
        self.apply_set_values(&args.set_values)?;

        let exec = self.execution.take().unwrap_or_default();
        let output = self.output.take().unwrap_or_default();

        let sequential = if args.sequential {
            true
        } else if args.workers.is_some() {
            false
        } else {
            exec.mode == Some(PartialExecutionMode::Sequential)
        };

        let mut builder = UnwrapConfigBuilder::new().sequential(sequential);
        if let Some(workers) = args.workers.or(exec.workers) {
            builder = builder.workers(workers);
        }
        let unwrap = builder.build()?;

        let titles = if !args.titles.is_empty() {
            args.titles.clone()
        } else {
            output
                .titles
                .unwrap_or_else(|| DcdWriteOptions::default().titles)
        };

        let carry_timing = if args.no_carry_timing {
            false
        } else {
            output.carry_timing.unwrap_or(true)
        };

        Ok(RunSettings {
            unwrap,
            titles,
            carry_timing,
        })
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        if set_values.is_empty() {
            return Ok(());
        }
        for kv_pair in set_values {
            let parts: Vec<_> = kv_pair.splitn(2, '=').collect();
            if parts.len() != 2 {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            }
            let key = parts[0];
            let value_str = parts[1];

            match key {
                "execution.mode" => {
                    self.execution.get_or_insert_with(Default::default).mode =
                        Some(PartialExecutionMode::parse(value_str).ok_or_else(|| {
                            CliError::Config(format!(
                                "Invalid value for {}: {} (expected 'sequential' or 'parallel')",
                                key, value_str
                            ))
                        })?);
                }
                "execution.workers" => {
                    self.execution.get_or_insert_with(Default::default).workers =
                        Some(value_str.parse().map_err(|_| {
                            CliError::Config(format!(
                                "Invalid integer value for {}: {}",
                                key, value_str
                            ))
                        })?);
                }
                "output.carry-timing" => {
                    self.output
                        .get_or_insert_with(Default::default)
                        .carry_timing = Some(value_str.parse().map_err(|_| {
                        CliError::Config(format!("Invalid boolean value for {}: {}", key, value_str))
                    })?);
                }
                "output.title" => {
                    self.output
                        .get_or_insert_with(Default::default)
                        .titles
                        .get_or_insert_with(Vec::new)
                        .push(value_str.to_string());
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}
