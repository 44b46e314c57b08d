use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::{AppContext, InitArgs};
use crate::core::options::ExtractOptions;

/// Config file names tried in order; the first one found wins.
pub const CONFIG_FILES: [&str; 2] = ["cctx.toml", ".cctx.toml"];

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Defaults for every query; command-line flags override them
    pub extract: ExtractOptions,

    /// Logging defaults
    pub logging: LoggingConfig,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig
{
    /// Filter used when neither --verbose nor CCTX_LOG is given
    pub level: String,
}

impl Default for LoggingConfig
{
    fn default() -> Self
    {
        Self { level: "warn".to_string() }
    }
}

pub fn load_config() -> Result<Config>
{
    load_config_from(Path::new("."))
}

/// Layer the first config file in `dir` under `CCTX_*` environment variables.
///
/// Nested keys use a double underscore: `CCTX_EXTRACT__TOP_K=5`.
pub fn load_config_from(dir: &Path) -> Result<Config>
{
    let mut builder = config::Config::builder();

    for name in CONFIG_FILES
    {
        let path = dir.join(name);
        if path.exists()
        {
            builder = builder.add_source(
                config::File::from(path).format(config::FileFormat::Toml),
            );
            break;
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("CCTX")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    Ok(parsed)
}

pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join(CONFIG_FILES[0]);

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let config = Config::default();
    let toml_string =
        toml::to_string_pretty(&config).context("Failed to serialize default config")?;

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml()
    {
        let text = toml::to_string_pretty(&Config::default()).expect("serialize");
        assert!(text.contains("[extract]"));
        assert!(text.contains("top_k = 3"));

        let back: Config = toml::from_str(&text).expect("parse");
        assert_eq!(back.extract, ExtractOptions::default());
        assert_eq!(back.logging.level, "warn");
    }

    #[test]
    fn file_values_override_defaults()
    {
        let dir = assert_fs::TempDir::new().expect("tempdir");
        std::fs::write(
            dir.path().join(".cctx.toml"),
            "[extract]\ntop_k = 9\ninclude_leading_comments = false\n",
        )
        .expect("write");

        let cfg = load_config_from(dir.path()).expect("load");
        assert_eq!(cfg.extract.top_k, 9);
        assert!(!cfg.extract.include_leading_comments);
        assert_eq!(cfg.extract.prefix_lines, 5);
    }
}
