use serde::Deserialize;
use std::{
    fs::File,
    io::{self, Read},
    path::{Path, PathBuf},
};

use crate::utils::resolve_config_dir;

const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid config due to missing fields or invalid syntax in {}: {source}", path.display())]
    InvalidConfig {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Unable to read config file {}: {source}", path.display())]
    Unreadable { path: PathBuf, source: io::Error },
    #[error("Missing {0}, pass it as a flag, an environment variable or set it in config.json")]
    Missing(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Defaults read from `<config-dir>/config.json`. Command line flags and
/// environment variables take precedence over every field.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
pub struct SamlAuthConfig {
    #[serde(alias = "idpId")]
    pub idp_id: Option<String>,
    #[serde(alias = "spId")]
    pub sp_id: Option<String>,
    #[serde(alias = "durationSeconds")]
    pub duration_seconds: Option<i32>,
    #[serde(alias = "samlFile")]
    pub saml_file: Option<PathBuf>,
    pub region: Option<String>,
}

impl SamlAuthConfig {
    fn load_config_from_reader<R: Read>(reader: R, path: &Path) -> Result<Self> {
        serde_json::from_reader::<R, SamlAuthConfig>(reader).map_err(|source| {
            Error::InvalidConfig {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    /// A missing config file is an empty config.
    pub fn load_config(config_dir: Option<&Path>) -> Result<Self> {
        let config_path = resolve_config_dir(config_dir).join(CONFIG_FILE_NAME);
        match File::open(&config_path) {
            Ok(file) => Self::load_config_from_reader(file, &config_path),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(Error::Unreadable {
                path: config_path,
                source,
            }),
        }
    }
}

/// Picks the first present value: flag or environment variable, then config file.
pub fn required(
    flag: Option<String>,
    configured: Option<String>,
    name: &'static str,
) -> Result<String> {
    flag.or(configured).ok_or(Error::Missing(name))
}
