//! Server settings
//!
//! Layered from built-in defaults, an optional `dynform.{yaml,toml,json}`
//! file in the working directory, then `DYNFORM__*` environment variables
//! (`DYNFORM__BIND=0.0.0.0:9000`).

use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Listen address
    pub bind: String,
    /// Prefix the form routes are mounted under
    pub base_path: String,
    /// Secret for CSRF tokens; ephemeral when unset
    pub csrf_secret: Option<String>,
    /// Form definitions file
    pub forms_path: PathBuf,
    /// Message catalogue file
    pub translations_path: Option<PathBuf>,
    /// Directory of `*.hbs` mail documents
    pub templates_dir: Option<PathBuf>,
    /// Root directory for stored assets
    pub storage_root: PathBuf,
    /// JSON lines file for records; in memory when unset
    pub records_path: Option<PathBuf>,
    /// Mail API endpoint; mails are logged when unset
    pub mail_endpoint: Option<String>,
}

impl Settings {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(config::File::with_name("dynform").required(false))
    }

    pub fn load_from<S>(file: S) -> Result<Self, config::ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        config::Config::builder()
            .set_default("bind", "0.0.0.0:8080")?
            .set_default("base_path", "")?
            .set_default("forms_path", "forms.yaml")?
            .set_default("storage_root", "var/storage")?
            .add_source(file)
            .add_source(config::Environment::with_prefix("DYNFORM").separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_file() {
        let settings = Settings::load_from(config::File::from_str(
            "base_path: /site\nmail_endpoint: http://mail.local/send\n",
            config::FileFormat::Yaml,
        ))
        .unwrap();
        assert_eq!(settings.base_path, "/site");
        assert_eq!(settings.forms_path, PathBuf::from("forms.yaml"));
        assert_eq!(settings.mail_endpoint.as_deref(), Some("http://mail.local/send"));
        assert!(settings.csrf_secret.is_none());
    }
}
