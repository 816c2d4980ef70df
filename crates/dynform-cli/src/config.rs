//! CLI Configuration

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_FORMS_PATH: &str = "forms.yaml";
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub api_url: Option<String>,
    pub forms_path: Option<String>,
    pub default_format: Option<String>,
}

impl Config {
    pub fn load(profile: Option<&str>) -> Result<Self, String> {
        Self::load_from(&Self::config_path(profile)?)
    }

    pub fn save(&self, profile: Option<&str>) -> Result<PathBuf, String> {
        let path = Self::config_path(profile)?;
        self.save_to(&path)?;
        Ok(path)
    }

    fn load_from(path: &PathBuf) -> Result<Self, String> {
        if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
            toml::from_str(&content).map_err(|e| e.to_string())
        } else {
            Ok(Self::default())
        }
    }

    fn save_to(&self, path: &PathBuf) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(path, content).map_err(|e| e.to_string())
    }

    /// Set one key by name
    pub fn set(&mut self, key: &str, value: String) -> Result<(), String> {
        match key {
            "api_url" => self.api_url = Some(value),
            "forms_path" => self.forms_path = Some(value),
            "default_format" => {
                if crate::output::OutputFormat::parse(&value).is_none() {
                    return Err(format!("Unknown format: {}", value));
                }
                self.default_format = Some(value)
            }
            _ => return Err(format!("Unknown config key: {}", key)),
        }
        Ok(())
    }

    /// Read one key by name
    pub fn get(&self, key: &str) -> Result<Option<&str>, String> {
        match key {
            "api_url" => Ok(self.api_url.as_deref()),
            "forms_path" => Ok(self.forms_path.as_deref()),
            "default_format" => Ok(self.default_format.as_deref()),
            _ => Err(format!("Unknown config key: {}", key)),
        }
    }

    fn config_path(profile: Option<&str>) -> Result<PathBuf, String> {
        let home = dirs::home_dir().ok_or("Cannot find home directory")?;
        let filename = match profile {
            Some(p) => format!("config.{}.toml", p),
            None => "config.toml".to_string(),
        };
        Ok(home.join(".dynform").join(filename))
    }
}
