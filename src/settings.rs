//! Application settings, read from the `tracker` table of Rocket's
//! configuration (`Rocket.toml` or `ROCKET_TRACKER` in the environment).
use std::path::PathBuf;

use rocket::figment::Figment;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Csv,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub backend: Backend,
    pub data_dir: PathBuf,
    pub csv_file: String,
    pub sqlite_file: String,
    pub currency: String,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: Backend::Csv,
            data_dir: PathBuf::from("data"),
            csv_file: "project_expenses.csv".to_string(),
            sqlite_file: "expenses.sqlite".to_string(),
            currency: "₹".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    pub fn from_figment(figment: &Figment) -> Result<Self, rocket::figment::Error> {
        match figment.extract_inner::<Settings>("tracker") {
            Ok(settings) => Ok(settings),
            Err(err) if err.missing() => Ok(Settings::default()),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::figment::providers::{Format, Toml};

    #[test]
    fn missing_table_falls_back_to_defaults() {
        let figment = Figment::new();
        let settings = Settings::from_figment(&figment).unwrap();
        assert_eq!(settings.backend, Backend::Csv);
        assert_eq!(settings.csv_file, "project_expenses.csv");
    }

    #[test]
    fn partial_table_keeps_other_defaults() {
        let figment = Figment::new().merge(Toml::string(
            r#"
            [tracker]
            backend = "sqlite"
            currency = "$"
            "#,
        ));
        let settings = Settings::from_figment(&figment).unwrap();
        assert_eq!(settings.backend, Backend::Sqlite);
        assert_eq!(settings.currency, "$");
        assert_eq!(settings.sqlite_file, "expenses.sqlite");
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let figment = Figment::new().merge(Toml::string("tracker = { backend = \"xlsx\" }"));
        assert!(Settings::from_figment(&figment).is_err());
    }
}
