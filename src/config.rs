//! Configuration
//!
//! Settings read from the environment (and a `.env` file loaded at startup).

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::delivery::SmtpSettings;
use crate::report::{Banner, REPORT_FILE_NAME};

pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_OUTPUT_DIR: &str = "generated_files";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub output_dir: PathBuf,
    /// Only set when the file exists
    pub logo_path: Option<PathBuf>,
    pub institution: String,
    pub device_title: String,
    /// None disables email delivery
    pub smtp: Option<SmtpSettings>,
}

/// Directory holding `data/` and `assets/`: the crate root when running from
/// target/debug or target/release, otherwise the executable's directory
pub fn project_root() -> PathBuf {
    let mut path = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));

    if path.ends_with("release") || path.ends_with("debug") {
        if let Some(parent) = path.parent() {
            if let Some(grandparent) = parent.parent() {
                path = grandparent.to_path_buf();
            }
        }
    }
    path
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok(), &project_root())
    }

    /// Build from any key lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F, root: &Path) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Banner::default();

        let database_path = get("MHM_DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| root.join("data").join("mhm.db"));

        let output_dir = get("MHM_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

        let logo_path = get("MHM_LOGO_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| root.join("assets").join("logo.png"));
        let logo_path = logo_path.is_file().then_some(logo_path);

        let smtp = match (get("SMTP_USER"), get("SMTP_PASS")) {
            (Some(username), Some(password)) => {
                let port = match get("SMTP_PORT") {
                    Some(raw) => raw.parse().unwrap_or_else(|_| {
                        warn!(value = %raw, default = DEFAULT_SMTP_PORT, "invalid SMTP_PORT, using default");
                        DEFAULT_SMTP_PORT
                    }),
                    None => DEFAULT_SMTP_PORT,
                };
                Some(SmtpSettings {
                    host: get("SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
                    port,
                    username,
                    password,
                })
            }
            _ => None,
        };

        Self {
            database_path,
            output_dir,
            logo_path,
            institution: get("MHM_INSTITUTION").unwrap_or(defaults.institution),
            device_title: get("MHM_DEVICE_TITLE").unwrap_or(defaults.device_title),
            smtp,
        }
    }

    /// Fixed path every report is written to
    pub fn report_output_path(&self) -> PathBuf {
        self.output_dir.join(REPORT_FILE_NAME)
    }

    pub fn banner(&self) -> Banner {
        Banner {
            logo: self.logo_path.clone(),
            institution: self.institution.clone(),
            device_title: self.device_title.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)], root: &Path) -> AppConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned(), root)
    }

    #[test]
    fn test_defaults() {
        let root = tempfile::tempdir().unwrap();
        let cfg = config(&[], root.path());

        assert_eq!(cfg.database_path, root.path().join("data").join("mhm.db"));
        assert_eq!(cfg.report_output_path(), PathBuf::from("generated_files/medical_report.pdf"));
        assert_eq!(cfg.logo_path, None);
        assert_eq!(cfg.institution, "Indian Institute of Technology Kharagpur");
        assert!(cfg.smtp.is_none());
    }

    #[test]
    fn test_logo_used_when_present() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("assets")).unwrap();
        std::fs::write(root.path().join("assets").join("logo.png"), b"png").unwrap();

        let cfg = config(&[], root.path());
        assert_eq!(cfg.logo_path, Some(root.path().join("assets").join("logo.png")));
        assert_eq!(cfg.banner().logo, cfg.logo_path);
    }

    #[test]
    fn test_smtp_requires_user_and_password() {
        let root = tempfile::tempdir().unwrap();
        assert!(config(&[("SMTP_USER", "a@example.com")], root.path()).smtp.is_none());

        let cfg = config(
            &[("SMTP_USER", "a@example.com"), ("SMTP_PASS", "secret"), ("SMTP_PORT", "2525")],
            root.path(),
        );
        let smtp = cfg.smtp.unwrap();
        assert_eq!(smtp.host, DEFAULT_SMTP_HOST);
        assert_eq!(smtp.port, 2525);
    }

    #[test]
    fn test_invalid_port_falls_back() {
        let root = tempfile::tempdir().unwrap();
        let cfg = config(
            &[("SMTP_USER", "a@example.com"), ("SMTP_PASS", "secret"), ("SMTP_PORT", "smtp")],
            root.path(),
        );
        assert_eq!(cfg.smtp.unwrap().port, DEFAULT_SMTP_PORT);
    }

    #[test]
    fn test_overrides() {
        let root = tempfile::tempdir().unwrap();
        let cfg = config(
            &[("MHM_OUTPUT_DIR", "/tmp/reports"), ("MHM_INSTITUTION", "District Hospital"), ("MHM_DATABASE_PATH", " ")],
            root.path(),
        );
        assert_eq!(cfg.report_output_path(), PathBuf::from("/tmp/reports/medical_report.pdf"));
        assert_eq!(cfg.institution, "District Hospital");
        assert_eq!(cfg.database_path, root.path().join("data").join("mhm.db"));
    }
}
