//! Runtime configuration, from flags or environment (`.env` is loaded first)

use clap::Parser;
use review_export::ExportSettings;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "review-api")]
#[command(version, about = "PDF review comments and annotated archive export")]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3001)]
    pub port: u16,

    /// SQLite connection string; defaults to the platform data directory
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Brand shown as the producer of archived documents
    #[arg(long, env = "BRANDING", default_value = "Boba Match")]
    pub branding: String,

    /// Ghostscript binary
    #[arg(long, env = "GHOSTSCRIPT_PATH", default_value = "gs")]
    pub ghostscript_path: PathBuf,

    /// Upper bound on one archive render
    #[arg(long, env = "GHOSTSCRIPT_TIMEOUT_SECS", default_value_t = 120)]
    pub ghostscript_timeout_secs: u64,

    /// Directory uploaded PDFs are stored in
    #[arg(long, env = "PDF_PATH", default_value = "pdfs")]
    pub pdf_path: PathBuf,

    /// Base URL of the review front end, used in feed links
    #[arg(long, env = "PUBLIC_URL", default_value = "http://localhost:3001/")]
    pub public_url: String,

    /// Emails allowed to see every review and all activity
    #[arg(long = "admin", env = "ADMINS", value_delimiter = ',')]
    pub admins: Vec<String>,
}

impl Config {
    pub fn database_url(&self) -> String {
        self.database_url.clone().unwrap_or_else(|| {
            let data_dir = dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("review-api");
            std::fs::create_dir_all(&data_dir).ok();
            format!("sqlite:{}/reviews.db?mode=rwc", data_dir.display())
        })
    }

    pub fn export_settings(&self) -> ExportSettings {
        ExportSettings {
            producer: self.branding.clone(),
            ghostscript: self.ghostscript_path.clone(),
        }
    }

    pub fn ghostscript_timeout(&self) -> Duration {
        Duration::from_secs(self.ghostscript_timeout_secs)
    }

    pub fn is_admin(&self, email: &str) -> bool {
        self.admins.iter().any(|admin| admin.eq_ignore_ascii_case(email))
    }

    /// Front-end link to one review
    pub fn review_url(&self, review_id: &str) -> String {
        format!("{}?review={}", self.public_url, review_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let config = Config::try_parse_from([
            "review-api",
            "--port",
            "8080",
            "--branding",
            "Acme",
            "--ghostscript-path",
            "/opt/gs/bin/gs",
            "--database-url",
            "sqlite::memory:",
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_url(), "sqlite::memory:");
        let settings = config.export_settings();
        assert_eq!(settings.producer, "Acme");
        assert_eq!(settings.ghostscript, PathBuf::from("/opt/gs/bin/gs"));
    }

    #[test]
    fn test_timeout_is_seconds() {
        let config = Config::try_parse_from(["review-api", "--ghostscript-timeout-secs", "7"]).unwrap();
        assert_eq!(config.ghostscript_timeout(), Duration::from_secs(7));
    }

    #[test]
    fn test_admin_list() {
        let config = Config::try_parse_from([
            "review-api",
            "--admin",
            "root@example.com,Ops@Example.com",
            "--public-url",
            "https://reviews.example.com/",
        ])
        .unwrap();
        assert!(config.is_admin("root@example.com"));
        assert!(config.is_admin("ops@example.com"));
        assert!(!config.is_admin("ann@example.com"));
        assert_eq!(
            config.review_url("abc"),
            "https://reviews.example.com/?review=abc"
        );
    }
}
