use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use crate::voting::Roster;

/// Server settings, read from the command line, the environment, or a `.env` file.
#[derive(Clone, Debug, Parser)]
#[command(name = "ballot-server", version, about = "Single-election voting server")]
pub struct Settings {
    /// PostgreSQL connection string; without one the election lives in memory only.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    #[arg(long, env = "DB_POOL_SIZE", default_value_t = 5)]
    pub db_pool_size: u32,

    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:3001")]
    pub bind_addr: SocketAddr,

    /// Where uploaded candidate photos are written and served from.
    #[arg(long, env = "UPLOAD_DIR", default_value = "uploads")]
    pub upload_dir: PathBuf,

    #[arg(long, env = "MAX_PHOTO_BYTES", default_value_t = 5 * 1024 * 1024)]
    pub max_photo_bytes: u64,

    #[arg(
        long,
        env = "CORS_ORIGINS",
        value_delimiter = ',',
        default_value = "http://localhost:3000"
    )]
    pub cors_origins: Vec<String>,

    #[arg(long, env = "APP_ENV", default_value = "development")]
    pub environment: String,

    #[arg(long, env = "ADMIN_PASSWORD", default_value = "admin123", hide_env_values = true)]
    pub admin_password: String,

    #[arg(long, env = "VOTER_PASSWORD", default_value = "password123", hide_env_values = true)]
    pub voter_password: String,

    #[arg(long, env = "VOTER_COUNT", default_value_t = 20)]
    pub voter_count: u32,
}

impl Settings {
    pub fn load() -> Settings {
        dotenvy::dotenv().ok();
        Settings::parse()
    }

    pub fn roster(&self) -> Roster {
        Roster {
            admin_password: self.admin_password.clone(),
            voter_password: self.voter_password.clone(),
            voter_count: self.voter_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let settings = Settings::try_parse_from([
            "ballot-server",
            "--database-url",
            "postgres://localhost/ballots",
        ])
        .unwrap();
        assert_eq!(settings.database_url.as_deref(), Some("postgres://localhost/ballots"));
        assert_eq!(settings.bind_addr.port(), 3001);
        assert_eq!(settings.max_photo_bytes, 5 * 1024 * 1024);
        assert_eq!(settings.roster().voter_count, 20);
    }

    #[test]
    fn cors_origins_split_on_commas() {
        let settings = Settings::try_parse_from([
            "ballot-server",
            "--database-url",
            "postgres://localhost/ballots",
            "--cors-origins",
            "https://a.example,https://b.example",
        ])
        .unwrap();
        assert_eq!(settings.cors_origins, ["https://a.example", "https://b.example"]);
    }
}
