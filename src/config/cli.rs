use crate::adapters::http::DEFAULT_TIMEOUT_SECONDS;
use crate::domain::model::RetrievalRequest;
use crate::utils::error::Result;
use crate::utils::validation::{validate_non_empty_string, validate_path, validate_positive_number, Validate};
use clap::Parser;

pub const DEFAULT_STORE_PATH: &str = "./data/contacts.json";

#[derive(Clone, Parser)]
#[command(name = "rent-portal-sync")]
#[command(about = "Retrieve tenant contact details from a rent-payment portal")]
pub struct CliConfig {
    #[arg(long, help = "Portal identifier, e.g. click_pay")]
    pub portal: String,

    #[arg(long)]
    pub username: String,

    #[arg(long, env = "RENT_PORTAL_PASSWORD", hide_env_values = true)]
    pub password: String,

    #[arg(long, help = "Optional TOML configuration file")]
    pub config: Option<String>,

    #[arg(long, help = "Contact store file [default: ./data/contacts.json]")]
    pub store_path: Option<String>,

    #[arg(
        long,
        default_value_t = DEFAULT_TIMEOUT_SECONDS,
        help = "Overall timeout for one portal interaction (seconds)"
    )]
    pub timeout_secs: u64,

    #[arg(long, help = "Print the record without saving it")]
    pub no_store: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

impl CliConfig {
    pub fn request(&self) -> RetrievalRequest {
        RetrievalRequest {
            portal: self.portal.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

impl std::fmt::Debug for CliConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliConfig")
            .field("portal", &self.portal)
            .field("username", &self.username)
            .field("config", &self.config)
            .field("store_path", &self.store_path)
            .field("timeout_secs", &self.timeout_secs)
            .field("no_store", &self.no_store)
            .finish_non_exhaustive()
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("portal", &self.portal)?;
        validate_non_empty_string("username", &self.username)?;
        validate_non_empty_string("password", &self.password)?;
        if let Some(path) = &self.store_path {
            validate_path("store_path", path)?;
        }
        validate_positive_number("timeout_secs", self.timeout_secs, 1)?;
        Ok(())
    }
}
