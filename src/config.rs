use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

use crate::auth::parse_credential;
use crate::league::{DisplayOptions, RetryPolicy};
use crate::records::{Squad, DEFAULT_MAX_PLAYERS, DEFAULT_SQUAD};

fn default_squad() -> Vec<String> {
    DEFAULT_SQUAD.iter().map(|p| p.to_string()).collect()
}

/// Team dashboard: match records, player stats and league tables
#[derive(Parser, Debug, Clone)]
#[command(name = "squad-dashboard", version, about)]
pub struct Config {
    /// Dashboard listen address
    #[arg(long, env = "DASHBOARD_ADDR", default_value = "0.0.0.0:8080")]
    pub dashboard_addr: String,

    /// Match records CSV table
    #[arg(long, env = "RECORDS_PATH", default_value = "maradonners_fc_results.csv")]
    pub records_path: String,

    /// SQLite database holding the cached league tables
    #[arg(long, env = "DATABASE_PATH", default_value = "league.db")]
    pub database_path: String,

    /// Squad members, comma separated, in display order
    #[arg(long, env = "SQUAD", value_delimiter = ',', default_values_t = default_squad())]
    pub squad: Vec<String>,

    /// Maximum players selected for one match
    #[arg(long, env = "MAX_PLAYERS", default_value_t = DEFAULT_MAX_PLAYERS)]
    pub max_players: usize,

    /// Write access as ROLE=PASSWORD (repeatable, or comma separated in env)
    #[arg(
        long = "credential",
        env = "CREDENTIALS",
        value_delimiter = ',',
        value_parser = parse_credential
    )]
    pub credentials: Vec<(String, String)>,

    /// League standings page to scrape
    #[arg(
        long,
        env = "LEAGUE_URL",
        default_value = "https://discoverysoccerpark.spawtz.com/Leagues/Standings?SportId=0&VenueId=2&LeagueId=34&SeasonId=842&DivisionId=3430"
    )]
    pub league_url: String,

    /// Our team's name as it appears on the league site
    #[arg(long, env = "TEAM_NAME", default_value = "Maradonners")]
    pub team_name: String,

    /// Timeout for one league fetch attempt, in seconds
    #[arg(long, env = "LEAGUE_TIMEOUT_SECS", default_value = "10")]
    pub league_timeout_secs: u64,

    /// Pause before retrying a failed league fetch, in milliseconds
    #[arg(long, env = "LEAGUE_RETRY_DELAY_MS", default_value = "500")]
    pub league_retry_delay_ms: u64,

    /// Number of promotion places in the standings
    #[arg(long, env = "PROMOTION_PLACES", default_value = "2")]
    pub promotion_places: usize,

    /// First relegation position in the standings
    #[arg(long, env = "RELEGATION_FROM", default_value = "9")]
    pub relegation_from: usize,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.dashboard_addr
            .parse::<SocketAddr>()
            .map_err(|e| anyhow::anyhow!("invalid dashboard_addr '{}': {}", self.dashboard_addr, e))?;

        let url = url::Url::parse(&self.league_url)
            .map_err(|e| anyhow::anyhow!("invalid league_url '{}': {}", self.league_url, e))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            anyhow::bail!("league_url must be http or https, got '{}'", url.scheme());
        }

        self.squad()?;

        if self.league_timeout_secs == 0 {
            anyhow::bail!("league_timeout_secs must be positive");
        }
        if self.relegation_from == 0 {
            anyhow::bail!("relegation_from must be at least 1");
        }
        Ok(())
    }

    pub fn squad(&self) -> anyhow::Result<Squad> {
        Ok(Squad::new(&self.squad, self.max_players)?)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_secs(self.league_timeout_secs),
            retry_delay: Duration::from_millis(self.league_retry_delay_ms),
        }
    }

    pub fn display_options(&self) -> DisplayOptions {
        DisplayOptions {
            team_name: self.team_name.clone(),
            promotion_places: self.promotion_places,
            relegation_from: self.relegation_from,
        }
    }
}
