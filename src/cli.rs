use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pucksync")]
#[command(version = "0.1.0")]
#[command(about = "NHL statistics tracker - download and track NHL statistics", long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config directory path
    #[arg(short, long, default_value = "config")]
    pub config: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database schema
    Init,
    /// Fetch all NHL teams
    FetchTeams,
    /// Fetch a team's roster
    FetchRoster {
        /// Team abbreviation (e.g., TOR, MTL)
        team: String,
        /// Season (e.g., 20232024); defaults to the current season
        #[arg(long)]
        season: Option<String>,
    },
    /// Fetch a team's season statistics
    FetchStats {
        /// Team abbreviation (e.g., TOR, MTL)
        team: String,
        /// Season (e.g., 20232024); defaults to the current season
        #[arg(long)]
        season: Option<String>,
    },
    /// Fetch season stats for every stored player of a team
    FetchPlayerStats {
        /// Team abbreviation (e.g., TOR, MTL)
        team: String,
    },
    /// Fetch the game schedule
    FetchSchedule {
        /// Date inside the week to fetch (YYYY-MM-DD); defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Fetch all data (teams, rosters, stats)
    FetchAll {
        /// Season (e.g., 20232024); defaults to the current season
        #[arg(long)]
        season: Option<String>,
    },
    /// Show database statistics
    Stats,
    /// Run scheduled updates
    Schedule,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fetch_roster_with_season() {
        let cli = Cli::parse_from(["pucksync", "fetch-roster", "TOR", "--season", "20232024"]);
        match cli.command {
            Commands::FetchRoster { team, season } => {
                assert_eq!(team, "TOR");
                assert_eq!(season.as_deref(), Some("20232024"));
            }
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn parses_fetch_schedule_date() {
        let cli = Cli::parse_from(["pucksync", "fetch-schedule", "--date", "2024-01-01"]);
        match cli.command {
            Commands::FetchSchedule { date } => {
                assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 1));
            }
            _ => panic!("wrong command"),
        }
    }
}
