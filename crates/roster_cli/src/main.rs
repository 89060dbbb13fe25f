//! Roster command-line entry point.
//!
//! # Responsibility
//! - Load configuration, open the store and seed demo members.
//! - Dispatch one command and print its result as JSON.
//!
//! # Invariants
//! - Any failure maps to a non-zero exit code and a message on stderr.

mod config;

use clap::{Args, Parser, Subcommand};
use config::{Config, ConfigError};
use log::{error, info};
use roster_core::db::{open_db, open_db_in_memory, DbError};
use roster_core::{
    MemberSearchCondition, MemberService, PageRequest, RepoError, SqliteMemberRepository,
    SqliteTeamRepository,
};
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::process::ExitCode;

/// Member/team roster backed by SQLite. Without a command, prints version info.
#[derive(Debug, Parser)]
#[command(name = "roster_cli", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
enum Command {
    /// Print the username of one member.
    Member { id: i64 },
    /// Print one page of members in id order.
    Members {
        /// Zero-based page number.
        #[arg(default_value_t = 0)]
        page: i64,
    },
    /// Print the first page of members matching every given filter.
    Search(SearchArgs),
}

#[derive(Debug, PartialEq, Eq, Args)]
struct SearchArgs {
    #[arg(long)]
    username: Option<String>,
    #[arg(long)]
    team: Option<String>,
    /// Minimum age, inclusive.
    #[arg(long)]
    age_goe: Option<i32>,
    /// Maximum age, inclusive.
    #[arg(long)]
    age_loe: Option<i32>,
}

impl SearchArgs {
    fn condition(&self) -> MemberSearchCondition {
        MemberSearchCondition {
            username: self.username.clone(),
            team_name: self.team.clone(),
            age_goe: self.age_goe,
            age_loe: self.age_loe,
        }
    }
}

#[derive(Debug)]
enum CliError {
    Config(ConfigError),
    Logging(String),
    Db(DbError),
    Repo(RepoError),
    Json(serde_json::Error),
    MemberNotFound(i64),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Logging(err) => write!(f, "logging init failed: {err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Json(err) => write!(f, "json output failed: {err}"),
            Self::MemberNotFound(id) => write!(f, "member {id} not found"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<DbError> for CliError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<RepoError> for CliError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Serialize)]
struct VersionInfo {
    cli_version: &'static str,
    core_version: &'static str,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_command module=cli status=error error={err}");
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let Some(command) = cli.command else {
        let info = VersionInfo {
            cli_version: env!("CARGO_PKG_VERSION"),
            core_version: roster_core::core_version(),
        };
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    };

    let config = Config::from_env()?;
    if let Some(log_dir) = &config.log_dir {
        roster_core::init_logging(&config.log_level, log_dir).map_err(CliError::Logging)?;
    }

    let conn = match &config.db_path {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };
    let service = MemberService::new(
        SqliteMemberRepository::try_new(&conn)?,
        SqliteTeamRepository::try_new(&conn)?,
    );
    service.seed_demo_members(config.seed_members)?;

    match command {
        Command::Member { id } => {
            let member = service.get_member(id)?.ok_or(CliError::MemberNotFound(id))?;
            println!("{}", member.username);
        }
        Command::Members { page } => {
            let request = PageRequest::of_page(page, config.page_size)?;
            let page = service.list_members(&request)?;
            println!("{}", serde_json::to_string_pretty(&page)?);
        }
        Command::Search(args) => {
            let request = PageRequest::new(0, config.page_size)?;
            let page = service.search_members(&args.condition(), Some(&request))?;
            println!("{}", serde_json::to_string_pretty(&page)?);
        }
    }
    info!("event=cli_command module=cli status=ok");
    Ok(())
}
