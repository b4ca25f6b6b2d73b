use std::fmt;
use std::path::{Path, PathBuf};

use attendance_core::model::{AttendanceStatus, SubjectId, UserId};
use chrono::NaiveDate;

pub const DEFAULT_DB_URL: &str = "sqlite://attendance.sqlite3";

#[derive(Debug, PartialEq, Eq)]
pub enum ArgsError {
    MissingCommand,
    UnknownCommand(String),
    MissingValue { flag: &'static str },
    MissingArgument { name: &'static str },
    UnknownArg(String),
    InvalidNumber { flag: &'static str, raw: String },
    InvalidSubjectId { raw: String },
    InvalidUserId { raw: String },
    InvalidDbUrl { raw: String },
    InvalidStatus { raw: String },
    InvalidDate { raw: String },
    InvalidMonth { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingCommand => write!(f, "missing command"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { name } => write!(f, "missing <{name}> argument"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidSubjectId { raw } => write!(f, "invalid subject id: {raw}"),
            ArgsError::InvalidUserId { raw } => write!(f, "invalid --user value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidStatus { raw } => {
                write!(f, "invalid status: {raw} (expected present or absent)")
            }
            ArgsError::InvalidDate { raw } => write!(f, "invalid date: {raw} (expected YYYY-MM-DD)"),
            ArgsError::InvalidMonth { raw } => write!(f, "invalid month: {raw} (expected YYYY-MM)"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_number<T: std::str::FromStr>(raw: String, flag: &'static str) -> Result<T, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  attendance summary");
    eprintln!("  attendance add <name> [--total <n>] [--attended <n>] [--color <c>] [--goal <pct>]");
    eprintln!("  attendance edit <id> [--name <s>] [--total <n>] [--attended <n>] [--color <c>] [--goal <pct>]");
    eprintln!("  attendance delete <id>");
    eprintln!("  attendance mark <id> <present|absent> [--date YYYY-MM-DD]");
    eprintln!("  attendance goal <id> <pct|clear>");
    eprintln!("  attendance goals");
    eprintln!("  attendance history <id>");
    eprintln!("  attendance recount <id>");
    eprintln!("  attendance report");
    eprintln!("  attendance calendar [YYYY-MM]");
    eprintln!("  attendance profile [--username <s>] [--full-name <s>] [--avatar <url>]");
    eprintln!("  attendance seed");
    eprintln!();
    eprintln!("Every command accepts --db <sqlite_url> and --user <uuid>.");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {DEFAULT_DB_URL}");
    eprintln!("  --user 00000000-0000-0000-0000-000000000000");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  ATTENDANCE_DB_URL, ATTENDANCE_USER_ID, ATTENDANCE_LOG");
}

/// Optional subject fields shared by `add` and `edit`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectFields {
    pub name: Option<String>,
    pub total: Option<u32>,
    pub attended: Option<u32>,
    pub color: Option<String>,
    pub goal: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileFields {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub avatar: Option<String>,
}

impl ProfileFields {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.full_name.is_none() && self.avatar.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Summary,
    Add(SubjectFields),
    Edit(SubjectId, SubjectFields),
    Delete(SubjectId),
    Mark {
        id: SubjectId,
        status: AttendanceStatus,
        date: Option<NaiveDate>,
    },
    Goal(SubjectId, Option<u8>),
    Goals,
    History(SubjectId),
    Recount(SubjectId),
    Report,
    Calendar(Option<(i32, u32)>),
    Profile(ProfileFields),
    Seed,
}

/// Values picked up from the environment before flags are applied.
#[derive(Debug, Clone, Default)]
pub struct EnvDefaults {
    pub db_url: Option<String>,
    pub user: Option<String>,
}

impl EnvDefaults {
    pub fn from_env() -> Self {
        Self {
            db_url: std::env::var("ATTENDANCE_DB_URL").ok(),
            user: std::env::var("ATTENDANCE_USER_ID").ok(),
        }
    }
}

#[derive(Debug)]
pub struct Args {
    pub db_url: String,
    pub user: UserId,
    pub command: Command,
}

impl Args {
    /// Parse `argv` (without the program name). `Ok(None)` means help was requested.
    pub fn parse(
        argv: impl IntoIterator<Item = String>,
        env: &EnvDefaults,
    ) -> Result<Option<Self>, ArgsError> {
        let mut args = argv.into_iter();
        let name = match args.next() {
            None => return Err(ArgsError::MissingCommand),
            Some(first) if first == "--help" || first == "-h" || first == "help" => {
                return Ok(None);
            }
            Some(first) => first,
        };

        let mut db_url = env
            .db_url
            .clone()
            .map_or_else(|| DEFAULT_DB_URL.to_string(), normalize_sqlite_url);
        let mut user = match &env.user {
            Some(raw) => parse_user(raw.clone())?,
            None => UserId::new(uuid::Uuid::nil()),
        };
        let mut positional = Vec::new();
        let mut subject = SubjectFields::default();
        let mut profile = ProfileFields::default();
        let mut date = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--user" => user = parse_user(require_value(&mut args, "--user")?)?,
                "--name" => subject.name = Some(require_value(&mut args, "--name")?),
                "--total" => {
                    subject.total = Some(parse_number(require_value(&mut args, "--total")?, "--total")?);
                }
                "--attended" => {
                    subject.attended =
                        Some(parse_number(require_value(&mut args, "--attended")?, "--attended")?);
                }
                "--color" => subject.color = Some(require_value(&mut args, "--color")?),
                "--goal" => {
                    subject.goal = Some(parse_number(require_value(&mut args, "--goal")?, "--goal")?);
                }
                "--date" => {
                    let raw = require_value(&mut args, "--date")?;
                    date = Some(
                        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                            .map_err(|_| ArgsError::InvalidDate { raw })?,
                    );
                }
                "--username" => profile.username = Some(require_value(&mut args, "--username")?),
                "--full-name" => {
                    profile.full_name = Some(require_value(&mut args, "--full-name")?);
                }
                "--avatar" => profile.avatar = Some(require_value(&mut args, "--avatar")?),
                "--help" | "-h" => return Ok(None),
                _ if arg.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positional.push(arg),
            }
        }

        let mut positional = positional.into_iter();
        let command = match name.as_str() {
            "summary" => Command::Summary,
            "add" => {
                let name = positional
                    .next()
                    .ok_or(ArgsError::MissingArgument { name: "name" })?;
                subject.name = Some(name);
                Command::Add(subject)
            }
            "edit" => Command::Edit(subject_arg(&mut positional)?, subject),
            "delete" => Command::Delete(subject_arg(&mut positional)?),
            "mark" => {
                let id = subject_arg(&mut positional)?;
                let raw = positional
                    .next()
                    .ok_or(ArgsError::MissingArgument { name: "status" })?;
                let status = raw
                    .parse()
                    .map_err(|_| ArgsError::InvalidStatus { raw })?;
                Command::Mark { id, status, date }
            }
            "goal" => {
                let id = subject_arg(&mut positional)?;
                let raw = positional
                    .next()
                    .ok_or(ArgsError::MissingArgument { name: "pct" })?;
                let goal = if raw.eq_ignore_ascii_case("clear") {
                    None
                } else {
                    Some(parse_number(raw, "goal")?)
                };
                Command::Goal(id, goal)
            }
            "goals" => Command::Goals,
            "history" => Command::History(subject_arg(&mut positional)?),
            "recount" => Command::Recount(subject_arg(&mut positional)?),
            "report" => Command::Report,
            "calendar" => Command::Calendar(positional.next().map(parse_month).transpose()?),
            "profile" => Command::Profile(profile),
            "seed" => Command::Seed,
            _ => return Err(ArgsError::UnknownCommand(name)),
        };

        if let Some(extra) = positional.next() {
            return Err(ArgsError::UnknownArg(extra));
        }

        Ok(Some(Self {
            db_url,
            user,
            command,
        }))
    }
}

fn subject_arg(positional: &mut impl Iterator<Item = String>) -> Result<SubjectId, ArgsError> {
    let raw = positional
        .next()
        .ok_or(ArgsError::MissingArgument { name: "id" })?;
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidSubjectId { raw })
}

fn parse_user(raw: String) -> Result<UserId, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidUserId { raw })
}

fn parse_month(raw: String) -> Result<(i32, u32), ArgsError> {
    let parsed = raw.trim().split_once('-').and_then(|(year, month)| {
        let year = year.parse::<i32>().ok()?;
        let month = month.parse::<u32>().ok()?;
        (1..=12).contains(&month).then_some((year, month))
    });
    parsed.ok_or(ArgsError::InvalidMonth { raw })
}

pub fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") || raw.starts_with("sqlite:file:") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Make sure the database file and its directory exist; sqlx will not create them.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" || db_url.starts_with("sqlite:file:") {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}
