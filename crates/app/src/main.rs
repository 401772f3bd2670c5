use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use quiz_core::model::{DEFAULT_FEEDBACK_DISPLAY_MS, DEFAULT_TIME_LIMIT_SECS, QuizSettings};
use services::{AppServices, Clock, QuestionCatalog};
use storage::repository::AttemptRecord;

mod terminal;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidTimeLimit { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidTimeLimit { raw } => {
                write!(f, "invalid --time-limit value: {raw} (expected seconds > 0)")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
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

struct Args {
    db_url: String,
    questions: Option<PathBuf>,
    time_limit_secs: u32,
    json: bool,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!(
        "  cargo run -p app -- run     [--db <sqlite_url>] [--questions <file>] [--time-limit <secs>]"
    );
    eprintln!("  cargo run -p app -- history [--db <sqlite_url>] [--json]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://quiz-platform.sqlite3");
    eprintln!("  --questions <built-in set>");
    eprintln!("  --time-limit {DEFAULT_TIME_LIMIT_SECS}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_QUESTIONS, QUIZ_TIME_LIMIT_SECS, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Run,
    History,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "run" => Some(Self::Run),
            "history" => Some(Self::History),
            _ => None,
        }
    }
}

fn parse_time_limit(raw: String) -> Result<u32, ArgsError> {
    match raw.trim().parse::<u32>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(ArgsError::InvalidTimeLimit { raw }),
    }
}

impl Args {
    fn parse(cmd: Command, args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("QUIZ_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://quiz-platform.sqlite3".into(), normalize_sqlite_url);
        let mut questions = std::env::var_os("QUIZ_QUESTIONS").map(PathBuf::from);
        let mut time_limit_secs = match std::env::var("QUIZ_TIME_LIMIT_SECS") {
            Ok(raw) => parse_time_limit(raw)?,
            Err(_) => DEFAULT_TIME_LIMIT_SECS,
        };
        let mut json = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--questions" if cmd == Command::Run => {
                    questions = Some(PathBuf::from(require_value(args, "--questions")?));
                }
                "--time-limit" if cmd == Command::Run => {
                    time_limit_secs = parse_time_limit(require_value(args, "--time-limit")?)?;
                }
                "--json" if cmd == Command::History => json = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            questions,
            time_limit_secs,
            json,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
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

    let path = std::path::Path::new(path);
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

fn init_tracing() {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in ["app=info", "services=info", "storage=info"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // No subcommand means an interactive quiz.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Run,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Run,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(cmd, &mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let questions = match &parsed.questions {
        Some(path) => QuestionCatalog::from_path(path)?,
        None => QuestionCatalog::builtin()?,
    };
    let settings = QuizSettings::new(
        parsed.time_limit_secs,
        Duration::from_millis(DEFAULT_FEEDBACK_DISPLAY_MS),
    )?;

    match cmd {
        Command::Run => {
            // A quiz is still playable without a working store.
            if let Err(err) = prepare_sqlite_file(&parsed.db_url) {
                tracing::warn!(db_url = %parsed.db_url, error = %err, "cannot prepare database file");
            }
            let app =
                AppServices::new_sqlite_lazy(&parsed.db_url, Clock::system(), questions, settings);
            terminal::run_quiz(&app).await
        }
        Command::History => {
            prepare_sqlite_file(&parsed.db_url)?;
            tracing::debug!(db_url = %parsed.db_url, "opening attempt store");
            let app =
                AppServices::new_sqlite(&parsed.db_url, Clock::system(), questions, settings)
                    .await?;
            print_history(&app, parsed.json).await
        }
    }
}

async fn print_history(app: &AppServices, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let history = app.history();

    if json {
        let records: Vec<AttemptRecord> = history
            .list_attempts()
            .await?
            .iter()
            .map(AttemptRecord::from_attempt)
            .collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    let items = history.list_history().await?;
    if items.is_empty() {
        println!("No attempts yet.");
        return Ok(());
    }
    for item in items {
        println!(
            "{}  {}/{} ({}%)  {}",
            item.completed_at.format("%Y-%m-%d %H:%M:%S UTC"),
            item.score,
            item.total,
            item.percentage,
            item.id
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(cmd: Command, args: &[&str]) -> Result<Args, ArgsError> {
        let mut iter = args.iter().map(|s| (*s).to_string());
        Args::parse(cmd, &mut iter)
    }

    #[test]
    fn relative_paths_become_absolute_urls() {
        let url = normalize_sqlite_url("data/quiz.sqlite3".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/quiz.sqlite3"));
        assert_eq!(
            normalize_sqlite_url("sqlite::memory:".into()),
            "sqlite::memory:"
        );
    }

    #[test]
    fn run_flags_are_parsed() {
        let args = parse(
            Command::Run,
            &["--db", "sqlite:///tmp/q.db", "--time-limit", "10", "--questions", "q.json"],
        )
        .unwrap();
        assert_eq!(args.db_url, "sqlite:///tmp/q.db");
        assert_eq!(args.time_limit_secs, 10);
        assert_eq!(args.questions, Some(PathBuf::from("q.json")));
        assert!(!args.json);
    }

    #[test]
    fn json_only_applies_to_history() {
        assert!(parse(Command::History, &["--json"]).unwrap().json);
        assert!(matches!(
            parse(Command::Run, &["--json"]),
            Err(ArgsError::UnknownArg(_))
        ));
    }

    #[test]
    fn zero_time_limit_is_rejected() {
        assert!(matches!(
            parse(Command::Run, &["--time-limit", "0"]),
            Err(ArgsError::InvalidTimeLimit { .. })
        ));
        assert!(matches!(
            parse(Command::Run, &["--time-limit"]),
            Err(ArgsError::MissingValue { flag: "--time-limit" })
        ));
    }
}
