mod app;
mod domain;
mod poller;
mod repo;
mod ui;
mod usecase;

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use time::{OffsetDateTime, UtcOffset};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use app::App;
use domain::calendar::{WorkCalendar, WorkHours};
use domain::review::RepoId;
use poller::Poller;
use repo::github::auth::{SCOPE_GIT_CONFIG_KEY, git_config_value, resolve_github_token};
use repo::github::{GithubConfig, OctocrabReviewApi};
use repo::memory::InMemoryReviewApi;
use repo::{ReviewApi, Scope};

#[derive(Parser, Debug)]
#[command(author, version, about = "revwatch: how overdue are your code reviews?", long_about = None)]
struct Args {
    /// Organization (`acme`) or repository (`acme/widgets`) to watch
    #[arg(long, env = "REVWATCH_SCOPE")]
    scope: Option<String>,

    /// GitHub API base URL, for GitHub Enterprise
    #[arg(long, env = "GITHUB_API_URL")]
    api_base: Option<String>,

    /// Base URL of the GitHub web UI, used for links
    #[arg(long, default_value = "https://github.com")]
    web_base: String,

    /// Seconds between poll cycles
    #[arg(long, default_value_t = 30)]
    interval_secs: u64,

    /// Pull requests decorated in parallel
    #[arg(long, default_value_t = 8)]
    concurrency: usize,

    /// Daily working window, Monday to Friday
    #[arg(long, default_value = "09:00-17:00")]
    work_hours: WorkHours,

    /// UTC offset of the working window in hours (default: local offset)
    #[arg(long, allow_hyphen_values = true)]
    utc_offset_hours: Option<i8>,

    /// Tick interval of render loop in milliseconds
    #[arg(long, default_value_t = 120)]
    tick_ms: u64,

    /// Run one poll cycle, print the result and exit
    #[arg(long, default_value_t = false)]
    once: bool,

    /// With --once, print JSON instead of text
    #[arg(long, requires = "once")]
    json: bool,

    /// Use canned review data instead of GitHub
    #[arg(long, default_value_t = false)]
    demo: bool,

    /// Log file for the dashboard (default: OS cache dir)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Must run before any other thread exists.
    let local_offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let args = Args::parse();
    init_tracing(&args)?;

    let offset = match args.utc_offset_hours {
        Some(hours) => UtcOffset::from_hms(hours, 0, 0)
            .map_err(|e| anyhow!("invalid --utc-offset-hours {hours}: {e}"))?,
        None => local_offset,
    };
    let calendar = WorkCalendar::new(args.work_hours, offset);

    let rt = poller::build_runtime()?;
    let (api, scope) = {
        // octocrab needs a runtime context while it is built.
        let _guard = rt.enter();
        build_api(&args)?
    };
    info!(scope = %scope.qualifier(), demo = args.demo, "starting revwatch");

    let mut poller = Poller::new(api, scope.clone(), calendar, args.concurrency);
    if args.once {
        let report = rt.block_on(poller.run_cycle())?;
        return ui::report::print(&report, &args.web_base, args.json);
    }

    let handle = poller::spawn(rt, poller, Duration::from_secs(args.interval_secs.max(1)))?;
    let app = App::new(handle, scope, args.web_base, calendar);
    ui::run(app, Duration::from_millis(args.tick_ms))
}

fn build_api(args: &Args) -> Result<(Box<dyn ReviewApi>, Scope)> {
    if args.demo {
        let api = InMemoryReviewApi::demo(OffsetDateTime::now_utc());
        return Ok((Box::new(api), Scope::Repository(RepoId::new("acme", "widgets"))));
    }
    let scope = resolve_scope(args)?;
    let config = GithubConfig {
        token: resolve_github_token()?,
        api_base: args.api_base.clone(),
    };
    Ok((Box::new(OctocrabReviewApi::new(&config)?), scope))
}

fn resolve_scope(args: &Args) -> Result<Scope> {
    let raw = args
        .scope
        .clone()
        .or_else(|| git_config_value(SCOPE_GIT_CONFIG_KEY))
        .ok_or_else(|| {
            anyhow!(
                "no organization or repository to watch; pass --scope or run \
                 \"git config --global {SCOPE_GIT_CONFIG_KEY} <org or org/repo>\""
            )
        })?;
    Scope::parse(&raw).ok_or_else(|| anyhow!("invalid scope {raw:?}; expected org or org/repo"))
}

fn init_tracing(args: &Args) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("revwatch=info"));
    if args.once {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
        return Ok(());
    }

    // The dashboard owns the terminal, so logs go to a file.
    let path = match args.log_file.clone() {
        Some(path) => path,
        None => default_log_path()?,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log dir {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .init();
    Ok(())
}

fn default_log_path() -> Result<PathBuf> {
    let base = dirs::cache_dir().context("failed to resolve cache dir")?;
    Ok(base.join("revwatch").join("revwatch.log"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_parse_with_defaults() {
        let args = Args::try_parse_from(["revwatch", "--scope", "acme/widgets", "--once"]).unwrap();
        assert_eq!(args.interval_secs, 30);
        assert_eq!(args.concurrency, 8);
        assert_eq!(args.work_hours, WorkHours::default());
        assert!(args.once);
        assert_eq!(
            resolve_scope(&args).unwrap(),
            Scope::Repository(RepoId::new("acme", "widgets"))
        );
    }

    #[test]
    fn json_requires_once() {
        assert!(Args::try_parse_from(["revwatch", "--json"]).is_err());
    }

    #[test]
    fn negative_offset_is_accepted() {
        let args = Args::try_parse_from(["revwatch", "--utc-offset-hours", "-5"]).unwrap();
        assert_eq!(args.utc_offset_hours, Some(-5));
    }
}
