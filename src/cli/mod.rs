//! cli
//!
//! Command-line interface layer for pr-bullet.
//!
//! # Responsibilities
//!
//! - Parse arguments, collect targets from argv or stdin
//! - Set up logging, configuration and the GitHub forge
//! - Show the summary, confirm, and report progress per target
//!
//! # Cancellation
//!
//! The whole run races Ctrl-C. `--timeout` bounds the network phases;
//! time spent waiting at the confirmation prompt is not counted. Dropping
//! the in-flight future cancels the remote call it was waiting on, and
//! nothing already created on a target is undone.

pub mod args;

pub use args::Cli;

use std::fs::File;
use std::future::Future;
use std::io::{self, BufRead, IsTerminal};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, LevelFilter};
use tokio::time::Instant;

use crate::core::config::Config;
use crate::core::identifier;
use crate::core::types::RepositoryRef;
use crate::engine::{
    resolve_pull_request, validate_target, ReplicationEvent, ResolvedPullRequest, Replicator,
};
use crate::forge::github::GitHubForge;
use crate::forge::Forge;
use crate::ui::output::{self, Verbosity};
use crate::ui::prompts;

/// Environment variable that turns on file logging.
pub const DEBUG_ENV: &str = "DEBUG";

/// File written in the working directory when `DEBUG` is set.
pub const DEBUG_LOG_FILE: &str = "pr-bullet.debug";

const CONFIRM_PROMPT: &str = "Do you want to create pull requests?";

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging(cli.debug)?;
    let verbosity = Verbosity::from_flags(cli.quiet, cli.debug);

    if cli.targets_from_stdin() && io::stdin().is_terminal() {
        bail!("when received 1 arg, pr-bullet need STDIN");
    }

    let config = Config::load()?;
    debug!("{:?}", config);

    let targets = if cli.targets_from_stdin() {
        read_targets(io::stdin().lock()).context("failed to read targets from stdin")?
    } else {
        cli.targets.clone()
    };
    if targets.is_empty() {
        bail!("no target repositories given");
    }

    let forge: Arc<dyn Forge> = Arc::new(GitHubForge::from_config(&config)?);

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(interruptible(execute(&cli, &config, forge, targets, verbosity)));
    // A prompt blocked on stdin must not keep the process alive.
    rt.shutdown_background();
    result
}

/// Race `work` against Ctrl-C.
async fn interruptible<T>(work: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::select! {
        result = work => result,
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl-C")?;
            Err(anyhow!("interrupted"))
        }
    }
}

async fn execute(
    cli: &Cli,
    config: &Config,
    forge: Arc<dyn Forge>,
    targets: Vec<String>,
    verbosity: Verbosity,
) -> Result<()> {
    let mut deadline = cli.timeout.map(RunDeadline::new);

    let (resolved, targets) =
        within(deadline, prepare(forge.as_ref(), &cli.pull_request, &targets)).await?;
    let ResolvedPullRequest { summary, files } = resolved;

    output::status(
        output::format_summary(&summary, &cli.pull_request, files.len(), &targets),
        verbosity,
    );

    let asked = Instant::now();
    let proceed = match (cli.yes, cli.targets_from_stdin()) {
        (true, _) => true,
        (false, true) => {
            bail!("when using STDIN, add the --yes option to allow the process to continue.")
        }
        (false, false) => tokio::task::spawn_blocking(|| prompts::confirm(CONFIRM_PROMPT, true))
            .await
            .context("confirmation prompt failed")?
            .context("could not confirm; pass --yes to skip the prompt")?,
    };
    if let Some(deadline) = deadline.as_mut() {
        deadline.extend(asked.elapsed());
    }
    if !proceed {
        return Ok(());
    }
    output::status("", verbosity);

    let replicator = Replicator::new(forge).with_blob_concurrency(config.blob_concurrency());
    let results = within(deadline, async {
        Ok(replicator
            .replicate_all(&targets, &summary, &files, |event| match event {
                ReplicationEvent::Started(target) => {
                    output::status_partial(output::format_progress(&summary, target), verbosity)
                }
                ReplicationEvent::Finished(result) => match &result.outcome {
                    Ok(pr) => output::status(output::format_created(pr), verbosity),
                    Err(_) => output::status("", verbosity),
                },
            })
            .await)
    })
    .await?;

    match results.into_iter().find_map(|r| r.outcome.err()) {
        Some(failure) => Err(failure.into()),
        None => Ok(()),
    }
}

/// Resolve the source pull request and validate every target, in order.
async fn prepare(
    forge: &dyn Forge,
    pull_request: &str,
    targets: &[String],
) -> Result<(ResolvedPullRequest, Vec<RepositoryRef>)> {
    let id = identifier::parse(pull_request)?;
    if !id.is_pull_request() {
        bail!("not a pull request: {}", pull_request);
    }

    let resolved = resolve_pull_request(forge, &id.repo, id.number).await?;

    let mut repos = Vec::with_capacity(targets.len());
    for target in targets {
        repos.push(validate_target(forge, target).await?);
    }

    Ok((resolved, repos))
}

/// Point in time after which network work is abandoned.
#[derive(Debug, Clone, Copy)]
struct RunDeadline {
    at: Instant,
    secs: u64,
}

impl RunDeadline {
    fn new(secs: u64) -> Self {
        Self {
            at: Instant::now() + Duration::from_secs(secs),
            secs,
        }
    }

    fn extend(&mut self, by: Duration) {
        self.at += by;
    }
}

async fn within<T>(
    deadline: Option<RunDeadline>,
    work: impl Future<Output = Result<T>>,
) -> Result<T> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline.at, work)
            .await
            .map_err(|_| anyhow!("timed out after {}s", deadline.secs))?,
        None => work.await,
    }
}

/// Read one target per line, skipping blank lines.
fn read_targets(input: impl BufRead) -> io::Result<Vec<String>> {
    let mut targets = Vec::new();
    for line in input.lines() {
        let line = line?;
        let target = line.trim();
        if !target.is_empty() {
            targets.push(target.to_string());
        }
    }
    Ok(targets)
}

/// Initialise `env_logger`.
///
/// Logging is off unless `--debug` is given (stderr) or `DEBUG` is set
/// (written to [`DEBUG_LOG_FILE`]). `RUST_LOG` still applies on top.
fn init_logging(debug: bool) -> Result<()> {
    let to_file = std::env::var_os(DEBUG_ENV).is_some_and(|v| !v.is_empty());

    let mut builder = env_logger::Builder::new();
    builder.filter_level(LevelFilter::Off);
    if debug || to_file {
        builder.filter_module("pr_bullet", LevelFilter::Debug);
    }
    builder.parse_default_env();

    if to_file {
        let file = File::create(DEBUG_LOG_FILE)
            .with_context(|| format!("failed to create {}", DEBUG_LOG_FILE))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.try_init().ok();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::mock::{MockForge, PullRequestSeed, SeedFile};
    use std::io::Cursor;

    #[test]
    fn read_targets_skips_blank_lines() {
        let input = Cursor::new("acme/one\n\n  acme/two  \n\n");
        assert_eq!(read_targets(input).unwrap(), vec!["acme/one", "acme/two"]);
    }

    #[test]
    fn read_targets_without_trailing_newline() {
        let input = Cursor::new("acme/one");
        assert_eq!(read_targets(input).unwrap(), vec!["acme/one"]);
    }

    #[tokio::test]
    async fn within_without_deadline_runs_to_completion() {
        let value = within(None, async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn within_times_out() {
        let deadline = RunDeadline::new(1);
        let result: Result<()> = within(Some(deadline), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert_eq!(result.unwrap_err().to_string(), "timed out after 1s");
    }

    #[tokio::test(start_paused = true)]
    async fn extended_deadline_allows_more_time() {
        let mut deadline = RunDeadline::new(1);
        deadline.extend(Duration::from_secs(5));
        let result = within(Some(deadline), async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Ok(())
        })
        .await;
        assert!(result.is_ok());
    }

    fn seeded_forge() -> MockForge {
        let source = RepositoryRef::new("acme", "widgets");
        let forge = MockForge::new();
        forge.seed_repository(&source, "main", "public");
        forge.seed_repository(&RepositoryRef::new("acme", "mirror"), "main", "public");
        forge.seed_pull_request(
            &source,
            PullRequestSeed {
                number: 12,
                title: "Add README".into(),
                body: None,
                head_ref: "feature-x".into(),
                user_login: "octocat".into(),
                changed_files: vec!["README.md".into()],
                tree: vec![SeedFile::blob("README.md", "hello")],
            },
        );
        forge
    }

    #[tokio::test]
    async fn prepare_resolves_and_validates() {
        let forge = seeded_forge();
        let (resolved, targets) = prepare(
            &forge,
            "https://github.com/acme/widgets/pull/12",
            &["acme/mirror".to_string()],
        )
        .await
        .unwrap();

        assert_eq!(resolved.summary.title, "Add README");
        assert_eq!(targets, vec![RepositoryRef::new("acme", "mirror")]);
    }

    #[tokio::test]
    async fn prepare_rejects_repository_as_source() {
        let forge = seeded_forge();
        let err = prepare(&forge, "acme/widgets", &["acme/mirror".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "not a pull request: acme/widgets");
    }

    #[tokio::test]
    async fn prepare_rejects_pull_request_as_target() {
        let forge = seeded_forge();
        let err = prepare(
            &forge,
            "acme/widgets/pull/12",
            &["acme/mirror/pull/1".to_string()],
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "invalid arg: acme/mirror/pull/1");
    }
}
