//! Statusboard CLI
//!
//! Drives the tracker against a RocksDB state directory and prints JSON.
//!
//! # Usage
//!
//! ```bash
//! statusboard --users users.toml project register P1001 "Project Alpha" --manager 1
//! statusboard --users users.toml snapshot create --actor 1 --project P1001 --phase DEVELOPMENT
//! statusboard --users users.toml escalate trigger 11 12 13 --reason "Budget overrun" --by 7
//! statusboard --users users.toml escalate watch --interval-secs 30
//!
//! # Config from env or TOML
//! STATUSBOARD_EDIT_POLICY=capability statusboard --config statusboard.toml report summary
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::Serialize;

use statusboard::{
    EscalationFilter, EscalationWatcher, FallbackResolver, HealthColor, LocalTransport,
    NewResponsibility, NewSnapshot, Phase, ProjectKey, ResponsibilityPatch, SnapshotPatch,
    SnapshotTransition, StateStore, Tracker, TrackerConfig, TrackerResult, UsersFile, ViewRoute,
};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to RocksDB state directory
    #[arg(long, global = true)]
    state_path: Option<PathBuf>,

    /// Users TOML file (overrides STATUSBOARD_USERS)
    #[arg(long, global = true)]
    users: Option<PathBuf>,

    /// Tracker config TOML file; STATUSBOARD_* variables apply otherwise
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Default page size for listings (overrides config)
    #[arg(long, global = true)]
    page_size: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Project registration
    #[command(subcommand)]
    Project(ProjectCommand),
    /// Status snapshots
    #[command(subcommand)]
    Snapshot(SnapshotCommand),
    /// Chronological timeline of a project
    Timeline {
        /// Project id or code
        project: String,
    },
    /// Responsibilities
    #[command(subcommand)]
    Resp(RespCommand),
    /// Escalations
    #[command(subcommand)]
    Escalate(EscalateCommand),
    /// Reports
    #[command(subcommand)]
    Report(ReportCommand),
}

#[derive(Subcommand, Debug)]
enum ProjectCommand {
    Register {
        code: String,
        name: String,
        #[arg(long)]
        manager: Option<u64>,
    },
    List,
}

#[derive(Subcommand, Debug)]
enum SnapshotCommand {
    Create {
        #[arg(long)]
        actor: u64,
        /// Project id or code
        #[arg(long)]
        project: String,
        #[arg(long)]
        phase: String,
        /// YYYY-MM-DD, defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, default_value = "")]
        notes: String,
        #[arg(long, default_value_t = false)]
        baseline: bool,
        #[arg(long = "final", default_value_t = false)]
        is_final: bool,
        /// JSON file with an array of initial responsibilities
        #[arg(long)]
        responsibilities: Option<PathBuf>,
    },
    Transition {
        snapshot_id: u64,
        /// MARK_BASELINE, MARK_FINAL, SAVE_REGULAR or CLONE_FROM_PREVIOUS
        transition: String,
        #[arg(long)]
        actor: u64,
    },
    /// Regular save, editing phase, date or notes
    Save {
        snapshot_id: u64,
        #[arg(long)]
        actor: u64,
        #[arg(long)]
        phase: Option<String>,
        /// YYYY-MM-DD
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        notes: Option<String>,
    },
    Latest {
        project: String,
    },
    List {
        project: String,
    },
    /// Open by id or by route (`/status/17`, `/projects/4/status/17`)
    Show {
        target: String,
    },
}

#[derive(Subcommand, Debug)]
enum RespCommand {
    Create {
        snapshot_id: u64,
        title: String,
        #[arg(long)]
        responsible: u64,
        #[arg(long)]
        deputy: Option<u64>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value_t = 0)]
        progress: i64,
        #[arg(long, default_value_t = false)]
        flag: bool,
        #[arg(long, default_value = "")]
        comments: String,
    },
    Update {
        id: u64,
        #[arg(long)]
        actor: u64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        progress: Option<i64>,
        #[arg(long)]
        flag: Option<bool>,
        #[arg(long)]
        comments: Option<String>,
        #[arg(long)]
        responsible: Option<u64>,
        #[arg(long)]
        deputy: Option<u64>,
        #[arg(long, default_value_t = false, conflicts_with = "deputy")]
        clear_deputy: bool,
        #[arg(long)]
        expected_version: Option<u64>,
    },
}

#[derive(ClapArgs, Debug)]
struct FilterArgs {
    /// Project id or code
    #[arg(long)]
    project: Option<String>,
    #[arg(long)]
    responsibility: Option<u64>,
    /// true, false, or omit for all
    #[arg(long)]
    resolved: Option<bool>,
    #[arg(long)]
    from: Option<NaiveDate>,
    #[arg(long)]
    to: Option<NaiveDate>,
    #[arg(long)]
    cursor: Option<String>,
}

#[derive(Subcommand, Debug)]
enum EscalateCommand {
    /// Trigger one escalation, or a bulk batch for several ids
    Trigger {
        #[arg(required = true)]
        responsibility_ids: Vec<u64>,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        by: u64,
    },
    Resolve {
        id: u64,
        #[arg(long)]
        by: u64,
        /// Skip the dedicated action and resolve through a partial update
        #[arg(long, default_value_t = false)]
        via_update: bool,
    },
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Poll for newly opened escalations until Ctrl-C
    Watch {
        #[arg(long, default_value_t = 30)]
        interval_secs: u64,
        #[arg(long)]
        project: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum ReportCommand {
    Summary,
    User {
        user_id: u64,
    },
    Escalations {
        #[command(flatten)]
        filter: FilterArgs,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a tracker result; tracker errors are printed structured
fn emit<T: Serialize>(result: TrackerResult<T>) -> Result<bool> {
    match result {
        Ok(value) => {
            print_json(&value)?;
            Ok(true)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Request failed");
            print_json(&serde_json::json!({ "error": e.to_structured() }))?;
            Ok(false)
        }
    }
}

fn build_filter(args: FilterArgs) -> TrackerResult<EscalationFilter> {
    Ok(EscalationFilter {
        project: args.project.as_deref().map(str::parse).transpose()?,
        responsibility_id: args.responsibility,
        resolved: args.resolved,
        created_from: args.from,
        created_to: args.to,
        page_size: None,
        cursor: args.cursor.map(Into::into),
    })
}

fn project_id(tracker: &Tracker, project: &str) -> TrackerResult<u64> {
    let key: ProjectKey = project.parse()?;
    Ok(tracker.projects().resolve(&key)?.id)
}

fn load_config(args: &Args) -> Result<TrackerConfig> {
    let mut config = match &args.config {
        Some(path) => TrackerConfig::from_toml_file(path)?,
        None => TrackerConfig::from_env(),
    };
    if let Some(size) = args.page_size {
        config.page_size = size;
    }
    Ok(config)
}

fn load_users(args: &Args) -> Result<UsersFile> {
    let path = args
        .users
        .clone()
        .or_else(|| std::env::var_os("STATUSBOARD_USERS").map(PathBuf::from));
    match path {
        Some(path) => UsersFile::from_toml_file(path),
        None => {
            tracing::warn!("No users file given; every user reference will fail to resolve");
            Ok(UsersFile::default())
        }
    }
}

fn read_responsibilities(path: &PathBuf) -> Result<Vec<NewResponsibility>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).context("Failed to parse responsibilities JSON")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("statusboard=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&args)?;
    let users = load_users(&args)?.into_directory();

    let state_path = args.state_path.clone().unwrap_or_else(|| {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".statusboard-state")
    });
    tracing::debug!("State path: {}", state_path.display());

    let store = StateStore::open(&state_path)
        .map_err(|e| anyhow::anyhow!("Failed to open state store: {}", e))?
        .shared();
    let tracker = Tracker::new(store, users.shared(), config);

    let ok = run(&tracker, args.command).await?;
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

async fn run(tracker: &Tracker, command: Command) -> Result<bool> {
    match command {
        Command::Project(cmd) => match cmd {
            ProjectCommand::Register {
                code,
                name,
                manager,
            } => emit(tracker.projects().register(&code, &name, manager)),
            ProjectCommand::List => emit(tracker.projects().list()),
        },

        Command::Snapshot(cmd) => match cmd {
            SnapshotCommand::Create {
                actor,
                project,
                phase,
                date,
                notes,
                baseline,
                is_final,
                responsibilities,
            } => {
                let items = match &responsibilities {
                    Some(path) => read_responsibilities(path)?,
                    None => Vec::new(),
                };
                emit((|| {
                    let input = NewSnapshot {
                        project_id: project_id(tracker, &project)?,
                        phase: phase.parse::<Phase>()?,
                        status_date: date,
                        notes,
                        is_baseline: baseline,
                        is_final,
                        responsibilities: items,
                    };
                    tracker.snapshots().create(actor, input)
                })())
            }
            SnapshotCommand::Transition {
                snapshot_id,
                transition,
                actor,
            } => emit(
                transition
                    .parse::<SnapshotTransition>()
                    .and_then(|t| tracker.snapshots().transition(snapshot_id, actor, t)),
            ),
            SnapshotCommand::Save {
                snapshot_id,
                actor,
                phase,
                date,
                notes,
            } => emit((|| {
                let patch = SnapshotPatch {
                    phase: phase.as_deref().map(str::parse::<Phase>).transpose()?,
                    status_date: date,
                    notes,
                };
                tracker.snapshots().save(snapshot_id, actor, patch)
            })()),
            SnapshotCommand::Latest { project } => emit(
                project_id(tracker, &project).and_then(|p| tracker.snapshots().fetch_latest(p)),
            ),
            SnapshotCommand::List { project } => {
                emit(project_id(tracker, &project).and_then(|p| tracker.snapshots().list(p)))
            }
            SnapshotCommand::Show { target } => emit(match target.parse::<u64>() {
                Ok(id) => tracker.snapshots().get(id),
                Err(_) => target
                    .parse::<ViewRoute>()
                    .and_then(|route| tracker.timeline().open_route(&route)),
            }),
        },

        Command::Timeline { project } => {
            emit(project_id(tracker, &project).and_then(|p| tracker.timeline().build(p)))
        }

        Command::Resp(cmd) => match cmd {
            RespCommand::Create {
                snapshot_id,
                title,
                responsible,
                deputy,
                status,
                progress,
                flag,
                comments,
            } => emit((|| {
                let input = NewResponsibility {
                    title,
                    responsible: Some(responsible),
                    deputy,
                    color: status
                        .as_deref()
                        .map(str::parse::<HealthColor>)
                        .transpose()?
                        .unwrap_or_default(),
                    progress,
                    needs_escalation: flag,
                    comments,
                };
                tracker.responsibilities().create(snapshot_id, input)
            })()),
            RespCommand::Update {
                id,
                actor,
                title,
                status,
                progress,
                flag,
                comments,
                responsible,
                deputy,
                clear_deputy,
                expected_version,
            } => emit((|| {
                let patch = ResponsibilityPatch {
                    title,
                    color: status.as_deref().map(str::parse).transpose()?,
                    responsible,
                    deputy: if clear_deputy {
                        Some(None)
                    } else {
                        deputy.map(Some)
                    },
                    progress,
                    needs_escalation: flag,
                    comments,
                    expected_version,
                };
                tracker.responsibilities().update(id, actor, patch)
            })()),
        },

        Command::Escalate(cmd) => match cmd {
            EscalateCommand::Trigger {
                responsibility_ids,
                reason,
                by,
            } => {
                let engine = tracker.escalations();
                if let [id] = responsibility_ids.as_slice() {
                    emit(engine.trigger(*id, &reason, by))
                } else {
                    let report = engine.trigger_bulk(&responsibility_ids, &reason, by);
                    let complete = report.is_complete();
                    print_json(&report)?;
                    Ok(complete)
                }
            }
            EscalateCommand::Resolve { id, by, via_update } => {
                let engine = tracker.escalations();
                let transport = if via_update {
                    LocalTransport::without_action(engine)
                } else {
                    LocalTransport::new(engine)
                };
                match FallbackResolver::new(transport).resolve(id, by) {
                    Ok(outcome) => {
                        print_json(&outcome)?;
                        Ok(true)
                    }
                    Err(statusboard::TransportError::Rejected(e)) => emit::<()>(Err(e)),
                    Err(e) => Err(e.into()),
                }
            }
            EscalateCommand::List { filter } => emit(
                build_filter(filter).and_then(|f| tracker.escalations().list(&f)),
            ),
            EscalateCommand::Watch {
                interval_secs,
                project,
            } => {
                let filter = match build_filter(FilterArgs {
                    project,
                    responsibility: None,
                    resolved: Some(false),
                    from: None,
                    to: None,
                    cursor: None,
                }) {
                    Ok(filter) => filter,
                    Err(e) => return emit::<()>(Err(e)),
                };

                let (tx, rx) = tokio::sync::watch::channel(false);
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        let _ = tx.send(true);
                    }
                });

                tracing::info!(interval_secs, "Watching for new escalations");
                let watcher = EscalationWatcher::with_filter(tracker.escalations(), filter);
                let reported = watcher
                    .run(Duration::from_secs(interval_secs.max(1)), rx, |e| {
                        if let Ok(line) = serde_json::to_string(e) {
                            println!("{}", line);
                        }
                    })
                    .await;
                match reported {
                    Ok(n) => {
                        tracing::info!(reported = n, "Watch finished");
                        Ok(true)
                    }
                    Err(e) => emit::<()>(Err(e)),
                }
            }
        },

        Command::Report(cmd) => match cmd {
            ReportCommand::Summary => emit(tracker.reports().project_summary()),
            ReportCommand::User { user_id } => {
                emit(tracker.reports().user_responsibilities(user_id))
            }
            ReportCommand::Escalations { filter } => emit(
                build_filter(filter)
                    .and_then(|f| tracker.reports().escalation_report(&f)),
            ),
        },
    }
}
