use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use plant_care_scheduler::client::HttpPlantApi;
use plant_care_scheduler::config::Config;
use plant_care_scheduler::logic::{self, BucketView};
use plant_care_scheduler::store::FileCredentialStore;
use plant_care_scheduler::{
    CareTask, CareTaskType, Credential, CredentialStore, PlantId, TaskBucket, TaskBuckets,
    TaskCompleter,
};

type Completer = TaskCompleter<HttpPlantApi, FileCredentialStore, HttpPlantApi>;

#[derive(Debug, Parser)]
#[command(name = "plant-tasks", version, about = "Plant care reminders from the command line")]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "plant-tasks.toml")]
    config: String,

    /// Log level when RUST_LOG is not set
    #[arg(short, long, default_value = "warn", value_parser = ["trace", "debug", "info", "warn", "error"])]
    log_level: String,

    /// Log format
    #[arg(long, default_value = "pretty", value_parser = ["json", "pretty"])]
    log_format: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Store the access/refresh token pair used for backend calls
    SetCredentials {
        #[arg(long)]
        access: String,
        #[arg(long)]
        refresh: String,
    },
    /// List tasks grouped by plant
    Tasks {
        /// Only show one bucket
        #[arg(short, long)]
        bucket: Option<BucketArg>,
    },
    /// Mark a care task as done today
    Complete {
        #[arg(long)]
        plant: PlantId,
        #[arg(long = "type")]
        kind: CareTaskType,
        #[arg(short, long, default_value = "today")]
        bucket: BucketArg,
    },
    /// Show the locally projected next dates of a plant
    Schedule {
        #[arg(long)]
        plant: PlantId,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BucketArg {
    Previous,
    Today,
    Next,
}

impl From<BucketArg> for TaskBucket {
    fn from(arg: BucketArg) -> Self {
        match arg {
            BucketArg::Previous => TaskBucket::Previous,
            BucketArg::Today => TaskBucket::Today,
            BucketArg::Next => TaskBucket::Next,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format)?;

    let config = Config::load(&cli.config)
        .with_context(|| format!("failed to load config {}", cli.config))?
        .apply_env();
    info!(base_url = %config.api.base_url, "using plant backend");

    let credentials = Arc::new(FileCredentialStore::new(&config.credentials_path));
    let api = Arc::new(HttpPlantApi::new(&config.api).context("failed to build HTTP client")?);
    let completer: Completer = TaskCompleter::new(api.clone(), credentials.clone(), api.clone());
    let today = logic::local_today();

    match cli.command {
        Command::SetCredentials { access, refresh } => {
            credentials
                .set(Credential::new(access, refresh))
                .context("failed to store credentials")?;
            println!("Credentials saved to {}", credentials.path().display());
        }
        Command::Tasks { bucket } => {
            let buckets = fetch(&completer, &api).await?;
            let selected: Vec<TaskBucket> = match bucket {
                Some(b) => vec![b.into()],
                None => TaskBucket::ALL.to_vec(),
            };
            for b in selected {
                print_bucket(b, buckets.bucket(b), today);
            }
        }
        Command::Complete { plant, kind, bucket } => {
            let bucket = TaskBucket::from(bucket);
            if !bucket.allows_completion() {
                bail!("upcoming tasks cannot be completed yet");
            }
            let buckets = fetch(&completer, &api).await?;
            let tasks = buckets.bucket(bucket);
            let task = tasks
                .iter()
                .find(|t| t.plant_id() == plant && t.kind == kind)
                .ok_or_else(|| anyhow!("no {kind} task for plant {plant} in {bucket:?}"))?;

            // The local list only drops the completed task; the re-fetch
            // below picks up the backend's new next dates.
            completer
                .complete_task(task, tasks, today, || debug!("task source stale, re-fetching"))
                .await
                .context("failed to complete task")?;

            println!(
                "{} done for {}",
                logic::care_type_label(kind),
                logic::display_name(&task.plant)
            );
            let buckets = fetch(&completer, &api).await?;
            print_bucket(bucket, buckets.bucket(bucket), today);
        }
        Command::Schedule { plant } => {
            let buckets = fetch(&completer, &api).await?;
            let record = TaskBucket::ALL
                .iter()
                .flat_map(|b| buckets.bucket(*b))
                .find(|t| t.plant_id() == plant)
                .map(|t| t.plant.clone())
                .ok_or_else(|| anyhow!("plant {plant} has no tasks"))?;

            println!("{}", logic::display_name(&record));
            for kind in CareTaskType::ALL {
                match logic::next_due_date(&record, kind, today) {
                    Some(date) => println!(
                        "  {:<12} {} {}",
                        logic::care_type_label(kind),
                        date,
                        logic::relative_day_text(logic::relative_day(date, today))
                    ),
                    None => println!("  {:<12} -", logic::care_type_label(kind)),
                }
            }
        }
    }

    Ok(())
}

async fn fetch(completer: &Completer, api: &HttpPlantApi) -> Result<TaskBuckets> {
    completer.fetch_tasks(api).await.context("failed to fetch tasks")
}

fn print_bucket(bucket: TaskBucket, tasks: &[CareTask], today: NaiveDate) {
    match logic::bucket_view(bucket, tasks) {
        BucketView::AllComplete(msg) => {
            println!("{}", msg.title);
            println!("  {}", msg.body);
        }
        BucketView::Groups(groups) => {
            for group in groups {
                println!(
                    "{} ({})",
                    logic::display_name(&group.plant),
                    logic::task_count_label(group.tasks.len())
                );
                for task in &group.tasks {
                    let when = logic::relative_day_for(task, today)
                        .map(logic::relative_day_text)
                        .unwrap_or_default();
                    println!("  {:<12} {}", logic::care_type_label(task.kind), when);
                }
            }
        }
    }
}

fn init_logging(log_level: &str, log_format: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .context("failed to initialise JSON logging")?,
        "pretty" => registry
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init()
            .context("failed to initialise logging")?,
        other => bail!("unsupported log format: {other}"),
    }

    Ok(())
}
