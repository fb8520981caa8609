use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lgnet::adapt::HistoryStats;
use lgnet::domain::{DecodedTask, ResultRecord, decode_tasks};
use lgnet::lg::{UnitOutput, evaluate_network};
use lgnet::processor::{TaskProcessor, WorkerPool};
use lgnet::queue::{ChannelQueue, JobQueue, JobState};
use lgnet::store::{ResultStore, SqliteResultStore};

mod cli;
mod config;

use cli::Cli;
use cli::commands::Commands;
use config::Config;

fn setup_logging(level: Option<&str>) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lgnet")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("lgnet.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    // RUST_LOG wins over the configured level
    env_logger::Builder::new()
        .parse_filters(level.unwrap_or("info"))
        .parse_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn read_tasks(path: &Path) -> Result<Vec<DecodedTask>> {
    let content = fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?;
    let tasks = decode_tasks(&content).context(format!("Failed to decode tasks from {}", path.display()))?;
    Ok(tasks)
}

fn open_store(cli: &Cli, config: &Config) -> Result<SqliteResultStore> {
    let path = cli.store.clone().unwrap_or_else(|| config.store.path.clone());
    SqliteResultStore::open(&path).context(format!("Failed to open result store at {}", path.display()))
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Run { files, concurrency } => handle_run(files, *concurrency, cli, config).await,
        Commands::Eval { file } => handle_eval(file, cli.is_verbose()),
        Commands::Result { task_id } => handle_result(task_id, cli, config).await,
        Commands::History { limit } => handle_history(*limit, cli, config).await,
    }
}

async fn handle_run(files: &[PathBuf], concurrency: Option<usize>, cli: &Cli, config: &Config) -> Result<()> {
    let mut entries = Vec::new();
    for file in files {
        entries.extend(read_tasks(file)?);
    }
    info!("Loaded {} task(s) from {} file(s)", entries.len(), files.len());

    let store = Arc::new(open_store(cli, config)?);
    let queue = Arc::new(ChannelQueue::new(config.queue.to_queue_config()));
    let processor = Arc::new(TaskProcessor::with_policy(store, config.adaptation.to_policy()));

    for entry in entries {
        match entry {
            Ok(task) => {
                let job_id = queue.submit(task).await.context("Failed to submit task")?;
                if cli.is_verbose() {
                    println!("{} {}", "Queued:".cyan(), job_id);
                }
            }
            Err(rejected) => {
                warn!("Task {} failed to decode: {}", rejected.id, rejected.error);
                queue
                    .reject(&rejected.id, &rejected.error)
                    .await
                    .context("Failed to record rejected task")?;
            }
        }
    }
    queue.close().await?;

    let workers = concurrency.unwrap_or(config.worker.concurrency);
    let stats = WorkerPool::new(queue.clone(), processor, workers)
        .run()
        .await
        .context("Worker pool failed")?;

    let mut completed = 0;
    let mut failed = 0;
    for (job_id, state) in queue.snapshot()? {
        match state {
            JobState::Completed { value } => {
                completed += 1;
                println!("{} {} O_final={}", "Completed:".green(), job_id, value);
            }
            JobState::Failed { attempts: 0, reason } => {
                failed += 1;
                println!("{} {} rejected: {}", "Failed:".red(), job_id, reason);
            }
            JobState::Failed { attempts, reason } => {
                failed += 1;
                println!(
                    "{} {} after {} attempt(s): {}",
                    "Failed:".red(),
                    job_id,
                    attempts,
                    reason
                );
            }
            other => println!("{} {} is still {}", "Pending:".yellow(), job_id, other.as_str()),
        }
    }

    println!(
        "{} {} completed, {} failed ({} deliveries)",
        "Summary:".bold(),
        completed,
        failed,
        stats.received
    );
    Ok(())
}

fn handle_eval(file: &Path, verbose: bool) -> Result<()> {
    for entry in read_tasks(file)? {
        let task = match entry {
            Ok(task) => task,
            Err(rejected) => {
                println!("{} {}: {}", "Failed:".red(), rejected.id, rejected.error);
                continue;
            }
        };

        match evaluate_network(&task.network.connections, &task.network.biases) {
            Ok(evaluation) => {
                println!("{} {} O_final={}", "Evaluated:".green(), task.id, evaluation.total);
                if verbose {
                    for unit in &evaluation.units {
                        println!("  {}", describe_unit(unit));
                    }
                }
            }
            Err(e) => println!("{} {}: {}", "Failed:".red(), task.id, e),
        }
    }
    Ok(())
}

fn describe_unit(unit: &UnitOutput) -> String {
    let mut line = format!(
        "{} ({}) O={} Q={} Q2={}",
        unit.lg_id, unit.unit_type, unit.result.o, unit.result.q, unit.result.q2
    );
    if let Some(t) = &unit.trace {
        line.push_str(&format!(
            "  [I1={} I2={} Q1={} R1={} Q2={} R2={}]",
            t.i1, t.i2, t.q1, t.r1, t.q2, t.r2
        ));
    }
    line
}

async fn find_result<S: ResultStore>(store: &S, task_id: &str) -> Result<ResultRecord> {
    store
        .find_one(task_id)
        .await?
        .ok_or_else(|| eyre::eyre!("Result not found: {}", task_id))
}

async fn handle_result(task_id: &str, cli: &Cli, config: &Config) -> Result<()> {
    let store = open_store(cli, config)?;
    let record = find_result(&store, task_id).await?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

async fn handle_history(limit: usize, cli: &Cli, config: &Config) -> Result<()> {
    let store = open_store(cli, config)?;
    let records = store.query_recent(limit).await?;

    if records.is_empty() {
        println!("{}", "No results yet".yellow());
        return Ok(());
    }

    for record in &records {
        println!(
            "{}  {}  O_final={}  units={}",
            record.timestamp.to_rfc3339(),
            record.task_id,
            record.o_final,
            record.connections.len()
        );
    }

    let outputs: Vec<i64> = records.iter().map(|r| r.o_final).collect();
    if let Some(stats) = HistoryStats::from_history(&outputs) {
        println!(
            "{} n={} mean={:.2} median={} mode={}",
            "Stats:".cyan(),
            stats.count,
            stats.mean,
            stats.median,
            stats.mode
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging once the configured level is known
    setup_logging(config.log_level.as_deref()).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lgnet::domain::{Bias, LgUnit};
    use lgnet::lg::LgResult;
    use lgnet::store::MemoryResultStore;

    #[tokio::test]
    async fn test_find_result_reports_missing_task() {
        let store = MemoryResultStore::new();
        store
            .insert(&ResultRecord::new("known", 4, vec![], vec![], vec![]))
            .await
            .unwrap();

        assert_eq!(find_result(&store, "known").await.unwrap().o_final, 4);

        let err = find_result(&store, "unknown").await.unwrap_err();
        assert_eq!(err.to_string(), "Result not found: unknown");
    }

    #[test]
    fn test_describe_unit_includes_simple_trace() {
        let units = vec![LgUnit::simple("u1", vec![10], vec![3])];
        let biases = [("u1".to_string(), Bias::Scalar(4))].into_iter().collect();
        let evaluation = evaluate_network(&units, &biases).unwrap();

        let line = describe_unit(&evaluation.units[0]);
        assert_eq!(line, "u1 (simple) O=4 Q=3 Q2=1  [I1=10 I2=3 Q1=2 R1=2 Q2=1 R2=1]");
    }

    #[test]
    fn test_describe_unit_without_trace() {
        let unit = UnitOutput {
            lg_id: "a".to_string(),
            unit_type: lgnet::domain::UnitType::Associated,
            result: LgResult { o: 7, q: 5, q2: 2 },
            trace: None,
        };
        assert_eq!(describe_unit(&unit), "a (associated) O=7 Q=5 Q2=2");
    }
}
