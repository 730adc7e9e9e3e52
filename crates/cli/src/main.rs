use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use triage::aggregate::ConversationAggregator;
use triage::config::{self, Config};
use triage::filter::MessageFilter;
use triage::llm::OpenAiClient;
use triage::model::{Conversation, ReviewRecord};
use triage::pipeline::Pipeline;
use triage::table::{self, SnapshotWriter};

#[derive(Parser)]
#[command(name = "triage")]
#[command(about = "Triage CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a starter config with sample boilerplate markers.
    Init {
        /// Config file path (default: TRIAGE_CONFIG_PATH or ~/.triage/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Group and filter ticket rows and print the resulting conversations. No service calls.
    Preview {
        /// Config file path (default: TRIAGE_CONFIG_PATH or ~/.triage/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// JSON array of ticket rows.
        #[arg(long, short, value_name = "FILE")]
        tickets: PathBuf,

        /// Show only this ticket.
        #[arg(long, value_name = "ID")]
        ticket: Option<String>,
    },

    /// Classify every ticket and write the review table. Ctrl-C stops after the current ticket.
    Run {
        /// Config file path (default: TRIAGE_CONFIG_PATH or ~/.triage/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// JSON array of ticket rows.
        #[arg(long, short, value_name = "FILE")]
        tickets: PathBuf,

        /// Catalog JSON with subjects and canned responses.
        #[arg(long, value_name = "FILE")]
        catalog: PathBuf,

        /// Review table output (default: stdout).
        #[arg(long, short, value_name = "FILE")]
        out: Option<PathBuf>,

        /// Append each record as a JSON line while the batch runs.
        #[arg(long, value_name = "FILE")]
        snapshot: Option<PathBuf>,

        /// Minimum seconds between service calls (default from config or 7).
        #[arg(long, value_name = "SECS")]
        throttle: Option<f64>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("triage {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Preview {
            config,
            tickets,
            ticket,
        }) => {
            if let Err(e) = run_preview(config, &tickets, ticket.as_deref()) {
                log::error!("preview failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Run {
            config,
            tickets,
            catalog,
            out,
            snapshot,
            throttle,
        }) => {
            let args = RunArgs {
                tickets,
                catalog,
                out,
                snapshot,
                throttle,
            };
            if let Err(e) = run_batch(config, args).await {
                log::error!("run failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(config::default_config_path);
    let dir = triage::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

fn run_preview(config_path: Option<PathBuf>, tickets: &Path, ticket: Option<&str>) -> anyhow::Result<()> {
    let (config, _) = config::load_config(config_path)?;
    let rows = table::load_tickets(tickets)?;
    let filter = MessageFilter::new(&config.filter)?;
    let aggregator = ConversationAggregator::new(&filter, &config.media);
    let conversations = select_ticket(aggregator.aggregate(&rows), ticket);
    if let (Some(id), true) = (ticket, conversations.is_empty()) {
        anyhow::bail!("ticket {} not found (or has no usable content)", id);
    }
    for conversation in conversations {
        println!(
            "== {} | {} | {}",
            conversation.ticket_id, conversation.sender_name, conversation.sender_handle
        );
        println!("{}", conversation.text());
        if conversation.has_media() {
            println!("{}", triage::model::format_media_links(&conversation.media));
        }
        println!();
    }
    Ok(())
}

/// Keep only the conversation for `ticket`, or all of them when no id is given.
fn select_ticket(conversations: Vec<Conversation>, ticket: Option<&str>) -> Vec<Conversation> {
    match ticket {
        Some(id) => conversations
            .into_iter()
            .filter(|c| c.ticket_id == id)
            .collect(),
        None => conversations,
    }
}

/// Appends records to the snapshot. The first failed write cancels the batch and is kept
/// so the run can report it.
struct SnapshotSink {
    writer: Option<SnapshotWriter>,
    cancel: CancellationToken,
    error: Option<anyhow::Error>,
}

impl SnapshotSink {
    fn new(writer: Option<SnapshotWriter>, cancel: CancellationToken) -> Self {
        Self {
            writer,
            cancel,
            error: None,
        }
    }

    fn record(&mut self, record: &ReviewRecord) {
        if self.error.is_some() {
            return;
        }
        if let Some(writer) = self.writer.as_mut() {
            if let Err(e) = writer.append(record) {
                log::error!("snapshot write failed, stopping after ticket {}: {:#}", record.ticket_id, e);
                self.error = Some(e);
                self.cancel.cancel();
            }
        }
    }

    fn finish(self) -> anyhow::Result<()> {
        match self.error {
            Some(e) => Err(e.context("snapshot write failed")),
            None => Ok(()),
        }
    }
}

struct RunArgs {
    tickets: PathBuf,
    catalog: PathBuf,
    out: Option<PathBuf>,
    snapshot: Option<PathBuf>,
    throttle: Option<f64>,
}

async fn run_batch(config_path: Option<PathBuf>, args: RunArgs) -> anyhow::Result<()> {
    let (mut config, path) = config::load_config(config_path)?;
    if let Some(secs) = args.throttle {
        config.pipeline.throttle_secs = secs;
    }
    log::info!("using config {}", path.display());

    let rows = table::load_tickets(&args.tickets)?;
    let catalog = table::load_catalog(&args.catalog)?;
    let backend = build_backend(&config)?;
    log::info!("classifying with model {}", backend.model());
    let pipeline = Pipeline::new(&config, backend)?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupt received, stopping after the current ticket");
            ctrl_c.cancel();
        }
    });

    let writer = args.snapshot.as_deref().map(SnapshotWriter::create).transpose()?;
    let mut sink = SnapshotSink::new(writer, cancel.clone());
    let mut on_record = |record: &ReviewRecord| sink.record(record);
    let records = pipeline
        .run_with(
            &rows,
            &catalog.subjects,
            &catalog.responses,
            &cancel,
            &mut on_record,
        )
        .await?;

    match &args.out {
        Some(out) => {
            table::write_records(out, &records)?;
            println!("wrote {} review record(s) to {}", records.len(), out.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&records)?),
    }
    sink.finish()
}

fn build_backend(config: &Config) -> anyhow::Result<OpenAiClient> {
    let api_key = config::resolve_api_key(config);
    if api_key.is_none() && !config.service.requires_api_key() {
        log::warn!("no API key configured (service.apiKey or TRIAGE_API_KEY); sending unauthenticated requests");
    }
    Ok(OpenAiClient::new(&config.service, api_key)?)
}
