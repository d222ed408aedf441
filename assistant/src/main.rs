use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sql_assistant::cli::{repl::print_response, Cli, Commands, Repl};
use sql_assistant::config::{AppConfig, CheckpointBackend};
use sql_assistant::orchestrator::{Decision, TurnRequest};
use sql_assistant::runtime;
use sql_assistant::seed::{self, SeedConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.json)?;

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    if let Some(url) = &cli.ollama_url {
        config.llm.url = url.clone();
    }
    if let Some(model) = &cli.model {
        config.llm.model = model.clone();
    }
    if let Some(database) = &cli.database {
        config.database.path = database.clone();
    }
    if cli.ephemeral {
        config.checkpoint.backend = CheckpointBackend::Memory;
    }

    if let Commands::Seed { orders, rng_seed } = &cli.command {
        let report = seed::seed_database(
            &config.database.path,
            &SeedConfig {
                orders: *orders,
                rng_seed: *rng_seed,
                ..SeedConfig::default()
            },
        )?;
        println!("Seeded {:?}:", config.database.path);
        println!("  customers:       {}", report.customers);
        println!("  products:        {}", report.products);
        println!("  warehouses:      {}", report.warehouses);
        println!("  inventory:       {}", report.inventory);
        println!("  orders:          {}", report.orders);
        println!("  order_items:     {}", report.order_items);
        println!("  stock_movements: {}", report.stock_movements);
        return Ok(());
    }

    let runtime = runtime::build(&config)?;
    let orchestrator = runtime.orchestrator.clone();
    let mut stdout = std::io::stdout();

    match cli.command {
        Commands::Chat { thread } => {
            Repl::new(&orchestrator).with_thread(thread).run().await?;
        }
        Commands::Ask {
            message,
            thread,
            auto_execute,
        } => {
            let response = orchestrator
                .start_or_continue(TurnRequest {
                    thread_id: thread,
                    text: message,
                    auto_execute,
                })
                .await?;
            print_response(&mut stdout, &response)?;
            println!("\n[thread: {} | status: {:?}]", response.thread_id, response.status);
        }
        Commands::Approve {
            thread,
            reject,
            feedback,
        } => {
            let decision = if reject { Decision::Reject } else { Decision::Approve };
            let response = orchestrator
                .resolve_approval(&thread, decision, feedback.as_deref())
                .await?;
            print_response(&mut stdout, &response)?;
            println!("\n[thread: {} | status: {:?}]", response.thread_id, response.status);
        }
        Commands::Threads => {
            let threads = orchestrator.threads().await?;
            if threads.is_empty() {
                println!("No threads.");
            }
            for thread in threads {
                let pending = thread.pending.map(|n| n.to_string()).unwrap_or_default();
                println!(
                    "{}  {:>4} msgs  {}  {}",
                    thread.thread_id,
                    thread.message_count,
                    thread.updated_at.format("%Y-%m-%d %H:%M:%S"),
                    pending
                );
            }
        }
        Commands::History { thread } => {
            for message in orchestrator.history(&thread).await? {
                println!("[{}] {}", message.kind(), message.text());
            }
        }
        // Handled before the runtime is built
        Commands::Seed { .. } => {}
        #[cfg(feature = "web")]
        Commands::Serve { port } => {
            use sql_assistant::web::{self, AppState, WebConfig};

            let state = AppState::new(orchestrator, runtime.llm_url.clone(), runtime.model_name.clone());
            web::serve(WebConfig { port }, state).await?;
        }
    }

    Ok(())
}

/// Logs go to stderr so they never interleave with REPL output
fn init_tracing(verbose: u8, json: bool) -> Result<()> {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;

    tracing_subscriber::registry()
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .with(filter)
        .init();

    Ok(())
}
