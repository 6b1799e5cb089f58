mod cli;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use cli::{Cli, Commands};
use vivacast_av::{probe_duration, AssetStore, LocalStore, RcloneStore, ToolRegistry};
use vivacast_core::config::{Config, RunSpec};
use vivacast_pipeline::{PipelineContext, ProgressSender};

fn main() {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise pick defaults from the verbose flag.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "vivacast=trace,vivacast_pipeline=trace,vivacast_av=debug,vivacast_core=debug"
                .to_string()
        } else {
            "vivacast=info,vivacast_pipeline=info,vivacast_av=info".to_string()
        }
    });

    tracing_subscriber::fmt().with_env_filter(&env_filter).init();

    let config_path = cli.config.as_deref();
    let result = match cli.command {
        Commands::Prepare {
            input,
            work_dir,
            output_dir,
        } => run_async(|| pipeline_command(Stage::Prepare, input, work_dir, output_dir, config_path)),
        Commands::Relay { output_dir } => run_async(|| {
            pipeline_command(
                Stage::Relay,
                PathBuf::new(),
                output_dir.clone(),
                output_dir,
                config_path,
            )
        }),
        Commands::Run {
            input,
            work_dir,
            output_dir,
        } => run_async(|| pipeline_command(Stage::Full, input, work_dir, output_dir, config_path)),
        Commands::Probe { file, json } => run_async(|| probe_file(file, json, config_path)),
        Commands::CheckTools => check_tools(config_path),
        Commands::Validate {
            config: validate_path,
        } => validate_config(validate_path.as_deref().or(config_path)),
        Commands::Version => {
            println!("vivacast {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        let code = e
            .downcast_ref::<vivacast_core::Error>()
            .map(|err| err.exit_code())
            .unwrap_or(1);
        std::process::exit(code);
    }
}

fn run_async<F, Fut>(f: F) -> Result<()>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<()>>,
{
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(f())
}

enum Stage {
    Prepare,
    Relay,
    Full,
}

async fn pipeline_command(
    stage: Stage,
    input: PathBuf,
    work_dir: PathBuf,
    output_dir: PathBuf,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = Config::load_or_default(config_path);
    for warning in config.validate() {
        tracing::warn!("Config: {warning}");
    }

    let tools = ToolRegistry::discover(&config.tools);
    // The relay stage never fetches; a relay-only host without rclone must
    // not fail before the transport starts.
    let store: Arc<dyn AssetStore> = match stage {
        Stage::Relay => Arc::new(LocalStore::new(output_dir.clone())),
        Stage::Prepare | Stage::Full => Arc::new(RcloneStore::new(
            tools.require("rclone")?,
            config.tools.rclone_remote.clone(),
            config.tools.rclone_config.clone(),
        )),
    };

    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; cancelling run");
            signal_token.cancel();
        }
    });

    let progress = ProgressSender::new(|pct, step| {
        tracing::info!("[{pct:>5.1}%] {step}");
    });
    let ctx = PipelineContext::new(config, tools, store, work_dir, output_dir)
        .with_cancellation(token)
        .with_progress(progress);

    match stage {
        Stage::Prepare => {
            let spec = RunSpec::load(&input)?;
            let prepared = vivacast_pipeline::run_prepare(&ctx, &spec).await?;
            println!(
                "Prepared {} members ({:.1}s total); manifest at {}",
                prepared.plan.members.len(),
                prepared.plan.total_duration,
                prepared.manifest.display()
            );
        }
        Stage::Relay => {
            vivacast_pipeline::run_relay(&ctx).await?;
            println!("Relay completed");
        }
        Stage::Full => {
            let spec = RunSpec::load(&input)?;
            vivacast_pipeline::run_full(&ctx, &spec).await?;
            println!("Broadcast completed");
        }
    }

    Ok(())
}

async fn probe_file(file: PathBuf, json: bool, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load_or_default(config_path);
    let tools = ToolRegistry::discover(&config.tools);
    let ffprobe = tools.require("ffprobe")?;
    let duration = probe_duration(&ffprobe, &file).await?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "file": file, "duration": duration })
        );
    } else {
        let secs = duration as u64;
        println!("File: {}", file.display());
        println!(
            "Duration: {:02}:{:02}:{:02} ({duration:.3}s)",
            secs / 3600,
            (secs / 60) % 60,
            secs % 60
        );
    }

    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = Config::load_or_default(config_path);
    let tools = ToolRegistry::discover(&config.tools);
    let mut all_ok = true;

    for tool in tools.check_all() {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);
        if let Some(ref version) = tool.version {
            print!(" ({version})");
        }
        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }
        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install them to enable all features.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            let contents = std::fs::read_to_string(p)?;
            Config::from_json(&contents)?
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    let warnings = config.validate();
    if warnings.is_empty() {
        println!("✓ Configuration is valid");
    } else {
        for warning in &warnings {
            println!("⚠ {warning}");
        }
    }
    println!(
        "  Overlay window: {:.0}s - {:.0}s",
        config.overlay.window_start, config.overlay.window_end
    );
    println!("  Encode: {}x{} @ {} fps", config.encode.width, config.encode.height, config.encode.fps);
    println!("  Cleanup strategy: {:?}", config.cleanup.strategy);

    Ok(())
}
