use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing_subscriber::EnvFilter;

use powermon::{PowermonConfig, PowermonError, RaplSampler, Result, SamplerSession};

#[derive(Parser, Debug)]
#[command(name = "powermon")]
#[command(about = "Per-socket CPU power and energy from RAPL counters")]
#[command(
    after_help = "Sampling runs until a line is entered on standard input (or Ctrl+C), then a summary is printed."
)]
struct Args {
    #[arg(help = "Sampling interval in milliseconds")]
    interval_ms: u64,

    #[arg(long, help = "Print the summary as JSON")]
    json: bool,

    #[arg(
        long,
        default_value = powermon::config::DEFAULT_SYSFS_CPU_ROOT,
        help = "Directory holding the sysfs CPU topology"
    )]
    sysfs_root: PathBuf,

    #[arg(
        long,
        default_value = powermon_raw::msr::DEFAULT_MSR_ROOT,
        help = "Directory holding the per-CPU msr device nodes"
    )]
    msr_root: PathBuf,

    #[arg(
        short,
        long,
        help = "Enable verbose logging (shows every MSR read)"
    )]
    verbose: bool,
}

fn check_permissions(config: &PowermonConfig) {
    if !nix::unistd::geteuid().is_root() {
        tracing::warn!("Not running as root; opening MSR devices will likely fail");
    }

    let msr_path = config.msr_root.join("0").join("msr");
    if std::fs::metadata(&msr_path).is_err() {
        tracing::warn!(
            "Cannot access {}; the msr kernel module may not be loaded (sudo modprobe msr)",
            msr_path.display()
        );
    }
}

/// Block until a line arrives on stdin, stdin closes, Ctrl+C, or the
/// sampler stops on its own
async fn wait_for_stop(session: &SamplerSession) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    tokio::select! {
        line = lines.next_line() => {
            if let Err(e) = line {
                tracing::warn!("Failed to read standard input: {}", e);
            }
            tracing::info!("Stop requested on standard input");
        }
        result = signal::ctrl_c() => {
            match result {
                Ok(()) => tracing::info!("Ctrl+C received!"),
                Err(e) => tracing::warn!("Failed to listen for Ctrl+C: {}", e),
            }
        }
        _ = session.stopped() => {
            tracing::warn!("Sampler stopped unexpectedly");
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = PowermonConfig::new(args.interval_ms)
        .with_sysfs_cpu_root(args.sysfs_root)
        .with_msr_root(args.msr_root);
    config.validate()?;

    check_permissions(&config);

    let sampler = RaplSampler::new(&config)?;
    for socket in sampler.sockets() {
        tracing::debug!(
            "Socket {} sampled through CPU {}",
            socket.socket_id,
            socket.core_id
        );
    }
    let info = sampler.power_info();
    if info.thermal_spec_power > 0.0 {
        tracing::info!(
            "Package TDP {:.1} W (min {:.1} W, max {:.1} W, window {:.3} s)",
            info.thermal_spec_power,
            info.minimum_power,
            info.maximum_power,
            info.time_window
        );
    }

    let session = SamplerSession::begin(sampler, config.interval);
    wait_for_stop(&session).await;
    let summary = session.end().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{summary}");
    }
    std::io::stdout().flush()?;

    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Setup logging based on verbose flag; RUST_LOG takes precedence
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Exit explicitly: a pending blocking read on stdin would otherwise keep
    // the runtime from shutting down after Ctrl+C.
    let code = match run(args).await {
        Ok(()) => 0,
        Err(e) => report_fatal(&e),
    };
    std::process::exit(code);
}

fn report_fatal(error: &PowermonError) -> i32 {
    eprintln!("powermon: {error}");
    error.exit_code()
}
