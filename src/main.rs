//! timeout-probe
//!
//! Runs a simulated operation under a timeout policy and reports how it
//! ended. Useful for checking a policy file and for watching the two
//! strategies behave differently against uncooperative work.
//!
//! ```text
//! timeout-probe --timeout-ms 50 --strategy pessimistic --work-ms 3000
//! timeout-probe --config policy.toml --cooperative --cancel-after-ms 20
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;

use timeout_policy::config::{load_config, PolicyConfig};
use timeout_policy::lifecycle::signals::cancel_on_ctrl_c;
use timeout_policy::observability::{logging, metrics};
use timeout_policy::resilience::{
    AbandonedOperation, AbandonedOutcome, BoxError, Cancelled, Context, Strategy, Timeout,
    TimeoutError, TimeoutPolicy,
};

#[derive(Parser)]
#[command(name = "timeout-probe")]
#[command(about = "Run a simulated operation under a timeout policy", long_about = None)]
struct Cli {
    /// Policy file (TOML). Flags below override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Timeout in milliseconds; -1 disables the timeout.
    #[arg(long, allow_hyphen_values = true)]
    timeout_ms: Option<i64>,

    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// How long the simulated operation works.
    #[arg(long, default_value_t = 1000)]
    work_ms: u64,

    /// Make the operation observe its cancellation token.
    #[arg(long)]
    cooperative: bool,

    /// Cancel from the caller side after this many milliseconds.
    #[arg(long)]
    cancel_after_ms: Option<u64>,

    /// Make the operation fail after its work.
    #[arg(long)]
    fail: bool,

    /// Print the Prometheus snapshot before exiting.
    #[arg(long)]
    print_metrics: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Optimistic,
    Pessimistic,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Optimistic => Strategy::Optimistic,
            StrategyArg::Pessimistic => Strategy::Pessimistic,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => PolicyConfig::default(),
    };
    if let Some(strategy) = cli.strategy {
        config.strategy = strategy.into();
    }

    logging::init_logging(&config.observability.log_level);

    let prometheus = if cli.print_metrics || config.observability.metrics_enabled {
        Some(metrics::install_prometheus()?)
    } else {
        None
    };

    let timeout = match cli.timeout_ms {
        Some(ms) => Timeout::from_millis_signed(ms)?,
        None => config.timeout()?,
    };

    tracing::info!(
        timeout = %timeout,
        strategy = config.strategy.as_str(),
        work_ms = cli.work_ms,
        cooperative = cli.cooperative,
        "timeout-probe starting"
    );

    let policy = TimeoutPolicy::<u64, BoxError>::builder(timeout)
        .strategy(config.strategy)
        .on_timeout(report_timeout)
        .build()?;

    let ctx = match &config.operation_key {
        Some(key) => Context::with_key(key.clone()),
        None => Context::with_key("timeout-probe"),
    };

    let caller = CancellationToken::new();
    cancel_on_ctrl_c(caller.clone());
    if let Some(ms) = cli.cancel_after_ms {
        let token = caller.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            token.cancel();
        });
    }

    let work = Duration::from_millis(cli.work_ms);
    let (cooperative, fail) = (cli.cooperative, cli.fail);
    let result = policy
        .execute_with(
            move |token: CancellationToken| simulate(work, cooperative, fail, token),
            &ctx,
            Some(&caller),
        )
        .await;

    let code = match result {
        Ok(ms) => {
            println!("completed after {}ms of work", ms);
            ExitCode::SUCCESS
        }
        Err(TimeoutError::Rejected(e)) => {
            println!("timed out: {}", e);
            ExitCode::from(2)
        }
        Err(TimeoutError::Cancelled(e)) => {
            println!("cancelled: {}", e);
            ExitCode::from(3)
        }
        Err(TimeoutError::Operation(e)) => {
            println!("failed: {}", e);
            ExitCode::from(1)
        }
    };

    if cli.print_metrics {
        if let Some(handle) = prometheus {
            print!("{}", handle.render());
        }
    }

    Ok(code)
}

async fn simulate(
    work: Duration,
    cooperative: bool,
    fail: bool,
    token: CancellationToken,
) -> Result<u64, BoxError> {
    if cooperative {
        tokio::select! {
            _ = tokio::time::sleep(work) => {}
            _ = token.cancelled() => return Err(Box::new(Cancelled::with_reason("work interrupted"))),
        }
    } else {
        tokio::time::sleep(work).await;
    }

    if fail {
        return Err("simulated failure".into());
    }
    Ok(work.as_millis() as u64)
}

fn report_timeout(ctx: &Context, timeout: Duration, abandoned: Option<AbandonedOperation<u64, BoxError>>) {
    tracing::warn!(
        operation_key = ctx.log_key(),
        timeout_ms = Timeout::from(timeout).log_millis(),
        abandoned = abandoned.is_some(),
        "Probe operation timed out"
    );

    if let Some(handle) = abandoned {
        handle.on_completion(|outcome: AbandonedOutcome<u64, BoxError>| match outcome {
            AbandonedOutcome::Completed(ms) => {
                tracing::info!(work_ms = ms, "Abandoned probe finished its work")
            }
            other => tracing::info!(outcome = ?other, "Abandoned probe ended"),
        });
    }
}
