use std::io::IsTerminal;
use std::path::PathBuf;

use clap::Parser;
use scaleover_cf::CfCliPlatform;
use tracing_subscriber::EnvFilter;

mod config;
mod progress;
mod run;

use config::{FileConfig, PlanArgs, build_plan};
use progress::TerminalProgress;

#[derive(Parser)]
#[command(
    name = "scaleover",
    about = "Roll traffic from one application to another",
    version
)]
struct Cli {
    /// Application currently serving traffic
    source: String,
    /// Application to move traffic to
    target: String,
    /// Time to spread the scaleover over, e.g. 1m or 90s
    #[arg(allow_hyphen_values = true)]
    rollover_duration: String,

    #[command(flatten)]
    plan: PlanArgs,

    /// Read plan options from a TOML file. Flags override file values
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Path to the cf CLI
    #[arg(long, default_value = "cf")]
    cf_binary: PathBuf,

    /// Print the commands a scaleover would issue without running them
    #[arg(long)]
    dry_run: bool,

    /// One status line per step, even on a terminal
    #[arg(long)]
    plain: bool,

    /// Log more (-v debug). Ignored when RUST_LOG is set
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Filter for the log subscriber. `RUST_LOG`, when set, wins over `-v`.
fn log_filter(rust_log: Option<&str>, verbose: u8) -> anyhow::Result<EnvFilter> {
    if let Some(directives) = rust_log {
        return Ok(EnvFilter::try_new(directives)?);
    }
    let level = match verbose {
        0 => "info",
        _ => "debug",
    };
    Ok(EnvFilter::default().add_directive(format!("scaleover={level}").parse()?))
}

fn init_tracing(verbose: u8) -> anyhow::Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref(), verbose)?)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let file = cli.config.as_deref().map(FileConfig::from_file).transpose()?;
    let plan = build_plan(&cli.rollover_duration, &cli.plan, file.as_ref())?;
    let platform = CfCliPlatform::with_binary(&cli.cf_binary);

    let interactive = !cli.plain && std::io::stdout().is_terminal();
    let mut progress = TerminalProgress::new(std::io::stdout(), interactive);

    if cli.dry_run {
        let commands =
            run::dry_run(&platform, &cli.source, &cli.target, plan, &mut progress).await;
        progress.finish();
        for command in commands? {
            println!("{}", serde_json::to_string(&command)?);
        }
        return Ok(());
    }

    println!("Starting scaleover of {} to {}", cli.source, cli.target);
    let result = run::scaleover(&platform, &cli.source, &cli.target, plan, &mut progress).await;
    progress.finish();
    let report = result?;

    if report.steps == 0 {
        println!("There are no instances of the source app to scale over");
        return Ok(());
    }
    if report.abandoned_waits > 0 {
        eprintln!(
            "warning: {} step(s) scaled {} down without confirming {} was running",
            report.abandoned_waits, report.source.name, report.target.name
        );
    }
    println!("Scaleover complete!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_arguments_are_required() {
        assert!(Cli::try_parse_from(["scaleover"]).is_err());
        assert!(Cli::try_parse_from(["scaleover", "two", "three"]).is_err());
        assert!(Cli::try_parse_from(["scaleover", "two", "three", "1m", "foo"]).is_err());
    }

    #[test]
    fn minimal_invocation() {
        let cli = Cli::try_parse_from(["scaleover", "two", "three", "1m"]).unwrap();
        assert_eq!(cli.source, "two");
        assert_eq!(cli.target, "three");
        assert_eq!(cli.rollover_duration, "1m");
        assert!(!cli.plan.no_route_check);
        assert_eq!(cli.cf_binary, PathBuf::from("cf"));
    }

    #[test]
    fn plan_flags_parse() {
        let cli = Cli::try_parse_from([
            "scaleover",
            "two",
            "three",
            "1m",
            "--no-route-check",
            "--leave",
            "1",
            "--batch-size",
            "2",
            "--wait-for-start",
            "--post-start-sleep",
            "30s",
        ])
        .unwrap();
        assert!(cli.plan.no_route_check);
        assert_eq!(cli.plan.leave, Some(1));
        assert_eq!(cli.plan.batch_size, Some(2));
        assert!(cli.plan.wait_for_start);
        assert_eq!(cli.plan.post_start_sleep.as_deref(), Some("30s"));
    }

    #[test]
    fn non_numeric_leave_is_rejected() {
        assert!(Cli::try_parse_from(["scaleover", "two", "three", "1m", "--leave", "a"]).is_err());
    }

    #[test]
    fn negative_duration_reaches_plan_validation() {
        let cli = Cli::try_parse_from(["scaleover", "two", "three", "-1m"]).unwrap();
        assert!(build_plan(&cli.rollover_duration, &cli.plan, None).is_err());
    }

    #[test]
    fn default_log_level_is_info() {
        assert!(log_filter(None, 0).unwrap().to_string().contains("scaleover=info"));
        assert!(log_filter(None, 1).unwrap().to_string().contains("scaleover=debug"));
    }

    #[test]
    fn rust_log_overrides_verbosity() {
        let filter = log_filter(Some("scaleover=trace"), 2).unwrap();
        assert!(filter.to_string().contains("scaleover=trace"));
    }

    #[test]
    fn verbosity_counts() {
        let cli = Cli::try_parse_from(["scaleover", "a", "b", "1m", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
