use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::ArgAction;
use protection_core::analysis::{AnalysisResult, ChartRanges, DeviceCurve, Verdict};
use protection_core::curves::{OperatingTime, ReferenceFuseStore};
use protection_core::study::CoordinationStudy;
use protection_core::study_file::load_study;
use serde::Serialize;

/// Exit code when the chain is not coordinated
const EXIT_NOT_COORDINATED: i32 = 2;

#[derive(Debug, clap::Parser)]
#[command(name = "protection", version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);
        self.command.run()
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Check discrimination margins between adjacent devices
    ///
    /// Exits with status 2 when some pair misses the minimum margin.
    Analyze {
        /// Study file (JSON)
        study: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Override the study's minimum margin (seconds)
        #[arg(long, value_name = "SECONDS")]
        min_margin: Option<f64>,
    },

    /// Print sampled time-current curves
    Curves {
        /// Study file (JSON)
        study: PathBuf,

        /// Only this device
        #[arg(long, value_name = "NAME")]
        device: Option<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print plot axis ranges covering every device curve
    Ranges {
        /// Study file (JSON)
        study: PathBuf,
    },

    /// Operating time of one device at one current
    Time {
        /// Study file (JSON)
        study: PathBuf,

        /// Device name
        #[arg(long, value_name = "NAME")]
        device: String,

        /// Current in amps
        #[arg(long, value_name = "AMPS")]
        current: f64,
    },

    /// List the bundled fuse curves
    Fuses {
        /// Only this fuse type
        #[arg(long, value_name = "TYPE")]
        fuse_type: Option<String>,
    },
}

impl Command {
    fn run(self) -> anyhow::Result<()> {
        match self {
            Command::Analyze {
                study,
                json,
                min_margin,
            } => analyze(&study, json, min_margin),
            Command::Curves { study, device, json } => curves(&study, device.as_deref(), json),
            Command::Ranges { study } => ranges(&study),
            Command::Time {
                study,
                device,
                current,
            } => time(&study, &device, current),
            Command::Fuses { fuse_type } => fuses(fuse_type.as_deref()),
        }
    }
}

fn open_study(path: &Path) -> anyhow::Result<(String, CoordinationStudy)> {
    let file = load_study(path).with_context(|| format!("failed to load study {}", path.display()))?;
    let title = file.meta.title.clone();
    let study = CoordinationStudy::from_file(file, ReferenceFuseStore::builtin())
        .with_context(|| format!("invalid study {}", path.display()))?;
    Ok((title, study))
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    title: &'a str,
    generated_at: DateTime<Utc>,
    verdict: Verdict,
    result: &'a AnalysisResult,
}

fn analyze(path: &Path, json: bool, min_margin: Option<f64>) -> anyhow::Result<()> {
    let (title, mut study) = open_study(path)?;
    if let Some(min_margin) = min_margin {
        study
            .set_min_margin(min_margin)
            .context("invalid --min-margin")?;
    }

    let result = study.result();
    let report = Report {
        title: &title,
        generated_at: Utc::now(),
        verdict: result.verdict(),
        result,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.verdict == Verdict::NotCoordinated {
        process::exit(EXIT_NOT_COORDINATED);
    }
    Ok(())
}

fn print_report(report: &Report<'_>) {
    let result = report.result;
    if !report.title.is_empty() {
        println!("{}", report.title);
    }
    println!("Coordination report ({})", report.generated_at.format("%Y-%m-%d %H:%M UTC"));
    println!("Minimum margin: {:.3} s", result.min_margin_s);
    println!();

    for pair in &result.pairs {
        let status = if pair.coordinated { "OK" } else { "FAIL" };
        println!("{} -> {}  [{}]", pair.primary_name, pair.backup_name, status);
        println!(
            "  {:>12}  {:>10}  {:>10}  {:>10}",
            "fault (A)", "primary", "backup", "margin"
        );
        for m in &pair.margins {
            let flag = if m.coordinated { "" } else { "  <" };
            println!(
                "  {:>12.1}  {:>9.3}s  {:>9.3}s  {:>9.3}s{}",
                m.fault_current_a, m.primary_time_s, m.backup_time_s, m.margin_s, flag
            );
        }
        println!();
    }

    for pair in &result.insufficient_data {
        println!(
            "{} -> {}  [no data: no fault level trips both devices]",
            pair.primary_name, pair.backup_name
        );
    }
    if result.has_insufficient_data() {
        println!();
    }

    if let Some(worst) = result.worst_margin() {
        println!(
            "Worst margin: {:.3} s at {:.1} A",
            worst.margin_s, worst.fault_current_a
        );
    }
    let verdict = match report.verdict {
        Verdict::Coordinated => "coordinated",
        Verdict::NotCoordinated => "NOT coordinated",
        Verdict::InsufficientData => "insufficient data",
    };
    println!("Result: {}", verdict);
}

fn curves(path: &Path, device: Option<&str>, json: bool) -> anyhow::Result<()> {
    let (_, mut study) = open_study(path)?;
    let curves: Vec<DeviceCurve> = match device {
        Some(name) => vec![DeviceCurve {
            name: name.to_string(),
            points: study.points_for(name)?.to_vec(),
        }],
        None => study.curve_points(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&curves)?);
        return Ok(());
    }

    for curve in &curves {
        println!("{} ({} points)", curve.name, curve.points.len());
        for p in &curve.points {
            println!("  {:>12.2} A  {:>10.4} s", p.current_a, p.time_s);
        }
    }
    Ok(())
}

fn ranges(path: &Path) -> anyhow::Result<()> {
    let (_, mut study) = open_study(path)?;
    let ranges: ChartRanges = study.chart_ranges();
    println!("{}", serde_json::to_string_pretty(&ranges)?);
    Ok(())
}

fn time(path: &Path, device: &str, current: f64) -> anyhow::Result<()> {
    let (_, study) = open_study(path)?;
    match study.operating_time(device, current)? {
        OperatingTime::Trip(seconds) => println!("{}: trips in {:.4} s at {} A", device, seconds, current),
        OperatingTime::NoTrip => println!("{}: does not trip at {} A", device, current),
        OperatingTime::Undefined => println!("{}: operating time undefined at {} A", device, current),
    }
    Ok(())
}

fn fuses(fuse_type: Option<&str>) -> anyhow::Result<()> {
    let store = ReferenceFuseStore::builtin();
    if store.is_empty() {
        anyhow::bail!("no fuse curves are bundled with this build");
    }

    let types: Vec<&str> = match fuse_type {
        Some(wanted) => {
            let matched: Vec<&str> = store
                .fuse_types()
                .into_iter()
                .filter(|t| t.eq_ignore_ascii_case(wanted))
                .collect();
            if matched.is_empty() {
                anyhow::bail!("unknown fuse type '{}'", wanted);
            }
            matched
        }
        None => store.fuse_types(),
    };

    for fuse_type in types {
        let ratings: Vec<String> = store
            .ratings(fuse_type)
            .iter()
            .map(|r| format!("{}", r))
            .collect();
        let mut manufacturers: Vec<&str> = store
            .curves()
            .iter()
            .filter(|c| c.selection().fuse_type.eq_ignore_ascii_case(fuse_type))
            .map(|c| c.selection().manufacturer.as_str())
            .collect();
        manufacturers.sort_unstable();
        manufacturers.dedup();

        println!("{} ({})", fuse_type, manufacturers.join(", "));
        println!("  ratings (A): {}", ratings.join(", "));
    }
    Ok(())
}
