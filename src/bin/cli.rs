use clap::{Parser, Subcommand};
use research_kpi::auth::hash_password;
use research_kpi::cache::CachedStore;
use research_kpi::gap::GapPlan;
use research_kpi::kpi::{GroupKind, KpiRow};
use research_kpi::{Dashboard, KpiError, Settings, WorkbookStore, YearFilter, report};
use std::path::{Path, PathBuf};

/// Command-line access to the research KPI workbook
#[derive(Parser, Debug)]
#[command(name = "kpi-cli", version, about)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, default_value = "kpi.toml", env = "KPI_CONFIG", global = true)]
    config: PathBuf,

    /// Override the workbook path
    #[arg(short, long, env = "KPI_WORKBOOK", global = true)]
    workbook: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the program and faculty KPI tables
    Report {
        /// Buddhist-era year, or "All"
        #[arg(long)]
        year: Option<String>,
    },
    /// Papers per tier a group needs to reach KPI 5.00
    Gap {
        /// programs or faculties
        kind: String,
        name: String,
        #[arg(long)]
        year: Option<String>,
    },
    /// List research rows whose author is not on the roster
    Mismatches,
    /// Write an empty workbook with the configured sheets and headers
    Init { path: PathBuf },
    /// Export KPI tables to .xlsx, or one table to .csv
    Export {
        path: PathBuf,
        #[arg(long)]
        year: Option<String>,
        /// Table written to a .csv file
        #[arg(long, default_value = "programs")]
        kind: String,
    },
    /// Print an Argon2 hash for `auth.admin_password_hash`
    HashPassword { password: String },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> research_kpi::Result<()> {
    let mut settings = Settings::load(&cli.config)?;
    if let Some(workbook) = cli.workbook {
        settings.store.workbook = workbook;
    }

    match cli.command {
        Command::Report { year } => {
            let dashboard = load_dashboard(&settings, year.as_deref())?;
            println!(
                "{} publications, total score {:.2}, {} staff, {:.2} per staff",
                dashboard.summary.publications,
                dashboard.summary.total_score,
                dashboard.summary.staff,
                dashboard.summary.average_per_staff
            );
            print_table(GroupKind::Program, &dashboard.programs);
            print_table(GroupKind::Faculty, &dashboard.faculties);
        }
        Command::Gap { kind, name, year } => {
            let kind = parse_kind(&kind)?;
            let dashboard = load_dashboard(&settings, year.as_deref())?;
            let (row, plan) = dashboard
                .gap(kind, &name)
                .ok_or_else(|| KpiError::NotFound(format!("{} `{}`", kind, name)))?;
            println!(
                "{}: KPI {:.2}, score {:.2} of {:.2} required",
                row.group,
                row.kpi,
                row.total_score,
                plan.required_total()
            );
            match plan {
                GapPlan::Achieved { .. } => println!("Goal achieved"),
                GapPlan::Needed { gap, papers, .. } => {
                    println!("Needs {:.2} more score, any one of:", gap);
                    for p in papers {
                        println!("  {:>3} x {} ({:.1})", p.papers, p.label, p.score);
                    }
                }
            }
        }
        Command::Mismatches => {
            let dashboard = load_dashboard(&settings, None)?;
            if dashboard.mismatches.is_empty() {
                println!("Every author is on the roster");
            }
            for p in &dashboard.mismatches {
                println!("{}\t{}\t{}", p.author_name, p.year, p.title);
            }
        }
        Command::Init { path } => {
            settings.store.workbook = path;
            let store = WorkbookStore::initialize(&settings.store, &[])?;
            println!("Created {}", store.path().display());
        }
        Command::Export { path, year, kind } => {
            let dashboard = load_dashboard(&settings, year.as_deref())?;
            export(&dashboard, &path, &kind)?;
            println!("Wrote {}", path.display());
        }
        Command::HashPassword { password } => {
            println!("{}", hash_password(&password)?);
        }
    }

    Ok(())
}

fn load_dashboard(settings: &Settings, year: Option<&str>) -> research_kpi::Result<Dashboard> {
    let store = WorkbookStore::open(&settings.store)?;
    let mut cached = CachedStore::new(store, settings.store.cache_ttl());
    let snapshot = cached.snapshot()?;
    Ok(Dashboard::build(
        &snapshot.staff,
        &snapshot.publications,
        YearFilter::parse(year),
        &settings.kpi,
    ))
}

fn parse_kind(kind: &str) -> research_kpi::Result<GroupKind> {
    GroupKind::parse(kind).ok_or_else(|| {
        KpiError::Validation(format!("expected programs or faculties, got `{}`", kind))
    })
}

fn print_table(kind: GroupKind, rows: &[KpiRow]) {
    println!();
    println!(
        "{:<40} {:>5} {:>6} {:>5} {:>8} {:>6}",
        kind.to_string(),
        "staff",
        "target",
        "pubs",
        "score",
        "kpi"
    );
    for row in rows {
        println!(
            "{:<40} {:>5} {:>6} {:>5} {:>8.2} {:>6.2}",
            row.group, row.headcount, row.target, row.publications, row.total_score, row.kpi
        );
    }
}

fn export(dashboard: &Dashboard, path: &Path, kind: &str) -> research_kpi::Result<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("xlsx") => std::fs::write(path, report::to_xlsx(dashboard)?)?,
        Some("csv") => {
            let kind = parse_kind(kind)?;
            std::fs::write(path, report::to_csv(dashboard.rows(kind)))?
        }
        _ => {
            return Err(KpiError::Validation(format!(
                "{}: expected a .xlsx or .csv path",
                path.display()
            )));
        }
    }
    Ok(())
}
