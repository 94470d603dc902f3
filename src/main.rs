// Retirement Limits - CLI
// Import published facts, list them, and resolve limits for a person.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

use retirement_limits::{
    init_logger, load_limits_file, load_phase_outs_file, AccountType, FilingStatus, LimitQuery,
    LimitType, LimitsConfig, LimitsService, LoadReport, Money, PhaseOutAccountType, SqliteCatalog,
};

#[derive(Debug, Parser)]
#[command(name = "retirement-limits")]
#[command(about = "Retirement contribution limits with MAGI phase-out", version)]
struct Cli {
    /// Path to limits.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database (overrides database.path)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    verbose: bool,

    /// Print results as JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load published facts from CSV files
    Import {
        #[arg(long)]
        limits: Option<PathBuf>,

        #[arg(long = "phase-outs")]
        phase_outs: Option<PathBuf>,
    },

    /// List tax years with published limits
    Years,

    /// Show published facts for a year (optionally one account type)
    Limits {
        year: i32,
        account_type: Option<AccountType>,
    },

    /// Resolve the applicable limits for a person
    Resolve {
        #[arg(long)]
        year: i32,

        #[arg(long = "account-type")]
        account_type: AccountType,

        #[arg(long = "limit-type")]
        limit_type: Option<LimitType>,

        /// Age as of December 31 of the tax year
        #[arg(long)]
        age: Option<u32>,

        #[arg(long = "filing-status", requires = "magi")]
        filing_status: Option<FilingStatus>,

        #[arg(long, requires = "filing_status", allow_hyphen_values = true)]
        magi: Option<Money>,

        /// Explicit phase-out schedule, e.g. TRADITIONAL_IRA_SPOUSE_COVERED
        #[arg(long = "phase-out-type")]
        phase_out_type: Option<PhaseOutAccountType>,
    },

    /// Show the load log
    Publications,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = LimitsConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    init_logger(cli.verbose || config.logging.verbose, config.logging.json);

    let db_path = cli
        .db
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.database.path));
    let catalog = SqliteCatalog::open(&db_path)
        .with_context(|| format!("Failed to open database {:?}", db_path))?;

    match cli.command {
        Command::Import { limits, phase_outs } => {
            run_import(&catalog, limits, phase_outs)?
        }
        Command::Publications => run_publications(&catalog, cli.json)?,
        Command::Years => run_years(&LimitsService::new(catalog), cli.json)?,
        Command::Limits { year, account_type } => {
            run_limits(&LimitsService::new(catalog), year, account_type, cli.json)?
        }
        Command::Resolve {
            year,
            account_type,
            limit_type,
            age,
            filing_status,
            magi,
            phase_out_type,
        } => {
            let mut query = LimitQuery::new(year, account_type);
            query.limit_type = limit_type;
            query.age_at_year_end = age;
            query.phase_out_type = phase_out_type;
            if let (Some(status), Some(magi)) = (filing_status, magi) {
                query = query.income(status, magi);
            }
            run_resolve(&LimitsService::new(catalog), &query, cli.json)?
        }
    }

    Ok(())
}

fn run_import(
    catalog: &SqliteCatalog,
    limits: Option<PathBuf>,
    phase_outs: Option<PathBuf>,
) -> Result<()> {
    if limits.is_none() && phase_outs.is_none() {
        bail!("Nothing to import: pass --limits and/or --phase-outs");
    }

    println!("🗄️  Import - CSV → SQLite");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    if let Some(path) = limits {
        println!("\n📂 Loading contribution limits from {:?}...", path);
        let report = load_limits_file(catalog, &path)
            .with_context(|| format!("Failed to load {:?}", path))?;
        print_report(&report);
    }

    if let Some(path) = phase_outs {
        println!("\n📂 Loading phase-out ranges from {:?}...", path);
        let report = load_phase_outs_file(catalog, &path)
            .with_context(|| format!("Failed to load {:?}", path))?;
        print_report(&report);
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ Import complete");
    Ok(())
}

fn print_report(report: &LoadReport) {
    if report.already_loaded {
        println!("⏭️  Already loaded (fingerprint {}), skipped", &report.fingerprint[..12]);
    } else {
        println!("✓ {} {} rows stored", report.rows, report.kind.as_str());
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_publications(catalog: &SqliteCatalog, json: bool) -> Result<()> {
    let publications = catalog.with_connection(retirement_limits::db::get_publications)?;
    if json {
        return print_json(&publications);
    }

    if publications.is_empty() {
        println!("📭 Nothing loaded yet");
        return Ok(());
    }

    println!("📜 Load log");
    for p in publications {
        println!(
            "  {}  {:<10} {:>4} rows  {}  {}",
            p.loaded_at.format("%Y-%m-%d %H:%M"),
            p.kind,
            p.row_count,
            &p.fingerprint[..12],
            p.source_file
        );
    }
    Ok(())
}

fn run_years(service: &LimitsService<SqliteCatalog>, json: bool) -> Result<()> {
    let years = service.available_years()?;
    if json {
        return print_json(&years);
    }

    if years.is_empty() {
        println!("📭 No limits published yet. Run `import` first.");
        return Ok(());
    }

    println!("📅 Years with published limits:");
    for year in years {
        println!("  {}", year);
    }
    Ok(())
}

fn run_limits(
    service: &LimitsService<SqliteCatalog>,
    year: i32,
    account_type: Option<AccountType>,
    json: bool,
) -> Result<()> {
    match account_type {
        Some(account_type) => {
            let found = service.limits_by_year_and_account_type(year, account_type)?;
            if json {
                return print_json(&found);
            }
            let Some(found) = found else {
                println!("📭 No {} limits published for {}", account_type.display_name(), year);
                return Ok(());
            };

            println!("📊 {} limits for {}", found.account_type.display_name(), year);
            for limit in &found.limits {
                println!("  {:<32} {:>12}", limit.limit_type().display_name(), limit.amount());
            }
        }
        None => {
            let yearly = service.limits_by_year(year)?;
            if json {
                return print_json(&yearly);
            }
            let Some(yearly) = yearly else {
                println!("📭 No limits published for {}", year);
                return Ok(());
            };

            println!("📊 Contribution limits for {}", year);
            for limit in &yearly.contribution_limits {
                println!(
                    "  {:<24} {:<32} {:>12}",
                    limit.account_type().display_name(),
                    limit.limit_type().display_name(),
                    limit.amount()
                );
            }

            if !yearly.phase_out_ranges.is_empty() {
                println!("\n📉 Phase-out ranges");
                for range in &yearly.phase_out_ranges {
                    println!(
                        "  {:<36} {:<28} {:>12} → {:>12}",
                        range.account_type().display_name(),
                        range.filing_status().display_name(),
                        range.magi_start(),
                        range.magi_end()
                    );
                }
            }
        }
    }
    Ok(())
}

fn run_resolve(
    service: &LimitsService<SqliteCatalog>,
    query: &LimitQuery,
    json: bool,
) -> Result<()> {
    let resolution = service.resolve(query)?;
    if json {
        return print_json(&resolution);
    }
    let Some(resolution) = resolution else {
        println!(
            "📭 No matching {} limits published for {}",
            query.account_type.display_name(),
            query.year
        );
        return Ok(());
    };

    println!(
        "🧮 {} limits for {}",
        resolution.account_type.display_name(),
        resolution.year
    );
    if let Some(schedule) = resolution.phase_out_type {
        println!("   Phase-out schedule: {}", schedule.display_name());
    }

    for limit in &resolution.limits {
        if limit.amount == limit.base_amount {
            println!("  {:<32} {:>12}", limit.limit_type.display_name(), limit.amount);
        } else {
            println!(
                "  {:<32} {:>12}  (base {}, phased out {})",
                limit.limit_type.display_name(),
                limit.amount,
                limit.base_amount,
                limit.phase_out_percentage
            );
        }
    }

    if resolution.limits.len() > 1 {
        println!("  {:<32} {:>12}", "Total", resolution.total());
    }

    for limit_type in &resolution.ineligible {
        println!("  🚫 {:<29} not eligible at this age", limit_type.display_name());
    }
    Ok(())
}
