// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use health_panel::validation::describe;
use health_panel::{
    load_csv, validate_input, write_csv, Config, Dashboard, Habits, HealthInput, IdGenerator,
    Record, RecordFeed, Sex, YesNo,
};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "health-panel", about = "Painel de Saúde IMC - BMI and risk tracking")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a new entry
    Submit {
        #[arg(long, default_value = "Masculino")]
        sexo: Sex,
        #[arg(long, default_value_t = 25)]
        idade: u32,
        #[arg(long, default_value_t = 70.0)]
        peso: f64,
        #[arg(long, default_value_t = 1.75)]
        altura: f64,
        #[arg(long, default_value = "Não")]
        diabetes: YesNo,
        #[arg(long, default_value = "Não")]
        hipertensao: YesNo,
        #[arg(long, default_value = "Moderado")]
        habitos: Habits,
    },

    /// List records, newest first
    List {
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Print the aggregated views as JSON
    Stats,

    /// Import entries from a CSV file (derived columns are recomputed)
    Import { csv: PathBuf },

    /// Export every record to a CSV file
    Export { csv: PathBuf },

    /// Interactive terminal dashboard (default)
    Dashboard,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    let store = config.open_store()?;
    info!(backend = store.name(), "Store opened");
    let feed = RecordFeed::new(store, config.max_records);

    match cli.command.unwrap_or(Commands::Dashboard) {
        Commands::Submit {
            sexo,
            idade,
            peso,
            altura,
            diabetes,
            hipertensao,
            habitos,
        } => run_submit(
            &feed,
            HealthInput {
                sex: sexo,
                age: idade,
                weight: peso,
                height: altura,
                diabetes,
                hypertension: hipertensao,
                habits: habitos,
            },
        )?,
        Commands::List { limit } => run_list(&feed, limit.unwrap_or(config.max_records))?,
        Commands::Stats => run_stats(&feed, config.max_records)?,
        Commands::Import { csv } => run_import(&feed, &csv)?,
        Commands::Export { csv } => run_export(&feed, &csv, config.max_records)?,
        Commands::Dashboard => run_ui_mode(&feed)?,
    }

    Ok(())
}

fn run_submit(feed: &RecordFeed, input: HealthInput) -> Result<()> {
    if let Err(errors) = validate_input(&input) {
        bail!("Invalid entry: {}", describe(&errors));
    }

    let record = Record::new(IdGenerator::new().next_id(), &input);
    let total = feed.submit(&record).context("Failed to save entry")?;

    println!("✓ Dados salvos com sucesso!");
    println!("  IMC:       {:.2}", record.bmi);
    println!("  Categoria: {}", record.category);
    println!("  Risco:     {}", record.risk);
    if let Some(total) = total {
        println!("  Total de registros: {}", total);
    }

    Ok(())
}

fn run_list(feed: &RecordFeed, limit: usize) -> Result<()> {
    let records = feed.store().fetch_all(limit).context("Failed to load records")?;

    println!(
        "{:<15} {:<10} {:>5} {:>6} {:>6} {:>6}  {:<15} {:<8}",
        "ID", "Sexo", "Idade", "Peso", "Altura", "IMC", "Categoria", "Risco"
    );
    for r in &records {
        println!(
            "{:<15} {:<10} {:>5} {:>6.1} {:>6.2} {:>6.2}  {:<15} {:<8}",
            r.id, r.sex, r.age, r.weight, r.height, r.bmi, r.category, r.risk
        );
    }
    println!("\n{} registro(s)", records.len());

    Ok(())
}

fn run_stats(feed: &RecordFeed, limit: usize) -> Result<()> {
    let records = feed.store().fetch_all(limit).context("Failed to load records")?;
    let dashboard = Dashboard::from_records(&records);
    println!("{}", serde_json::to_string_pretty(&dashboard)?);
    Ok(())
}

fn run_import(feed: &RecordFeed, csv: &Path) -> Result<()> {
    println!("📂 Loading CSV...");
    let report = load_csv(csv, &IdGenerator::new())?;
    println!("✓ Loaded {} entries from CSV", report.records.len());

    for (line, reason) in &report.rejected {
        println!("  ✗ line {}: {}", line, reason);
    }

    println!("\n💾 Saving entries...");
    let mut saved = 0;
    for record in &report.records {
        feed.store()
            .submit(record)
            .with_context(|| format!("Failed to save entry {}", record.id))?;
        saved += 1;
    }
    println!("✓ Saved {} entries ({} rejected)", saved, report.rejected.len());

    Ok(())
}

fn run_export(feed: &RecordFeed, csv: &Path, limit: usize) -> Result<()> {
    let records = feed.store().fetch_all(limit).context("Failed to load records")?;
    write_csv(csv, &records)?;
    println!("✓ Exported {} records to {}", records.len(), csv.display());
    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(feed: &RecordFeed) -> Result<()> {
    ui::run_ui(feed)?;
    println!("\n✅ UI closed successfully");
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_feed: &RecordFeed) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the web API: cargo run --bin health-server --features server");
    std::process::exit(1);
}
