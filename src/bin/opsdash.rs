use clap::{Parser, Subcommand};
use serde_json::Value;

use opsdash::date_util::{format_date, parse_date, parse_timestamp};
use opsdash::metrics::{self, MigrationPerformance};
use opsdash::model::MigrationStatus;
use opsdash::{ImportResource, MigrationQuery, OpsDash, Period, Resource};

#[derive(Parser)]
#[command(name = "opsdash", about = "Technical-support operations warehouse CLI")]
struct Cli {
    /// Database path (default: ~/.opsdash/opsdash.db)
    #[arg(long)]
    db: Option<String>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show warehouse status
    Status,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// List records of a resource
    List {
        /// agents, campuses, sources, scopes, materials, holidays, slas,
        /// training, migrations, tickets, print-results, impl-prints
        resource: Resource,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one record as JSON
    Get { resource: Resource, id: i64 },
    /// Create a record from a JSON payload
    Add {
        resource: Resource,
        /// JSON object (a migration payload with `items` creates a batch)
        #[arg(long)]
        data: String,
    },
    /// Replace a record from a JSON payload
    Update {
        resource: Resource,
        id: i64,
        #[arg(long)]
        data: String,
    },
    /// Delete a record
    Delete { resource: Resource, id: i64 },
    /// Delete every migration of a campus
    ClearMigrations { campus_id: i64 },
    /// Import a JSON array of records from a file
    Import {
        /// campuses, holidays, slas or training
        resource: ImportResource,
        file: std::path::PathBuf,
    },
    /// Ticket dashboard: totals, weekly trend, composition and FRT trend
    Dashboard {
        /// Evaluate as of this timestamp (default: now)
        #[arg(long)]
        as_of: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Onboarding progress of active campuses
    Onboarding {
        #[arg(long)]
        json: bool,
    },
    /// Migration deadline performance over a period
    Performance {
        /// Period (e.g. 2025, 2025-Q1, 2025-03, 2025-W10, 30d, mtd, qtd, ytd)
        #[arg(long, default_value = "mtd")]
        period: String,
        #[arg(long)]
        json: bool,
    },
    /// Query migrations with filters
    Migrations {
        /// Campus name substring
        #[arg(long)]
        campus_name: Option<String>,
        #[arg(long)]
        campus: Option<i64>,
        /// Job type (SLA id)
        #[arg(long)]
        sla: Option<i64>,
        /// Migration condition (Ke-1 .. Ke-9)
        #[arg(long)]
        condition: Option<String>,
        #[arg(long)]
        specialist: Option<i64>,
        #[arg(long)]
        status: Option<MigrationStatus>,
        /// Deadline date (YYYY-MM-DD)
        #[arg(long)]
        deadline: Option<String>,
        /// on_time, fast, late or none
        #[arg(long)]
        performance: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        json: bool,
        #[arg(long)]
        csv: bool,
    },
    /// Project the deadline an SLA gives a job starting today
    Deadline {
        sla_id: i64,
        /// Start date (YYYY-MM-DD, default: today)
        #[arg(long)]
        from: Option<String>,
    },
    /// Compute FRT between two timestamps
    Frt { created: String, responded: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
    /// List all config values
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let dw = match &cli.db {
        Some(path) => OpsDash::open_at(path).await?,
        None => OpsDash::open().await?,
    };

    match cli.command {
        Commands::Status => print_status(&dw).await?,
        Commands::Config { action } => handle_config(&dw, action).await?,
        Commands::List { resource, json } => {
            let rows = dw.list_json(resource).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print_rows(resource, &rows);
            }
        }
        Commands::Get { resource, id } => {
            let row = dw.get_json(resource, id).await?;
            println!("{}", serde_json::to_string_pretty(&row)?);
        }
        Commands::Add { resource, data } => {
            let ids = dw.create_json(resource, &data).await?;
            for id in ids {
                println!("Created {resource} {id}");
            }
        }
        Commands::Update { resource, id, data } => {
            dw.update_json(resource, id, &data).await?;
            println!("Updated {resource} {id}");
        }
        Commands::Delete { resource, id } => {
            dw.delete(resource, id).await?;
            println!("Deleted {resource} {id}");
        }
        Commands::ClearMigrations { campus_id } => {
            let n = dw.delete_campus_migrations(campus_id).await?;
            println!("Deleted {n} migrations of campus {campus_id}");
        }
        Commands::Import { resource, file } => {
            let text = std::fs::read_to_string(&file)?;
            let report = dw.import(resource, &text).await?;
            println!(
                "Imported {} {resource}, {} rejected",
                report.imported, report.failed
            );
            for e in &report.errors {
                eprintln!("  {e}");
            }
        }
        Commands::Dashboard { as_of, json } => {
            let as_of = match as_of {
                Some(s) => parse_timestamp(&s)
                    .ok_or_else(|| anyhow::anyhow!("invalid timestamp: {s}"))?,
                None => chrono::Local::now().naive_local(),
            };
            let report = dw.dashboard(as_of).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_dashboard(&report);
            }
        }
        Commands::Onboarding { json } => {
            let rows = dw.onboarding().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print_onboarding(&rows);
            }
        }
        Commands::Performance { period, json } => {
            let today = chrono::Local::now().date_naive();
            let period = Period::parse(&period, today)?;
            let report = dw.migration_performance(period).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_performance(&report);
            }
        }
        Commands::Migrations {
            campus_name,
            campus,
            sla,
            condition,
            specialist,
            status,
            deadline,
            performance,
            limit,
            json,
            csv,
        } => {
            let mut q = MigrationQuery::new();
            if let Some(ref name) = campus_name {
                q = q.campus_name(name);
            }
            if let Some(id) = campus {
                q = q.campus(id);
            }
            if let Some(id) = sla {
                q = q.sla(id);
            }
            if let Some(ref c) = condition {
                q = q.condition(c);
            }
            if let Some(id) = specialist {
                q = q.specialist(id);
            }
            if let Some(s) = status {
                q = q.status(s);
            }
            if let Some(ref d) = deadline {
                let date = parse_date(d).ok_or_else(|| anyhow::anyhow!("invalid date: {d}"))?;
                q = q.deadline(date);
            }
            if let Some(ref p) = performance {
                let p = MigrationPerformance::parse(p)
                    .ok_or_else(|| anyhow::anyhow!("invalid performance: {p}"))?;
                q = q.performance(p);
            }
            if let Some(n) = limit {
                q = q.limit(n);
            }

            if json {
                println!("{}", q.to_json(dw.db()).await?);
            } else if csv {
                print!("{}", q.to_csv(dw.db()).await?);
            } else {
                let rows = q.rows(dw.db()).await?;
                for r in &rows {
                    println!(
                        "{:>5}  {:<30} {:<24} {:<14} {:>10}  {}",
                        r.id,
                        truncate(&r.campus_name, 30),
                        truncate(r.job_name.as_deref().unwrap_or("-"), 24),
                        r.status.as_str(),
                        r.deadline.as_ref().map(format_date).unwrap_or_else(|| "-".into()),
                        r.performance.as_str(),
                    );
                }
                println!("\n{} migrations", rows.len());
            }
        }
        Commands::Deadline { sla_id, from } => {
            let start = match from {
                Some(s) => parse_date(&s).ok_or_else(|| anyhow::anyhow!("invalid date: {s}"))?,
                None => chrono::Local::now().date_naive(),
            };
            let deadline = dw.project_sla_deadline(sla_id, start).await?;
            println!("{}", format_date(&deadline));
        }
        Commands::Frt { created, responded } => {
            let created_at = parse_timestamp(&created)
                .ok_or_else(|| anyhow::anyhow!("invalid timestamp: {created}"))?;
            let responded_at = parse_timestamp(&responded)
                .ok_or_else(|| anyhow::anyhow!("invalid timestamp: {responded}"))?;
            let frt = metrics::compute_frt(Some(created_at), Some(responded_at));
            let target = dw.frt_target_minutes().await?;
            println!("FRT:     {} minutes", frt.unwrap_or_default());
            println!("Target:  {}", metrics::classify_frt_target(frt, target));
            println!(
                "Created: {}",
                metrics::classify_working_hours(&created_at).label()
            );
        }
    }

    Ok(())
}

async fn print_status(dw: &OpsDash) -> anyhow::Result<()> {
    let counts = dw.status().await?;
    println!("Warehouse Status");
    for (table, count) in counts {
        println!("  {:<26} {count}", format!("{table}:"));
    }
    Ok(())
}

async fn handle_config(dw: &OpsDash, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => match dw.config_get(&key).await? {
            Some(v) => println!("{key} = {v}"),
            None => println!("{key} is not set"),
        },
        ConfigAction::Set { key, value } => {
            dw.config_set(&key, &value).await?;
            println!("Config updated.");
        }
        ConfigAction::List => {
            let items = dw.config_list().await?;
            if items.is_empty() {
                println!("No configuration set.");
            } else {
                for (k, v) in items {
                    println!("{k} = {v}");
                }
            }
        }
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

/// One line per record: id plus the most descriptive field present.
fn print_rows(resource: Resource, rows: &Value) {
    let Some(rows) = rows.as_array() else {
        return;
    };
    for row in rows {
        let label = ["name", "campus_name", "question", "type"]
            .iter()
            .find_map(|k| row.get(*k).and_then(Value::as_str))
            .unwrap_or("-");
        let status = row.get("status").and_then(Value::as_str).unwrap_or("");
        let id = row.get("id").and_then(Value::as_i64).unwrap_or_default();
        println!("{id:>5}  {:<40} {status}", truncate(label, 40));
    }
    println!("\n{} {resource}", rows.len());
}

fn print_dashboard(report: &opsdash::DashboardReport) {
    let s = &report.stats;
    println!("Tickets");
    println!("  Total:     {}", s.total);
    println!("  Completed: {}", s.completed);
    println!("  Active:    {}", s.active);
    println!("  New today: {}", s.new_today);

    println!("\nLast 7 days");
    for day in &report.trend {
        println!(
            "  {} {}  {:>4} new  {:>4} done",
            day.name,
            format_date(&day.date),
            day.tiket,
            day.selesai
        );
    }

    println!("\nComposition");
    for c in &report.composition.cs {
        println!("  tickets    {:<16} {}", c.name, c.value);
    }
    for c in &report.composition.migration {
        println!("  migrations {:<16} {}", c.name, c.value);
    }

    println!("\nAverage FRT");
    for m in &report.frt_trend {
        println!("  {:<9} {:>6.1} min  ({} tickets)", m.month, m.avg_frt, m.ticket_count);
    }
    if let Some(ref change) = report.frt_change {
        let verdict = if change.is_improvement() { "faster" } else { "slower" };
        println!("  {:.1}% {verdict} than the month before", change.percentage);
    }
}

fn print_onboarding(rows: &[opsdash::OnboardingRow]) {
    println!(
        "{:<30} {:>10} {:>6} {:>6} {:>10}  Status",
        "Campus", "Deployed", "Impl", "Train", "Trained"
    );
    for r in rows {
        println!(
            "{:<30} {:>10} {:>5}% {:>5}% {:>10}  {}",
            truncate(&r.name, 30),
            r.deployment_date.as_ref().map(format_date).unwrap_or_else(|| "-".into()),
            r.impl_progress,
            r.train_progress,
            r.train_finish_date.as_ref().map(format_date).unwrap_or_else(|| "-".into()),
            r.onboarding_status,
        );
    }
}

fn print_performance(report: &opsdash::PerformanceReport) {
    for s in [&report.current, &report.previous] {
        println!("Period: {}", s.period);
        println!("  Closed:        {}", s.total);
        println!("  On time:       {}", s.on_time);
        println!("  Fast:          {}", s.fast);
        println!("  Late:          {}", s.late);
        println!("  No deadline:   {}", s.unclassified);
        if let Some(rate) = s.on_time_rate {
            println!("  On-time rate:  {rate:.1}%");
        }
        if let Some(days) = s.avg_late_days {
            println!("  Avg late days: {days:.1}");
        }
    }
    if let Some(delta) = report.on_time_rate_change {
        let arrow = match delta.direction {
            metrics::TrendDirection::Up => "up",
            metrics::TrendDirection::Down => "down",
        };
        println!("On-time rate {arrow} {:.1}%", delta.percentage);
    }
}
