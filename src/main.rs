mod classify;
mod error;
mod model;
mod parser;
mod settings;
mod stats;
mod utils;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use classify::{status_badge, Tier};
use model::MunicipalityType;
use parser::provisions::DecisionScope;
use settings::{Overrides, Settings};
use utils::{format_date, format_date_short, format_duration, truncate};

#[derive(Parser)]
#[command(name = "adu_compliance", about = "ADU bylaw compliance extraction and stats")]
struct Cli {
    /// Settings file (default: ./compliance.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Characters scanned past the last provision header when looking for a decision
    #[arg(long, global = true)]
    lookahead: Option<usize>,
    /// How far a provision's decision lookup may reach
    #[arg(long, global = true, value_enum)]
    scope: Option<ScopeArg>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ScopeArg {
    Balanced,
    Lookahead,
}

impl From<ScopeArg> for DecisionScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Balanced => DecisionScope::Balanced,
            ScopeArg::Lookahead => DecisionScope::Lookahead,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Town,
    City,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a compliance data file
    Extract {
        file: PathBuf,
        /// Print the full extraction as JSON
        #[arg(long)]
        json: bool,
    },
    /// Aggregate statistics (markdown)
    Stats {
        file: PathBuf,
        /// Rows in the frequency table
        #[arg(short = 'n', long, default_value = "10")]
        top: usize,
    },
    /// Communities overview table
    Overview {
        file: PathBuf,
        /// Filter by county
        #[arg(short, long)]
        county: Option<String>,
        /// Filter by municipality type
        #[arg(short, long, value_enum)]
        kind: Option<KindArg>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// One community in detail
    Show { file: PathBuf, slug: String },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let overrides = Overrides {
        lookahead_chars: cli.lookahead,
        decision_scope: cli.scope.map(DecisionScope::from),
    };
    let settings = Settings::load(cli.config.as_deref(), overrides)
        .context("loading settings")?;
    info!(settings = ?settings, "settings loaded");
    let opts = settings.options();

    match cli.command {
        Commands::Extract { file, json } => {
            let out = parser::load(&file, &opts)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                let doc = &out.document;
                println!(
                    "Extracted {} communities, {} provisions, {} narratives, {} sources.",
                    doc.records.len(),
                    doc.provision_count(),
                    doc.narratives.len(),
                    doc.sources.len(),
                );
                for tier in Tier::ALL {
                    println!(
                        "  {:<22} {:<20} {}",
                        tier.label(),
                        tier.key(),
                        out.stats.tiers.get(tier)
                    );
                }
                if !doc.narratives.is_empty() {
                    println!("\n--- Narratives ---");
                    for n in &doc.narratives {
                        println!("  {}: {} [{}]", n.slug, truncate(&n.title, 60), n.tag.label());
                    }
                }
            }
        }
        Commands::Stats { file, top } => {
            let out = parser::load(&file, &opts)?;
            print!("{}", stats::render_markdown(&out.stats, top));
        }
        Commands::Overview {
            file,
            county,
            kind,
            limit,
        } => {
            let out = parser::load(&file, &opts)?;
            let kind = kind.map(|k| match k {
                KindArg::Town => MunicipalityType::Town,
                KindArg::City => MunicipalityType::City,
            });
            let rows: Vec<_> = out
                .document
                .records
                .iter()
                .filter(|r| {
                    county
                        .as_deref()
                        .map_or(true, |c| r.county.eq_ignore_ascii_case(c))
                })
                .filter(|r| kind.map_or(true, |k| r.municipality_type == k))
                .take(limit)
                .collect();
            if rows.is_empty() {
                println!("No communities found.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<20} | {:<12} | {:<5} | {:>8} | {:>4} | {:>4} | {:>4} | {:>4} | {:<8} | {:<24}",
                "#", "Community", "County", "Type", "Pop.", "AG", "Inc", "Rev", "OK", "Reviewed", "Status"
            );
            println!("{}", "-".repeat(121));

            for (i, r) in rows.iter().enumerate() {
                let counts = classify::StatusCounts::of(&r.provisions);
                let disapproved = r
                    .provisions
                    .iter()
                    .filter(|p| p.tier == Tier::Disapproved)
                    .count();
                println!(
                    "{:>3} | {:<20} | {:<12} | {:<5} | {:>8} | {:>4} | {:>4} | {:>4} | {:>4} | {:<8} | {:<24}",
                    i + 1,
                    truncate(&r.name, 20),
                    truncate(&r.county, 12),
                    r.municipality_type.as_str(),
                    r.population,
                    disapproved,
                    counts.inconsistent,
                    counts.review,
                    counts.compliant,
                    format_date_short(&r.last_reviewed),
                    status_badge(r).label,
                );
            }

            println!("\n{} communities", rows.len());
        }
        Commands::Show { file, slug } => {
            let out = parser::load(&file, &opts)?;
            let Some(r) = out.document.find(&slug) else {
                bail!("no community with slug '{}'", slug);
            };

            println!("{} ({}, {} County)", r.name, r.municipality_type.as_str(), r.county);
            let badge = status_badge(r);
            println!("Status:        {} ({:?})", badge.label, badge.tone);
            println!("Population:    {}", r.population);
            println!("Last reviewed: {}", format_date(&r.last_reviewed));
            if r.is_exempt {
                println!("Exempt from Chapter 40A");
            }
            if let Some(date) = &r.ag_decision_date {
                println!("AG decision:   {}", format_date(date));
            }
            println!(
                "Permits:       {} submitted, {} approved, {} denied, {} pending ({}%)",
                r.permits.submitted,
                r.permits.approved,
                r.permits.denied,
                r.permits.pending,
                r.permits.approval_rate,
            );
            println!("\n{}\n", r.bottom_line_or_generated());

            for tier in Tier::ALL {
                let group: Vec<_> = r.provisions.iter().filter(|p| p.tier == tier).collect();
                if group.is_empty() {
                    continue;
                }
                println!("--- {} ({}) ---", tier.label(), group.len());
                for p in group {
                    println!("  [{}] {} ({})", p.id, p.label, p.category);
                    if let Some(decision) = &p.decision {
                        println!("      {}", truncate(decision, 100));
                    }
                }
            }
        }
    }

    info!(elapsed = %format_duration(t0.elapsed()), "done");
    Ok(())
}
