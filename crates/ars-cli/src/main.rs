//! Risk Sentinel CLI
//!
//! Command-line interface for the blind-spot analysis pipeline: run gap
//! analysis over collector exports, inspect the recommendation queue, and
//! check compliance frameworks.

use anyhow::{bail, Context, Result};
use ars_analysis::gap::{reference, BlindSpotMetric, ScopeFilter};
use ars_analysis::pipeline::{Pipeline, PipelineOutcome};
use ars_analysis::recommend::RecommendationEngine;
use ars_analysis::classify::RuleBasedStrategy;
use ars_compliance::{
    ComplianceChecker, ComplianceFramework, ComplianceSummary, EvidencePackWriter, FindingStatus,
    RiskProfile,
};
use ars_core::orchestrator::Orchestrator;
use ars_core::recommendation::{Priority, Recommendation};
use ars_core::registry::AgentRegistry;
use ars_observability::{init_logging_with_config, LoggingConfig};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

mod config;
mod ingest;

use config::AppConfig;

#[derive(Parser)]
#[command(name = "risk-sentinel")]
#[command(version)]
#[command(about = "Blind-spot analysis for AI risk documentation", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Emit machine-readable JSON instead of tables
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run gap analysis against the built-in reference distribution
    Demo,
    /// Run the full pipeline over a collector export file
    Analyze {
        /// Statements file (JSON or YAML array of ingest records)
        #[arg(short, long)]
        input: PathBuf,
        /// Restrict the analysis scope to one model type
        #[arg(long)]
        model_type: Option<String>,
    },
    /// Check a subject against a compliance framework
    Compliance {
        /// Statements file (JSON or YAML array of ingest records)
        #[arg(short, long)]
        input: PathBuf,
        /// Subject model id the statements describe
        #[arg(short, long)]
        subject: String,
        /// Framework: eu_ai_act, nist_ai_rmf, or a YAML file path
        #[arg(short, long, default_value = "eu_ai_act")]
        framework: String,
        /// Export evidence packs into this directory
        #[arg(long)]
        export_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    let logging = if config.json_logs {
        LoggingConfig::production()
    } else {
        LoggingConfig::default()
    };
    init_logging_with_config(logging);

    match cli.command {
        Commands::Demo => run_demo(cli.json),
        Commands::Analyze { input, model_type } => {
            run_analyze(&config, input, model_type, cli.json).await
        }
        Commands::Compliance {
            input,
            subject,
            framework,
            export_dir,
        } => run_compliance(&config, input, subject, &framework, export_dir, cli.json).await,
    }
}

fn run_demo(json: bool) -> Result<()> {
    let metrics = reference::reference_metrics();
    let recommendations = demo_recommendations(&metrics);

    if json {
        let value = serde_json::json!({
            "blind_spot_index": { "by_category": metrics },
            "recommendations": recommendations,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{}", "Reference gap analysis".bold());
    print_metric_table(&metrics);
    println!();
    print_recommendations(&recommendations);
    Ok(())
}

fn demo_recommendations(metrics: &[BlindSpotMetric]) -> Vec<Recommendation> {
    use ars_analysis::gap::BlindSpotReport;
    use chrono::Utc;

    let report = BlindSpotReport {
        run_at: Utc::now(),
        scope: ScopeFilter::default(),
        global_bsi: 0.0,
        by_category: metrics.to_vec(),
        high_risk: vec![],
        total_documented: 0,
        total_incidents: 0,
    };
    RecommendationEngine::default().recommend(&report)
}

async fn run_analyze(
    config: &AppConfig,
    input: PathBuf,
    model_type: Option<String>,
    json: bool,
) -> Result<()> {
    let statements = ingest::load_statements(&input)?;
    let scope = ScopeFilter {
        model_type,
        ..ScopeFilter::default()
    };
    let pipeline = Pipeline::new(
        Arc::new(RuleBasedStrategy::with_default_rules()),
        config.pipeline.clone(),
    );
    let mut registry = AgentRegistry::new();
    let outcome = pipeline
        .run(statements, &scope, &mut registry)
        .await
        .context("Analysis run aborted")?;

    // Every recommendation becomes a proposed action awaiting human
    // review; nothing is applied from here.
    let orchestrator = Orchestrator::new(config.orchestrator.clone());
    for recommendation in &outcome.snapshot.recommendations {
        orchestrator.propose(recommendation.clone()).await;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome.snapshot)?);
        return Ok(());
    }

    print_outcome(&outcome);
    let pending = orchestrator.pending_review().await;
    println!();
    println!(
        "{} {} action(s) enqueued for human review",
        "→".cyan(),
        pending.len()
    );
    for action in pending {
        println!(
            "  {} [{}] {}",
            action.id.to_string().dimmed(),
            priority_colored(action.recommendation.priority),
            action.recommendation.category
        );
    }
    Ok(())
}

async fn run_compliance(
    config: &AppConfig,
    input: PathBuf,
    subject: String,
    framework_arg: &str,
    export_dir: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let framework = resolve_framework(framework_arg)?;
    let statements = ingest::load_statements(&input)?;
    let pipeline = Pipeline::new(
        Arc::new(RuleBasedStrategy::with_default_rules()),
        config.pipeline.clone(),
    );
    let mut registry = AgentRegistry::new();
    let outcome = pipeline
        .run(statements, &ScopeFilter::default(), &mut registry)
        .await
        .context("Analysis run aborted")?;

    let profile = RiskProfile::from_report(&subject, &outcome.report, &outcome.entities);
    let findings = ComplianceChecker::new().check(&profile, &framework);
    let summary = ComplianceSummary::from_findings(&findings);

    if let Some(dir) = export_dir {
        let writer = EvidencePackWriter::new(dir);
        for finding in &findings {
            let pack = writer.export(finding, &outcome.entities, &framework)?;
            println!("{} {}", "exported".green(), pack.display());
        }
    }

    if json {
        let value = serde_json::json!({
            "subject": subject,
            "framework": framework.framework_id,
            "version": framework.version,
            "findings": findings,
            "summary": summary,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!(
        "{} {} (rule set {})",
        "Compliance check:".bold(),
        framework.framework_id,
        framework.version
    );
    for finding in &findings {
        let status = match finding.status {
            FindingStatus::Pass => "PASS".green(),
            FindingStatus::Fail => "FAIL".red(),
            FindingStatus::InsufficientEvidence => "INSUFFICIENT EVIDENCE".yellow(),
        };
        println!(
            "  {:<14} {} ({} evidence ref(s))",
            finding.rule_id,
            status,
            finding.evidence.len()
        );
    }
    println!(
        "\n{} passed, {} failed, {} not evaluable",
        summary.passed.to_string().green(),
        summary.failed.to_string().red(),
        summary.insufficient_evidence.to_string().yellow()
    );
    Ok(())
}

fn resolve_framework(arg: &str) -> Result<ComplianceFramework> {
    match arg {
        "eu_ai_act" => Ok(ComplianceFramework::builtin_eu_ai_act()),
        "nist_ai_rmf" => Ok(ComplianceFramework::builtin_nist_ai_rmf()),
        path => {
            let path = PathBuf::from(path);
            if !path.exists() {
                bail!("Unknown framework {path:?} (expected eu_ai_act, nist_ai_rmf, or a YAML file)");
            }
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read framework file: {}", path.display()))?;
            Ok(ComplianceFramework::from_yaml(&contents)?)
        }
    }
}

fn print_outcome(outcome: &PipelineOutcome) {
    println!(
        "{} {:.3}",
        "Global Blind Spot Index:".bold(),
        outcome.report.global_bsi
    );
    println!(
        "{} documentation entities, {} incident entities",
        outcome.report.total_documented, outcome.report.total_incidents
    );
    if !outcome.review_queue.is_empty() {
        println!(
            "{} {} statement(s) need manual classification review",
            "!".yellow(),
            outcome.review_queue.len()
        );
    }
    if !outcome.near_misses.is_empty() {
        println!(
            "{} {} dedup near miss(es) logged for audit",
            "!".yellow(),
            outcome.near_misses.len()
        );
    }
    println!();
    print_metric_table(&outcome.report.by_category);
    println!();
    print_recommendations(&outcome.snapshot.recommendations);
}

fn print_metric_table(metrics: &[BlindSpotMetric]) {
    println!(
        "{:<45} {:>10} {:>10} {:>7}",
        "Category".bold(),
        "Doc %".bold(),
        "Inc %".bold(),
        "BSI".bold()
    );
    for metric in metrics {
        let bsi = metric.effective_bsi();
        let bsi_text = format!("{bsi:.3}");
        let bsi_colored = if bsi > 0.5 {
            bsi_text.red()
        } else if bsi > 0.3 {
            bsi_text.yellow()
        } else {
            bsi_text.green()
        };
        println!(
            "{:<45} {:>10.1} {:>10.1} {:>7}",
            metric.category.to_string(),
            metric.documented_pct,
            metric.incident_pct,
            bsi_colored
        );
    }
}

fn print_recommendations(recommendations: &[Recommendation]) {
    println!("{}", "Recommendations".bold());
    for recommendation in recommendations {
        let evidence = if recommendation.evidence_required {
            " [evidence required]".yellow().to_string()
        } else {
            String::new()
        };
        println!(
            "  [{}] {}{}\n      {}",
            priority_colored(recommendation.priority),
            recommendation.category,
            evidence,
            recommendation.action.dimmed()
        );
    }
}

fn priority_colored(priority: Priority) -> colored::ColoredString {
    match priority {
        Priority::High => "HIGH".red().bold(),
        Priority::Medium => "MEDIUM".yellow(),
        Priority::Low => "LOW".green(),
    }
}
