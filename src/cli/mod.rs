//! Lifestyle Risk CLI Module
//!
//! Command-line interface for training, prediction, and serving.

use clap::{Args, Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::data::{DataLoader, FeatureSchema, PatientRecord};
use crate::inference::{PredictionResult, Predictor};
use crate::training::{ClassWeight, ForestConfig, Trainer, TrainingConfig};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

/// Paint `text` with a `#rrggbb` risk colour, falling back to plain bold
fn risk_badge(text: &str, color: Option<&str>) -> ColoredString {
    match color.and_then(parse_hex) {
        Some((r, g, b)) => text.truecolor(r, g, b).bold(),
        None => text.bold(),
    }
}

fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "lifestyle-risk")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Lifestyle disease risk prediction from patient vitals")]
#[command(long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train the multi-disease model on a CSV file or data directory
    Train(TrainArgs),

    /// Predict risk for one patient record
    Predict {
        /// Trained model file
        #[arg(short, long, env = "RISK_MODEL_PATH", default_value = "models/risk_model.bin")]
        model: PathBuf,

        /// JSON file holding one record (an object of feature values)
        #[arg(short, long)]
        record: Option<PathBuf>,

        /// Feature assignment NAME=VALUE; repeatable, overrides --record
        #[arg(short, long = "set", value_name = "NAME=VALUE")]
        set: Vec<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start the web server
    Serve {
        /// Server host
        #[arg(long, env = "RISK_HOST", default_value = "127.0.0.1")]
        host: String,

        /// Server port
        #[arg(short, long, env = "RISK_PORT", default_value = "8080")]
        port: u16,

        /// Trained model file
        #[arg(short, long, env = "RISK_MODEL_PATH", default_value = "models/risk_model.bin")]
        model: PathBuf,

        /// Schema for the form while no model is loaded (built-in name or JSON file)
        #[arg(long, default_value = "vitals")]
        schema: String,
    },

    /// Print a built-in feature schema as JSON
    Schema {
        /// Schema name (vitals, brfss)
        #[arg(short, long, default_value = "vitals")]
        name: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    /// Input CSV file, or a directory whose first CSV is used
    #[arg(short, long)]
    pub data: PathBuf,

    /// Output model file
    #[arg(long, default_value = "models/risk_model.bin")]
    pub model_path: PathBuf,

    /// Output metrics file (defaults to <model>.metrics.json)
    #[arg(long)]
    pub metrics_path: Option<PathBuf>,

    /// Fraction of rows held out for evaluation
    #[arg(long, default_value = "0.2")]
    pub test_size: f64,

    /// Trees per disease
    #[arg(short = 'n', long, default_value = "300")]
    pub estimators: usize,

    /// Maximum tree depth (unlimited when omitted)
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Seed for the split, bootstrap and feature sampling
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Feature schema: built-in name (vitals, brfss) or JSON file
    #[arg(long, default_value = "vitals")]
    pub schema: String,

    /// Class weighting (balanced, none)
    #[arg(long, default_value = "balanced")]
    pub class_weight: ClassWeight,

    /// Target to stratify the split on (defaults to the first target)
    #[arg(long)]
    pub stratify_on: Option<String>,

    /// Oversample minority classes of the stratification target before fitting
    #[arg(long)]
    pub oversample: bool,
}

impl TrainArgs {
    pub fn training_config(&self) -> TrainingConfig {
        let forest = ForestConfig::default()
            .with_n_estimators(self.estimators)
            .with_max_depth(self.max_depth)
            .with_class_weight(self.class_weight)
            .with_random_state(self.seed);

        let mut config = TrainingConfig::new()
            .with_test_size(self.test_size)
            .with_seed(self.seed)
            .with_oversample(self.oversample)
            .with_model_path(&self.model_path)
            .with_forest(forest);
        if let Some(path) = &self.metrics_path {
            config = config.with_metrics_path(path);
        }
        if let Some(target) = &self.stratify_on {
            config = config.with_stratify_on(target);
        }
        config
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(args: &TrainArgs) -> anyhow::Result<()> {
    section("Train");

    let schema = FeatureSchema::resolve(&args.schema)?;
    println!("  {}", kv("Schema ", &schema.name));
    println!("  {}", kv("Targets", &schema.target_names().join(", ")));
    println!();

    step_run("Loading data");
    let start = Instant::now();
    let loader = DataLoader::new(schema);
    let data = loader.load(&args.data)?;
    step_done(&format!("{} rows in {:?}", data.len(), start.elapsed()));

    step_run(&format!("Training {} trees per disease", args.estimators.to_string().cyan()));
    let trainer = Trainer::new(args.training_config());
    let (_, summary) = trainer.train(&data)?;
    step_done(&format!("{:.2?}", summary.duration));

    step_ok(&format!(
        "Split on {}: {} train / {} test ({} rows fitted)",
        summary.stratified_on, summary.n_train, summary.n_test, summary.n_fit
    ));

    section("Held-out metrics");
    println!(
        "  {:<16} {:>10} {:>10} {:>10}",
        muted("Disease"),
        muted("F1 (w)"),
        muted("Accuracy"),
        muted("F1 (macro)")
    );
    for (name, m) in &summary.metrics.outputs {
        println!(
            "  {:<16} {:>10} {:>10} {:>10}",
            name.white(),
            format!("{:.4}", m.f1).white().bold(),
            format!("{:.4}", m.accuracy).white(),
            format!("{:.4}", m.f1_macro).white()
        );
    }

    println!();
    println!("  {}", kv("Model  ", &summary.model_path.display().to_string()));
    println!("  {}", kv("Metrics", &summary.metrics_path.display().to_string()));
    println!();

    Ok(())
}

/// Build a record from an optional JSON file plus `NAME=VALUE` overrides
pub fn read_record(path: Option<&Path>, assignments: &[String]) -> anyhow::Result<PatientRecord> {
    let mut record = match path {
        Some(path) => {
            let file = std::fs::File::open(path)
                .map_err(|e| anyhow::anyhow!("cannot open {}: {}", path.display(), e))?;
            serde_json::from_reader::<_, PatientRecord>(std::io::BufReader::new(file))?
        }
        None => PatientRecord::new(),
    };

    let overrides = PatientRecord::from_assignments(assignments).map_err(anyhow::Error::msg)?;
    for (name, value) in overrides.iter() {
        record.insert(name.clone(), value.clone());
    }

    if record.is_empty() {
        anyhow::bail!("no input: pass --record <file.json> or --set NAME=VALUE");
    }
    Ok(record)
}

pub fn cmd_predict(
    model_path: &Path,
    record_path: Option<&Path>,
    assignments: &[String],
    json: bool,
) -> anyhow::Result<()> {
    let record = read_record(record_path, assignments)?;
    let predictor = Predictor::new(model_path);
    let result = predictor.predict(&record)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    print_prediction(&result);
    Ok(())
}

fn print_prediction(result: &PredictionResult) {
    section("Risk assessment");
    for p in &result.predictions {
        println!(
            "  {:<16} {}  {}",
            p.disease.white(),
            risk_badge(&p.label, p.color.as_deref()),
            dim(&format!("{:.1}%", p.probability * 100.0))
        );
        let spread: Vec<String> = p
            .probabilities
            .iter()
            .map(|(class, prob)| format!("{}={:.2}", class, prob))
            .collect();
        println!("  {:<16} {}", "", muted(&spread.join("  ")));
    }
    println!();
}

pub fn cmd_schema(name: &str) -> anyhow::Result<()> {
    let schema = FeatureSchema::builtin(name)
        .ok_or_else(|| anyhow::anyhow!("unknown schema '{}', expected vitals|brfss", name))?;
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

pub async fn cmd_serve(host: &str, port: u16, model: &Path, schema: &str) -> anyhow::Result<()> {
    use crate::server::{run_server, ServerConfig};

    let schema = FeatureSchema::resolve(schema)?;

    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "Lifestyle Risk".white().bold()));
    line_box_center(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("Web UI ", &format!("http://{}:{}", host, port)));
    line_box(&kv("API    ", &format!("http://{}:{}/api", host, port)));
    line_box(&kv("Health ", &format!("http://{}:{}/api/health", host, port)));
    line_box(&kv("Model  ", &model.display().to_string()));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box_center(&format!("{}", dim("ctrl+c to stop")));
    line_box_empty();
    line_box_bottom();
    println!();

    let config = ServerConfig::default()
        .with_host(host)
        .with_port(port)
        .with_model_path(model)
        .with_schema(schema);

    run_server(config).await
}
