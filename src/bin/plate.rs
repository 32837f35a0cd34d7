//! Plate CLI - Command-line interface for the Plate engine
//!
//! Commands:
//! - dashboard: Compute trend, habit stats and insight from records
//! - plan: Compute onboarding calorie and protein targets
//! - arrival: Project when a target weight is reached
//! - validate: Validate input records
//! - schema: Print schema information

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{Local, NaiveDate};
use tracing::{debug, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use plate_engine::metabolic::MetabolicPlanner;
use plate_engine::schema::{RecordAdapter, SCHEMA_VERSION};
use plate_engine::types::{ActivityLevel, Goal, OnboardingProfile, Sex};
use plate_engine::{plan_onboarding, DashboardProcessor, EngineConfig, ENGINE_VERSION};

/// Plate - biometric trend and habit insight engine
#[derive(Parser)]
#[command(name = "plate")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Turn weight readings and plate checks into trends and insights", long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the dashboard bundle from records
    Dashboard {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Last day of the habit window (YYYY-MM-DD, defaults to today)
        #[arg(long, value_parser = parse_date)]
        today: Option<NaiveDate>,

        /// Engine config JSON file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Compute onboarding calorie and protein targets
    Plan {
        #[arg(long)]
        sex: SexArg,

        /// Age in years
        #[arg(long)]
        age: u32,

        /// Height in centimetres
        #[arg(long)]
        height_cm: f64,

        /// Current weight in kilograms
        #[arg(long)]
        weight_kg: f64,

        /// Activity level name (sedentary, lightly-active, ...) or multiplier (1.2 - 1.9)
        #[arg(long, value_parser = parse_activity)]
        activity: ActivityLevel,

        #[arg(long)]
        goal: GoalArg,

        /// Target weight in kilograms, adds an arrival estimate
        #[arg(long)]
        target_weight_kg: Option<f64>,

        /// Start date for the arrival estimate (YYYY-MM-DD, defaults to today)
        #[arg(long, value_parser = parse_date)]
        today: Option<NaiveDate>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Project when a target weight is reached
    Arrival {
        /// Current weight in kilograms
        #[arg(long)]
        current: f64,

        /// Target weight in kilograms
        #[arg(long)]
        target: f64,

        /// Start date (YYYY-MM-DD, defaults to today)
        #[arg(long, value_parser = parse_date)]
        today: Option<NaiveDate>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate input records
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, Copy, ValueEnum)]
enum SexArg {
    Male,
    Female,
}

impl From<SexArg> for Sex {
    fn from(arg: SexArg) -> Self {
        match arg {
            SexArg::Male => Sex::Male,
            SexArg::Female => Sex::Female,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum GoalArg {
    WeightLoss,
    Maintenance,
    MuscleGain,
}

impl From<GoalArg> for Goal {
    fn from(arg: GoalArg) -> Self {
        match arg {
            GoalArg::WeightLoss => Goal::WeightLoss,
            GoalArg::Maintenance => Goal::Maintenance,
            GoalArg::MuscleGain => Goal::MuscleGain,
        }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn parse_activity(s: &str) -> Result<ActivityLevel, String> {
    if let Ok(multiplier) = s.parse::<f64>() {
        return ActivityLevel::from_multiplier(multiplier)
            .ok_or_else(|| format!("unsupported multiplier {multiplier}; use 1.2, 1.375, 1.55, 1.725 or 1.9"));
    }
    let name = s.replace('-', "_");
    serde_json::from_value(serde_json::Value::String(name))
        .map_err(|_| format!("unknown activity level '{s}'"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Priority: RUST_LOG > --verbose > warn
fn init_logging(verbose: bool) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(false).compact())
        .init();
}

fn run(cli: Cli) -> Result<(), PlateCliError> {
    match cli.command {
        Commands::Dashboard {
            input,
            output,
            today,
            config,
            output_format,
        } => cmd_dashboard(&input, &output, today, config.as_deref(), output_format),

        Commands::Plan {
            sex,
            age,
            height_cm,
            weight_kg,
            activity,
            goal,
            target_weight_kg,
            today,
            json,
        } => {
            let profile = OnboardingProfile {
                sex: sex.into(),
                age,
                height_cm,
                weight_kg,
                activity,
                goal: goal.into(),
                target_weight_kg,
            };
            cmd_plan(&profile, today.unwrap_or_else(local_today), json)
        }

        Commands::Arrival {
            current,
            target,
            today,
            json,
        } => cmd_arrival(current, target, today.unwrap_or_else(local_today), json),

        Commands::Validate { input, json } => cmd_validate(&input, json),

        Commands::Schema { json_schema } => cmd_schema(json_schema),
    }
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

fn read_input(input: &Path) -> Result<String, PlateCliError> {
    if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            warn!("reading records from the terminal; end input with Ctrl-D");
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn cmd_dashboard(
    input: &Path,
    output: &Path,
    today: Option<NaiveDate>,
    config: Option<&Path>,
    output_format: OutputFormat,
) -> Result<(), PlateCliError> {
    let config = match config {
        Some(path) => EngineConfig::from_json(&fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };
    let today = today.unwrap_or_else(local_today);

    let input_data = read_input(input)?;
    let output_data = render_dashboard(&input_data, today, config, &output_format)?;

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

/// Empty input renders the no-data dashboard rather than failing
fn render_dashboard(
    input_data: &str,
    today: NaiveDate,
    config: EngineConfig,
    output_format: &OutputFormat,
) -> Result<String, PlateCliError> {
    let records = RecordAdapter::parse(input_data)?;
    let snapshot = RecordAdapter::to_snapshot(&records, 0);
    debug!(
        records = records.len(),
        readings = snapshot.readings.len(),
        logged_days = snapshot.logs.len(),
        %today,
        "computing dashboard"
    );

    let processor = DashboardProcessor::with_config(config)?;
    let dashboard = processor.compute(&snapshot, today);

    Ok(match output_format {
        OutputFormat::Json => serde_json::to_string(&dashboard)? + "\n",
        OutputFormat::JsonPretty => serde_json::to_string_pretty(&dashboard)? + "\n",
    })
}

fn cmd_plan(profile: &OnboardingProfile, today: NaiveDate, json: bool) -> Result<(), PlateCliError> {
    let plan = plan_onboarding(profile, today)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    let macros = &plan.macro_plan;
    println!("Onboarding Plan");
    println!("===============");
    println!("Focus:            {}", macros.focus_label);
    println!("BMR:              {} kcal", macros.bmr_kcal);
    println!("TDEE:             {} kcal", macros.tdee_kcal);
    println!("Target calories:  {} kcal", macros.target_calories);
    println!("Target protein:   {} g", macros.target_protein_grams);

    if let Some(arrival) = &plan.arrival {
        if arrival.is_at_goal() {
            println!("Arrival:          already at goal");
        } else {
            println!(
                "Arrival:          {} weeks ({})",
                arrival.weeks, arrival.arrival_date
            );
        }
    }

    Ok(())
}

fn cmd_arrival(current: f64, target: f64, today: NaiveDate, json: bool) -> Result<(), PlateCliError> {
    let estimate = MetabolicPlanner::estimate_arrival(current, target, today)?;

    if json {
        let report = ArrivalReport {
            weeks: estimate.weeks,
            arrival_date: estimate.arrival_date,
            at_goal: estimate.is_at_goal(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if estimate.is_at_goal() {
        println!("Already at goal weight ({current} kg)");
    } else {
        println!(
            "{} kg -> {} kg: about {} weeks, around {}",
            current, target, estimate.weeks, estimate.arrival_date
        );
    }

    Ok(())
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), PlateCliError> {
    let input_data = read_input(input)?;
    let records = RecordAdapter::parse(&input_data)?;
    let failures = RecordAdapter::validate_records(&records);

    let report = ValidationReport {
        total_records: records.len(),
        valid_records: records.len() - failures.len(),
        invalid_records: failures.len(),
        errors: failures
            .iter()
            .map(|f| ValidationErrorDetail {
                index: f.index,
                kind: f.kind.to_string(),
                date: f.date.to_string(),
                error: f.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records:   {}", report.total_records);
        println!("Valid records:   {}", report.valid_records);
        println!("Invalid records: {}", report.invalid_records);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - {} record for {} (index {}): {}",
                    err.kind, err.date, err.index, err.error
                );
            }
        }
    }

    if report.invalid_records > 0 {
        Err(PlateCliError::ValidationFailed(report.invalid_records))
    } else {
        Ok(())
    }
}

fn cmd_schema(json_schema: bool) -> Result<(), PlateCliError> {
    if json_schema {
        println!("{}", input_json_schema());
        return Ok(());
    }

    println!("Input Schema: {}", SCHEMA_VERSION);
    println!();
    println!("Records are a JSON array or newline-delimited JSON, tagged by \"kind\":");
    println!();
    println!("1. weight - one body-weight reading per calendar day");
    println!("   - date (YYYY-MM-DD), weight_kg (> 0), captured_at_millis (optional)");
    println!();
    println!("2. meal - one plate check per meal slot per day");
    println!("   - date, slot (breakfast, lunch, dinner, snack)");
    println!("   - protein_present, plants_present, satiety (1-5), captured_at_millis (optional)");
    println!();
    println!("Repeated dates (or date + slot) keep the latest capture.");

    Ok(())
}

fn input_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": SCHEMA_VERSION,
        "oneOf": [
            {
                "type": "object",
                "required": ["kind", "date", "weight_kg"],
                "properties": {
                    "kind": { "const": "weight" },
                    "date": { "type": "string", "format": "date" },
                    "weight_kg": { "type": "number", "exclusiveMinimum": 0 },
                    "captured_at_millis": { "type": "integer" }
                }
            },
            {
                "type": "object",
                "required": ["kind", "date", "slot", "protein_present", "plants_present", "satiety"],
                "properties": {
                    "kind": { "const": "meal" },
                    "date": { "type": "string", "format": "date" },
                    "slot": { "enum": ["breakfast", "lunch", "dinner", "snack"] },
                    "protein_present": { "type": "boolean" },
                    "plants_present": { "type": "boolean" },
                    "satiety": { "type": "integer", "minimum": 1, "maximum": 5 },
                    "captured_at_millis": { "type": "integer" }
                }
            }
        ]
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum PlateCliError {
    Io(io::Error),
    Engine(plate_engine::EngineError),
    Json(serde_json::Error),
    ValidationFailed(usize),
}

impl From<io::Error> for PlateCliError {
    fn from(e: io::Error) -> Self {
        PlateCliError::Io(e)
    }
}

impl From<plate_engine::EngineError> for PlateCliError {
    fn from(e: plate_engine::EngineError) -> Self {
        PlateCliError::Engine(e)
    }
}

impl From<serde_json::Error> for PlateCliError {
    fn from(e: serde_json::Error) -> Self {
        PlateCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<PlateCliError> for CliError {
    fn from(e: PlateCliError) -> Self {
        match e {
            PlateCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            PlateCliError::Engine(plate_engine::EngineError::InvalidParameter(msg)) => CliError {
                code: "INVALID_PARAMETER".to_string(),
                message: msg,
                hint: Some("Weights must be positive numbers of kilograms".to_string()),
            },
            PlateCliError::Engine(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(format!("Ensure input matches the {} schema", SCHEMA_VERSION)),
            },
            PlateCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            PlateCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} records failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_records: usize,
    valid_records: usize,
    invalid_records: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    kind: String,
    date: String,
    error: String,
}

#[derive(serde::Serialize)]
struct ArrivalReport {
    weeks: u32,
    arrival_date: NaiveDate,
    at_goal: bool,
}
