use crate::infra::{load_invoice, load_rules};
use crate::server;
use clap::{Args, Parser, Subcommand, ValueEnum};
use invoice_audit::error::AppError;
use invoice_audit::workflows::compliance::{
    prepare_line_items, write_violations_csv, ComplianceEvaluator,
};
use std::io;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Invoice Audit",
    about = "Check invoices against contract pricing rules",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Evaluate an invoice file against a pricing rules file
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// Invoice JSON, including line items
    #[arg(long)]
    pub(crate) invoice: PathBuf,
    /// Pricing rules JSON: a list of rules or an object with a `rules` field
    #[arg(long)]
    pub(crate) rules: PathBuf,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub(crate) format: OutputFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    Json,
    Csv,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Evaluate(args) => run_evaluate(args),
    }
}

fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let invoice = load_invoice(&args.invoice)?;
    let rules = load_rules(&args.rules)?;

    let (line_items, _) = prepare_line_items(&invoice);
    let evaluation = ComplianceEvaluator::new().evaluate(&invoice, &line_items, &rules.rules);

    match args.format {
        OutputFormat::Json => {
            let rendered = serde_json::to_string_pretty(&evaluation)?;
            println!("{rendered}");
        }
        OutputFormat::Csv => write_violations_csv(&evaluation.violations, io::stdout().lock())?,
    }

    Ok(())
}
