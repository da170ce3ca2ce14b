//! CLI for ECDSA signature batch auditing

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use noncescope::attack::linear::{SolverOptions, UnknownMapping};
use noncescope::attack::nonce_reuse::RecoveryPolicy;
use noncescope::provider::load_signatures;
use noncescope::report::LinearOutput;
use noncescope::{analyze, AnalysisConfig, AnalysisReport, InputPolicy, ScalarField};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "noncescope")]
#[command(about = "ECDSA signature nonce auditing")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, global = true)]
    json: bool,

    #[arg(
        short,
        long,
        global = true,
        action = ArgAction::Count,
        help = "Log to stderr (-v info, -vv debug)"
    )]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    Analyze {
        #[arg(default_value = "-")]
        input: String,

        #[arg(long, help = "Group order n, decimal or 0x hex [default: secp256k1 order]")]
        modulus: Option<String>,

        #[arg(
            long,
            default_value = "first",
            help = "Reuse groups to attempt key recovery on: first, all"
        )]
        recover_from: String,

        #[arg(
            long,
            help = "Nonce unknown per signature for the linear solver, e.g. 0,0,1"
        )]
        unknowns: Option<String>,

        #[arg(long, help = "Add the private key as a shared unknown in the linear solver")]
        with_private_key: bool,

        #[arg(long, help = "Reduce out-of-range values mod n instead of rejecting them")]
        reduce_inputs: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli) {
        Ok(found_vulnerabilities) => {
            if found_vulnerabilities {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<bool> {
    match cli.command {
        Command::Analyze {
            input,
            modulus,
            recover_from,
            unknowns,
            with_private_key,
            reduce_inputs,
        } => {
            let field = match modulus {
                Some(text) => ScalarField::from_str_modulus(&text)?,
                None => ScalarField::secp256k1(),
            };
            let recovery = match recover_from.as_str() {
                "first" => RecoveryPolicy::First,
                "all" => RecoveryPolicy::All,
                _ => anyhow::bail!("Unknown recovery policy: {}", recover_from),
            };
            let mapping = match unknowns {
                Some(text) => text.parse::<UnknownMapping>()?,
                None => UnknownMapping::PerSignature,
            };
            let policy = if reduce_inputs {
                InputPolicy::Reduce
            } else {
                InputPolicy::Reject
            };

            let signatures = load_signatures(&input, &field, policy)?;

            let config = AnalysisConfig {
                field,
                recovery,
                solver: SolverOptions {
                    mapping,
                    with_private_key,
                },
            };
            let report = analyze(&signatures, &config);

            let output = format_output(&report, cli.json)?;
            println!("{}", output);

            Ok(report.has_vulnerabilities())
        }
    }
}

fn format_output(report: &AnalysisReport, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(report)?);
    }

    let output = report.output();
    let mut text = String::new();
    text.push_str(&format!(
        "Analyzed {} signatures\n\n",
        output.summary.total_signatures
    ));

    text.push_str("Nonce reuse:\n");
    if output.reuse_groups.is_empty() {
        text.push_str("  No reused r values.\n");
    } else {
        for (i, group) in output.reuse_groups.iter().enumerate() {
            text.push_str(&format!("  Group #{}\n", i + 1));
            text.push_str(&format!("    R Value: {}\n", group.r.decimal));
            text.push_str(&format!("    Signatures: {:?}\n", group.indices));
        }
    }
    text.push('\n');

    let key = &output.recovered_key;
    text.push_str("Key recovery:\n");
    text.push_str(&format!("  Status: {}\n", key.status.label()));
    if let (Some(group), Some([a, b])) = (key.group, key.signatures) {
        text.push_str(&format!(
            "  Group: #{} (signatures {} and {})\n",
            group + 1,
            a,
            b
        ));
    }
    if let Some(nonce) = &key.nonce {
        text.push_str(&format!("  Nonce (decimal): {}\n", nonce.decimal));
    }
    if let Some(pk) = &key.private_key {
        text.push_str(&format!("  Private Key (decimal): {}\n", pk.decimal));
        text.push_str(&format!("  Private Key (hex): {}\n", pk.hex));
    }
    if let Some(reason) = key.reason {
        text.push_str(&format!("  Reason: {}\n", reason));
    }
    text.push('\n');

    if output.low_s_indices.is_empty() {
        text.push_str("Low-S signatures: none\n\n");
    } else {
        text.push_str(&format!(
            "Low-S signatures: {:?}\n\n",
            output.low_s_indices
        ));
    }

    text.push_str("Linear dependency:\n");
    match &output.linear_dependency {
        LinearOutput::UniqueSolution { values } => {
            text.push_str("  Unique solution\n");
            for value in values {
                text.push_str(&format!("    {} = {}\n", value.unknown, value.value.decimal));
            }
        }
        LinearOutput::Relationships { free, relations } => {
            text.push_str(&format!("  Relationships (free: {})\n", free.join(", ")));
            for relation in relations {
                text.push_str(&format!("    {}\n", relation.expression));
            }
        }
        LinearOutput::Inconsistent { equation } => {
            text.push_str(&format!(
                "  Inconsistent: signature {} contradicts the others\n",
                equation
            ));
        }
        LinearOutput::NoEquations => text.push_str("  No equations\n"),
        LinearOutput::InvalidMapping {
            entries,
            signatures,
        } => {
            text.push_str(&format!(
                "  Invalid mapping: {} unknown ids for {} signatures\n",
                entries, signatures
            ));
        }
    }

    Ok(text)
}
