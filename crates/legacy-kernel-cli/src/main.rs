use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use legacy_kernel_api::{ChatRequest, ChatResult, DigitalLegacyApi, MintRequest};
use legacy_kernel_core::{build_record, generate_response, Policy, WillRecord};
use legacy_kernel_store_memory::MemoryStore;
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

const CLI_CONTRACT_VERSION: &str = "cli.v1";

#[derive(Debug, Parser)]
#[command(name = "dlp")]
#[command(about = "Digital Legacy Protocol CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Mint a digital will and print it; optionally write it to a file.
    Mint(MintArgs),
    /// Chat with the avatar of a will stored in a JSON file.
    Chat(ChatArgs),
    /// Run the scripted mint-then-chat walkthrough.
    Simulate,
}

#[derive(Debug, Args)]
struct MintArgs {
    #[arg(long)]
    subject: String,
    /// Policy rules as a JSON object, e.g. '{"forbidden_topics":["politics"]}'.
    #[arg(long)]
    rules_json: String,
    /// RFC 3339 creation time; defaults to now (UTC).
    #[arg(long)]
    created_at: Option<String>,
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ChatArgs {
    #[arg(long)]
    will: PathBuf,
    #[arg(long)]
    query: String,
}

#[derive(Debug, Serialize)]
struct CliEnvelope<T>
where
    T: Serialize,
{
    cli_contract_version: &'static str,
    data: T,
}

fn print_envelope<T>(data: T) -> Result<()>
where
    T: Serialize,
{
    let envelope = CliEnvelope { cli_contract_version: CLI_CONTRACT_VERSION, data };
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

fn parse_policy(raw: &str) -> Result<Policy> {
    serde_json::from_str(raw).context("rules-json must be a JSON object of avatar rules")
}

fn parse_created_at(raw: Option<&str>) -> Result<OffsetDateTime> {
    match raw {
        Some(value) => OffsetDateTime::parse(value, &Rfc3339)
            .with_context(|| format!("created-at must be RFC 3339, got: {value}")),
        None => Ok(OffsetDateTime::now_utc()),
    }
}

fn run_mint(args: MintArgs) -> Result<()> {
    let policy = parse_policy(&args.rules_json)?;
    let created_at = parse_created_at(args.created_at.as_deref())?;
    let record = build_record(&args.subject, policy, created_at)?;

    if let Some(out) = &args.out {
        let json = serde_json::to_string_pretty(&record)?;
        fs::write(out, json).with_context(|| format!("failed to write {}", out.display()))?;
    }

    print_envelope(record)
}

fn load_will(path: &Path) -> Result<WillRecord> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let record: WillRecord = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a digital will record", path.display()))?;
    Ok(record)
}

fn run_chat(args: ChatArgs) -> Result<()> {
    let record = load_will(&args.will)?;
    let response = generate_response(&record, &args.query)?;

    print_envelope(ChatResult { address: record.address, query: args.query, response })
}

fn run_simulate() -> Result<()> {
    let api = DigitalLegacyApi::new(MemoryStore::new());
    let policy = parse_policy(
        r#"{
            "interaction_level": "interactive",
            "forbidden_topics": ["politics", "personal_finances"],
            "commercial_use": "prohibited"
        }"#,
    )?;

    println!("--- Digital Legacy Protocol Simulation ---");
    let record = api.mint(MintRequest {
        subject: "user-xyz-123".to_string(),
        policy,
        created_at: None,
    })?;
    println!();
    println!("[STEP 1: MINTING COMPLETE]");
    println!("Address: {}", record.address);
    println!("Subject: {}", record.subject);
    println!("Rules: {}", serde_json::to_string_pretty(&record.policy)?);

    println!();
    println!("[STEP 2: AVATAR READY]");
    for query in [
        "Tell me about the Mindsurance project.",
        "What are your thoughts on politics?",
        "What was your favorite memory?",
    ] {
        let turn = api.chat(ChatRequest {
            address: record.address.clone(),
            query: query.to_string(),
        })?;
        println!();
        println!("> User asks: \"{}\"", turn.query);
        println!("< Avatar responds: \"{}\"", turn.response);
    }

    println!();
    println!("--- Simulation Finished ---");
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Mint(args) => run_mint(args),
        Command::Chat(args) => run_chat(args),
        Command::Simulate => run_simulate(),
    }
}
