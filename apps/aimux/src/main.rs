use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::info;

mod cli;
mod data_dir;

use aimux_common::{GlobalConfig, GlobalConfigPatch, ProvidersConfig};
use aimux_core::{Bootstrap, bootstrap};
use aimux_provider_core::{
    ALL_PROVIDERS_FAILED, AttemptOutcome, ChatMessage, EventHub, GenerateRequest, GenerateResult,
    TerminalEventSink,
};
use aimux_storage::UsageStore;

use crate::cli::{Cli, Command, GenerateArgs};

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("aimux failed: {err:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("aimux=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let global = load_config(&cli)?;
    info!(
        state_file = %global.state_file.display(),
        timeout_secs = global.request_timeout_secs,
        deadline_secs = ?global.deadline_secs,
        proxy = %global.proxy.as_deref().unwrap_or(""),
        "config loaded"
    );

    let events = EventHub::new(256);
    if cli.events {
        events.add_sink(Arc::new(TerminalEventSink::new())).await;
    }

    match cli.command {
        Command::Generate(args) => {
            let boot = bootstrap(global, &ProvidersConfig::from_env(), events).await?;
            generate(&boot, args).await
        }
        Command::Status { json } => {
            let boot = bootstrap(global, &ProvidersConfig::from_env(), events).await?;
            status(&boot, json)
        }
        Command::Reset => reset(&global, events).await,
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<GlobalConfig> {
    let mut merged = match cli.config.as_deref() {
        Some(path) => GlobalConfigPatch::from_json_file(path)?,
        None => GlobalConfigPatch::default(),
    };
    merged.overlay(cli.config_patch());
    Ok(merged.into_config())
}

async fn generate(boot: &Bootstrap, args: GenerateArgs) -> anyhow::Result<()> {
    let prompt = if args.prompt.is_empty() {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("read prompt from stdin")?;
        buf
    } else {
        args.prompt.join(" ")
    };

    let mut messages = Vec::new();
    if let Some(system) = args.system {
        messages.push(ChatMessage::system(system));
    }
    messages.push(ChatMessage::user(prompt.trim()));

    let mut request = GenerateRequest::new(messages)
        .with_timeout(Duration::from_secs(boot.global.request_timeout_secs));
    if let Some(max_tokens) = args.max_tokens {
        request = request.with_max_tokens(max_tokens);
    }
    if let Some(temperature) = args.temperature {
        request = request.with_temperature(temperature);
    }
    if let Some(secs) = boot.global.deadline_secs {
        request = request.with_deadline(Duration::from_secs(secs));
    }

    let result = boot.orchestrator.generate(&request).await;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if let Some(text) = &result.response_text {
        println!("{text}");
    }
    if !result.success {
        if !args.json {
            print_trace(&result);
        }
        bail!(
            "{}",
            result.error.as_deref().unwrap_or(ALL_PROVIDERS_FAILED)
        );
    }
    Ok(())
}

fn print_trace(result: &GenerateResult) {
    eprintln!("trace {}", result.trace_id);
    for attempt in &result.attempts {
        let outcome = match attempt.outcome {
            AttemptOutcome::Skipped => "skipped (cooling down)",
            AttemptOutcome::Failed(kind) => kind.as_str(),
            AttemptOutcome::DeadlineExceeded => "deadline exceeded",
        };
        eprintln!(
            "  slot {} ({}): {} {}",
            attempt.slot,
            attempt.provider,
            outcome,
            attempt.message.as_deref().unwrap_or("")
        );
    }
}

fn status(boot: &Bootstrap, json: bool) -> anyhow::Result<()> {
    let now = OffsetDateTime::now_utc();
    let statuses = boot.store.statuses(&boot.registry.slots(), now);
    if json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }

    for (provider, status) in boot.registry.providers().iter().zip(&statuses) {
        let descriptor = &provider.descriptor;
        let state = match status.entry.cooldown_until {
            Some(until) if !status.eligible => {
                format!("cooling until {}", until.format(&Rfc3339)?)
            }
            _ => "eligible".to_string(),
        };
        println!(
            "slot {} {:<10} {:<40} priority={} failures={} last_error={} {}",
            descriptor.slot,
            descriptor.kind.as_str(),
            descriptor.model,
            descriptor.priority,
            status.entry.consecutive_failures,
            status
                .entry
                .last_error_kind
                .map(|kind| kind.as_str())
                .unwrap_or("-"),
            state
        );
    }
    for skipped in boot.registry.skipped() {
        println!("slot {} skipped: {}", skipped.slot, skipped.reason);
    }
    Ok(())
}

async fn reset(global: &GlobalConfig, events: EventHub) -> anyhow::Result<()> {
    let store = UsageStore::open(&global.state_file, global.cooldown.clone())
        .await
        .with_context(|| format!("open usage store {}", global.state_file.display()))?
        .with_events(events);
    let backup = store.reset_all(OffsetDateTime::now_utc()).await?;
    println!("usage state cleared; previous state saved to {}", backup.display());
    Ok(())
}
