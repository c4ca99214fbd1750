//! Interactive key tester.
//!
//! Reads commands from stdin while probes run in the background; each
//! verdict is printed as soon as it arrives. One probe at a time.

use anyhow::{Context, Result};
use clap::Parser;
use engine::{EngineConfig, ProbeSession, SessionError, Validator};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

mod command;

use command::{Command, ResultList};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML engine config (timeout, markers, origin override)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Service selected at start-up
    #[arg(long, default_value = "amap-webapi")]
    service: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr and stay quiet unless RUST_LOG asks for more.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = EngineConfig::load(args.config.as_deref()).context("Failed to load engine config")?;
    let validator = Validator::from_config(&config).context("Failed to build validator")?;

    if validator.registry().resolve(&args.service).is_none() {
        anyhow::bail!("Unknown service '{}' — try one of: {}", args.service, validator.registry().ids().join(", "));
    }

    let (session, mut outcomes) = ProbeSession::new(validator);
    let mut selected = args.service;
    let mut results = ResultList::default();

    println!("地图API Key 检测工具 — selected: {selected} (type 'help' for commands)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line.context("Failed to read stdin")? {
                    Some(l) => l,
                    None => break,
                };
                match Command::parse(&line) {
                    Command::Empty => {}
                    Command::Help => println!("{}", command::HELP),
                    Command::Quit => break,
                    Command::List => {
                        for svc in session.validator().registry().iter() {
                            let marker = if svc.id == selected { "*" } else { " " };
                            println!("{marker} {:<18} {}", svc.id, svc.display_name);
                        }
                    }
                    Command::Use(id) => {
                        match session.validator().registry().resolve(&id) {
                            Some(svc) => {
                                println!("selected: {} ({})", svc.id, svc.display_name);
                                selected = id;
                            }
                            None => println!("unknown service '{id}'"),
                        }
                    }
                    Command::Test(key) => match session.submit(&key, &selected) {
                        Ok(()) => {
                            results.start_test();
                            println!("测试中... ({selected})");
                        }
                        Err(SessionError::Busy) => println!("a test is still running — wait for its result"),
                        Err(e) => println!("{e}"),
                    },
                    Command::Show(n) => match results.get(n) {
                        Some(outcome) => println!("{}", command::detail(outcome)),
                        None => println!("no result #{n}"),
                    },
                    Command::Clear => {
                        results.clear();
                        println!("results cleared");
                    }
                    Command::Invalid(msg) => println!("{msg}"),
                }
            }
            Some(outcome) = outcomes.recv() => {
                let line = results.push(outcome);
                debug!(index = results.len(), "Outcome received");
                println!("{line}");
            }
        }
    }

    Ok(())
}
