// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Verkko CLI - fixture inspection and live verification

use std::env;
use std::path::Path;
use std::process::ExitCode;

use verkko::diff::{render_prepared, render_spec};
use verkko::queue::ExpectationQueue;
use verkko::recorder::Recorder;
use verkko::verifier::{check_entries, render_divergences};
use verkko::{fixture, SessionConfig};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("verkko=info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    match args[1].as_str() {
        "show" => {
            if args.len() < 3 {
                eprintln!("Usage: verkko show <fixture>");
                return ExitCode::from(1);
            }
            show_fixture(Path::new(&args[2])).await
        }
        "verify" => {
            if args.len() < 3 {
                eprintln!("Usage: verkko verify <fixture>");
                return ExitCode::from(1);
            }
            verify_fixture(Path::new(&args[2])).await
        }
        "--help" | "-h" | "help" => {
            print_usage();
            ExitCode::SUCCESS
        }
        "--version" | "-v" | "version" => {
            println!("verkko {}", verkko::VERSION);
            ExitCode::SUCCESS
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            ExitCode::from(1)
        }
    }
}

fn print_usage() {
    println!(
        r#"Verkko - HTTP mocking, recording and verification for test suites

USAGE:
    verkko <COMMAND> [OPTIONS]

COMMANDS:
    show <fixture>      Print the exchanges stored in a fixture file
    verify <fixture>    Replay a fixture against the live services and report divergences
    help                Show this help message
    version             Show version information

ENVIRONMENT:
    VERKKO_VERIFY=1     Run every mocked session in verify mode
    VERKKO_WRITE=1      Re-capture every file-backed session
    RUST_LOG            Log filter (default: verkko=info)

EXAMPLES:
    verkko show tests/fixtures/users.json
    verkko verify tests/fixtures/users.json
"#
    );
}

async fn show_fixture(path: &Path) -> ExitCode {
    let entries = match fixture::read(path) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(1);
        }
    };

    let queue = ExpectationQueue::prepare(&entries).await;
    println!("{} ({} entries)", path.display(), queue.len());

    for index in 0..queue.len() {
        let Some(entry) = queue.entry(index) else { continue };
        println!();
        println!("#{}", index + 1);
        for line in render_spec(entry.request.as_ref()) {
            println!("  {}", line);
        }
        println!();
        for line in render_prepared(&entry.response) {
            println!("  {}", line);
        }
        if !entry.verify.ignore_headers.is_empty() {
            println!("  // verification ignores: {}", entry.verify.ignore_headers.join(", "));
        }
    }

    ExitCode::SUCCESS
}

async fn verify_fixture(path: &Path) -> ExitCode {
    let entries = match fixture::read(path) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(1);
        }
    };

    let config = SessionConfig::from_env();
    let recorder = match Recorder::new(&config) {
        Ok(recorder) => recorder,
        Err(e) => {
            eprintln!("Failed to create HTTP client: {}", e);
            return ExitCode::from(1);
        }
    };

    let queue = ExpectationQueue::prepare(&entries).await;
    println!("Verifying {} entries from {}", queue.len(), path.display());

    let divergences = check_entries(&recorder, &queue, &config.volatile_headers).await;
    if divergences.is_empty() {
        println!("All entries agree with the live services");
        return ExitCode::SUCCESS;
    }

    println!();
    println!("{}", render_divergences(&divergences));
    println!();
    println!("{} of {} entries diverged", divergences.len(), queue.len());
    ExitCode::from(1)
}
