// src/bin/smoke_test.rs - Health, completions and chat smoke test against a running server

use std::process::ExitCode;

use clap::Parser;
use sglang_serve_tools::constants::*;
use sglang_serve_tools::{
    format_duration, ChatMessage, ChatRequest, CompletionRequest, Logger, TestClient, TestReport,
};

#[derive(Parser, Debug)]
#[command(name = "sglang-smoke-test")]
#[command(about = "Send one completions and one chat request to a running SGLang server")]
struct ClientArgs {
    #[arg(long, default_value = DEFAULT_CLIENT_HOST, help = "Server host")]
    host: String,

    #[arg(long, default_value_t = DEFAULT_PORT, help = "Server port")]
    port: u16,

    #[arg(
        long,
        default_value = "Hello! Please introduce yourself briefly.",
        help = "Test prompt"
    )]
    prompt: String,

    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS, help = "Maximum generated tokens")]
    max_tokens: u32,

    #[arg(
        long,
        default_value_t = DEFAULT_REQUEST_TIMEOUT_SECONDS,
        help = "Per-request timeout in seconds"
    )]
    timeout_seconds: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = ClientArgs::parse();
    let logger = Logger::new(true);
    let base_url = format!("http://{}:{}", args.host, args.port);

    println!("======================================================");
    println!("SGLang server smoke test");
    println!("======================================================");
    println!("Target: {}", base_url);

    let client = match TestClient::new(&base_url, args.timeout_seconds) {
        Ok(client) => client,
        Err(e) => {
            logger.error(&e.to_string());
            return ExitCode::FAILURE;
        }
    };

    println!("\n1. Checking server health...");
    if !client.health().await {
        logger.error(&format!(
            "{} at {}; start it with sglang-launch first",
            ERROR_SERVER_UNREACHABLE, base_url
        ));
        return ExitCode::FAILURE;
    }
    println!("{} server is up", LOG_PREFIX_SUCCESS);

    let mut report = TestReport::new();

    println!("\n2. Testing /v1/completions...");
    println!("{} prompt: {}", LOG_PREFIX_REQUEST, args.prompt);
    let request = CompletionRequest::new(&args.prompt, args.max_tokens);
    match client.completions(&request).await {
        Ok(outcome) => {
            println!("{}", outcome.content.trim());
            println!(
                "{} completions ok ({})",
                LOG_PREFIX_SUCCESS,
                format_duration(outcome.latency)
            );
            report.record_pass("completions", outcome.latency);
        }
        Err(e) => {
            logger.error(&format!("completions failed: {}", e));
            report.record_fail("completions", &e.to_string());
        }
    }

    println!("\n3. Testing /v1/chat/completions...");
    println!("{} user message: {}", LOG_PREFIX_REQUEST, args.prompt);
    let request = ChatRequest::new(vec![ChatMessage::user(&args.prompt)], args.max_tokens);
    match client.chat_completions(&request).await {
        Ok(outcome) => {
            println!("{}", outcome.content.trim());
            println!(
                "{} chat completions ok ({})",
                LOG_PREFIX_SUCCESS,
                format_duration(outcome.latency)
            );
            report.record_pass("chat completions", outcome.latency);
        }
        Err(e) => {
            logger.error(&format!("chat completions failed: {}", e));
            report.record_fail("chat completions", &e.to_string());
        }
    }

    report.print_summary();

    if report.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
