// src/bin/thinking_probe.rs - Exercise the chat template's enable_thinking switch

use std::process::ExitCode;

use clap::Parser;
use sglang_serve_tools::constants::*;
use sglang_serve_tools::{
    format_duration, has_thinking_markers, ChatMessage, ChatRequest, TestClient, TestReport,
};

const CLEAN_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Answer concisely and do not show your reasoning.";

const BATCH_QUESTIONS: [&str; 4] = [
    "What is deep learning?",
    "What are the advantages of blockchain technology?",
    "How do machine learning and artificial intelligence differ?",
    "What are Python's main strengths?",
];

struct SamplingProfile {
    name: &'static str,
    temperature: f64,
    top_p: f64,
    presence_penalty: f64,
}

const SAMPLING_PROFILES: [SamplingProfile; 3] = [
    SamplingProfile {
        name: "conservative",
        temperature: 0.3,
        top_p: 0.7,
        presence_penalty: 2.0,
    },
    SamplingProfile {
        name: "recommended",
        temperature: 0.7,
        top_p: 0.8,
        presence_penalty: 1.5,
    },
    SamplingProfile {
        name: "creative",
        temperature: 0.9,
        top_p: 0.9,
        presence_penalty: 1.0,
    },
];

#[derive(Parser, Debug)]
#[command(name = "sglang-thinking-probe")]
#[command(about = "Probe a running SGLang server's enable_thinking chat-template flag")]
struct ProbeArgs {
    #[arg(long, default_value = DEFAULT_CLIENT_HOST, help = "Server host")]
    host: String,

    #[arg(long, default_value_t = DEFAULT_PORT, help = "Server port")]
    port: u16,

    #[arg(
        long,
        default_value = "What is artificial intelligence? Answer briefly.",
        help = "Probe question"
    )]
    question: String,

    #[arg(long, default_value_t = PROBE_MAX_TOKENS, help = "Maximum generated tokens")]
    max_tokens: u32,

    #[arg(
        long,
        default_value_t = DEFAULT_REQUEST_TIMEOUT_SECONDS,
        help = "Per-request timeout in seconds"
    )]
    timeout_seconds: u64,
}

fn snippet(text: &str, limit: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= limit {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(limit).collect();
    format!("{}...", cut)
}

fn clean_request(question: &str, max_tokens: u32) -> ChatRequest {
    ChatRequest::clean(
        vec![
            ChatMessage::system(CLEAN_SYSTEM_PROMPT),
            ChatMessage::user(question),
        ],
        max_tokens,
    )
}

/// Run one chat request and record the outcome. When `expect_clean` is set,
/// leaked thinking markers count as a failure even if the request succeeded.
async fn run_probe(
    client: &TestClient,
    report: &mut TestReport,
    name: &str,
    request: &ChatRequest,
    expect_clean: bool,
) {
    match client.chat_completions(request).await {
        Ok(outcome) => {
            let leaked = has_thinking_markers(&outcome.content);
            println!("    answer: {}", snippet(&outcome.content, 120));
            println!(
                "    {} chars, {}",
                outcome.content.chars().count(),
                format_duration(outcome.latency)
            );

            if expect_clean && leaked {
                println!("    {} output contains thinking markers", LOG_PREFIX_WARNING);
                report.record_fail(name, "thinking markers in output");
            } else {
                if !expect_clean {
                    println!(
                        "    {}",
                        if leaked {
                            "thinking markers present (expected)"
                        } else {
                            "no thinking markers"
                        }
                    );
                }
                report.record_pass(name, outcome.latency);
            }
        }
        Err(e) => {
            println!("    {} {}", LOG_PREFIX_ERROR, e);
            report.record_fail(name, &e.to_string());
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = ProbeArgs::parse();
    let base_url = format!("http://{}:{}", args.host, args.port);

    println!("======================================================");
    println!("SGLang enable_thinking probe");
    println!("======================================================");
    println!("Target: {}", base_url);

    let client = match TestClient::new(&base_url, args.timeout_seconds) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{} {}", LOG_PREFIX_ERROR, e);
            return ExitCode::FAILURE;
        }
    };

    if !client.health().await {
        println!(
            "{} {} at {}; start it with sglang-launch first",
            LOG_PREFIX_ERROR, ERROR_SERVER_UNREACHABLE, base_url
        );
        return ExitCode::FAILURE;
    }

    let mut report = TestReport::new();

    println!("\n1. enable_thinking=false");
    let request = clean_request(&args.question, args.max_tokens);
    run_probe(&client, &mut report, "thinking disabled", &request, true).await;

    println!("\n2. enable_thinking=true (contrast)");
    let mut request = clean_request(&args.question, args.max_tokens * 2);
    request.enable_thinking = Some(true);
    run_probe(&client, &mut report, "thinking enabled", &request, false).await;

    println!("\n3. Model name variants");
    for model in ["default", "Qwen/Qwen3-4B"] {
        println!("  model: {}", model);
        let mut request = clean_request("Who invented the telephone?", args.max_tokens);
        request.model = model.to_string();
        run_probe(
            &client,
            &mut report,
            &format!("model {}", model),
            &request,
            true,
        )
        .await;
    }

    println!("\n4. Batch questions (enable_thinking=false)");
    for (i, question) in BATCH_QUESTIONS.iter().enumerate() {
        println!("  4.{} {}", i + 1, question);
        let request = clean_request(question, args.max_tokens);
        run_probe(
            &client,
            &mut report,
            &format!("batch question {}", i + 1),
            &request,
            true,
        )
        .await;
    }

    println!("\n5. Sampling profiles");
    for profile in &SAMPLING_PROFILES {
        println!(
            "  {} (temperature={}, top_p={}, presence_penalty={})",
            profile.name, profile.temperature, profile.top_p, profile.presence_penalty
        );
        let mut request = clean_request("What is natural language processing?", args.max_tokens);
        request.temperature = profile.temperature;
        request.top_p = profile.top_p;
        request.presence_penalty = Some(profile.presence_penalty);
        run_probe(
            &client,
            &mut report,
            &format!("profile {}", profile.name),
            &request,
            true,
        )
        .await;
    }

    println!("\n6. With vs. without chat_template_kwargs");
    println!("  without:");
    let mut request = ChatRequest::new(
        vec![
            ChatMessage::system("You are a helpful assistant."),
            ChatMessage::user("What is machine learning?"),
        ],
        args.max_tokens,
    );
    request.top_p = RECOMMENDED_TOP_P;
    run_probe(&client, &mut report, "server default thinking", &request, false).await;

    println!("  with enable_thinking=false:");
    let request = clean_request("What is machine learning?", args.max_tokens);
    run_probe(&client, &mut report, "explicit thinking off", &request, true).await;

    report.print_summary();

    if report.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
