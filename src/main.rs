use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use std::env;
use std::io::Read;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod checks;
mod utils;

use checks::llm_check::{run_llm_check, sample_extraction_request};
use checks::message_check::{inspect_message, WorkflowMessage};
use checks::payload_check::payload_report;
use checks::pdf_check::{inspect_pdf, PdfCheckOptions};
use checks::report::CheckReport;
use utils::format_signature::SignatureRegistry;
use utils::llm_client::{LlmServiceClient, DEFAULT_TIMEOUT};

const DEFAULT_SERVICE_URL: &str = "http://localhost:8001";

/// Prints a formatted box with the given lines
/// Empty strings create empty lines, other strings are centered within the box
fn print_box(lines: &[&str]) {
    const BOX_WIDTH: usize = 60; // Total width including borders
    const CONTENT_WIDTH: usize = BOX_WIDTH - 4; // Width for content (excluding "║  " and "  ║")

    eprintln!("\n\x1b[36m╔{}╗", "═".repeat(BOX_WIDTH - 2));

    for line in lines {
        if line.is_empty() {
            eprintln!("║{}║", " ".repeat(BOX_WIDTH - 2));
        } else {
            let visible_len = strip_ansi_codes(line).chars().count();

            if visible_len < CONTENT_WIDTH {
                let total_padding = CONTENT_WIDTH - visible_len;
                let left_padding = total_padding / 2;
                let right_padding = total_padding - left_padding;

                eprintln!(
                    "║  {}{}{}\x1b[36m║",
                    " ".repeat(left_padding),
                    line,
                    " ".repeat(right_padding)
                );
            } else {
                eprintln!("║  {}\x1b[36m  ║", line);
            }
        }
    }

    eprintln!("╚{}╝\x1b[0m\n", "═".repeat(BOX_WIDTH - 2));
}

/// Strips ANSI escape codes to calculate visible text length
fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::new();
    let mut chars = text.chars();

    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            if chars.next() == Some('[') {
                for c in chars.by_ref() {
                    if c.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
        } else {
            result.push(ch);
        }
    }

    result
}

fn input_arg() -> Arg {
    Arg::new("input")
        .value_name("FILE")
        .help("File holding the payload, or '-' for stdin")
        .default_value("-")
}

fn save_arg() -> Arg {
    Arg::new("save")
        .long("save")
        .value_name("PATH")
        .help("Write the decoded bytes to PATH for manual inspection")
        .value_parser(clap::value_parser!(PathBuf))
        .action(clap::ArgAction::Set)
}

fn cli() -> Command {
    Command::new("payload-inspect")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Diagnostics for workflow-automation payloads and the LLM extraction service")
        .long_about(
            "Subcommands:\n\
            - payload: classify a payload as markup text or base64 binary and process it\n\
            - pdf: decode a base64 PDF payload and report its structure\n\
            - message: inspect a workflow message JSON (body and attachments)\n\
            - llm: exercise the LLM microservice health, models and extract endpoints",
        )
        .subcommand_required(true)
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .global(true)
                .help("Suppress the banner and log only errors")
                .action(clap::ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("payload")
                .about("Classify a payload and reduce or decode it")
                .arg(input_arg())
                .arg(
                    Arg::new("expect")
                        .long("expect")
                        .value_name("FORMAT")
                        .help("Validate decoded bytes against this format (e.g. pdf)")
                        .action(clap::ArgAction::Set),
                )
                .arg(
                    Arg::new("charset")
                        .long("charset")
                        .value_name("LABEL")
                        .help("Declared encoding of base64 text bodies (e.g. iso-8859-1)")
                        .action(clap::ArgAction::Set),
                )
                .arg(save_arg()),
        )
        .subcommand(
            Command::new("pdf")
                .about("Decode a base64 PDF payload and report its structure")
                .arg(input_arg())
                .arg(save_arg())
                .arg(
                    Arg::new("extract-text")
                        .long("extract-text")
                        .help("Also extract the PDF text layer")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("message")
                .about("Inspect a workflow message JSON with body and attachments")
                .arg(input_arg()),
        )
        .subcommand(
            Command::new("llm")
                .about("Check the LLM microservice endpoints")
                .arg(
                    Arg::new("url")
                        .long("url")
                        .value_name("URL")
                        .help("Service base URL (env: LLM_SERVICE_URL)")
                        .action(clap::ArgAction::Set),
                )
                .arg(
                    Arg::new("timeout")
                        .long("timeout")
                        .value_name("SECS")
                        .help("Per-request timeout in seconds (env: LLM_SERVICE_TIMEOUT_SECS)")
                        .value_parser(clap::value_parser!(u64))
                        .action(clap::ArgAction::Set),
                )
                .arg(
                    Arg::new("text")
                        .long("text")
                        .value_name("TEXT")
                        .help("Submission text for the extraction request")
                        .action(clap::ArgAction::Set),
                )
                .arg(
                    Arg::new("subject")
                        .long("subject")
                        .value_name("SUBJECT")
                        .action(clap::ArgAction::Set),
                )
                .arg(
                    Arg::new("sender")
                        .long("sender")
                        .value_name("EMAIL")
                        .action(clap::ArgAction::Set),
                )
                .arg(
                    Arg::new("attachment")
                        .long("attachment")
                        .value_name("FILENAME")
                        .help("Attachment filename to list in the request (repeatable)")
                        .action(clap::ArgAction::Append),
                ),
        )
}

fn read_input(matches: &ArgMatches) -> Result<String> {
    let source = matches
        .get_one::<String>("input")
        .map(String::as_str)
        .unwrap_or("-");

    if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read payload from stdin")?;
        return Ok(buf);
    }

    std::fs::read_to_string(source)
        .with_context(|| format!("failed to read payload from {}", source))
}

fn service_timeout(matches: &ArgMatches) -> Result<Duration> {
    if let Some(secs) = matches.get_one::<u64>("timeout") {
        return Ok(Duration::from_secs(*secs));
    }
    match env::var("LLM_SERVICE_TIMEOUT_SECS") {
        Ok(raw) => {
            let secs = raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("LLM_SERVICE_TIMEOUT_SECS is not a number: {}", raw))?;
            Ok(Duration::from_secs(secs))
        }
        Err(_) => Ok(DEFAULT_TIMEOUT),
    }
}

async fn run(matches: &ArgMatches) -> Result<CheckReport> {
    let registry = SignatureRegistry::builtin();

    match matches.subcommand() {
        Some(("payload", sub)) => {
            let payload = read_input(sub)?;
            let expected = match sub.get_one::<String>("expect") {
                Some(name) => Some(registry.get(name).with_context(|| {
                    format!(
                        "unknown format '{}' (known: {})",
                        name,
                        registry.names().join(", ")
                    )
                })?),
                None => None,
            };
            let save_to = sub.get_one::<PathBuf>("save");
            Ok(payload_report(
                "input",
                payload.trim(),
                registry,
                expected,
                sub.get_one::<String>("charset").map(String::as_str),
                save_to.map(PathBuf::as_path),
            ))
        }
        Some(("pdf", sub)) => {
            let payload = read_input(sub)?;
            let options = PdfCheckOptions {
                save_to: sub.get_one::<PathBuf>("save").map(PathBuf::as_path),
                extract_text: sub.get_flag("extract-text"),
            };
            Ok(inspect_pdf(&payload, &options))
        }
        Some(("message", sub)) => {
            let raw = read_input(sub)?;
            let message: WorkflowMessage =
                serde_json::from_str(&raw).context("workflow message is not valid JSON")?;
            Ok(inspect_message(&message, registry))
        }
        Some(("llm", sub)) => {
            let base_url = sub
                .get_one::<String>("url")
                .cloned()
                .or_else(|| env::var("LLM_SERVICE_URL").ok())
                .unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string());
            let timeout = service_timeout(sub)?;
            info!("Checking LLM service at {} (timeout {:?})", base_url, timeout);

            let mut request = sample_extraction_request();
            if let Some(text) = sub.get_one::<String>("text") {
                request.text = text.clone();
            }
            if let Some(subject) = sub.get_one::<String>("subject") {
                request.email_subject = Some(subject.clone());
            }
            if let Some(sender) = sub.get_one::<String>("sender") {
                request.sender_email = Some(sender.clone());
            }
            let attachments: Vec<String> = sub
                .get_many::<String>("attachment")
                .map(|values| values.cloned().collect())
                .unwrap_or_default();
            if !attachments.is_empty() {
                request.attachment_info = Some(attachments);
            }

            let client = LlmServiceClient::new(&base_url, timeout)
                .with_context(|| format!("cannot build client for {}", base_url))?;
            Ok(run_llm_check(&client, &request).await)
        }
        _ => anyhow::bail!("no subcommand given"),
    }
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();
    let quiet = matches.get_flag("quiet");

    // Logs go to stderr; stdout carries the report
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if quiet { "error" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if !quiet {
        print_box(&[
            "",
            "\x1b[1m\x1b[31m payload-inspect \x1b[0m",
            "",
            "\x1b[0m Workflow payload and LLM service diagnostics \x1b[0m",
            "",
        ]);
    }

    match run(&matches).await {
        Ok(report) => {
            println!("{}", report);
            if !report.passed() {
                warn!("Some checks failed");
                process::exit(1);
            }
        }
        Err(e) => {
            error!("{:#}", e);
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{cli, strip_ansi_codes};

    #[test]
    fn strips_ansi_sequences() {
        assert_eq!(strip_ansi_codes("\x1b[1m\x1b[31m bold \x1b[0m"), " bold ");
    }

    #[test]
    fn parses_llm_options() {
        let matches = cli()
            .try_get_matches_from([
                "payload-inspect",
                "llm",
                "--url",
                "http://localhost:9000",
                "--timeout",
                "5",
                "--attachment",
                "a.pdf",
                "--attachment",
                "b.pdf",
            ])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "llm");
        assert_eq!(sub.get_one::<u64>("timeout"), Some(&5));
        assert_eq!(sub.get_many::<String>("attachment").unwrap().count(), 2);
    }

    #[test]
    fn parses_payload_options() {
        let matches = cli()
            .try_get_matches_from([
                "payload-inspect",
                "payload",
                "--expect",
                "pdf",
                "--charset",
                "windows-1252",
            ])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "payload");
        assert_eq!(
            sub.get_one::<String>("charset").map(String::as_str),
            Some("windows-1252")
        );
    }

    #[test]
    fn requires_a_subcommand() {
        assert!(cli().try_get_matches_from(["payload-inspect"]).is_err());
        cli().debug_assert();
    }
}
