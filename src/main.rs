use std::path::Path;
use std::process::ExitCode;
use tracing::info;

use dotenvy::dotenv;

mod audio;
mod dialogue;
mod diarize;
mod models;
mod normalize;
mod pipeline;
mod report;
mod transcribe;

use pipeline::{ModelRegistry, Pipeline};

const USAGE: &str = "\
Usage: colloquy <audio-file> [model-size] [--report] [--json]

  model-size   whisper model: tiny, base, small (default), medium, large
  --report     classify the transcript into report sections
  --json       print the full result as JSON";

struct Args {
    input: String,
    model: String,
    report: bool,
    json: bool,
}

fn parse_args(args: impl Iterator<Item = String>) -> Option<Args> {
    let mut input = None;
    let mut model = None;
    let mut report = false;
    let mut json = false;

    for arg in args {
        match arg.as_str() {
            "--report" => report = true,
            "--json" => json = true,
            "--help" | "-h" => return None,
            _ if input.is_none() => input = Some(arg),
            _ if model.is_none() => model = Some(arg),
            _ => return None,
        }
    }

    Some(Args {
        input: input?,
        model: model.unwrap_or_else(|| "small".to_string()),
        report,
        json,
    })
}

fn main() -> ExitCode {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let Some(args) = parse_args(std::env::args().skip(1)) else {
        eprintln!("{}", USAGE);
        return ExitCode::FAILURE;
    };

    let registry = ModelRegistry::with_default_models();
    let mut pipeline = Pipeline::new(registry);

    let result = pipeline.process(Path::new(&args.input), &args.model);

    if args.json {
        match serde_json::to_string_pretty(&result) {
            Ok(rendered) => println!("{}", rendered),
            Err(e) => {
                eprintln!("Failed to serialize result: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        print!("{}", dialogue::render_dialogue(&result.dialogue));

        if args.report {
            if let Some(text) = result.processed_text.as_deref() {
                let sections = report::classify_sentences(text);
                println!();
                print!("{}", report::render_report(&sections));
            } else {
                info!("No processed text available for report generation");
            }
        }
    }

    match result.error {
        Some(error) => {
            eprintln!("Processing failed: {}", error);
            ExitCode::FAILURE
        }
        None => ExitCode::SUCCESS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Option<Args> {
        parse_args(raw.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_minimal() {
        let parsed = args(&["meeting.mp3"]).unwrap();

        assert_eq!(parsed.input, "meeting.mp3");
        assert_eq!(parsed.model, "small");
        assert!(!parsed.report);
        assert!(!parsed.json);
    }

    #[test]
    fn test_parse_model_and_flags() {
        let parsed = args(&["meeting.mp3", "large", "--report", "--json"]).unwrap();

        assert_eq!(parsed.model, "large");
        assert!(parsed.report);
        assert!(parsed.json);
    }

    #[test]
    fn test_parse_rejects_missing_input_and_extras() {
        assert!(args(&[]).is_none());
        assert!(args(&["--report"]).is_none());
        assert!(args(&["a.mp3", "small", "extra"]).is_none());
        assert!(args(&["a.mp3", "--help"]).is_none());
    }
}
