//! `mrdigest diff`: render a merge request's diff within the token budget.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use mrdigest_config::AppConfig;
use mrdigest_core::{MergeRequestSource, Tokenizer};
use mrdigest_diff::{BoundedDiff, CharEstimateTokenizer, Disposition, DiffPipeline, clip_tokens, main_language};
use serde::Serialize;

use crate::source::JsonFileSource;

#[derive(clap::Args)]
pub struct DiffArgs {
    /// Merge request JSON file
    #[arg(short, long)]
    pub input: PathBuf,

    /// Config file (defaults to ~/.mrdigest/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Extra context lines around each hunk
    #[arg(long)]
    pub context_lines: Option<usize>,

    /// Render hunks with new-side line numbers
    #[arg(long)]
    pub annotate: bool,

    /// Model context window in tokens
    #[arg(long)]
    pub max_tokens: Option<usize>,

    /// Tokens already used by the surrounding prompt
    #[arg(long, default_value_t = 0)]
    pub prompt_tokens: usize,

    /// Token cap for the merge request description
    #[arg(long, default_value_t = 500)]
    pub description_tokens: usize,

    /// Hugging Face tokenizer.json (requires the `hf` feature)
    #[arg(long)]
    pub tokenizer: Option<PathBuf>,

    /// Print a per-file allocation report to stderr
    #[arg(long)]
    pub report: bool,

    /// Output format on stdout
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Title, description and the bounded diff as plain text
    Text,
    /// One JSON document with the bounded diff and its allocation outcomes
    Json,
}

/// Machine-readable form of one `diff` invocation.
#[derive(Debug, Serialize)]
struct DiffDocument<'a> {
    title: &'a str,
    description: &'a str,
    tokenizer: &'a str,
    limit: usize,
    main_language: Option<&'a str>,
    diff: &'a BoundedDiff,
}

pub async fn run(args: DiffArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => AppConfig::load_with_env(path),
        None => AppConfig::load(),
    }
    .map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(n) = args.context_lines {
        config.diff.patch_extra_lines = n;
    }
    if args.annotate {
        config.diff.add_line_numbers = true;
    }
    if let Some(max) = args.max_tokens {
        config.budget.max_model_tokens = max;
    }
    config.validate()?;

    let tokenizer = build_tokenizer(args.tokenizer.as_deref())?;
    let source = JsonFileSource::load(&args.input).await?;

    // The description is part of the prompt, so it is paid for first
    let payload = source.payload();
    let description = clip_tokens(tokenizer.as_ref(), &payload.description, args.description_tokens)?;
    let prompt_tokens = args.prompt_tokens + tokenizer.count(&description)?;

    let tokenizer_name = tokenizer.name().to_string();
    let pipeline = DiffPipeline::from_config(&config, tokenizer);
    let diff = pipeline.run_for_source(&source, prompt_tokens).await?;

    let filenames: Vec<String> = source
        .diff_files()
        .await?
        .into_iter()
        .map(|f| f.filename)
        .collect();
    let language = main_language(&payload.languages, &filenames);
    let limit = config.budget.max_model_tokens;

    match args.format {
        OutputFormat::Text => {
            if !payload.title.is_empty() {
                println!("# {}\n", payload.title);
            }
            if !description.is_empty() {
                println!("{description}\n");
            }
            println!("{}", diff.text);
        }
        OutputFormat::Json => {
            let document = DiffDocument {
                title: &payload.title,
                description: &description,
                tokenizer: &tokenizer_name,
                limit,
                main_language: language.as_deref(),
                diff: &diff,
            };
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
    }

    if args.report {
        eprintln!("{}", render_report(&diff, limit, language.as_deref()));
    }

    Ok(())
}

fn build_tokenizer(path: Option<&Path>) -> Result<Arc<dyn Tokenizer>, Box<dyn std::error::Error>> {
    match path {
        None => Ok(Arc::new(CharEstimateTokenizer::default())),
        #[cfg(feature = "hf")]
        Some(path) => Ok(Arc::new(mrdigest_diff::HfTokenizer::from_file(path)?)),
        #[cfg(not(feature = "hf"))]
        Some(path) => Err(format!(
            "Cannot load {}: mrdigest was built without the `hf` feature",
            path.display()
        )
        .into()),
    }
}

fn render_report(diff: &BoundedDiff, limit: usize, language: Option<&str>) -> String {
    let mut out = String::new();
    out.push_str("📊 Allocation report\n");
    out.push_str("====================\n");
    out.push_str(&format!("  Tokens:     {} / {}\n", diff.total_tokens, limit));
    out.push_str(&format!("  Clipped:    {}\n", if diff.clipped { "yes" } else { "no" }));
    out.push_str(&format!("  Language:   {}\n", language.unwrap_or("-")));
    out.push('\n');

    for outcome in &diff.outcomes {
        let status = match outcome.disposition {
            Disposition::Full => "full".to_string(),
            Disposition::Reduced => "reduced".to_string(),
            Disposition::NameOnly(list) => format!("name only ({list:?})").to_lowercase(),
            Disposition::Dropped => "dropped".to_string(),
        };
        out.push_str(&format!(
            "  {:<20} {:>7}  {}\n",
            status, outcome.tokens, outcome.filename
        ));
    }
    out
}
