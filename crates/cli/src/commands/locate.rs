//! `mrdigest locate`: map a quoted line to its patch position.

use std::path::PathBuf;

use mrdigest_core::MergeRequestSource;
use mrdigest_diff::{LineLocation, fill_missing_patch, locate_line};
use serde::Serialize;

use crate::source::JsonFileSource;

#[derive(Debug, Serialize)]
struct Located<'a> {
    file: &'a str,
    #[serde(flatten)]
    location: LineLocation,
}

pub async fn run(
    input: PathBuf,
    file: String,
    line: String,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = JsonFileSource::load(&input).await?;
    let mut files = source.diff_files().await?;
    files.iter_mut().for_each(fill_missing_patch);

    match locate_line(&files, &file, &line) {
        Some(location) if json => {
            let located = Located {
                file: file.trim(),
                location,
            };
            println!("{}", serde_json::to_string(&located)?);
        }
        Some(loc) => {
            println!("  File:      {}", file.trim());
            println!("  Position:  {}", loc.position);
            println!("  Line:      {}", loc.line_number);
        }
        None => {
            return Err(format!("No line matching {line:?} in {file}").into());
        }
    }

    Ok(())
}
