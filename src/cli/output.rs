//! CLI output formatting utilities.

use crate::ingestion::StageOutcome;
use console::{style, StyledObject};
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print one unit summary line plus a preview.
    pub fn unit_info(content_type: &str, source: &str, page: u32, id: &str, content: &str) {
        println!(
            "  {} {} {} p.{} ({})",
            style("*").cyan(),
            style(format!("[{}]", content_type)).magenta(),
            style(source).bold(),
            page,
            style(id).dim()
        );
        println!("    {}", content_preview(content, 120));
    }

    /// Print search result.
    pub fn search_result(content_type: &str, source: &str, page: u32, score: f32, content: &str) {
        println!(
            "\n{} {} p.{} {} (score: {:.2})",
            style(">>").green(),
            style(source).bold(),
            page,
            style(format!("[{}]", content_type)).magenta(),
            score
        );
        println!("   {}", content_preview(content, 200));
    }

    /// Print one row of the ingest report.
    pub fn stage_row(document: &str, text: &StageOutcome, images: &StageOutcome, tables: &StageOutcome) {
        println!(
            "  {:<32} text: {:<10} images: {:<10} tables: {}",
            style(document).bold(),
            stage_cell(text),
            stage_cell(images),
            stage_cell(tables)
        );
    }

    /// Create a progress bar.
    pub fn progress_bar(len: u64, msg: &str) -> ProgressBar {
        let pb = ProgressBar::new(len);
        if let Ok(bar_style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(bar_style.progress_chars("#>-"));
        }
        pb.set_message(msg.to_string());
        pb
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

fn stage_cell(outcome: &StageOutcome) -> StyledObject<String> {
    match outcome {
        StageOutcome::Extracted { count } => style(count.to_string()).green(),
        StageOutcome::Empty => style("-".to_string()).dim(),
        StageOutcome::Failed { .. } => style("failed".to_string()).red(),
    }
}

/// Single-line preview, cut on a character boundary.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    match content.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &content[..idx]),
        None => content,
    }
}
