use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::{extract, ColumnLabels, ExtractOptions};

#[derive(Parser, Debug)]
#[command(
    about = "Extract question/answer records and their anchored images from an XLSX workbook."
)]
pub struct Args {
    /// Workbook to read.
    input: PathBuf,

    /// Directory receiving one JSON file per record.
    #[arg(long, value_name = "DIR", default_value = "json_output")]
    output_dir: PathBuf,

    /// Directory receiving extracted images (default: `<output-dir>/image`).
    #[arg(long, value_name = "DIR")]
    image_dir: Option<PathBuf>,

    /// JSON key holding each record's sheet name.
    #[arg(long, default_value = "シート名")]
    sheet_label: String,

    /// Header label of the classification column.
    #[arg(long, default_value = "分類")]
    classification_label: String,

    /// Header label of the item column.
    #[arg(long, default_value = "項目")]
    item_label: String,

    /// Header label of the sequence-number column.
    #[arg(long, default_value = "No.")]
    number_label: String,

    /// Header label of the question column.
    #[arg(long, default_value = "質問")]
    question_label: String,

    /// Header label of the answer column.
    #[arg(long, default_value = "回答")]
    answer_label: String,
}

impl Args {
    pub fn options(&self) -> ExtractOptions {
        let mut options = ExtractOptions::with_output_dir(&self.output_dir);
        if let Some(image_dir) = &self.image_dir {
            options.image_dir = image_dir.clone();
        }
        options.labels = ColumnLabels {
            sheet: self.sheet_label.clone(),
            classification: self.classification_label.clone(),
            item: self.item_label.clone(),
            number: self.number_label.clone(),
            question: self.question_label.clone(),
            answer: self.answer_label.clone(),
        };
        options
    }
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    run_with_args(args)
}

pub fn run_with_args(args: Args) -> Result<()> {
    let options = args.options();
    let summary = extract(&args.input, &options)
        .with_context(|| format!("extract records from {}", args.input.display()))?;

    log::info!(
        "{} record(s), {} image(s) written to {}",
        summary.records,
        summary.images,
        options.output_dir.display()
    );
    if !summary.orphans.is_empty() {
        log::warn!(
            "{} image row(s) were not attached to any record",
            summary.orphans.len()
        );
    }
    if !summary.overwritten.is_empty() {
        log::warn!(
            "{} record file(s) were overwritten by a record with the same sheet and number",
            summary.overwritten.len()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    #[test]
    fn defaults_match_library_defaults() {
        let args = Args::try_parse_from(["xlsx-qa", "faq.xlsx"]).unwrap();
        assert_eq!(args.options(), ExtractOptions::default());
    }

    #[test]
    fn image_dir_and_labels_can_be_overridden() {
        let args = Args::try_parse_from([
            "xlsx-qa",
            "faq.xlsx",
            "--output-dir",
            "out",
            "--image-dir",
            "pics",
            "--number-label",
            "番号",
        ])
        .unwrap();
        let options = args.options();
        assert_eq!(options.output_dir, Path::new("out"));
        assert_eq!(options.image_dir, Path::new("pics"));
        assert_eq!(options.labels.number, "番号");
        assert_eq!(options.labels.question, "質問");
    }

    #[test]
    fn image_dir_follows_output_dir() {
        let args = Args::try_parse_from(["xlsx-qa", "faq.xlsx", "--output-dir", "out"]).unwrap();
        assert_eq!(args.options().image_dir, Path::new("out").join("image"));
    }
}
