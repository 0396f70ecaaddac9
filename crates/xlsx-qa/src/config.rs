use std::path::PathBuf;

/// Header labels of the question/answer columns.
///
/// Record fields are written under these exact strings because downstream consumers match on
/// them. The defaults are the labels used by the FAQ workbooks this tool was built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLabels {
    /// Not a worksheet column: the key under which each record stores its sheet name.
    pub sheet: String,
    pub classification: String,
    pub item: String,
    pub number: String,
    pub question: String,
    pub answer: String,
}

impl Default for ColumnLabels {
    fn default() -> Self {
        Self {
            sheet: "シート名".to_string(),
            classification: "分類".to_string(),
            item: "項目".to_string(),
            number: "No.".to_string(),
            question: "質問".to_string(),
            answer: "回答".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Directory receiving one JSON file per record.
    pub output_dir: PathBuf,
    /// Directory receiving extracted pictures.
    pub image_dir: PathBuf,
    pub labels: ColumnLabels,
}

impl ExtractOptions {
    /// Records in `output_dir`, pictures in `output_dir/image`.
    pub fn with_output_dir(output_dir: impl Into<PathBuf>) -> Self {
        let output_dir = output_dir.into();
        Self {
            image_dir: output_dir.join("image"),
            output_dir,
            labels: ColumnLabels::default(),
        }
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::with_output_dir("json_output")
    }
}
