use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use pretty_assertions::assert_eq;
use rust_xlsxwriter::{Format, Image, Workbook, Worksheet};
use serde_json::Value;
use xlsx_qa::{extract, extract_records, ExtractError, ExtractOptions, StructuralError};

const PNG_1X1_TRANSPARENT_B64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mP8/x8AAwMB/6XgdAAAAABJRU5ErkJggg==";

fn png_image() -> Image {
    let png_bytes = STANDARD
        .decode(PNG_1X1_TRANSPARENT_B64)
        .expect("decode png base64");
    Image::new_from_buffer(&png_bytes).expect("image from buffer")
}

fn write_header(sheet: &mut Worksheet) {
    for (col, label) in ["分類", "項目", "No.", "質問", "回答"].iter().enumerate() {
        sheet.write_string(0, col as u16, *label).unwrap();
    }
}

/// Two records: rows 2-3 (merged classification/item, two question lines) and row 4.
fn write_faq_rows(sheet: &mut Worksheet, first_number: &str) {
    let merged = Format::new();
    sheet.merge_range(1, 0, 2, 0, "請求", &merged).unwrap();
    sheet.merge_range(1, 1, 2, 1, "支払い", &merged).unwrap();
    sheet.write_string(1, 2, first_number).unwrap();
    sheet.write_string(1, 3, "支払方法は?").unwrap();
    sheet.write_string(2, 3, "分割できますか?").unwrap();
    sheet.write_string(1, 4, "カード払いです").unwrap();

    sheet.write_string(3, 0, "契約").unwrap();
    sheet.write_string(3, 1, "解約").unwrap();
    sheet.write_number(3, 2, 2).unwrap();
    sheet.write_string(3, 3, "解約方法は?").unwrap();
    sheet.write_string(3, 4, "窓口へどうぞ").unwrap();
}

fn faq_workbook() -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("FAQ").unwrap();
    write_header(sheet);
    write_faq_rows(sheet, "1");

    let image = png_image();
    // A2 and D3 fall in the first record, E4 in the second.
    sheet.insert_image(1, 0, &image).unwrap();
    sheet.insert_image(2, 3, &image).unwrap();
    sheet.insert_image(3, 4, &image).unwrap();

    workbook.save_to_buffer().unwrap()
}

fn read_json(path: &Path) -> Value {
    serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
}

fn file_name(path: &str) -> &str {
    Path::new(path).file_name().unwrap().to_str().unwrap()
}

fn json_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    files
}

/// `(file name, bytes)` of every file in `dir`, sorted by name.
fn dir_snapshot(dir: &Path) -> Vec<(String, Vec<u8>)> {
    let mut files: Vec<(String, Vec<u8>)> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.is_file())
        .map(|path| {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            (name, fs::read(&path).unwrap())
        })
        .collect();
    files.sort();
    files
}

#[test]
fn records_carry_joined_text_and_their_images() {
    let dir = tempfile::tempdir().unwrap();
    let options = ExtractOptions::with_output_dir(dir.path().join("out"));

    let summary = extract_records(&faq_workbook(), "faq", &options).unwrap();
    assert_eq!(summary.records, 2);
    assert_eq!(summary.images, 3);
    assert!(summary.orphans.is_empty());
    assert_eq!(
        summary.written,
        vec![
            options.output_dir.join("faq_FAQ_QA_1.json"),
            options.output_dir.join("faq_FAQ_QA_2.json"),
        ]
    );

    let first = read_json(&summary.written[0]);
    assert_eq!(first["シート名"], "FAQ");
    assert_eq!(first["分類"], "請求");
    assert_eq!(first["項目"], "支払い");
    assert_eq!(first["No."], 1);
    assert_eq!(first["質問"], "支払方法は?\n分割できますか?");
    assert_eq!(first["回答"], "カード払いです");
    let urls: Vec<&str> = first["image_urls"]
        .as_array()
        .unwrap()
        .iter()
        .map(|url| file_name(url.as_str().unwrap()))
        .collect();
    assert_eq!(urls.len(), 2);
    assert!(urls[0].starts_with("FAQ_A2_"), "{urls:?}");
    assert!(urls[1].starts_with("FAQ_D3_"), "{urls:?}");

    let second = read_json(&summary.written[1]);
    assert_eq!(second["No."], 2);
    assert_eq!(second["分類"], "契約");
    let urls = second["image_urls"].as_array().unwrap();
    assert_eq!(urls.len(), 1);
    assert!(file_name(urls[0].as_str().unwrap()).starts_with("FAQ_E4_"));

    for url in first["image_urls"].as_array().unwrap() {
        assert!(Path::new(url.as_str().unwrap()).is_file(), "{url}");
    }
}

#[test]
fn keys_are_written_in_column_order() {
    let dir = tempfile::tempdir().unwrap();
    let options = ExtractOptions::with_output_dir(dir.path());

    let summary = extract_records(&faq_workbook(), "faq", &options).unwrap();
    let text = fs::read_to_string(&summary.written[1]).unwrap();

    let positions: Vec<usize> = ["シート名", "分類", "項目", "No.", "質問", "回答", "image_urls"]
        .iter()
        .map(|key| text.find(&format!("\"{key}\"")).unwrap())
        .collect();
    let mut sorted = positions.clone();
    sorted.sort_unstable();
    assert_eq!(positions, sorted);
    assert!(text.starts_with("{\n  \"シート名\": \"FAQ\","), "{text}");
}

#[test]
fn rerunning_produces_identical_files() {
    let dir = tempfile::tempdir().unwrap();
    let options = ExtractOptions::with_output_dir(dir.path());
    let bytes = faq_workbook();

    let first = extract_records(&bytes, "faq", &options).unwrap();
    let records = dir_snapshot(dir.path());
    let images = dir_snapshot(&options.image_dir);
    assert_eq!(records.len(), 2);
    assert_eq!(images.len(), 3);

    let second = extract_records(&bytes, "faq", &options).unwrap();
    assert_eq!(first, second);
    assert_eq!(dir_snapshot(dir.path()), records);
    assert_eq!(dir_snapshot(&options.image_dir), images);
}

#[test]
fn non_numeric_sequence_number_aborts_before_any_record_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let options = ExtractOptions::with_output_dir(dir.path());

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("FAQ").unwrap();
    write_header(sheet);
    write_faq_rows(sheet, "abc");
    let bytes = workbook.save_to_buffer().unwrap();

    let err = extract_records(&bytes, "faq", &options).unwrap_err();
    assert!(
        matches!(
            err,
            ExtractError::TypeCoercion { ref sheet, row: 2, ref value } if sheet == "FAQ" && value == "abc"
        ),
        "{err:?}"
    );
    assert!(json_files(dir.path()).is_empty());
}

#[test]
fn image_below_the_table_is_an_orphan() {
    let dir = tempfile::tempdir().unwrap();
    let options = ExtractOptions::with_output_dir(dir.path());

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("FAQ").unwrap();
    write_header(sheet);
    write_faq_rows(sheet, "1");
    sheet.insert_image(10, 1, &png_image()).unwrap();
    let bytes = workbook.save_to_buffer().unwrap();

    let summary = extract_records(&bytes, "faq", &options).unwrap();
    assert_eq!(summary.images, 1);
    assert_eq!(summary.orphans, vec![("FAQ".to_string(), 11)]);
    for path in &summary.written {
        assert_eq!(read_json(path)["image_urls"], Value::Array(Vec::new()));
    }
    // The orphan is still saved.
    assert!(options.image_dir.join("FAQ_B11_image1.png").is_file());
}

#[test]
fn sheets_without_drawings_still_produce_records() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("support.xlsx");

    let mut workbook = Workbook::new();
    let with_images = workbook.add_worksheet();
    with_images.set_name("A").unwrap();
    write_header(with_images);
    write_faq_rows(with_images, "1");
    with_images.insert_image(3, 3, &png_image()).unwrap();

    let plain = workbook.add_worksheet();
    plain.set_name("B").unwrap();
    write_header(plain);
    write_faq_rows(plain, "5");
    workbook.save(&input).unwrap();

    let options = ExtractOptions::with_output_dir(dir.path().join("json"));
    let summary = extract(&input, &options).unwrap();

    let names: Vec<&str> = summary
        .written
        .iter()
        .map(|path| path.file_name().unwrap().to_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec![
            "support_A_QA_1.json",
            "support_A_QA_2.json",
            "support_B_QA_5.json",
            "support_B_QA_2.json",
        ]
    );
    assert_eq!(read_json(&summary.written[1])["image_urls"].as_array().unwrap().len(), 1);
    assert_eq!(read_json(&summary.written[2])["シート名"], "B");
    assert_eq!(read_json(&summary.written[2])["image_urls"], Value::Array(Vec::new()));
}

#[test]
fn repeated_sequence_numbers_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let options = ExtractOptions::with_output_dir(dir.path());

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("FAQ").unwrap();
    write_header(sheet);
    write_faq_rows(sheet, "2");
    let bytes = workbook.save_to_buffer().unwrap();

    let summary = extract_records(&bytes, "faq", &options).unwrap();
    let path = options.output_dir.join("faq_FAQ_QA_2.json");
    assert_eq!(summary.records, 2);
    assert_eq!(summary.written, vec![path.clone(), path.clone()]);
    assert_eq!(summary.overwritten, vec![path.clone()]);
    assert_eq!(read_json(&path)["分類"], "契約");
    assert_eq!(json_files(dir.path()).len(), 1);
}

#[test]
fn missing_header_column_is_structural() {
    let dir = tempfile::tempdir().unwrap();
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "分類").unwrap();
    sheet.write_string(0, 1, "質問").unwrap();
    let bytes = workbook.save_to_buffer().unwrap();

    let err = extract_records(&bytes, "faq", &ExtractOptions::with_output_dir(dir.path()))
        .unwrap_err();
    assert!(
        matches!(
            err,
            ExtractError::Structural(StructuralError::MissingColumn { ref label, .. }) if label == "項目"
        ),
        "{err:?}"
    );
}

#[test]
fn unreadable_input_is_a_filesystem_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = extract(
        &dir.path().join("missing.xlsx"),
        &ExtractOptions::with_output_dir(dir.path()),
    )
    .unwrap_err();
    assert!(matches!(err, ExtractError::Filesystem { .. }), "{err:?}");
}
