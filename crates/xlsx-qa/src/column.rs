//! Spreadsheet column letters (`A`, `Z`, `AA`, ...).
//!
//! Column letters are bijective base-26: there is no zero digit, so every step down a "place"
//! must subtract one after dividing. Dropping that `- 1` maps column 26 to `BA` instead of `AA`.

/// Convert a 0-based column index into A1 column letters.
pub fn col_to_name(col: u32) -> String {
    let mut n = i64::from(col);
    let mut out = Vec::<u8>::new();
    while n >= 0 {
        out.push(b'A' + (n % 26) as u8);
        n = n / 26 - 1;
    }
    out.reverse();
    out.into_iter().map(char::from).collect()
}

/// Parse A1 column letters back into a 0-based column index.
///
/// Returns `None` for empty input, non-letters, or values that overflow `u32`.
pub fn name_to_col(name: &str) -> Option<u32> {
    if name.is_empty() {
        return None;
    }
    let mut col: u32 = 0;
    for b in name.bytes() {
        if !b.is_ascii_alphabetic() {
            return None;
        }
        let v = u32::from(b.to_ascii_uppercase() - b'A') + 1;
        col = col.checked_mul(26)?.checked_add(v)?;
    }
    Some(col - 1)
}

/// A1 label for a 0-based column and a 1-based row (e.g. `(27, 5)` -> `AB5`).
pub fn cell_label(col: u32, row: u32) -> String {
    format!("{}{row}", col_to_name(col))
}
