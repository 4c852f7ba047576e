//! Load raw report rows from local files.
//!
//! Two inputs are accepted:
//! - JSON: a bare array of rows, `{"items": [...]}`, or the API envelope
//!   `{"ok": true, "data": {"items": [...]}}`
//! - CSV: any encoding chardet recognizes, delimiter auto-detected from the
//!   header line
//!
//! Every row becomes a JSON object keyed by column name. Turning rows into
//! [`RawRecord`](crate::models::RawRecord)s is left to the caller, since the
//! column names depend on the report kind.

use serde_json::{Map, Value};
use std::path::Path;

use crate::api::logs::log_info;
use crate::error::{InputError, InputResult};

/// Rows plus what was detected while parsing.
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed rows as JSON objects
    pub rows: Vec<Value>,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
    /// Column headers
    pub headers: Vec<String>,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let charset = chardet::detect(bytes).0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes using `encoding`, falling back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::ISO_8859_15.decode(bytes).0.into_owned()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Detect the delimiter by counting occurrences in the first line.
///
/// Defaults to `,` when none of the candidates appear.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let mut best_sep = ',';
    let mut best_count = 0;

    for sep in [',', ';', '\t', '|'] {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse CSV text into row objects keyed by header.
///
/// Short rows are padded with empty strings, extra cells are dropped and
/// blank lines are skipped.
pub fn parse_csv_rows(content: &str, delimiter: char) -> InputResult<(Vec<String>, Vec<Value>)> {
    let content = content.trim_start_matches('\u{feff}');
    if content.trim().is_empty() {
        return Err(InputError::EmptyFile);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }

        let mut obj = Map::new();
        for (i, header) in headers.iter().enumerate() {
            let value = record.get(i).unwrap_or("");
            obj.insert(header.clone(), Value::String(value.to_string()));
        }
        rows.push(Value::Object(obj));
    }

    Ok((headers, rows))
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> InputResult<ParseResult> {
    if bytes.is_empty() {
        return Err(InputError::EmptyFile);
    }

    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);
    let (headers, rows) = parse_csv_rows(&content, delimiter)?;

    Ok(ParseResult {
        rows,
        encoding,
        delimiter,
        headers,
    })
}

/// Extract the row list from any accepted JSON layout.
pub fn parse_json_rows(value: Value) -> InputResult<Vec<Value>> {
    match value {
        Value::Array(rows) => Ok(rows),
        Value::Object(mut obj) => {
            if let Some(Value::Array(rows)) = obj.remove("items") {
                return Ok(rows);
            }
            match obj.remove("data") {
                Some(data) => parse_json_rows(data),
                None => Err(InputError::Layout(
                    "expected an array, {items}, or {data: {items}}".to_string(),
                )),
            }
        }
        other => Err(InputError::Layout(format!(
            "expected an array or object, found {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn looks_like_json(bytes: &[u8]) -> bool {
    let text = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
    matches!(
        text.iter().find(|b| !b.is_ascii_whitespace()),
        Some(b'[') | Some(b'{')
    )
}

/// Load rows from `path`, choosing JSON or CSV by extension or content.
pub fn load_rows<P: AsRef<Path>>(path: P) -> InputResult<Vec<Value>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    if bytes.is_empty() {
        return Err(InputError::EmptyFile);
    }

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or_else(|| looks_like_json(&bytes));

    if is_json {
        let text = String::from_utf8_lossy(&bytes);
        let value: Value = serde_json::from_str(text.trim_start_matches('\u{feff}'))?;
        let rows = parse_json_rows(value)?;
        log_info(format!("Loaded {} rows from {}", rows.len(), path.display()));
        return Ok(rows);
    }

    let result = parse_bytes_auto(&bytes)?;
    log_info(format!(
        "Loaded {} rows from {} (encoding {}, delimiter {:?})",
        result.rows.len(),
        path.display(),
        result.encoding,
        result.delimiter
    ));
    Ok(result.rows)
}
