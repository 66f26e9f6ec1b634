//! Plate-reader grid parsing with encoding auto-detection.
//!
//! - [`line`] - classify a row and extract its row letter and payload
//! - [`grid`] - scan a whole export into the flat data/identifier buffers
//!
//! Instrument exports are frequently Windows-1252 or Latin-1, so byte input
//! is decoded before it is scanned.

pub mod grid;
pub mod line;

pub use grid::{parse_grid, GridAssembler, GridReport, MalformedRow, MalformedRowPolicy, PlateGrid};
pub use line::{classify, extract_row, parse_data_row, parse_identifier_row, LineType};

use std::path::Path;

use crate::error::{GridError, GridResult};

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParsedPlate {
    /// Flat plate buffers
    pub grid: PlateGrid,
    /// Line counts and skipped rows
    pub report: GridReport,
    /// Detected or used encoding
    pub encoding: String,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> GridResult<String> {
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => String::from_utf8_lossy(bytes).to_string(),
        },
        // Latin-1 exports are decoded as its Windows-1252 superset
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.to_string()
        }
        other => match encoding_rs::Encoding::for_label(other.as_bytes()) {
            Some(enc) => {
                let (text, _, had_errors) = enc.decode(bytes);
                if had_errors {
                    return Err(GridError::Encoding(format!("invalid {} input", enc.name())));
                }
                text.to_string()
            }
            // Fallback: try UTF-8 with lossy conversion
            None => String::from_utf8_lossy(bytes).to_string(),
        },
    };

    Ok(decoded)
}

/// Parse plate-export bytes with encoding auto-detection.
pub fn parse_bytes_auto(bytes: &[u8], policy: MalformedRowPolicy) -> GridResult<ParsedPlate> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let (grid, report) = GridAssembler::new(policy).parse(content.as_bytes())?;

    Ok(ParsedPlate {
        grid,
        report,
        encoding,
    })
}

/// Parse a plate-export CSV file with encoding auto-detection.
pub fn parse_csv_file_auto<P: AsRef<Path>>(path: P, policy: MalformedRowPolicy) -> GridResult<ParsedPlate> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes, policy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_parse() {
        let csv = "A,Ctrl_unpulsed,S1,S2,S3\nA,10,20,30,15,25,35,5,5,5,0,0,0\n";
        let parsed = parse_bytes_auto(csv.as_bytes(), MalformedRowPolicy::Abort).unwrap();

        assert_eq!(parsed.encoding, "utf-8");
        assert_eq!(parsed.grid.identifiers()[0], "Ctrl_unpulsed");
        assert_eq!(parsed.grid.data()[2], 30);
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1").unwrap();
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_windows_1252_names_survive() {
        // "A,Ctrl,Sérum,S2,S3" with é as 0xE9
        let mut bytes = b"A,Ctrl,S".to_vec();
        bytes.push(0xE9);
        bytes.extend_from_slice(b"rum,S2,S3\n");

        let decoded = decode_content(&bytes, "windows-1252").unwrap();
        let (grid, _) = GridAssembler::default().parse(decoded.as_bytes()).unwrap();
        assert_eq!(grid.identifiers()[1], "Sérum");
    }

    #[test]
    fn test_missing_file() {
        let err = parse_csv_file_auto("/nonexistent/plate.csv", MalformedRowPolicy::Abort).unwrap_err();
        assert!(matches!(err, GridError::Io(_)));
    }
}
