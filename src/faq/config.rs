use super::{ IntentEntry, IntentTable };
use log::info;
use serde::Deserialize;
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;

#[derive(Debug)]
pub enum FaqConfigError {
    EmptyKeyword(usize),
    IoError(std::io::Error),
    JsonError(serde_json::Error),
}

impl fmt::Display for FaqConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaqConfigError::EmptyKeyword(index) =>
                write!(f, "Intent #{} has an empty keyword", index),
            FaqConfigError::IoError(e) => write!(f, "FAQ file IO error: {}", e),
            FaqConfigError::JsonError(e) => write!(f, "FAQ JSON parsing error: {}", e),
        }
    }
}

impl Error for FaqConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FaqConfigError::IoError(e) => Some(e),
            FaqConfigError::JsonError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FaqConfigError {
    fn from(err: std::io::Error) -> Self {
        FaqConfigError::IoError(err)
    }
}

impl From<serde_json::Error> for FaqConfigError {
    fn from(err: serde_json::Error) -> Self {
        FaqConfigError::JsonError(err)
    }
}

// `intents` is a list rather than a map so the file order survives parsing.
#[derive(Deserialize, Debug)]
struct IntentFile {
    intents: Vec<IntentEntry>,
    #[serde(default)]
    suggestions: Vec<String>,
    #[serde(default = "default_contact")]
    contact: String,
}

fn default_contact() -> String {
    "Still stuck? Contact our support team.".to_string()
}

pub fn parse_intents(json_str: &str) -> Result<IntentTable, FaqConfigError> {
    let file: IntentFile = serde_json::from_str(json_str)?;
    IntentTable::new(file.intents, file.suggestions, &file.contact)
}

pub fn load_intents<P: AsRef<Path>>(path: P) -> Result<IntentTable, FaqConfigError> {
    let json_str = fs::read_to_string(&path)?;
    let table = parse_intents(&json_str)?;
    info!("Loaded {} FAQ intents from {}", table.entries().len(), path.as_ref().display());
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_order_is_preserved() {
        let table = parse_intents(
            r#"{
                "intents": [
                    { "keyword": "Zebra", "response": "z" },
                    { "keyword": "apple", "response": "a" }
                ],
                "suggestions": ["Zebra?"],
                "contact": "write to us"
            }"#
        ).unwrap();

        let keywords: Vec<_> = table.entries().iter().map(|e| e.keyword.as_str()).collect();
        assert_eq!(keywords, vec!["zebra", "apple"]);
        assert_eq!(table.respond("apple zebra"), "z");
        assert!(table.fallback().ends_with("write to us"));
    }

    #[test]
    fn missing_contact_uses_default() {
        let table = parse_intents(r#"{ "intents": [] }"#).unwrap();
        assert!(table.fallback().ends_with("Contact our support team."));
        assert!(table.suggestions().is_empty());
    }

    #[test]
    fn load_reports_io_and_json_errors() {
        let missing = load_intents("/definitely/not/here.json").unwrap_err();
        assert!(matches!(missing, FaqConfigError::IoError(_)));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let broken = load_intents(file.path()).unwrap_err();
        assert!(matches!(broken, FaqConfigError::JsonError(_)));
    }

    #[test]
    fn load_reads_table_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "intents": [{{ "keyword": "grades", "response": "See your dashboard." }}] }}"#)
            .unwrap();
        let table = load_intents(file.path()).unwrap();
        assert_eq!(table.respond("Where are my GRADES?"), "See your dashboard.");
    }
}
