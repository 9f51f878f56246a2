//! `assistline redact`: scrub text with the configured redactor.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use assistline_security::Redactor;

pub fn run(config_path: Option<&Path>, text: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let redactor = Redactor::from_config(&config.redaction)?;

    let input = match text {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let result = redactor.redact(input.trim_end_matches(['\r', '\n']));
    println!("{}", result.redacted_text);
    println!("{}", counts_json(&result.counts));
    Ok(())
}

fn counts_json(counts: &BTreeMap<String, usize>) -> String {
    serde_json::json!({ "counts": counts }).to_string()
}
