//! `assistline status`: show the resolved configuration.

use std::path::Path;

use assistline_config::AppConfig;
use assistline_core::assist::ConfidenceAggregation;

fn set_or_missing(value: bool) -> &'static str {
    if value { "set" } else { "not set" }
}

pub fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let path = super::config_path(config_path);
    let config = AppConfig::load_from(&path).map_err(|e| format!("Failed to load config: {e}"))?;

    println!("assistline status");
    println!("=================");
    println!("  Config file:   {}{}", path.display(), if path.exists() { "" } else { " (missing, defaults)" });
    println!("  Gateway:       {}:{}", config.gateway.host, config.gateway.port);
    println!(
        "  Generator:     {} / {} (api key {})",
        config.generator.provider,
        config.generator.model,
        set_or_missing(config.has_api_key())
    );
    println!(
        "  Intent:        {}",
        if config.intent.enabled {
            config.intent.endpoint.as_deref().unwrap_or("(no endpoint)")
        } else {
            "disabled"
        }
    );
    println!("  CRM:           {}", config.crm.provider);
    println!(
        "  Redaction:     {} ({} custom categories)",
        if config.redaction.enabled { "enabled" } else { "DISABLED" },
        config.redaction.custom_categories.len()
    );
    println!(
        "  Assist:        window {} msgs, deadline {} ms (max {} ms)",
        config.assist.history_window, config.assist.default_deadline_ms, config.assist.max_deadline_ms
    );
    let confidence = match config.assist.confidence {
        ConfidenceAggregation::Mean => "mean".to_string(),
        ConfidenceAggregation::Weighted { smart_replies, knowledge } => {
            format!("weighted (replies {smart_replies}, knowledge {knowledge})")
        }
    };
    println!("  Confidence:    {confidence}");
    println!(
        "  Webhook:       secret {}, header {}",
        set_or_missing(config.contact_center.webhook_secret.is_some()),
        config.contact_center.signature_header
    );
    println!(
        "  Audit:         {}",
        if config.audit.enabled { "enabled" } else { "disabled" }
    );

    Ok(())
}
