//! `assistline doctor`: diagnose configuration and providers.

use std::path::Path;
use std::time::Duration;

use assistline_providers::ProviderRegistry;
use assistline_security::Redactor;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("assistline doctor");
    println!("=================\n");

    let mut issues = 0;

    let path = super::config_path(config_path);
    if !path.exists() {
        println!("  ⚠️  No config file at {}, using defaults", path.display());
    }

    let config = match super::load_config(config_path) {
        Ok(config) => {
            println!("  ✅ Configuration valid");
            config
        }
        Err(e) => {
            println!("  ❌ Configuration invalid: {e}");
            return Err("configuration invalid".into());
        }
    };

    match Redactor::from_config(&config.redaction) {
        Ok(redactor) => println!(
            "  ✅ Redaction patterns compile ({} categories)",
            redactor.category_names().len()
        ),
        Err(e) => {
            println!("  ❌ Redaction pattern error: {e}");
            issues += 1;
        }
    }
    if !config.redaction.enabled {
        println!("  ⚠️  Redaction is disabled; capabilities will see raw text");
    }

    if config.contact_center.webhook_secret.is_none() {
        println!("  ⚠️  No webhook secret; contact-center signatures are not verified");
    }

    match ProviderRegistry::from_config(&config) {
        Ok(registry) => {
            match &registry.generator {
                Some(generator) => {
                    let reachable = matches!(
                        tokio::time::timeout(PROBE_TIMEOUT, generator.health_check()).await,
                        Ok(Ok(true))
                    );
                    if reachable {
                        println!("  ✅ Generator '{}' reachable", generator.name());
                    } else {
                        println!("  ❌ Generator '{}' unreachable", generator.name());
                        issues += 1;
                    }
                }
                None => println!("  ⚠️  No text generator; only next-action heuristics available"),
            }

            if let Some(intent) = &registry.intent {
                let reachable = matches!(
                    tokio::time::timeout(PROBE_TIMEOUT, intent.health_check()).await,
                    Ok(Ok(true))
                );
                if reachable {
                    println!("  ✅ Intent detector '{}' reachable", intent.name());
                } else {
                    println!("  ❌ Intent detector '{}' unreachable", intent.name());
                    issues += 1;
                }
            }

            let crm_ok = matches!(
                tokio::time::timeout(PROBE_TIMEOUT, registry.crm.health_check()).await,
                Ok(Ok(true))
            );
            if crm_ok {
                println!("  ✅ CRM '{}' reachable", registry.crm.name());
            } else {
                println!("  ❌ CRM '{}' unreachable", registry.crm.name());
                issues += 1;
            }
        }
        Err(e) => {
            println!("  ❌ Provider setup failed: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  All checks passed.");
        Ok(())
    } else {
        println!("  {issues} issue(s) found. See above for details.");
        Err(format!("{issues} issue(s) found").into())
    }
}
