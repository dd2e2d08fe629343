//! `draftloop config` — Configuration management commands.

use draftloop_config::{AppConfig, ApprovalMode};

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let warnings = warnings(&config);
            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Provider:        {}", config.default_provider);
            println!("   Model:           {}", config.active_model());
            println!("   Max iterations:  {}", config.refinement.max_iterations);
            println!(
                "   Approval:        {:?} ({})",
                config.refinement.approval_token,
                match config.refinement.approval_mode {
                    ApprovalMode::Exact => "exact match",
                    ApprovalMode::ContainsToken => "contains token",
                }
            );
            println!("   Retry attempts:  {}", config.retry.attempts);
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

/// Non-fatal problems worth pointing out.
fn warnings(config: &AppConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if !config.has_api_key() {
        warnings.push(
            "No API key set (set OPENROUTER_API_KEY, OPENAI_API_KEY or DRAFTLOOP_API_KEY)".into(),
        );
    }

    let token = &config.refinement.approval_token;
    if !config.prompts.critic.contains("{approval_token}") && !config.prompts.critic.contains(token.as_str()) {
        warnings.push(format!(
            "Critic prompt never mentions the approval token {token:?}; the loop may never approve"
        ));
    }

    if !config.prompts.refiner.contains("{artifact}") || !config.prompts.refiner.contains("{critique}") {
        warnings.push("Refiner prompt should reference both {artifact} and {critique}".into());
    }

    warnings
}

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    redact(&mut config);
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

fn redact(config: &mut AppConfig) {
    if config.api_key.is_some() {
        config.api_key = Some("***".into());
    }
    for provider in config.providers.values_mut() {
        if provider.api_key.is_some() {
            provider.api_key = Some("***".into());
        }
    }
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use draftloop_config::ProviderConfig;

    #[test]
    fn config_path_is_valid() {
        let path = AppConfig::config_dir().join("config.toml");
        assert!(path.to_str().unwrap().contains("config.toml"));
    }

    #[test]
    fn default_config_only_warns_about_key() {
        let warnings = warnings(&AppConfig::default());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("API key"));
    }

    #[test]
    fn warns_on_prompts_without_placeholders() {
        let mut config = AppConfig {
            api_key: Some("sk-test".into()),
            ..AppConfig::default()
        };
        config.prompts.critic = "Be harsh.".into();
        config.prompts.refiner = "Rewrite it.".into();

        let warnings = warnings(&config);
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn redacts_all_keys() {
        let mut config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        config.providers.insert(
            "openai".into(),
            ProviderConfig {
                api_key: Some("sk-other".into()),
                api_url: None,
                default_model: None,
            },
        );

        redact(&mut config);
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(!toml_str.contains("sk-secret"));
        assert!(!toml_str.contains("sk-other"));
    }
}
