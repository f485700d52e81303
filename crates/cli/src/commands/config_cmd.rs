//! `mrdigest config`: configuration management commands.

use mrdigest_config::AppConfig;

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let mut warnings = Vec::new();

            if config.budget.max_model_tokens
                <= config.budget.soft_buffer.max(config.budget.hard_buffer) * 2
            {
                warnings.push("Buffers take more than half of the token window");
            }

            if config.budget.hard_buffer > config.budget.soft_buffer {
                warnings.push("hard_buffer is larger than soft_buffer; clipping will stop early");
            }

            if config.diff.patch_extra_lines > 20 {
                warnings.push("patch_extra_lines above 20 rarely fits a budget");
            }

            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Tokens:     {}", config.budget.max_model_tokens);
            println!(
                "   Buffers:    soft {} / hard {}",
                config.budget.soft_buffer, config.budget.hard_buffer
            );
            println!("   Context:    {} lines", config.diff.patch_extra_lines);
            println!(
                "   Ignore:     {} globs, {} regexes",
                config.ignore.glob.len(),
                config.ignore.regex.len()
            );
            println!("   Languages:  {}", config.language_extensions.len());
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub async fn show(defaults: bool) -> Result<(), Box<dyn std::error::Error>> {
    if defaults {
        println!("{}", AppConfig::default_toml());
        return Ok(());
    }
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}
