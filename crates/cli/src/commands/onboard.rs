//! `draftloop onboard` — First-time setup.

use draftloop_config::AppConfig;
use std::path::Path;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();

    println!("draftloop — First-Time Setup");
    println!("============================\n");

    let created = write_default_config(&config_dir)?;
    let config_path = config_dir.join("config.toml");

    if created {
        println!("✅ Created config.toml at: {}", config_path.display());
        println!("\n📝 Next steps:");
        println!("   1. Edit {} and add your API key", config_path.display());
        println!("      (or export OPENROUTER_API_KEY)");
        println!("   2. Run: draftloop refine \"a short story about cats\"\n");
    } else {
        println!("⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    }

    Ok(())
}

/// Create `dir/config.toml` with defaults. Returns `false` if it exists.
fn write_default_config(dir: &Path) -> std::io::Result<bool> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
    }

    let config_path = dir.join("config.toml");
    if config_path.exists() {
        return Ok(false);
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    Ok(true)
}
