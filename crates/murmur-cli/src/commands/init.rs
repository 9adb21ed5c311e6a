//! Writes starter configuration files.

use anyhow::{Context, Result, bail};
use murmur_core::config::{MurmurSettings, PersonaRoster};
use murmur_core::persona::default_roster;
use murmur_infrastructure::TomlSettingsRepository;
use murmur_infrastructure::storage::write_atomic;

use crate::render;
use crate::runtime::GlobalOpts;

/// Writes the default settings and the built-in roster for editing.
pub async fn run(opts: &GlobalOpts, force: bool) -> Result<()> {
    let settings_path = opts.settings_path()?;
    let personas_path = opts.personas_path()?;

    if !force {
        for path in [&settings_path, &personas_path] {
            if path.exists() {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
        }
    }

    TomlSettingsRepository::with_path(settings_path.clone())
        .save(&MurmurSettings::default())
        .await
        .context("Failed to write settings")?;

    let roster = PersonaRoster {
        personas: default_roster(),
    };
    let content = toml::to_string_pretty(&roster).context("Failed to serialize roster")?;
    write_atomic(&personas_path, content.as_bytes())
        .await
        .context("Failed to write personas")?;

    println!("{}", render::system_line(&format!("Wrote {}", settings_path.display())));
    println!("{}", render::system_line(&format!("Wrote {}", personas_path.display())));
    Ok(())
}
