use std::path::Path;

use crate::error::{Result, SitebookError};
use crate::settings::{save_settings, Settings};

use super::{effective_settings, resolve_settings_path};

pub fn init(config: Option<&Path>, force: bool) -> Result<()> {
    let path = resolve_settings_path(config);
    if path.exists() && !force {
        return Err(SitebookError::Settings(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    save_settings(&Settings::default(), &path)?;
    println!("Wrote default settings to {}", path.display());
    Ok(())
}

pub fn show(config: Option<&Path>) -> Result<()> {
    let settings = effective_settings(config)?;
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}
