// src/cli/init_settings.rs
use std::path::Path;

use crate::error::Result;
use crate::settings::io::save_settings_to_file;

pub fn run(config: Option<&Path>) -> Result<()> {
    let settings = super::load_settings(config)?;
    let path = save_settings_to_file(&settings, config)?;
    println!("Settings written to {}", path.display());
    Ok(())
}
