use anyhow::Context;
use log::info;
use std::{fs, path::Path};

pub fn create_folder(root_path: &str) -> Result<(), anyhow::Error> {
    let path = Path::new(root_path);

    if path.is_dir() {
        return Ok(());
    }

    fs::create_dir_all(path).with_context(|| format!("error creating folder {}", root_path))?;
    info!("folder created: {}", root_path);
    Ok(())
}
