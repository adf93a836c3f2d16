use std::env;
use std::path::PathBuf;

use metric_relay::config::{read_config, Config};

use crate::config_data::write_sample_cfg;
use crate::CFG_FILE_NAME;

fn get_config_path() -> Option<PathBuf> {
    let exe_dir = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.to_path_buf()));
    if let Some(exe_dir) = exe_dir {
        if exe_dir.join(CFG_FILE_NAME).exists() {
            return Some(exe_dir.join(CFG_FILE_NAME));
        }
    }

    if let Ok(cur_dir) = env::current_dir() {
        if cur_dir.join(CFG_FILE_NAME).exists() {
            return Some(cur_dir.join(CFG_FILE_NAME));
        }
    }

    if let Some(cfg_dir) = dirs::config_dir() {
        if cfg_dir.join(CFG_FILE_NAME).exists() {
            return Some(cfg_dir.join(CFG_FILE_NAME));
        }
    }

    None
}

/// Config file (when there is one) with the environment applied on top.
pub(crate) fn open_config(cfg_path: Option<PathBuf>) -> Result<Config, String> {
    let mut config = match cfg_path.or_else(get_config_path) {
        Some(config_path) => {
            println!("Reading config from {}", config_path.display());
            read_config(&config_path).map_err(|e| e.to_string())?
        }
        None => {
            println!("No {} found. Using defaults and environment", CFG_FILE_NAME);
            Config::default()
        }
    };

    config.apply_process_env().map_err(|e| e.to_string())?;

    if config.metrics.is_empty() {
        return Err("No metrics configured. Set `metrics` in the config file or METRICS".to_string());
    }

    match config.log {
        Some(ref log) => match log.location {
            Some(ref location) => println!("Log enabled. Files will be written in {}", location.display()),
            None => println!("Log enabled on console"),
        },
        None => println!("Log disabled. Using stdout"),
    }

    Ok(config)
}

pub(crate) fn generate_cfg(config_path: &Option<PathBuf>) -> Result<PathBuf, String> {
    let path: PathBuf = match config_path {
        Some(path) => path.clone(),
        None => {
            let cfg_dir = dirs::config_dir().ok_or("Could not find user config dir")?;
            cfg_dir.join(CFG_FILE_NAME)
        }
    };

    println!("Writing sample config to {}", path.display());
    write_sample_cfg(&path).map_err(|e| e.to_string())?;

    Ok(path)
}
