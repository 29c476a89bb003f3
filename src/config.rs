use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;

fn default_max_file_size() -> usize {
    // 50 MB in bytes
    50 * 1024 * 1024
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub workbook_path: PathBuf,
    pub info_sheet: String,
    pub ticket_sheet_marker: String,
    pub bind_addr: SocketAddr,
    pub max_file_size: usize,
    pub cache_capacity: u64,
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {}: {}", name, e)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn new() -> Result<Self> {
        // Load .env file first
        dotenv().ok();

        let workbook_path = std::env::var("CS_WORKBOOK_PATH")
            .map(PathBuf::from)
            .map_err(|e| anyhow::anyhow!("Failed to load CS_WORKBOOK_PATH: {}", e))?;

        Ok(Config {
            workbook_path,
            info_sheet: std::env::var("CS_INFO_SHEET")
                .unwrap_or_else(|_| "Informações Gerais".to_string()),
            ticket_sheet_marker: std::env::var("CS_TICKET_SHEET_MARKER")
                .unwrap_or_else(|_| "Chamados Mensais".to_string()),
            bind_addr: parse_var("CS_BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 3000)))?,
            max_file_size: parse_var("CS_MAX_FILE_SIZE", default_max_file_size())?,
            cache_capacity: parse_var("CS_CACHE_CAPACITY", 4)?,
        })
    }
}

pub fn load_config() -> Result<Config> {
    Config::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_var_falls_back_and_rejects_garbage() {
        std::env::remove_var("CS_TEST_UNSET_CAPACITY");
        assert_eq!(parse_var("CS_TEST_UNSET_CAPACITY", 4u64).unwrap(), 4);

        std::env::set_var("CS_TEST_BAD_CAPACITY", "lots");
        assert!(parse_var("CS_TEST_BAD_CAPACITY", 4u64).is_err());

        std::env::set_var("CS_TEST_GOOD_CAPACITY", " 8 ");
        assert_eq!(parse_var("CS_TEST_GOOD_CAPACITY", 4u64).unwrap(), 8);
    }
}
