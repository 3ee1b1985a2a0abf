//! INI file configuration adapter.
//!
//! Section and key names are case-sensitive: `[variables]` keys become DSL
//! identifiers and `[position.<SYMBOL>]` carries a symbol.

use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut config = Ini::new_cs();
        config.load(path).map_err(std::io::Error::other)?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new_cs();
        config.read(content.to_string())?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn entries(&self, section: &str) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = self
            .config
            .get_map_ref()
            .get(section)
            .map(|keys| {
                keys.iter()
                    .map(|(k, v)| (k.clone(), v.clone().unwrap_or_default()))
                    .collect()
            })
            .unwrap_or_default();
        entries.sort();
        entries
    }

    fn sections(&self) -> Vec<String> {
        let mut sections = self.config.sections();
        sections.sort();
        sections
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[strategy]
name = Trend Follow
file = strategies/trend.qf

[data]
directory = ./data
symbols = BTCUSDT,ETHUSDT
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("strategy", "name"),
            Some("Trend Follow".to_string())
        );
        assert_eq!(
            adapter.get_string("data", "symbols"),
            Some("BTCUSDT,ETHUSDT".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[data]\ndirectory = ./data\n").unwrap();
        assert_eq!(adapter.get_string("data", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn keys_are_case_sensitive() {
        let adapter =
            FileConfigAdapter::from_string("[variables]\nfastPeriod = 9\n").unwrap();
        assert_eq!(
            adapter.get_string("variables", "fastPeriod"),
            Some("9".to_string())
        );
        assert_eq!(adapter.get_string("variables", "fastperiod"), None);
    }

    #[test]
    fn get_double_returns_value_or_default() {
        let adapter =
            FileConfigAdapter::from_string("[strategy]\norder_quantity = 2.5\nbad = x\n").unwrap();
        assert_eq!(adapter.get_double("strategy", "order_quantity", 1.0), 2.5);
        assert_eq!(adapter.get_double("strategy", "missing", 99.9), 99.9);
        assert_eq!(adapter.get_double("strategy", "bad", 99.9), 99.9);
    }

    #[test]
    fn inline_code_keeps_operators() {
        let adapter =
            FileConfigAdapter::from_string("[strategy]\ncode = close > sma(close, 20)\n").unwrap();
        assert_eq!(
            adapter.get_string("strategy", "code"),
            Some("close > sma(close, 20)".to_string())
        );
    }

    #[test]
    fn entries_are_sorted() {
        let adapter =
            FileConfigAdapter::from_string("[variables]\nslow = 21\nfast = 9\n").unwrap();
        assert_eq!(
            adapter.entries("variables"),
            vec![
                ("fast".to_string(), "9".to_string()),
                ("slow".to_string(), "21".to_string()),
            ]
        );
        assert!(adapter.entries("missing").is_empty());
    }

    #[test]
    fn sections_lists_position_sections() {
        let content = "[data]\ndirectory = d\n\n[position.BTCUSDT]\nsize = 1\n";
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.sections(),
            vec!["data".to_string(), "position.BTCUSDT".to_string()]
        );
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[backtest]\noutput = /tmp/out.csv\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("backtest", "output"),
            Some("/tmp/out.csv".to_string())
        );
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(result.is_err());
    }
}
