use std::path::PathBuf;

// Defaults
pub const LEDGER_FILE: &str = "carbon_data.csv";
pub const STATIC_DIR: &str = "static";
pub const CHART_FILE: &str = "graph.png";
pub const REPORTS_DIR: &str = "reports";
pub const BIND_ADDR: &str = "127.0.0.1:5000";

/// Locations of every artifact the application reads or writes
#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    /// CSV ledger of all submissions
    pub ledger_path: PathBuf,

    /// Folder served under `/static`; the chart lives here
    pub static_dir: PathBuf,

    /// File name of the chart inside `static_dir`
    pub chart_file: String,

    /// Folder of generated PDF reports, served under `/reports`
    pub report_dir: PathBuf,

    /// Address the web server listens on
    pub bind_addr: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ledger_path: PathBuf::from(LEDGER_FILE),
            static_dir: PathBuf::from(STATIC_DIR),
            chart_file: CHART_FILE.to_string(),
            report_dir: PathBuf::from(REPORTS_DIR),
            bind_addr: BIND_ADDR.to_string(),
        }
    }
}

impl AppConfig {
    /// Default layout rooted at `root` instead of the working directory
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            ledger_path: root.join(LEDGER_FILE),
            static_dir: root.join(STATIC_DIR),
            report_dir: root.join(REPORTS_DIR),
            ..Self::default()
        }
    }

    pub fn chart_path(&self) -> PathBuf {
        self.static_dir.join(&self.chart_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chart_lives_in_the_static_folder() {
        let config = AppConfig::rooted_at("/srv/carbon");
        assert_eq!(config.chart_path(), PathBuf::from("/srv/carbon/static/graph.png"));
        assert_eq!(config.ledger_path, PathBuf::from("/srv/carbon/carbon_data.csv"));
        assert_eq!(config.bind_addr, BIND_ADDR);
    }
}
