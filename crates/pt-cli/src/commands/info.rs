//! `pt_cli --info`

use crate::config::Config;
use crate::error::Result;
use colored::Colorize;
use std::io::Write;

/// Print the effective configuration, password redacted
pub fn run(config: &Config, out: &mut dyn Write) -> Result<()> {
    writeln!(out, "{}", "Config:".cyan().bold())?;
    for (key, value) in config.info_lines() {
        writeln!(out, "{}: {}", key, value)?;
    }

    if !config.loaded_from.is_empty() {
        writeln!(out)?;
        writeln!(out, "{}", "Loaded from:".cyan().bold())?;
        for path in &config.loaded_from {
            writeln!(out, "  {}", path.display())?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_info_lists_keys() {
        let mut config = Config::default();
        config.user = Some("jane".into());
        config.password = Some("secret".into());

        let mut out: Vec<u8> = Vec::new();
        run(&config, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("project: moh-q"));
        assert!(text.contains("user: jane"));
        assert!(text.contains("password: ********"));
        assert!(!text.contains("secret"));
        assert!(!text.contains("Loaded from"));
    }
}
