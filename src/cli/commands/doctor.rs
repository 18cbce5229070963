//! Doctor command - verify system requirements and configuration.

use crate::cli::Output;
use crate::config::Settings;
use console::style;
use std::process::Command;

#[derive(Debug, PartialEq)]
enum Status {
    Ok,
    Warn,
    Fail,
}

/// Outcome of a single diagnostic check.
#[derive(Debug)]
struct Check {
    name: &'static str,
    status: Status,
    detail: String,
    hint: Option<String>,
}

impl Check {
    fn ok(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: Status::Ok,
            detail: detail.into(),
            hint: None,
        }
    }

    fn warn(name: &'static str, detail: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            name,
            status: Status::Warn,
            detail: detail.into(),
            hint: Some(hint.into()),
        }
    }

    fn fail(name: &'static str, detail: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            name,
            status: Status::Fail,
            detail: detail.into(),
            hint: Some(hint.into()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            Status::Ok => style("✓").green(),
            Status::Warn => style("!").yellow(),
            Status::Fail => style("✗").red(),
        };
        println!("  {} {} - {}", icon, style(self.name).bold(), self.detail);
        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Omfang Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let mut checks = Vec::new();

    let sections: [(&str, Vec<Check>); 4] = [
        ("External Tools", vec![check_ytdlp()]),
        (
            "API Configuration",
            vec![check_openai_key(), check_youtube_key(settings)],
        ),
        ("Directories", check_directories(settings)),
        ("Configuration", vec![check_config_file()]),
    ];

    for (title, section) in sections {
        println!("{}", style(title).bold());
        for check in &section {
            check.print();
        }
        checks.extend(section);
        println!();
    }

    let failures = checks.iter().filter(|c| c.status == Status::Fail).count();
    let warnings = checks.iter().filter(|c| c.status == Status::Warn).count();

    if failures > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Omfang.",
            failures
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Omfang is ready to use.");
    }

    Ok(())
}

fn check_ytdlp() -> Check {
    let hint = install_hint_ytdlp();
    match Command::new("yt-dlp").arg("--version").output() {
        Ok(out) if out.status.success() => {
            let mut version = String::from_utf8_lossy(&out.stdout)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .to_string();
            if version.len() > 50 {
                version.truncate(50);
                version.push_str("...");
            }
            Check::ok("yt-dlp", version)
        }
        Ok(_) => Check::fail("yt-dlp", "installed but not working", hint),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Check::fail("yt-dlp", "not found", hint)
        }
        Err(e) => Check::fail("yt-dlp", format!("error: {}", e), hint),
    }
}

fn mask_key(key: &str, prefix: usize) -> String {
    format!("{}...{}", &key[..prefix], &key[key.len() - 4..])
}

fn check_openai_key() -> Check {
    let set_hint = "Set with: export OPENAI_API_KEY='sk-...'";
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if key.starts_with("sk-") && key.len() > 20 => Check::ok(
            "OPENAI_API_KEY",
            format!("configured ({})", mask_key(&key, 7)),
        ),
        Ok(key) if key.is_empty() => Check::fail("OPENAI_API_KEY", "empty", set_hint),
        Ok(_) => Check::warn(
            "OPENAI_API_KEY",
            "set but format looks unusual",
            "Expected format: sk-... (OpenAI API key)",
        ),
        Err(_) => Check::fail("OPENAI_API_KEY", "not set", set_hint),
    }
}

fn check_youtube_key(settings: &Settings) -> Check {
    match settings.youtube_api_key() {
        Some(key) if key.len() > 8 => Check::ok(
            "YouTube API key",
            format!("configured ({})", mask_key(&key, 4)),
        ),
        Some(_) => Check::warn(
            "YouTube API key",
            "set but looks too short",
            "Check the key in [youtube] api_key or YOUTUBE_API_KEY",
        ),
        None => Check::fail(
            "YouTube API key",
            "not set",
            "Set with: export YOUTUBE_API_KEY='...' (or [youtube] api_key in config)",
        ),
    }
}

fn check_directories(settings: &Settings) -> Vec<Check> {
    let mut checks = Vec::new();

    let data_dir = settings.data_dir();
    checks.push(if data_dir.exists() {
        Check::ok("Data directory", data_dir.display().to_string())
    } else {
        Check::warn(
            "Data directory",
            format!("{} (will be created)", data_dir.display()),
            "Directory will be created on first use",
        )
    });

    let db_path = settings.sqlite_path();
    checks.push(if db_path.exists() {
        let size = std::fs::metadata(&db_path)
            .map(|m| format_size(m.len()))
            .unwrap_or_else(|_| "unknown size".to_string());
        Check::ok("Database", format!("{} ({})", db_path.display(), size))
    } else {
        Check::warn(
            "Database",
            format!("{} (not created yet)", db_path.display()),
            "Database will be created on first indexing",
        )
    });

    let cache_path = settings.cache_path();
    checks.push(if cache_path.exists() {
        Check::ok("Tag cache", cache_path.display().to_string())
    } else {
        Check::warn(
            "Tag cache",
            format!("{} (not created yet)", cache_path.display()),
            "Cache will be created on first discovery",
        )
    });

    checks
}

fn check_config_file() -> Check {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        Check::ok("Config file", config_path.display().to_string())
    } else {
        Check::warn(
            "Config file",
            "using defaults",
            "Create with: omfang init (or omfang config edit)",
        )
    }
}

/// Render a byte count with a binary unit suffix.
fn format_size(bytes: u64) -> String {
    const UNITS: [(u64, &str); 3] = [(1 << 30, "GB"), (1 << 20, "MB"), (1 << 10, "KB")];
    for (scale, unit) in UNITS {
        if bytes >= scale {
            return format!("{:.1} {}", bytes as f64 / scale as f64, unit);
        }
    }
    format!("{} B", bytes)
}

fn install_hint_ytdlp() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install yt-dlp"
    } else if cfg!(target_os = "linux") {
        "Install with: pip install yt-dlp (or your package manager)"
    } else {
        "Install from: https://github.com/yt-dlp/yt-dlp"
    }
}
