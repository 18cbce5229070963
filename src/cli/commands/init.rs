//! Init command - interactive first-run setup.

use crate::cli::Output;
use crate::config::Settings;
use console::style;
use std::io::{self, Write};

/// Run the init command for first-time setup.
pub fn run_init(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Omfang Setup");
    println!();
    println!("Welcome to Omfang! Let's make sure everything is configured correctly.\n");

    step("Step 1: Checking prerequisites");
    if !setup_tools()? {
        return cancelled("Install the missing tools and run 'omfang init' again.");
    }

    step("Step 2: Checking API configuration");
    if !setup_api_keys(settings)? {
        return cancelled("Set your API keys and run 'omfang init' again.");
    }

    step("Step 3: Setting up directories");
    setup_data_dir(settings)?;

    step("Step 4: Configuration file");
    setup_config_file(settings)?;

    println!();
    println!("{}", style("Setup Complete!").bold().green());
    println!();
    println!("Next steps:");
    println!("  {} Check system status", style("omfang doctor").cyan());
    println!("  {} Index your first video", style("omfang index <url>").cyan());
    println!(
        "  {} Ask a question about it",
        style("omfang ask <url> \"<question>\"").cyan()
    );
    println!();
    println!("For more help: {}", style("omfang --help").cyan());

    Ok(())
}

fn step(title: &str) {
    println!("{}", style(title).bold().cyan());
    println!();
}

fn cancelled(note: &str) -> anyhow::Result<()> {
    println!();
    Output::info(&format!("Setup cancelled. {}", note));
    Ok(())
}

/// Returns false if a tool is missing and the user chose not to continue.
fn setup_tools() -> anyhow::Result<bool> {
    let ytdlp_present = std::process::Command::new("yt-dlp")
        .arg("--version")
        .output()
        .is_ok();

    if ytdlp_present {
        Output::success("All required tools are installed!");
        println!();
        return Ok(true);
    }

    Output::warning("Some tools are missing. Please install them:");
    println!();
    println!("  {} {} - not found", style("✗").red(), style("yt-dlp").bold());
    println!(
        "    {} {}",
        style("→").dim(),
        style(install_hint_ytdlp()).dim()
    );
    println!();

    let go_on = prompt_continue("Continue anyway?")?;
    if go_on {
        println!();
    }
    Ok(go_on)
}

/// Returns false if a key is missing and the user chose not to continue.
fn setup_api_keys(settings: &Settings) -> anyhow::Result<bool> {
    if std::env::var("OPENAI_API_KEY").is_ok() {
        Output::success("OpenAI API key is configured!");
    } else {
        Output::warning("OPENAI_API_KEY environment variable is not set.");
        println!();
        println!("  Omfang requires an OpenAI API key for embeddings and answers.");
        println!(
            "  Get your API key from: {}",
            style("https://platform.openai.com/api-keys").underlined()
        );
        println!();
        println!("  Set it in your shell configuration (~/.bashrc, ~/.zshrc, etc.):");
        println!("  {}", style("export OPENAI_API_KEY='sk-...'").green());
        println!();

        if !prompt_continue("Continue without API key?")? {
            return Ok(false);
        }
    }

    if settings.youtube_api_key().is_some() {
        Output::success("YouTube API key is configured!");
    } else {
        Output::warning("No YouTube Data API key found.");
        println!();
        println!("  Omfang uses the YouTube Data API for video metadata and discovery.");
        println!(
            "  Get a key from: {}",
            style("https://console.cloud.google.com/apis/credentials").underlined()
        );
        println!();
        println!("  Set it via environment variable:");
        println!("  {}", style("export YOUTUBE_API_KEY='...'").green());
        println!("  Or in the config file under {}:", style("[youtube]").bold());
        println!("  {}", style("api_key = \"...\"").green());
        println!();

        if !prompt_continue("Continue without YouTube key?")? {
            return Ok(false);
        }
    }

    println!();
    Ok(true)
}

fn setup_data_dir(settings: &Settings) -> anyhow::Result<()> {
    let data_dir = settings.data_dir();
    if data_dir.exists() {
        Output::info(&format!("Data directory exists: {}", data_dir.display()));
    } else {
        std::fs::create_dir_all(&data_dir)?;
        Output::success(&format!("Created data directory: {}", data_dir.display()));
    }
    println!();
    Ok(())
}

fn setup_config_file(settings: &Settings) -> anyhow::Result<()> {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        Output::info(&format!("Config file exists: {}", config_path.display()));
    } else if prompt_continue("Create default configuration file?")? {
        settings.save_to(&config_path)?;
        Output::success(&format!("Created config file: {}", config_path.display()));
        println!();
        println!(
            "  Edit your config with: {}",
            style("omfang config edit").green()
        );
    } else {
        Output::info("Skipped config file creation. Using defaults.");
    }
    Ok(())
}

fn install_hint_ytdlp() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install yt-dlp"
    } else if cfg!(target_os = "linux") {
        "Install with: pip install yt-dlp"
    } else {
        "Install from: https://github.com/yt-dlp/yt-dlp"
    }
}

/// Prompt user for yes/no confirmation.
fn prompt_continue(message: &str) -> io::Result<bool> {
    print!("{} {} ", style("?").cyan(), message);
    print!("{} ", style("[y/N]").dim());
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let answer = input.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_hint_ytdlp() {
        assert!(install_hint_ytdlp().contains("yt-dlp"));
    }
}
