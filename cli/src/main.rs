mod commands;
mod render;

use anyhow::Context;
use cmdkit_core::{ClapParser, Session, Settings, exit_code};
use tracing::error;
use tracing_subscriber::EnvFilter;

use render::{RenderFormat, StdoutRenderer};

fn main() {
    let settings = match load_settings() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(exit_code::SOFTWARE);
        }
    };

    // Logs go to stderr; stdout carries command output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
        )
        .init();

    let root = match commands::tree(&settings.program_name) {
        Ok(root) => root,
        Err(err) => {
            error!(error = %err, "invalid command tree");
            eprintln!("error: {err}");
            std::process::exit(exit_code::SOFTWARE);
        }
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    let renderer = StdoutRenderer::new(RenderFormat::from_env());
    let mut session = Session::new(ClapParser::new(), renderer).with_settings(settings);

    let code = match session.run(&root, &args) {
        Ok(code) => code,
        Err(violation) => {
            error!(command = %violation.command, "{violation}");
            eprintln!("internal error: {violation}");
            exit_code::SOFTWARE
        }
    };
    std::process::exit(code);
}

/// Settings from the YAML file named by `CMDKIT_CONFIG`, or the defaults.
fn load_settings() -> anyhow::Result<Settings> {
    match std::env::var_os("CMDKIT_CONFIG") {
        Some(path) => Settings::load(&path)
            .with_context(|| format!("failed to load settings from {}", path.to_string_lossy())),
        None => Ok(Settings::default()),
    }
}
