//! Config handling: logging and credentials

use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;

use tracing::log::LevelFilter;
use tracing::{debug, info};

use crate::constants::{API_KEY_ENV, API_KEY_MIN_LENGTH, API_KEY_PREFIX};
use crate::error::CeramicsError;

/// Sets up logging based on the debug flag
pub fn setup_logging(debug: bool) -> Result<(), Box<std::io::Error>> {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut logger = simple_logger::SimpleLogger::new().with_level(level);
    if !debug {
        logger = logger
            .with_module_level("tracing", LevelFilter::Warn)
            .with_module_level("rustls", LevelFilter::Info)
            .with_module_level("reqwest", LevelFilter::Info)
            .with_module_level("hyper_util", LevelFilter::Info)
            .with_module_level("h2", LevelFilter::Info);
    }
    logger.init().map_err(|err| {
        eprintln!("Failed to initialize logger: {}", err);
        Box::new(std::io::Error::other(err))
    })
}

/// Check the shape of an API key without talking to the service.
pub fn validate_api_key(api_key: &str) -> Result<(), CeramicsError> {
    let api_key = api_key.trim();
    if api_key.is_empty() {
        return Err(CeramicsError::Configuration(format!(
            "{API_KEY_ENV} is empty"
        )));
    }
    if !api_key.starts_with(API_KEY_PREFIX) {
        return Err(CeramicsError::Configuration(format!(
            "Invalid API key format. Stability AI keys should start with '{API_KEY_PREFIX}'"
        )));
    }
    if api_key.len() < API_KEY_MIN_LENGTH {
        return Err(CeramicsError::Configuration(
            "API key appears too short. Please check your key".to_string(),
        ));
    }
    Ok(())
}

/// Load `.env` into the environment if it exists.
///
/// When there is neither a key in the environment nor an env file, ask for
/// a key on stdin and write `env_path` with it.
pub fn load_credentials(env_path: &Path) -> Result<(), CeramicsError> {
    if env_path.exists() {
        dotenv::from_path(env_path).map_err(|err| {
            CeramicsError::Configuration(format!(
                "Failed to read {}: {err}",
                env_path.display()
            ))
        })?;
        debug!("Loaded environment from {}", env_path.display());
        return Ok(());
    }
    if env::var(API_KEY_ENV).is_ok() {
        return Ok(());
    }

    let stdin = io::stdin();
    let api_key = prompt_for_api_key(&mut stdin.lock(), &mut io::stdout())?;
    write_env_file(env_path, &api_key)?;
    info!("Created {} with your API key", env_path.display());
    dotenv::from_path(env_path).map_err(|err| {
        CeramicsError::Configuration(format!("Failed to read {}: {err}", env_path.display()))
    })?;
    Ok(())
}

/// Ask for an API key, returning the trimmed answer.
pub fn prompt_for_api_key<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> Result<String, CeramicsError> {
    writeln!(output, "No .env file found. Creating one...")?;
    write!(output, "Please enter your Stability AI API key: ")?;
    output.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    let answer = answer.trim().to_string();
    if answer.is_empty() {
        return Err(CeramicsError::Configuration(format!(
            "No API key given. Set {API_KEY_ENV} or create a .env file"
        )));
    }
    Ok(answer)
}

/// Write `STABILITY_API_KEY=<key>` to `path`.
pub fn write_env_file(path: &Path, api_key: &str) -> Result<(), CeramicsError> {
    fs::write(path, format!("{API_KEY_ENV}={api_key}\n"))?;
    Ok(())
}
