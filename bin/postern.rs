use std::{env, fs, process::ExitCode};

use postern::{Mailer, Properties, logging};

/// Loads a flat TOML table into the mailer property set. Scalar values are
/// carried as their string form so limits can be written as bare numbers.
fn load_properties(path: &str) -> Result<Properties, Box<dyn std::error::Error>> {
    let table: toml::Table = fs::read_to_string(path)?.parse()?;

    let mut properties = Properties::new();
    for (key, value) in table {
        let value = match value {
            toml::Value::String(value) => value,
            other => other.to_string(),
        };
        properties.insert(key, value);
    }

    Ok(properties)
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    let args: Vec<String> = env::args().collect();
    let [_, config_path, name, from, subject, message] = &args[..] else {
        eprintln!("usage: postern <config.toml> <name> <from> <subject> <message>");
        return ExitCode::FAILURE;
    };

    let properties = match load_properties(config_path) {
        Ok(properties) => properties,
        Err(error) => {
            eprintln!("could not load {config_path}: {error}");
            return ExitCode::FAILURE;
        }
    };

    let mailer = Mailer::new(&properties);
    let outcome = mailer.mail(name, from, subject, message).await;
    println!("{outcome}");

    if outcome.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
