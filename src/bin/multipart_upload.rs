//! Multipart upload CLI
//!
//! Uploads one file to the storage service in parts. Credentials and the
//! destination come from the environment (or a `.env` file):
//! `AUTHENTICATION_TOKEN`, `TEAM_ID`, `FOLDER_ID`.

use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;
use std::process::ExitCode;
use storage_upload::{Result, UploadConfig, UploadError, UploadOptions, Uploader};

fn command() -> Command {
    Command::new("multipart_upload")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Upload a file to the storage service in parts")
        .arg(
            Arg::new("file")
                .help("File to upload")
                .env("FILE_PATH")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("content-type")
                .long("content-type")
                .help("Content type registered with the stored file")
                .default_value(storage_upload::DEFAULT_CONTENT_TYPE),
        )
        .arg(
            Arg::new("name")
                .long("name")
                .help("File name registered with the stored file (default: the file's basename)"),
        )
        .arg(
            Arg::new("chunk-size")
                .long("chunk-size")
                .help("Part size in bytes")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("base-url")
                .long("base-url")
                .help("API root URL"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log every part")
                .action(ArgAction::SetTrue),
        )
}

async fn run(matches: clap::ArgMatches) -> Result<String> {
    let mut config = UploadConfig::from_env()?;

    if let Some(chunk_size) = matches.get_one::<usize>("chunk-size") {
        config = config.chunk_size(*chunk_size);
    }
    if let Some(base_url) = matches.get_one::<String>("base-url") {
        config = config.base_url(base_url.clone());
    }

    let file = matches
        .get_one::<PathBuf>("file")
        .cloned()
        .ok_or_else(|| {
            UploadError::config_error("Missing required environment variables: FILE_PATH")
        })?;

    let mut options = UploadOptions::new();
    if let Some(content_type) = matches.get_one::<String>("content-type") {
        options = options.content_type(content_type.clone());
    }
    if let Some(name) = matches.get_one::<String>("name") {
        options = options.file_name(name.clone());
    }

    let uploader = Uploader::from_config(config)?;
    let result = uploader.upload(&file, &options).await?;

    log::info!(
        "Uploaded {} ({}) in {} parts, sha256 {}",
        result.file_name,
        result.size_display(),
        result.parts,
        result.sha256
    );

    Ok(result.stored_file_reference)
}

#[tokio::main]
async fn main() -> ExitCode {
    // Loaded before parsing so FILE_PATH can come from .env too.
    let _ = dotenvy::dotenv();
    let matches = command().get_matches();

    let default_filter = if matches.get_flag("verbose") {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match run(matches).await {
        Ok(reference) => {
            println!("File uploaded successfully!");
            println!("File: {}", reference);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
