use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use base64::Engine;
use clap::Parser;
use fake_io::{FakeIoSession, Fixture};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fake-io")]
#[command(about = "Read files the way code under a fake-io session would see them")]
#[command(version)]
struct Cli {
    /// Fixture describing fake files and interceptors (.toml, .yaml or .json)
    #[arg(short = 'f', long = "fixture")]
    fixture: Option<PathBuf>,

    /// Extra regex interceptor; may be repeated
    #[arg(short = 'i', long = "intercept")]
    intercept: Vec<String>,

    /// Read in binary mode (JSON output carries base64 content)
    #[arg(short = 'b', long = "binary")]
    binary: bool,

    /// Output one JSON object per path (path, source, content or error)
    #[arg(long = "json")]
    json: bool,

    /// Paths to read
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

enum Content {
    Text(String),
    Bytes(Vec<u8>),
}

fn read_path(path: &Path, binary: bool) -> fake_io::Result<(bool, Content)> {
    let mut file = fake_io::open(path, if binary { "rb" } else { "r" })?;
    let fake = file.is_fake();
    let content = if binary {
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;
        Content::Bytes(buf)
    } else {
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        Content::Text(buf)
    };
    file.close()?;
    Ok((fake, content))
}

fn build_session(cli: &Cli) -> fake_io::Result<FakeIoSession> {
    let session = match &cli.fixture {
        Some(path) => FakeIoSession::from_fixture(&Fixture::load(path)?)?,
        None => FakeIoSession::new(),
    };
    for pattern in &cli.intercept {
        session.intercept_regex(pattern)?;
    }
    Ok(session)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let session = match build_session(&cli) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let guard = session.enter();
    let mut failed = false;
    let mut stdout = std::io::stdout().lock();

    for path in &cli.paths {
        let result = read_path(path, cli.binary);
        if result.is_err() {
            failed = true;
        }

        if cli.json {
            let value = match result {
                Ok((fake, content)) => serde_json::json!({
                    "path": path.display().to_string(),
                    "source": if fake { "fake" } else { "real" },
                    "content": match content {
                        Content::Text(text) => text,
                        Content::Bytes(bytes) => base64::engine::general_purpose::STANDARD.encode(bytes),
                    },
                }),
                Err(e) => serde_json::json!({
                    "path": path.display().to_string(),
                    "error": e.to_string(),
                }),
            };
            let _ = writeln!(stdout, "{}", value);
        } else {
            match result {
                Ok((_, Content::Text(text))) => {
                    let _ = stdout.write_all(text.as_bytes());
                }
                Ok((_, Content::Bytes(bytes))) => {
                    let _ = stdout.write_all(&bytes);
                }
                Err(e) => eprintln!("fake-io: {}: {}", path.display(), e),
            }
        }
    }

    let _ = stdout.flush();
    drop(guard);
    std::process::exit(if failed { 1 } else { 0 });
}
