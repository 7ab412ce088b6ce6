use std::path::PathBuf;

use clap::Parser;
use tower_lsp::{LspService, Server};

use relay_lsp::server::RelayLanguageServer;

#[derive(Parser, Debug)]
#[command(
    name = "relay-ls",
    version,
    about = "Language server that delegates linting and formatting to configured commands"
)]
struct Cli {
    /// Silence all log output.
    #[arg(short, long)]
    quiet: bool,

    /// Append logs to this file instead of stderr.
    #[arg(long, value_name = "PATH")]
    logfile: Option<PathBuf>,

    /// Log verbosity, 0 (off) to 5 (trace).
    #[arg(long, default_value_t = 3, value_name = "LEVEL")]
    loglevel: u8,
}

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    init_logging(&args);

    log::info!(
        "relay-ls {} starting (pid {})",
        env!("CARGO_PKG_VERSION"),
        std::process::id(),
    );

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(RelayLanguageServer::new);
    Server::new(stdin, stdout, socket).serve(service).await;
}

/// Level comes from the CLI; `RUST_LOG` still overrides for ad-hoc
/// debugging. `--logfile` redirects the whole stream: with the transport on
/// stdio, stderr is often swallowed by the editor.
fn init_logging(args: &Cli) {
    let level = if args.quiet {
        "off"
    } else {
        match args.loglevel {
            0 => "off",
            1 => "error",
            2 => "warn",
            3 => "info",
            4 => "debug",
            _ => "trace",
        }
    };

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level));
    if let Some(path) = &args.logfile {
        match std::fs::OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => eprintln!("relay-ls: cannot open log file {}: {e}", path.display()),
        }
    }
    builder.init();
}
