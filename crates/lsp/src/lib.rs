//! Merl LSP core.
//!
//! The language-server side of the toolchain: document lifecycle,
//! diagnostics, the per-version hover index, completion, and the reactor
//! that serializes every client event. Parsing and inference are supplied
//! by the host through [`parse::Pipeline`]; this crate is a library the
//! embedding application wires and serves.
//!
//! ```no_run
//! # async fn example() {
//! use merl_lsp::parse::{ParseResult, ValidateInput};
//!
//! let prelude = merl_runtime::prelude::prelude();
//! let parse = std::sync::Arc::new(
//!     // the host's parse+infer implementation goes here
//!     |_: &merl_core::ModuleMap, _: &[String], _: &str, _: &ValidateInput| -> ParseResult {
//!         Err(Vec::new())
//!     },
//! );
//! let pipeline = merl_lsp::parse::Pipeline::new(prelude, parse);
//! std::process::exit(merl_lsp::run_stdio(pipeline).await);
//! # }
//! ```

pub mod completion;
pub mod diagnostics;
pub mod hover;
pub mod parse;
pub mod reactor;
pub mod server;
pub mod vfs;

pub use parse::Pipeline;
pub use server::MerlLanguageServer;

use tokio::io::{AsyncRead, AsyncWrite};
use tower_lsp::{LspService, Server};
use tracing::{error, info};

/// Install the stderr tracing subscriber the server logs through.
/// Respects `RUST_LOG`; defaults the crate to `info`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("merl_lsp=info".parse().expect("static directive parses")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Serve over arbitrary byte streams.
pub async fn run_with_io<I, O>(input: I, output: O, pipeline: Pipeline)
where
    I: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
{
    let (service, socket) = LspService::new(move |client| MerlLanguageServer::new(client, pipeline));
    Server::new(input, output, socket).serve(service).await;
}

/// Serve over the process's standard streams and return the process exit
/// code: 0 on clean shutdown, 1 if the transport loop died.
pub async fn run_stdio(pipeline: Pipeline) -> i32 {
    info!("starting Merl LSP server on stdio");
    let serve = tokio::spawn(async move {
        let stdin = tokio::io::stdin();
        let stdout = tokio::io::stdout();
        run_with_io(stdin, stdout, pipeline).await;
    });
    match serve.await {
        Ok(()) => {
            info!("server shut down cleanly");
            0
        }
        Err(err) => {
            error!("server loop failed: {}", err);
            1
        }
    }
}
