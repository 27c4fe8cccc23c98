use std::process::ExitCode;

use clap::Parser;

use shopprobe_cli::args::Args;
use shopprobe_cli::commands::execute;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let otel = shopprobe_common::telemetry::init_tracing(
        "shopprobe",
        args.otlp_endpoint.as_deref(),
        args.otlp_token.as_deref(),
    );

    let code = execute(args).await;

    if let Some(provider) = otel {
        if let Err(e) = provider.shutdown() {
            eprintln!("failed to flush spans: {e}");
        }
    }
    ExitCode::from(code)
}
