use clap::Parser;

use bookreader_web::server::{shutdown_signal, StaticServer, DEFAULT_PORT};

/// A very simple HTTP server for the current directory
#[derive(Parser, Debug)]
#[command(name = "bookreader-serve")]
struct Args {
    /// Port to listen on
    #[arg(default_value_t = DEFAULT_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let root = std::env::current_dir()?;

    let server = StaticServer::bind(args.port, root).await?;
    let addr = server.local_addr()?;

    println!("Now visit http://{}:{}", addr.ip(), addr.port());
    println!("Press CTRL-C to stop this server");

    server.run(shutdown_signal()).await
}
