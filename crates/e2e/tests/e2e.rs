//! E2E test harness entry point
//!
//! Drives a WebDriver browser through every bookreader case.
//! Run with: cargo test --package bookreader-e2e --test e2e -- [OPTIONS]
//!
//! Needs a running geckodriver or chromedriver (`--webdriver-url`). With
//! `--static-dir` the harness starts `bookreader-serve` itself; otherwise the
//! application must already be reachable at `--base-url`.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bookreader_e2e::browser::{Browser, BrowserConfig};
use bookreader_e2e::runner::RunnerConfig;
use bookreader_e2e::server::ServerConfig;
use bookreader_e2e::store::StoreConfig;
use bookreader_e2e::wait::WaitPolicy;
use bookreader_e2e::{cases, E2eResult, Group, TestRunner};

#[derive(Parser, Debug)]
#[command(name = "bookreader-e2e")]
#[command(about = "E2E test runner for the bookreader")]
struct Args {
    /// Application URL, used when the harness does not start the server
    #[arg(long, env = "BOOKREADER_BASE_URL", default_value = "http://localhost:8080/")]
    base_url: String,

    /// WebDriver endpoint
    #[arg(long, env = "BOOKREADER_WEBDRIVER_URL", default_value = "http://127.0.0.1:4444")]
    webdriver_url: String,

    /// Browser to drive (firefox, chrome)
    #[arg(long, env = "BOOKREADER_BROWSER", default_value = "firefox")]
    browser: Browser,

    /// Run the browser without a window
    #[arg(long, env = "BOOKREADER_HEADLESS", default_value_t = true, action = clap::ArgAction::Set)]
    headless: bool,

    /// Fluidinfo API endpoint used for cleanup
    #[arg(long, env = "BOOKREADER_STORE_URL", default_value = "https://fluiddb.fluidinfo.com")]
    store_url: String,

    /// Test account, also used to log in through the UI
    #[arg(long, env = "BOOKREADER_STORE_USER", default_value = "test")]
    store_user: String,

    #[arg(long, env = "BOOKREADER_STORE_PASSWORD", default_value = "test", hide_env_values = true)]
    store_password: String,

    /// Path to the static server binary
    #[arg(long, env = "BOOKREADER_SERVE_BINARY", default_value = "target/debug/bookreader-serve")]
    serve_binary: PathBuf,

    /// Serve this directory with `bookreader-serve` for the run
    #[arg(long, env = "BOOKREADER_STATIC_DIR")]
    static_dir: Option<PathBuf>,

    /// Port for the spawned server (0 = auto)
    #[arg(long, env = "BOOKREADER_PORT", default_value = "0")]
    port: u16,

    /// Run only this group
    #[arg(short, long)]
    group: Option<Group>,

    /// Run only a specific test by name
    #[arg(short, long)]
    name: Option<String>,

    /// Upper bound on every UI wait
    #[arg(long, env = "BOOKREADER_WAIT_TIMEOUT_MS", default_value = "10000")]
    wait_timeout_ms: u64,

    /// Output directory for results
    #[arg(short, long, default_value = "test-results")]
    output: PathBuf,

    /// Print the selected cases and exit
    #[arg(long)]
    list: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // libtest passes these through when run via `cargo test`.
    let args = Args::parse_from(
        std::env::args().filter(|a| a != "--nocapture" && a != "--quiet"),
    );

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(2);
        }
    };

    match rt.block_on(async_main(args)) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

async fn async_main(args: Args) -> E2eResult<i32> {
    let selected = cases::select(args.group, args.name.as_deref())?;

    if args.list {
        for case in &selected {
            let marker = if case.mutates_store { " [store]" } else { "" };
            println!("{}::{}{} - {}", case.group, case.name, marker, case.description);
        }
        return Ok(0);
    }

    let server = args.static_dir.map(|static_dir| ServerConfig {
        binary_path: args.serve_binary,
        static_dir,
        port: if args.port == 0 { None } else { Some(args.port) },
        ..Default::default()
    });

    let config = RunnerConfig {
        server,
        base_url: args.base_url,
        browser: BrowserConfig {
            webdriver_url: args.webdriver_url,
            browser: args.browser,
            headless: args.headless,
        },
        store: StoreConfig {
            base_url: args.store_url,
            username: args.store_user,
            password: args.store_password,
            ..Default::default()
        },
        wait: WaitPolicy::with_timeout(Duration::from_millis(args.wait_timeout_ms)),
        output_dir: args.output,
        screenshots_on_failure: true,
    };

    let mut runner = TestRunner::new(config)?;

    let cancel = runner.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, aborting the run");
            cancel.cancel();
        }
    });

    let results = runner.run(&selected).await?;
    runner.write_results(&results)?;

    let code = if results.aborted.is_some() {
        2
    } else if results.failed > 0 {
        1
    } else {
        0
    };
    info!("Exiting with code {}", code);
    Ok(code)
}
