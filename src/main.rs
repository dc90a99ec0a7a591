#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use std::io::Read;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use anyhow::{bail, Context};
    use clap::{Parser, Subcommand};
    use futures::future::AbortHandle;
    use hubspot_connect::config::Config;
    use hubspot_connect::connections::hubspot::{
        ConnectOutcome, HubspotAction, HubspotConnector, WidgetHost,
    };
    use hubspot_connect::models::integration::{
        Credentials, IntegrationEntry, IntegrationParams, HUBSPOT_KEY,
    };
    use hubspot_connect::utils::api::{HubspotApi, IntegrationBackend};
    use hubspot_connect::utils::popup::{IntervalTicker, PopupError, PopupLauncher, PopupWindow};

    #[derive(Parser)]
    #[command(name = "hubspot-connect", about = "Connect a HubSpot integration and load its items")]
    struct Cli {
        /// Integrations backend base URL (overrides HUBSPOT_BACKEND_URL)
        #[arg(long, global = true)]
        backend_url: Option<String>,
        /// User id sent with authorize and credentials requests
        #[arg(long, global = true)]
        user: Option<String>,
        /// Org id sent with authorize and credentials requests
        #[arg(long, global = true)]
        org: Option<String>,
        #[command(subcommand)]
        command: Command,
    }

    #[derive(Subcommand)]
    enum Command {
        /// Print the authorization URL
        Authorize,
        /// Authorize in the browser, then fetch the stored credentials
        Connect,
        /// Load items with previously fetched credentials
        Load {
            /// JSON file holding the credentials, or `-` for stdin
            #[arg(long)]
            credentials: PathBuf,
        },
    }

    /// Terminal stand-in for the parent component. Alerts go to stderr; the
    /// connect and load results are printed by `run` from their return values.
    struct TerminalHost;

    impl WidgetHost for TerminalHost {
        fn dispatch(&self, action: HubspotAction) {
            tracing::debug!("widget action: {:?}", action);
        }

        fn alert(&self, message: &str) {
            eprintln!("{}", message);
        }

        fn merge_integration(&self, key: &str, entry: IntegrationEntry) {
            tracing::debug!("storing {} integration ({})", key, entry.integration_type);
        }

        fn log_error(&self, message: &str) {
            tracing::error!("{}", message);
        }
    }

    /// The browser tab counts as closed once the user presses Enter.
    struct TerminalPopup(Arc<AtomicBool>);

    impl PopupWindow for TerminalPopup {
        fn is_closed(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    struct SystemBrowser;

    impl PopupLauncher for SystemBrowser {
        fn open(
            &self,
            url: &str,
            _name: &str,
            _features: &str,
        ) -> Result<Option<Box<dyn PopupWindow>>, PopupError> {
            if let Err(e) = webbrowser::open(url) {
                tracing::warn!("Could not open a browser: {}", e);
            }
            println!("Authorize HubSpot at:\n\n  {}\n\nPress Enter once the authorization window has closed.", url);

            let closed = Arc::new(AtomicBool::new(false));
            let flag = closed.clone();
            std::thread::spawn(move || {
                let mut line = String::new();
                let _ = std::io::stdin().read_line(&mut line);
                flag.store(true, Ordering::SeqCst);
            });
            Ok(Some(Box::new(TerminalPopup(closed))))
        }
    }

    fn init_tracing() {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,hubspot_connect=debug"));
        fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    }

    fn read_credentials(path: &Path) -> anyhow::Result<Credentials> {
        let raw = if path.as_os_str() == "-" {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read credentials from stdin")?;
            buf
        } else {
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?
        };
        let value = serde_json::from_str(&raw).context("Credentials are not valid JSON")?;
        Credentials::from_value(value).context("Credentials file is empty")
    }

    pub async fn run() -> anyhow::Result<()> {
        init_tracing();
        let cli = Cli::parse();

        let mut config = Config::from_env()?;
        if let Some(url) = cli.backend_url.as_deref() {
            config = config.with_backend_url(url)?;
        }
        let user = cli.user.or(config.user_id.clone()).unwrap_or_else(|| "TestUser".to_string());
        let org = cli.org.or(config.org_id.clone()).unwrap_or_else(|| "TestOrg".to_string());

        let api = HubspotApi::new(&config.backend_url)?;
        tracing::info!("Using backend {}", api.base_url());

        match cli.command {
            Command::Authorize => {
                let url = api.authorize(&user, &org).await?;
                println!("{}", url);
            }
            Command::Connect => {
                let connector = HubspotConnector::new(api, user, org);
                let host = TerminalHost;
                let mut ticker = IntervalTicker::new(config.poll_interval);
                let (handle, registration) = AbortHandle::new_pair();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        handle.abort();
                    }
                });

                match connector
                    .connect(&host, &SystemBrowser, &mut ticker, registration)
                    .await
                {
                    ConnectOutcome::Connected(credentials) => {
                        println!("{}", serde_json::to_string_pretty(credentials.as_value())?);
                    }
                    ConnectOutcome::NoCredentials => bail!("Backend returned no HubSpot credentials"),
                    ConnectOutcome::Cancelled => bail!("Cancelled"),
                    ConnectOutcome::Failed => bail!("HubSpot connect failed"),
                }
            }
            Command::Load { credentials } => {
                let credentials = read_credentials(&credentials)?;
                let params = IntegrationParams::new()
                    .merged(HUBSPOT_KEY, IntegrationEntry::hubspot(credentials));
                let connector = HubspotConnector::new(api, user, org);
                let host = TerminalHost;

                let Some(items) = connector.load_items(&host, &params).await else {
                    bail!("Loading HubSpot items failed");
                };
                println!("{}", items.text);
                if !items.counts.is_empty() {
                    eprintln!("{}", items.summary());
                }
            }
        }

        Ok(())
    }

}

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    cli::run().await
}

#[cfg(target_arch = "wasm32")]
fn main() {}
