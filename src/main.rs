use std::env;

use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use xfer_eng::csv::{read_accounts, read_transfers, write_accounts};
use xfer_eng::{AccountLockManager, InMemoryGateway, Orchestrator};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse().unwrap()))
        .with_writer(std::io::stderr)
        .init();

    let mut args = env::args().skip(1);
    let (accounts_path, transfers_path) = match (args.next(), args.next()) {
        (Some(a), Some(t)) => (a, t),
        _ => {
            eprintln!("usage: xfer-eng <accounts.csv> <transfers.csv>");
            std::process::exit(2);
        }
    };

    let gateway = InMemoryGateway::new();
    match read_accounts(&accounts_path) {
        Ok(accounts) => {
            for (id, balance) in accounts {
                gateway.open_account(id, balance);
            }
        }
        Err(e) => {
            eprintln!("failed to read accounts: {e}");
            std::process::exit(1);
        }
    }

    let orchestrator = Orchestrator::new(gateway, AccountLockManager::new());
    let (req_sender, req_receiver) = tokio::sync::mpsc::channel(16);

    tokio::spawn(async move {
        for result in read_transfers(&transfers_path) {
            match result {
                Ok(request) => {
                    req_sender.send(request).await.unwrap();
                }
                Err(e) => {
                    warn!("{e}");
                }
            }
        }
    });

    orchestrator.run(ReceiverStream::new(req_receiver)).await;

    write_accounts(orchestrator.gateway().accounts());
}
