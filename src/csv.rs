use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::{Account, AccountId, Amount, TransferRequest};

/// Errors that can occur when parsing csv rows
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("line {line}: failed to parse row: {source}")]
    Parse { line: usize, source: csv::Error },

    #[error("failed to open {path}: {source}")]
    Open { path: String, source: csv::Error },
}

#[derive(Debug, Deserialize)]
struct AccountRow {
    account: AccountId,
    balance: f64,
}

#[derive(Debug, Deserialize)]
struct TransferRow {
    source: AccountId,
    destination: AccountId,
    amount: f64,
}

#[derive(Debug, Serialize)]
struct OutputRow {
    account: AccountId,
    balance: String,
}

/// Read opening account balances from a csv file (`account,balance`).
pub fn read_accounts(path: impl AsRef<Path>) -> Result<Vec<(AccountId, Amount)>, CsvError> {
    let path = path.as_ref();
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| CsvError::Open {
            path: path.display().to_string(),
            source,
        })?;

    reader
        .into_deserialize::<AccountRow>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2; // 1-indexed, skip header
            let row = result.map_err(|source| CsvError::Parse { line, source })?;
            Ok((row.account, Amount::from_float(row.balance)))
        })
        .collect()
}

/// Read transfer requests from a csv file (`source,destination,amount`).
pub fn read_transfers(
    path: impl AsRef<Path>,
) -> impl Iterator<Item = Result<TransferRequest, CsvError>> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .expect("failed to open csv file");

    reader
        .into_deserialize::<TransferRow>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2; // 1-indexed, skip header
            let row = result.map_err(|source| CsvError::Parse { line, source })?;
            Ok(TransferRequest::new(
                row.source,
                row.destination,
                Amount::from_float(row.amount),
            ))
        })
}

/// Write final account balances to stdout in csv format, sorted by id.
pub fn write_accounts(accounts: impl IntoIterator<Item = Account>) {
    let stdout = io::stdout();
    let mut writer = csv::Writer::from_writer(stdout.lock());

    let mut accounts: Vec<_> = accounts.into_iter().collect();
    accounts.sort_by_key(|account| account.id);

    for account in accounts {
        let row = OutputRow {
            account: account.id,
            balance: account.balance.to_string(),
        };
        writer.serialize(&row).expect("failed to write csv row");
    }

    writer.flush().expect("failed to flush csv writer");
}
