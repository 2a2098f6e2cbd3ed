//! CSV export of normalized transactions (spec §6 `export`), fixed
//! column order `Date, Amount, Category, Title, Note, Account` regardless
//! of the source bank's own column layout. Grounded on the `csv` crate's
//! symmetric `Writer` usage already established in `ledgerflow-ingest`'s
//! reader side.

use std::io::Read;
use std::io::Write;

use chrono::NaiveDate;
use ledgerflow_core::Transaction;

use crate::error::CliError;

const HEADER: [&str; 6] = ["Date", "Amount", "Category", "Title", "Note", "Account"];

/// Writes `transactions` as CSV to `writer` in the fixed ledger column
/// order, one row per transaction, in the order given (callers that need
/// a deterministic ordering should sort beforehand).
pub fn write_ledger<W: Write>(writer: W, transactions: &[Transaction]) -> Result<(), CliError> {
    let mut csv_writer = csv::WriterBuilder::new().has_headers(false).from_writer(writer);

    csv_writer.write_record(HEADER)?;
    for txn in transactions {
        csv_writer.write_record([
            txn.date.format("%Y-%m-%d").to_string(),
            format!("{:.2}", txn.amount),
            txn.category.clone(),
            txn.description.clone(),
            txn.note.clone().unwrap_or_default(),
            txn.account.clone(),
        ])?;
    }
    csv_writer.flush().map_err(|source| CliError::Io {
        path: "<export>".to_string(),
        source,
    })?;
    Ok(())
}

/// Reads a previously-exported ledger CSV back into [`Transaction`]s, for
/// `detect-transfers` runs over an already-normalized ledger (spec §6
/// `detect_transfers_only`). `transaction_index` is assigned by row order
/// since the fixed export schema does not carry one.
pub fn read_ledger<R: Read>(reader: R) -> Result<Vec<Transaction>, CliError> {
    let mut csv_reader = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
    let mut transactions = Vec::new();

    for (index, record) in csv_reader.records().enumerate() {
        let record = record?;
        let date = record
            .get(0)
            .and_then(|value| NaiveDate::parse_from_str(value, "%Y-%m-%d").ok())
            .ok_or_else(|| CliError::Parsing {
                path: "<ledger>".to_string(),
                source: format!("row {index}: unparseable or missing date"),
            })?;
        let amount: f64 = record
            .get(1)
            .and_then(|value| value.parse().ok())
            .ok_or_else(|| CliError::Parsing {
                path: "<ledger>".to_string(),
                source: format!("row {index}: unparseable or missing amount"),
            })?;
        let category = record.get(2).unwrap_or_default().to_string();
        let description = record.get(3).unwrap_or_default().to_string();
        let note = record.get(4).filter(|value| !value.is_empty()).map(str::to_string);
        let account = record.get(5).unwrap_or_default().to_string();

        transactions.push(Transaction {
            date,
            amount,
            currency: String::new(),
            description,
            note,
            category,
            account: account.clone(),
            balance: None,
            source_bank: account,
            transaction_index: index as u64,
            exchange_amount: None,
            exchange_currency: None,
            raw: std::collections::BTreeMap::new(),
        });
    }

    Ok(transactions)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use super::*;

    fn sample_transaction() -> Transaction {
        Transaction {
            date: NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date"),
            amount: -42.5,
            currency: "USD".to_string(),
            description: "Coffee Shop".to_string(),
            note: Some("card ending 1234".to_string()),
            category: "Dining".to_string(),
            account: "Checking".to_string(),
            balance: None,
            source_bank: "examplebank".to_string(),
            transaction_index: 0,
            exchange_amount: None,
            exchange_currency: None,
            raw: std::collections::BTreeMap::new(),
        }
    }

    #[test]
    fn writes_fixed_column_order_with_header() {
        let mut buffer = Vec::new();
        write_ledger(&mut buffer, &[sample_transaction()]).expect("export succeeds");
        let text = String::from_utf8(buffer).expect("utf8 output");
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Date,Amount,Category,Title,Note,Account"));
        assert_eq!(lines.next(), Some("2024-03-15,-42.50,Dining,Coffee Shop,card ending 1234,Checking"));
    }

    #[test]
    fn missing_note_exports_as_empty_field() {
        let mut txn = sample_transaction();
        txn.note = None;
        let mut buffer = Vec::new();
        write_ledger(&mut buffer, &[txn]).expect("export succeeds");
        let text = String::from_utf8(buffer).expect("utf8 output");
        assert!(text.lines().nth(1).expect("data row").ends_with(",Checking"));
        assert!(text.contains(",Dining,Coffee Shop,,Checking"));
    }

    #[test]
    fn read_ledger_round_trips_written_csv() {
        let mut buffer = Vec::new();
        write_ledger(&mut buffer, &[sample_transaction()]).expect("export succeeds");

        let transactions = read_ledger(buffer.as_slice()).expect("read succeeds");
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].date, sample_transaction().date);
        assert_eq!(transactions[0].category, "Dining");
        assert_eq!(transactions[0].note.as_deref(), Some("card ending 1234"));
    }

    #[test]
    fn read_ledger_rejects_unparseable_date() {
        let text = "Date,Amount,Category,Title,Note,Account\nnot-a-date,1.00,Misc,X,,Acct\n";
        let err = read_ledger(text.as_bytes()).expect_err("should fail");
        assert!(err.to_string().contains("unparseable"));
    }
}
