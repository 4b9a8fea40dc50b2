use std::env;
use std::error::Error;
use std::path::Path;
use std::process::exit;

use chrono::NaiveDate;
use common::{Amount, Email, NewTransaction, NewUser, PasswordHash, RawPassword, TransactionType};
use rusqlite::Connection;

use backend::db::{initialize, Insert, TransactionData};

/// Create and populate a database for manual testing.
///
/// Seeds the demo user `nick` (password `nick123`) and two sample
/// transactions.
fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <output_path>", &args[0]);
        exit(1);
    }

    let output_path = Path::new(&args[1]);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize(&conn)?;

    println!("Creating test user...");

    // The demo password predates the strength requirements, so it is hashed
    // without the weak-password check.
    let password_hash = PasswordHash::new(&RawPassword::new("nick123".to_owned())?)?;

    let user = NewUser {
        username: "nick".to_owned(),
        password_hash,
        name: "Nick Demo".to_owned(),
        email: Email::new("nick@example.com")?,
    }
    .insert(&conn)?;

    println!("Creating sample transactions...");

    let sample_transactions = [
        NewTransaction {
            name: "Monthly Salary".to_owned(),
            amount: Amount::new(5_000_000.0)?,
            transaction_type: TransactionType::Income,
            date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
        },
        NewTransaction {
            name: "Monthly Shopping".to_owned(),
            amount: Amount::new(1_500_000.0)?,
            transaction_type: TransactionType::Expense,
            date: NaiveDate::from_ymd_opt(2024, 3, 16).unwrap(),
        },
    ];

    for details in sample_transactions {
        TransactionData::new(details, user.id()).insert(&conn)?;
    }

    Ok(())
}
