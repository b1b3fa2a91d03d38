use std::{error::Error, path::Path, process::exit};

use clap::Parser;
use rusqlite::Connection;
use time::{Duration, OffsetDateTime};

use expense_tracker::{
    Category, NewRecord, NewUser, PasswordHash, ValidatedPassword, create_record, create_user,
    initialize_db,
};

/// A utility for creating a test database for the expense tracker server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// How many days of sample expenses to create, ending today.
    #[arg(long, default_value_t = 30)]
    days: u16,
}

const SAMPLE_EXPENSES: [(&str, f64, Category); 7] = [
    ("Groceries", 54.30, Category::Food),
    ("Bus fare", 4.20, Category::Transportation),
    ("New shoes", 119.99, Category::Shopping),
    ("Movie tickets", 32.00, Category::Entertainment),
    ("Power bill", 145.67, Category::Bills),
    ("Pharmacy", 18.50, Category::Healthcare),
    ("Birthday gift", 40.00, Category::Other),
];

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    if output_path
        .extension()
        .is_none_or(|extension| extension.is_empty())
    {
        eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
        exit(1);
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating test user...");

    let password_hash = PasswordHash::new(
        ValidatedPassword::new_unchecked("test"),
        PasswordHash::DEFAULT_COST,
    )?;

    let user = create_user(
        NewUser {
            name: "Test User".to_owned(),
            email: "test@example.com".to_owned(),
            password_hash,
        },
        &conn,
    )?;

    println!("Creating {} days of sample expenses...", args.days);

    let today = OffsetDateTime::now_utc().date();

    for day in 0..args.days {
        let date = today - Duration::days(i64::from(day));
        // Every third day gets a second expense so the chart has some variety.
        let expenses_today = if day % 3 == 0 { 2 } else { 1 };

        for offset in 0..expenses_today {
            let (text, amount, category) =
                SAMPLE_EXPENSES[(usize::from(day) + offset) % SAMPLE_EXPENSES.len()];

            create_record(
                NewRecord {
                    user_id: user.id,
                    text: text.to_owned(),
                    amount,
                    category,
                    date,
                },
                &conn,
            )?;
        }
    }

    println!("Success! Log in as {} with the password 'test'.", user.email);

    Ok(())
}
