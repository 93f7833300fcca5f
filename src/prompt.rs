use anyhow::{Context, Result};
use std::io::{self, Write};

use crate::api::{Account, Squid};

/// Let the user pick an existing squid or create a new one.
///
/// `None` means "create a new squid". Invalid input falls back to creating
/// a new squid rather than looping.
pub fn select_squid(squids: &[Squid]) -> Result<Option<String>> {
    if squids.is_empty() {
        println!("No existing LinkedIn squids found. Creating a new one.");
        return Ok(None);
    }

    println!("\n--- Available LinkedIn Squids ---");
    for (index, squid) in squids.iter().enumerate() {
        println!(
            "[{}] ID: {} | Name: {} | Created: {}",
            index + 1,
            squid.id,
            squid.name.as_deref().unwrap_or("-"),
            squid.created_at.as_deref().unwrap_or("-"),
        );
    }
    println!("[N] Create New Squid");
    println!("---------------------------------");

    let choice = read_line("Select a Squid (number) or 'N' for new: ")?;
    let choice = choice.trim().to_lowercase();

    if choice == "n" {
        return Ok(None);
    }

    match choice.parse::<usize>() {
        Ok(number) if number >= 1 && number <= squids.len() => {
            Ok(Some(squids[number - 1].id.clone()))
        }
        _ => {
            println!("Invalid selection. Creating new squid.");
            Ok(None)
        }
    }
}

/// Let the user pick a connected account. Re-prompts on invalid input.
pub fn select_account(accounts: &[Account]) -> Result<String> {
    println!("\n--- Available Accounts ---");
    for (index, account) in accounts.iter().enumerate() {
        println!(
            "[{}] ID: {} | Username: {} | Type: {}",
            index + 1,
            account.id,
            account.username.as_deref().unwrap_or("-"),
            account.kind.as_deref().unwrap_or("-"),
        );
    }
    println!("--------------------------");

    loop {
        let choice = read_line("Select an Account (number): ")?;
        match choice.trim().parse::<usize>() {
            Ok(number) if number >= 1 && number <= accounts.len() => {
                return Ok(accounts[number - 1].id.clone());
            }
            Ok(_) => println!("Invalid selection. Try again."),
            Err(_) => println!("Invalid input. Please enter a number."),
        }
    }
}

/// Ask a yes/no question, defaulting to no. A failed read counts as no.
pub fn confirm(question: &str) -> bool {
    match read_line(question) {
        Ok(answer) => answer.trim().eq_ignore_ascii_case("y"),
        Err(_) => false,
    }
}

fn read_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush().context("Failed to flush stdout")?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line)
}
