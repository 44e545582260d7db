//! A simple CLI tool for tallying an exported set of votes, and checking that a
//! receipt refers to one of them. This uses the server's own tally
//! implementation, and reads exactly what `GET /admin/votes` returns.

use std::fs::File;
use std::io::BufReader;

use clap::{Arg, ArgAction, ArgMatches, Command};
use rocket::serde::json::serde_json;

use evote_backend::model::{
    api::{results::Tally, vote::VoteDescription},
    common::receipt::Receipt,
};

const PROGRAM_NAME: &str = "tally-cli";

const ABOUT_TEXT: &str = "Tally an exported set of votes.

EXIT CODES:
     0: Tally succeeded (and the receipt, if given, was found).
   255: Ran successfully, but the receipt is not in the export.
 Other: Error.";

const VOTES_PATH: &str = "VOTES_PATH";

const VOTES_PATH_HELP: &str = "The path to a JSON export of all votes,\n\
as returned by `GET /admin/votes`";

const RECEIPT: &str = "receipt";

const RECEIPT_HELP: &str = "A vote receipt to look for in the export";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME)
        .about(ABOUT_TEXT)
        .arg(
            Arg::new(VOTES_PATH)
                .help(VOTES_PATH_HELP)
                .action(ArgAction::Set)
                .required(true),
        )
        .arg(
            Arg::new(RECEIPT)
                .long(RECEIPT)
                .short('r')
                .help(RECEIPT_HELP)
                .action(ArgAction::Set),
        )
}

/// Errors that this program may produce.
#[derive(Debug, Eq, PartialEq)]
enum Error {
    /// IO error described by the inner message.
    IO(String),
    /// Failed to decode the JSON export.
    Format(String),
    /// The receipt given could not be parsed.
    Receipt(String),
}

/// Load the export at the given path.
fn load(path: &str) -> Result<Vec<VoteDescription>, Error> {
    let file = BufReader::new(File::open(path).map_err(|e| Error::IO(e.to_string()))?);
    serde_json::from_reader(file).map_err(|e| Error::Format(e.to_string()))
}

/// Is there a vote in the export for this receipt?
/// Only the vote key matters, as on the server.
fn find_receipt<'a>(votes: &'a [VoteDescription], receipt: &Receipt) -> Option<&'a VoteDescription> {
    let key = receipt.vote_key();
    votes.iter().find(|vote| vote.id == key)
}

/// Render the tally for humans.
fn report(tally: &Tally) -> Vec<String> {
    let mut lines = vec![format!(
        "{} vote{} in total.",
        tally.total_votes,
        if tally.total_votes != 1 { "s" } else { "" }
    )];
    for group in &tally.groups {
        lines.push(format!(
            "Group {} ({} vote{}):",
            group.group_id,
            group.total_votes,
            if group.total_votes != 1 { "s" } else { "" }
        ));
        for candidate in &group.candidates {
            lines.push(format!(
                "  {}: {} vote{}",
                candidate.name,
                candidate.votes,
                if candidate.votes != 1 { "s" } else { "" }
            ));
        }
    }
    lines
}

/// Run the tally, report the result, and return the exit code.
fn run(args: &ArgMatches) -> u8 {
    let path: &String = args.get_one(VOTES_PATH).unwrap(); // Required argument is guaranteed to be present.
    let receipt = match args
        .get_one::<String>(RECEIPT)
        .map(|receipt| receipt.parse::<Receipt>())
        .transpose()
    {
        Ok(receipt) => receipt,
        Err(err) => {
            println!("{}", Error::Receipt(err.to_string()).message());
            return 1;
        }
    };

    let votes = match load(path) {
        Ok(votes) => votes,
        Err(err) => {
            println!("{}", err.message());
            return 1;
        }
    };

    for line in report(&Tally::from_export(&votes)) {
        println!("{line}");
    }

    match receipt {
        Some(receipt) => match find_receipt(&votes, &receipt) {
            Some(vote) => {
                println!("Receipt verified: vote cast at {}.", vote.timestamp);
                0
            }
            None => {
                println!("Receipt not found: no vote with key {}.", receipt.vote_key());
                255
            }
        },
        None => 0,
    }
}

impl Error {
    fn message(&self) -> String {
        match self {
            Self::IO(msg) => format!("IO error: {msg}"),
            Self::Format(msg) => format!("Invalid JSON: {msg}"),
            Self::Receipt(msg) => format!("Invalid receipt: {msg}"),
        }
    }
}

fn main() {
    let args = cli().get_matches();
    let exit_code = run(&args);
    std::process::exit(exit_code.into())
}
