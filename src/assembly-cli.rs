//! Offline tooling for assembly operators: recount an exported results file
//! independently of the server, and hash admin passwords for `Rocket.toml`.

use std::fs::File;
use std::io::BufReader;

use clap::{Arg, ArgAction, ArgMatches, Command};
use rand::Rng;

use condo_vote_backend::model::common::{tally::Tally, weights::WeightTable};

const PROGRAM_NAME: &str = "assembly-cli";

const ABOUT_TEXT: &str = "Offline tools for condominium assembly voting.

EXIT CODES:
     0: Success.
     1: IO error.
     2: Malformed input.";

const TALLY: &str = "tally";
const HASH_PASSWORD: &str = "hash-password";
const RESULTS_PATH: &str = "RESULTS_PATH";
const PASSWORD: &str = "PASSWORD";

const RESULTS_PATH_HELP: &str = "The path to a results export,\n\
as returned by `GET /ballots/export`";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME)
        .about(ABOUT_TEXT)
        .subcommand_required(true)
        .subcommand(
            Command::new(TALLY)
                .about("Recompute the weighted tally of an exported results file")
                .arg(
                    Arg::new(RESULTS_PATH)
                        .help(RESULTS_PATH_HELP)
                        .action(ArgAction::Set)
                        .required(true),
                ),
        )
        .subcommand(
            Command::new(HASH_PASSWORD)
                .about("Print an argon2 hash for `admin_password_hash`")
                .arg(
                    Arg::new(PASSWORD)
                        .help("The admin password to hash")
                        .action(ArgAction::Set)
                        .required(true),
                ),
        )
}

/// Errors that this program may produce.
#[derive(Debug, PartialEq)]
enum Error {
    /// IO error described by the inner message.
    IO(String),
    /// The input could not be understood.
    Format(String),
}

/// One option's line in the recount.
#[derive(Debug, PartialEq)]
struct OptionLine {
    label: String,
    count: u64,
    weight: f64,
    percentage: f64,
}

/// Read an export and tally it. Lines are ordered by weight, then label.
fn recount(path: &str) -> Result<(Tally, Vec<OptionLine>), Error> {
    let file = BufReader::new(File::open(path).map_err(|e| Error::IO(e.to_string()))?);
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut votes = Vec::new();
    for (index, record) in reader.records().enumerate() {
        // Line 1 is the header.
        let line = index + 2;
        let record = record.map_err(|e| Error::Format(e.to_string()))?;
        let (Some(label), Some(weight)) = (record.get(1), record.get(2)) else {
            return Err(Error::Format(format!("Line {line} has fewer than 3 columns")));
        };
        let weight = weight
            .parse::<f64>()
            .ok()
            .filter(|w| WeightTable::is_valid_weight(*w))
            .ok_or_else(|| Error::Format(format!("Line {line} has an invalid weight")))?;
        votes.push((label.to_string(), weight));
    }

    let tally = Tally::from_weighted(votes.iter().map(|(label, weight)| (label.as_str(), *weight)));
    let mut lines = tally
        .per_option
        .iter()
        .map(|(label, total)| OptionLine {
            label: label.clone(),
            count: total.count,
            weight: total.weight,
            percentage: tally.percentage(label),
        })
        .collect::<Vec<_>>();
    lines.sort_by(|a, b| b.weight.total_cmp(&a.weight).then_with(|| a.label.cmp(&b.label)));
    Ok((tally, lines))
}

fn hash_password(password: &str) -> Result<String, Error> {
    let mut salt = [0_u8; 16];
    rand::thread_rng().fill(&mut salt);
    argon2::hash_encoded(password.as_bytes(), &salt, &argon2::Config::default())
        .map_err(|e| Error::Format(e.to_string()))
}

/// Run the chosen command, report the result, and return the exit code.
fn run(args: &ArgMatches) -> u8 {
    let result = match args.subcommand() {
        Some((TALLY, sub_args)) => {
            // Required argument is guaranteed to be present.
            let path: &String = sub_args.get_one(RESULTS_PATH).unwrap();
            recount(path).map(|(tally, lines)| {
                println!(
                    "{} ballot{}, total weight {}",
                    tally.total_count,
                    if tally.total_count != 1 { "s" } else { "" },
                    tally.total_weight
                );
                for line in lines {
                    println!(
                        "{}: {} vote{}, weight {} ({:.2}%)",
                        line.label,
                        line.count,
                        if line.count != 1 { "s" } else { "" },
                        line.weight,
                        line.percentage
                    );
                }
            })
        }
        Some((HASH_PASSWORD, sub_args)) => {
            let password: &String = sub_args.get_one(PASSWORD).unwrap();
            hash_password(password).map(|hash| println!("{hash}"))
        }
        _ => unreachable!("subcommand is required"),
    };

    match result {
        Ok(()) => 0,
        Err(Error::IO(msg)) => {
            println!("IO error: {}", msg);
            1
        }
        Err(Error::Format(msg)) => {
            println!("Invalid input: {}", msg);
            2
        }
    }
}

fn main() {
    let args = cli().get_matches();
    let exit_code = run(&args);
    std::process::exit(exit_code.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn recount_of_export() {
        let (tally, lines) = recount("example_exports/results.csv").unwrap();
        assert_eq!(tally.total_count, 3);
        assert_eq!(tally.total_weight, 4.5);
        assert_eq!(
            lines,
            vec![
                OptionLine {
                    label: "Sí".to_string(),
                    count: 2,
                    weight: 2.5,
                    percentage: 2.5 / 4.5 * 100.0,
                },
                OptionLine {
                    label: "No".to_string(),
                    count: 1,
                    weight: 2.0,
                    percentage: 2.0 / 4.5 * 100.0,
                },
            ]
        );
    }

    #[test]
    fn empty_export() {
        let (tally, lines) = recount("example_exports/empty.csv").unwrap();
        assert_eq!(tally.total_count, 0);
        assert!(lines.is_empty());
    }

    #[test]
    fn bad_inputs() {
        assert_eq!(
            recount("example_exports/bad_weight.csv").map(|_| ()),
            Err(Error::Format("Line 3 has an invalid weight".to_string()))
        );
        assert!(matches!(
            recount("example_exports/missing.csv"),
            Err(Error::IO(_))
        ));
    }

    #[test]
    fn hashes_verify() {
        let hash = hash_password("coordinator").unwrap();
        assert!(argon2::verify_encoded(&hash, b"coordinator").unwrap());
        assert!(!argon2::verify_encoded(&hash, b"nope").unwrap());
    }
}
