use anyhow::anyhow;
use clap::Parser;
use const_format::concatcp;
use rand::{seq::SliceRandom, Rng};
use reqwest::{
    blocking::{Client, Response},
    StatusCode,
};
use serde::Deserialize;
use serde_json::json;
use std::env;
use std::fs::File;
use std::ops::AddAssign;
use std::process::{self, Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const LOCAL_PORT: u32 = 8374;
const LOCAL_URL: &str = concatcp!("http://127.0.0.1:", LOCAL_PORT);

#[rustfmt::skip]
const ROCKET_ENV: &[(&str, &str)] = &[
    ("ROCKET_PORT", concatcp!(LOCAL_PORT)),
    ("ROCKET_STORE", "memory"),
    ("ROCKET_JWT_SECRET", "benchmark-jwt-secret"),
];

const OPTIONS: &[&str] = &["Sí", "No", "Abstención"];

#[derive(Parser)]
struct Args {
    /// Silence local server logging.
    #[arg(short, long)]
    quiet: bool,

    /// Send local server logging to this file; takes precedence over --quiet.
    #[arg(long)]
    logfile: Option<String>,

    /// Connect to a remote server at this URL instead of running a local one.
    #[arg(long)]
    remote: Option<String>,

    /// Admin username on the server.
    #[arg(long, default_value = "coordinator")]
    username: String,

    /// Admin password on the server.
    #[arg(long, default_value = "coordinator")]
    password: String,

    /// How many threads to use. Defaults to the number of logical CPUs.
    #[arg(long, default_value_t = num_cpus::get())]
    threads: usize,

    /// Voters handled by each thread.
    #[arg(long, default_value_t = 100)]
    voters_per_thread: usize,

    /// Fraction of voters who immediately try to vote a second time.
    #[arg(long, default_value_t = 0.1)]
    duplicate_rate: f64,

    /// Fraction of voters who submit two ballots at the same moment.
    #[arg(long, default_value_t = 0.05)]
    race_rate: f64,
}

/// Construct a URL from segments.
macro_rules! url {
    ($($segment:expr),+) => {{
        std::path::PathBuf::from_iter([$($segment),+]).to_str().unwrap()
    }}
}

/// Build the server and set up its environment.
fn setup_deps() -> anyhow::Result<()> {
    Command::new("cargo")
        .args(["build", "--release"])
        .status()?
        .success()
        .then_some(())
        .ok_or_else(|| anyhow!("server build exited nonzero"))?;

    for (var, val) in ROCKET_ENV {
        env::set_var(var, val);
    }

    Ok(())
}

/// Terminate the given child process. This is a SIGTERM on unix and a hard-kill on other
/// platforms.
fn terminate_child(child: &mut Child) -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        let pid = nix::unistd::Pid::from_raw(child.id() as i32);
        nix::sys::signal::kill(pid, nix::sys::signal::Signal::SIGTERM)?;
    }
    #[cfg(not(unix))]
    {
        child.kill()?;
    }
    Ok(())
}

/// Start a local server and wait until it answers.
fn launch_server(logfile: Stdio) -> anyhow::Result<Child> {
    let mut proc = Command::new("./target/release/condo-vote-backend")
        .stdout(logfile)
        .spawn()?;

    let client = Client::new();
    loop {
        let resp = client
            .get(url!(LOCAL_URL, "sessions/current"))
            .send()
            .and_then(Response::error_for_status);
        if resp.is_ok() {
            break;
        }

        // Check the server didn't exit.
        if let Some(retcode) = proc.try_wait()? {
            return Err(anyhow!("Server exited prematurely with code {}", retcode));
        }
        thread::sleep(Duration::from_millis(50));
    }

    Ok(proc)
}

/// National ID and apartment of a generated voter.
fn voter(voter_id: usize) -> (String, String) {
    (format!("{:09}", voter_id + 1), format!("B{voter_id}"))
}

/// Weight of a generated apartment; a small spread of realistic values.
fn weight(voter_id: usize) -> f64 {
    [0.8, 1.0, 1.25, 1.5][voter_id % 4]
}

/// Log in as admin and return the client with its auth cookie.
fn admin_client(url: &str, args: &Args) -> anyhow::Result<Client> {
    let client = Client::builder().cookie_store(true).build()?;
    client
        .post(url!(url, "auth/admin"))
        .json(&json!({ "username": args.username, "password": args.password }))
        .send()
        .and_then(Response::error_for_status)?;
    Ok(client)
}

/// Load the roll, check everybody in, and open voting.
fn setup_assembly(url: &str, admin: &Client, num_voters: usize) -> anyhow::Result<()> {
    // Start from an empty session.
    admin
        .post(url!(url, "sessions/current/stop"))
        .send()
        .and_then(Response::error_for_status)?;
    admin
        .post(url!(url, "sessions/current/reset"))
        .json(&json!({ "confirm": true }))
        .send()
        .and_then(Response::error_for_status)?;

    let mut roll = String::from("cedula,apartamento,peso\n");
    for voter_id in 0..num_voters {
        let (national_id, apartment) = voter(voter_id);
        roll.push_str(&format!("{national_id},{apartment},{}\n", weight(voter_id)));
    }
    admin
        .post(url!(url, "voters/import"))
        .header("Content-Type", "text/csv")
        .body(roll)
        .send()
        .and_then(Response::error_for_status)?;

    for voter_id in 0..num_voters {
        let (national_id, apartment) = voter(voter_id);
        admin
            .post(url!(url, "attendance", national_id.as_str()))
            .json(&json!({ "apartment": apartment }))
            .send()
            .and_then(Response::error_for_status)?;
    }

    admin
        .post(url!(url, "sessions/current/start"))
        .json(&json!({
            "question": {
                "title": "Benchmark Question",
                "options": OPTIONS,
            }
        }))
        .send()
        .and_then(Response::error_for_status)?;
    Ok(())
}

/// What happened to the requests of one thread.
#[derive(Debug, Default)]
struct Outcomes {
    validate: Duration,
    vote: Duration,
    votes: u32,
    accepted: u32,
    rejected: u32,
    duplicates_accepted: u32,
}

impl AddAssign for Outcomes {
    fn add_assign(&mut self, rhs: Self) {
        self.validate += rhs.validate;
        self.vote += rhs.vote;
        self.votes += rhs.votes;
        self.accepted += rhs.accepted;
        self.rejected += rhs.rejected;
        self.duplicates_accepted += rhs.duplicates_accepted;
    }
}

/// Submit one ballot, returning whether it was accepted.
fn submit(url: &str, client: &Client, voter_id: usize, option: &str) -> anyhow::Result<bool> {
    let (national_id, apartment) = voter(voter_id);
    let resp = client
        .post(url!(url, "votes"))
        .json(&json!({
            "nationalId": national_id,
            "apartment": apartment,
            "option": option,
        }))
        .send()?;
    match resp.status() {
        StatusCode::CREATED => Ok(true),
        StatusCode::FORBIDDEN => Ok(false),
        status => Err(anyhow!("Unexpected vote response: {status}")),
    }
}

/// Validate and vote as each voter in `voters`, with the configured share of
/// repeated and simultaneous duplicate attempts.
fn run_voters(
    url: &str,
    voters: std::ops::Range<usize>,
    args: &Args,
) -> anyhow::Result<Outcomes> {
    let client = Client::new();
    let mut outcomes = Outcomes::default();

    for voter_id in voters {
        let (national_id, apartment) = voter(voter_id);
        let option = *OPTIONS.choose(&mut rand::thread_rng()).unwrap();

        let start = Instant::now();
        client
            .post(url!(url, "votes/validate"))
            .json(&json!({ "nationalId": national_id, "apartment": apartment }))
            .send()
            .and_then(Response::error_for_status)?;
        outcomes.validate += start.elapsed();

        let start = Instant::now();
        let accepted = if rand::thread_rng().gen_bool(args.race_rate) {
            // Two ballots at once; at most one may win.
            let (a, b) = thread::scope(|s| {
                let a = s.spawn(|| submit(url, &client, voter_id, option));
                let b = s.spawn(|| submit(url, &client, voter_id, option));
                (a.join(), b.join())
            });
            let (a, b) = (
                a.map_err(|_| anyhow!("vote thread panicked"))??,
                b.map_err(|_| anyhow!("vote thread panicked"))??,
            );
            outcomes.votes += 2;
            if a && b {
                outcomes.duplicates_accepted += 1;
            }
            outcomes.rejected += u32::from(!a) + u32::from(!b);
            a || b
        } else {
            outcomes.votes += 1;
            let accepted = submit(url, &client, voter_id, option)?;
            outcomes.rejected += u32::from(!accepted);
            accepted
        };
        outcomes.vote += start.elapsed();
        outcomes.accepted += u32::from(accepted);

        if rand::thread_rng().gen_bool(args.duplicate_rate) {
            outcomes.votes += 1;
            if submit(url, &client, voter_id, option)? {
                outcomes.duplicates_accepted += 1;
            } else {
                outcomes.rejected += 1;
            }
        }
    }

    Ok(outcomes)
}

/// Run the benchmark.
fn benchmark(url: &str, args: &Args) -> anyhow::Result<u32> {
    let per_thread = args.voters_per_thread;
    let end_val = args.threads * per_thread;

    let start = Instant::now();
    let outcomes = thread::scope(|s| {
        let mut threads = Vec::with_capacity(args.threads);
        for first in (0..end_val).step_by(per_thread) {
            threads.push(s.spawn(move || run_voters(url, first..first + per_thread, args)));
        }

        let mut outcomes = Outcomes::default();
        for t in threads {
            outcomes += t.join().map_err(|_| anyhow!("thread panicked"))??;
        }
        Ok::<_, anyhow::Error>(outcomes)
    })?;
    let total_duration = start.elapsed();

    let voters = end_val.max(1) as u32;
    println!("validate: {:?}", outcomes.validate / voters);
    println!("vote:     {:?}", outcomes.vote / voters);
    println!(
        "\n{} ballots submitted, {} accepted, {} rejected",
        outcomes.votes, outcomes.accepted, outcomes.rejected
    );
    println!(
        "actual duration: {} voters in {:?} ({:.2}/s)",
        end_val,
        total_duration,
        end_val as f64 / total_duration.as_secs_f64()
    );

    if outcomes.duplicates_accepted > 0 {
        return Err(anyhow!(
            "{} duplicate ballots were accepted",
            outcomes.duplicates_accepted
        ));
    }
    Ok(outcomes.accepted)
}

/// Check the tally agrees with what the benchmark saw accepted.
fn verify(url: &str, admin: &Client, accepted: u32, num_voters: usize) -> anyhow::Result<()> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Report {
        total_count: u64,
        total_weight: f64,
    }
    let report: Report = admin
        .get(url!(url, "tally"))
        .send()
        .and_then(Response::error_for_status)?
        .json()?;

    if report.total_count != u64::from(accepted) {
        return Err(anyhow!(
            "tally counts {} ballots but {} were accepted",
            report.total_count,
            accepted
        ));
    }
    let mut weights: Vec<f64> = (0..num_voters).map(weight).collect();
    weights.sort_by(f64::total_cmp);
    let expected: f64 = weights.iter().sum();
    if (report.total_weight - expected).abs() > 1e-6 {
        return Err(anyhow!(
            "tally weight {} differs from the roll's {}",
            report.total_weight,
            expected
        ));
    }
    println!("tally verified: {} ballots, weight {}", report.total_count, report.total_weight);
    Ok(())
}

fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let url = args.remote.as_deref().unwrap_or(LOCAL_URL);

    // If we're not connecting remotely, bring up a local server.
    let mut proc: Option<Child> = None;
    if args.remote.is_none() {
        setup_deps()?;
        let logfile = match &args.logfile {
            Some(path) => Stdio::from(File::create(path)?),
            None => {
                if args.quiet {
                    Stdio::null()
                } else {
                    Stdio::inherit()
                }
            }
        };
        proc = Some(launch_server(logfile)?);
    }

    // Use a closure to ensure the cleanup below runs.
    let result = (|| {
        let num_voters = args.threads * args.voters_per_thread;
        let admin = admin_client(url, &args)?;
        setup_assembly(url, &admin, num_voters)?;
        let accepted = benchmark(url, &args)?;
        verify(url, &admin, accepted, num_voters)
    })();

    // Kill the server.
    if let Some(p) = proc.as_mut() {
        terminate_child(p)?;
        p.wait()?;
    }

    result
}

fn main() {
    if let Err(e) = run() {
        eprintln!("FATAL: {}", e);
        process::exit(1);
    }
}
