use std::fs;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::arg;
use tracing_subscriber::EnvFilter;
use zone_digest::rr::{Name, TimeToLive};
use zone_digest::sign::{ZoneSigningKey, parse_key_algorithm};
use zone_digest::store::DEFAULT_TREE_WIDTH;
use zone_digest::{Backend, DigestRecordType, Zone, ZoneDigestError, engine};

/// Placeholder digest types honored per run.
const MAX_PLACEHOLDERS: usize = 10;

fn main() -> ExitCode {
    let args = command().get_matches();

    let filter = if args.get_flag("quiet") {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("zonemd: {error}");
            ExitCode::FAILURE
        }
    }
}

fn command() -> clap::Command {
    clap::Command::new("zonemd")
        .about("Compute, verify, and re-sign message digests covering DNS zones")
        .args([
            arg!(-c --calculate "Calculate the zone digest(s) and update the apex records"),
            arg!(-v --verify "Verify the zone digest(s); exit status is nonzero on mismatch"),
            arg!(-p --placeholder <TYPE> "Insert a placeholder digest record of the given digest type")
                .action(clap::ArgAction::Append)
                .value_parser(clap::value_parser!(u8)),
            arg!(-z --zsk <FILE> "Zone signing key; enables re-signing of the digest records")
                .value_parser(clap::value_parser!(PathBuf)),
            arg!(-a --algorithm <ALG> "DNSKEY algorithm of the signing key")
                .default_value("ECDSAP256SHA256"),
            arg!(-u --update <FILE> "File of add/del record updates applied after the initial load")
                .value_parser(clap::value_parser!(PathBuf)),
            arg!(-o --output <FILE> "Write the resulting zone to FILE")
                .value_parser(clap::value_parser!(PathBuf)),
            arg!(-t --timings "Print a CPU time breakdown to stdout"),
            arg!(-q --quiet "Quiet mode, show errors only"),
            arg!(-D --depth <DEPTH> "Depth of the hash tree store")
                .value_parser(clap::value_parser!(u32)),
            arg!(-W --width <WIDTH> "Width of the hash tree store")
                .value_parser(clap::value_parser!(usize)),
            arg!(<ORIGIN> "DNS origin of the zone").value_parser(clap::value_parser!(Name)),
            arg!([ZONEFILE] "Zone file; read from standard input when absent")
                .value_parser(clap::value_parser!(PathBuf)),
        ])
}

fn run(args: &clap::ArgMatches) -> Result<bool, ZoneDigestError> {
    let origin = {
        let mut name = args
            .get_one::<Name>("ORIGIN")
            .expect("ORIGIN is required")
            .clone();
        if !name.is_fqdn() {
            name.set_fqdn(true);
        }
        name
    };

    let calculate = args.get_flag("calculate");
    let verify = args.get_flag("verify");

    let mut placeholders: Vec<u8> = args
        .get_many::<u8>("placeholder")
        .map(|types| types.copied().collect())
        .unwrap_or_default();
    if placeholders.len() > MAX_PLACEHOLDERS {
        tracing::warn!("only the first {MAX_PLACEHOLDERS} placeholder digest types are honored");
        placeholders.truncate(MAX_PLACEHOLDERS);
    }

    let backend = match (
        args.get_one::<u32>("depth").copied(),
        args.get_one::<usize>("width").copied(),
    ) {
        (None, None) => Backend::Flat,
        (depth, width) => Backend::Tree {
            depth: depth.unwrap_or(0),
            width: width.unwrap_or(DEFAULT_TREE_WIDTH),
        },
    };

    let key = match args.get_one::<PathBuf>("zsk") {
        Some(path) => {
            let algorithm = parse_key_algorithm(
                args.get_one::<String>("algorithm").expect("has a default"),
            )?;
            Some(ZoneSigningKey::load(path, algorithm, TimeToLive::DEFAULT)?)
        }
        None => None,
    };

    let started = Instant::now();
    let text = match args.get_one::<PathBuf>("ZONEFILE") {
        Some(path) => fs::read_to_string(path)?,
        None => io::read_to_string(io::stdin())?,
    };
    let mut zone = Zone::from_text(origin, &text, backend, DigestRecordType::Standard)?;

    if !placeholders.is_empty() {
        engine::add_placeholders(&mut zone, &placeholders)?;
    }
    let loaded = Instant::now();

    if calculate {
        engine::calculate(&mut zone, key.as_ref())?;
    }
    let calculated = Instant::now();

    let mut ok = true;
    if verify {
        ok &= engine::verify(&mut zone)?;
    }
    let verified = Instant::now();

    if let Some(path) = args.get_one::<PathBuf>("update") {
        let updates = fs::read_to_string(path)?;
        zone.apply_update(&updates)?;
        if calculate {
            engine::calculate(&mut zone, key.as_ref())?;
        }
    }
    let updated = Instant::now();

    if let Some(path) = args.get_one::<PathBuf>("output")
        && (!placeholders.is_empty() || calculate)
    {
        let mut out = BufWriter::new(fs::File::create(path)?);
        zone.write_to(&mut out)?;
    }

    if args.get_flag("timings") {
        println!(
            "TIMINGS: load {load:7.2} calculate {calc:7.2} verify {verify:7.2} update {update:7.2}",
            load = millis(started, loaded),
            calc = millis(loaded, calculated),
            verify = millis(calculated, verified),
            update = millis(verified, updated),
        );
    }

    Ok(ok)
}

fn millis(from: Instant, to: Instant) -> f64 {
    (to - from).as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parses_flag_vocabulary() {
        let matches = command()
            .try_get_matches_from([
                "zonemd", "-c", "-v", "-p", "1", "-p", "2", "-D", "3", "-W", "7", "-q",
                "example.com", "zone.db",
            ])
            .unwrap();

        assert!(matches.get_flag("calculate"));
        assert!(matches.get_flag("verify"));
        assert!(matches.get_flag("quiet"));
        assert_eq!(
            matches.get_many::<u8>("placeholder").unwrap().copied().collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(matches.get_one::<u32>("depth"), Some(&3));
        assert_eq!(matches.get_one::<usize>("width"), Some(&7));
    }

    #[test]
    fn test_command_requires_origin() {
        assert!(command().try_get_matches_from(["zonemd", "-c"]).is_err());
    }
}
