//! Prints the movement of a tournament.
//!
//! ```text
//! movement <pairs> <boards> [hands-per-round] [version]
//! ```
//!
//! Environment variables are read as described in `pair_movement::configuration`.

use std::env;

use anyhow::{bail, Context};
use pair_movement::prelude::*;

fn parse_arg(value: Option<String>, name: &str) -> anyhow::Result<Option<u32>> {
    value
        .map(|v| v.parse().with_context(|| format!("{name} must be an integer, was {v:?}")))
        .transpose()
}

fn main() -> anyhow::Result<()> {
    let mut args = env::args().skip(1);
    let Some(pair_count) = parse_arg(args.next(), "pairs")? else {
        bail!("usage: movement <pairs> <boards> [hands-per-round] [version]");
    };
    let board_count = parse_arg(args.next(), "boards")?.context("number of boards is missing")?;
    let hands_per_round = parse_arg(args.next(), "hands-per-round")?;
    let version = args.next();

    let config = Configuration::from_env();
    let factory = MovementFactory::new(config);

    let mut request = MovementRequest::new(pair_count, board_count)
        .with_version_tag(version.as_deref())
        .context("corrupted tournament")?;
    if let Some(hands_per_round) = hands_per_round {
        request = request.with_hands_per_round(hands_per_round);
    }
    let movement = factory.create(&request)?;

    println!(
        "{} pairs, {} rounds, {} hands per round, {} hands (v{})",
        movement.pair_count(),
        movement.num_rounds(),
        movement.hands_per_round(),
        movement.total_hands(),
        request.version
    );

    for pair_no in 1..=movement.pair_count() {
        println!("pair {pair_no}");
        for record in movement.get_movement(pair_no)? {
            let Some(seating) = &record.seating else {
                println!("  round {:>2}: sits out", record.round_no);
                continue;
            };
            let relay = if seating.is_relay { " relay" } else { "" };
            println!(
                "  round {:>2}: {:>4} vs {:>2}  hands {:?}{relay}",
                record.round_no,
                seating.position(),
                seating.opponent,
                seating.hands
            );
        }
    }

    if config.is_verbose() {
        for round_no in 1..=movement.num_rounds() {
            println!(
                "round {round_no:>2} boards in play: {:?}",
                movement.hands_in_round(round_no)
            );
        }
    }

    Ok(())
}
