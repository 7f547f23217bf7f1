// Runs a minima search from JSON files:
//
//   annealnet <net-spec.json> <search-config.json> <samples.json> <out-net.json>
//
// `samples.json` holds `[[input, target], ...]`. The trained net is written
// to `out-net.json`. Set RUST_LOG=debug for per-restart logs.
use std::process::ExitCode;

use annealnet::{Net, NetSpec, Result, Sample, Search, SearchConfig};
use tracing::{error, info};

fn run(args: &[String]) -> Result<()> {
    let spec = NetSpec::load_json(&args[1])?;
    let config = SearchConfig::load_json(&args[2])?;
    let samples: Vec<Sample> = serde_json::from_reader(std::io::BufReader::new(
        std::fs::File::open(&args[3])?,
    ))?;

    let mut net = Net::from_spec(&spec)?;
    let result = Search::new(config).run(&mut net, &samples, |cost, _| {
        info!(cost, "new best");
    })?;

    for (input, target) in &samples {
        let output = net.evaluate(input)?;
        info!(?input, ?target, ?output, "trained");
    }
    net.save_json(&args[4])?;
    info!(cost = result.cost, path = %args[4], "saved");
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 5 {
        eprintln!("usage: annealnet <net-spec.json> <search-config.json> <samples.json> <out-net.json>");
        return ExitCode::from(2);
    }
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
