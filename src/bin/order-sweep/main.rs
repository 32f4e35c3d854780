use std::{path::PathBuf, process::ExitCode, time::Instant};

use clap::Parser;
use log::{error, info};
use rayon::prelude::*;

use ppm_trie::{
    entropy_coding::BitCounter,
    models::{PpmEncoder, PpmModel},
    PpmConfig, Result,
};

/// Compresses one file at every max order and reports the smallest output
#[derive(Parser, Debug)]
#[command(name = "order-sweep")]
struct Args {
    path: PathBuf,

    /// Highest order tried
    #[arg(short, long, default_value_t = 12)]
    max: usize,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match sweep(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn sweep(args: &Args) -> Result<()> {
    let buf = std::fs::read(&args.path)?;

    let results = (1..=args.max)
        .into_par_iter()
        .map(|order| exec(&buf, order).map(|csize| (order, csize)))
        .collect::<Result<Vec<_>>>()?;

    if let Some(&(order, csize)) = results.iter().min_by_key(|(_, csize)| *csize) {
        info!(
            "-> best: {} (ratio: {:.3}) for [order: {}]",
            csize,
            csize as f64 / buf.len().max(1) as f64,
            order
        );
    }
    Ok(())
}

fn exec(buf: &[u8], order: usize) -> Result<u64> {
    let timer = Instant::now();
    let mut model = PpmModel::new(PpmConfig::with_order(order))?;
    let mut encoder = PpmEncoder::new(&mut model, BitCounter::new());
    encoder.encode_all(buf)?;
    let csize = encoder.finish()?.bytes();

    let time = timer.elapsed();
    info!(
        "[order: {:2}] csize: {} (ratio: {:.3}), nodes: {}, ctime: {:?} ({:?} per byte)",
        order,
        csize,
        csize as f64 / buf.len().max(1) as f64,
        model.node_count(),
        time,
        time.div_f64(buf.len().max(1) as f64)
    );
    Ok(csize)
}
