use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
    time::Instant,
};

use clap::{Parser, ValueEnum};
use log::{error, info};
use rayon::prelude::*;

use ppm_trie::{
    config::DEFAULT_ORDER,
    helpers::cmp,
    runner::{compress_file, decompress_file},
    Error, PpmConfig, Result,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Action {
    /// Compress
    #[value(name = "c")]
    Compress,
    /// Decompress
    #[value(name = "d")]
    Decompress,
    /// Test = compress + decompress + compare
    #[value(name = "t")]
    Test,
}

#[derive(Parser, Debug)]
#[command(name = "ppm-trie", version)]
#[command(about = "PPM compressor. Directories are shallow traversed, outputs go to the current directory")]
struct Args {
    action: Action,

    /// A single file or a directory
    path: PathBuf,

    /// Longest context used for prediction (1..=32), ignored by `d`
    #[arg(short, long, default_value_t = DEFAULT_ORDER)]
    order: usize,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = PpmConfig::with_order(args.order);

    match exec(&args, &config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

/// Ok(false) when some file of a directory failed
fn exec(args: &Args, config: &PpmConfig) -> Result<bool> {
    config.validate()?;
    if args.path.is_file() {
        return run(&args.path, args.action, config).map(|()| true);
    }
    if !args.path.is_dir() {
        return Err(Error::InvalidConfig("path must be a file or a directory"));
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(&args.path)? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }

    let failures = files
        .par_iter()
        .filter_map(|path| run(path, args.action, config).err().map(|err| (path, err)))
        .inspect(|(path, err)| error!("{}: {err}", path.display()))
        .count();
    if failures > 0 {
        error!("{failures} of {} files failed", files.len());
    }
    Ok(failures == 0)
}

fn run(file_path: &Path, action: Action, config: &PpmConfig) -> Result<()> {
    let mut out_path = std::env::current_dir()?;
    out_path.push(file_path.file_name().ok_or(Error::InvalidConfig("path has no file name"))?);

    let compress_path = out_path.with_extension("ppm");
    let decompress_path = out_path.with_extension("orig");

    match action {
        Action::Compress => compress(file_path, &compress_path, config),
        Action::Decompress => decompress(file_path, &decompress_path),
        Action::Test => {
            compress(file_path, &compress_path, config)?;
            decompress(&compress_path, &decompress_path)?;
            if cmp(file_path, &decompress_path)? {
                info!("[{}] compare: OK", file_path.display());
                Ok(())
            } else {
                Err(Error::Mismatch(decompress_path))
            }
        }
    }
}

fn compress(input: &Path, output: &Path, config: &PpmConfig) -> Result<()> {
    let timer = Instant::now();
    let size = compress_file(input, output, config)?;
    let csize = fs::metadata(output)?.len();
    info!(
        "[{}] csize: {} (ratio: {:.3}), ctime: {:?}",
        input.display(),
        csize,
        csize as f64 / size.max(1) as f64,
        timer.elapsed()
    );
    Ok(())
}

fn decompress(input: &Path, output: &Path) -> Result<()> {
    let timer = Instant::now();
    let size = decompress_file(input, output)?;
    info!("[{}] dsize: {}, dtime: {:?}", input.display(), size, timer.elapsed());
    Ok(())
}
