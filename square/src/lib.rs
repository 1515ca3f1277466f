//! Command line handling shared by the `square` job binaries.
use std::path::PathBuf;
use clap::Parser;
use rank_reduce::{Config, Error, GroupSize, Rank, Result};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Number of members to launch (local group only)
    #[arg(short = 'n', long)]
    pub procs: Option<GroupSize>,
    /// Rank that receives and prints the sum
    #[arg(short, long)]
    pub root: Option<Rank>,
    /// Print every member's own value instead of reducing
    #[arg(long)]
    pub no_reduction: bool,
    /// Check the sum against the closed form
    #[arg(long)]
    pub verify: bool,
    /// YAML config file; flags given here override it
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl Args {
    /// Resolve the job config from the optional file and the flags.
    pub fn config(&self) -> Result<Config> {
        let mut cfg: Config = match &self.config {
            Some(path) => rank_reduce::load_config(path)
                .map_err(|err| Error::ConfigError(format!("{}: {}", path.display(), err)))?,
            None => Config::default(),
        };
        if let Some(procs) = self.procs {
            cfg.procs = procs;
        }
        if let Some(root) = self.root {
            cfg.root = root;
        }
        if self.no_reduction {
            cfg.use_reduction = false;
        }
        if self.verify {
            cfg.verify = true;
        }
        Ok(cfg)
    }
}
