//! Square every rank of an in-process group and print the result.
use std::io;
use std::process;
use clap::Parser;
use log::{error, info, warn};
use rank_reduce::{
    self,
    Communicator,
    GroupContext,
    RankReducer,
    Result,
    Value,
};
use square::Args;

fn run(args: Args) -> Result<()> {
    let cfg = args.config()?;
    for setting in cfg.ignored_settings() {
        warn!("{} is ignored without reduction", setting);
    }
    info!("launching {} members", cfg.procs);
    let results = rank_reduce::launch(cfg.procs, |comm| -> Result<Option<Value>> {
        let name = comm.processor_name()?;
        let group = GroupContext::from_communicator(comm)?;
        info!("rank {} of {} on {}", group.rank(), group.size(), name);
        RankReducer::new(group, cfg.root, cfg.mode())
            .verify(cfg.verify)
            .run(&mut io::stdout())
    })?;
    for result in results {
        result?;
    }
    Ok(())
}

fn main() {
    rank_reduce::init_logging();

    let args = Args::parse();
    if let Err(err) = run(args) {
        error!("{}", err);
        process::exit(1);
    }
}
