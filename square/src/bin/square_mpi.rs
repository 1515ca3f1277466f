//! Square the rank of this MPI process and reduce the squares onto the root.
//!
//! Launch with the MPI job launcher, e.g. `mpirun -n 4 square_mpi`.
use std::io;
use std::process;
use clap::Parser;
use log::{error, info, warn};
use rank_reduce::{
    self,
    Communicator,
    GroupContext,
    MpiWorld,
    RankReducer,
    Result,
};
use square::Args;

fn run(args: Args) -> Result<()> {
    let cfg = args.config()?;
    for setting in cfg.ignored_settings() {
        warn!("{} is ignored without reduction", setting);
    }
    if args.procs.is_some() {
        warn!("--procs is ignored; the group size comes from the MPI launcher");
    }
    let world = MpiWorld::init()?;
    let name = world.processor_name()?;
    let group = GroupContext::from_communicator(world)?;
    info!("rank {} of {} on {}", group.rank(), group.size(), name);
    RankReducer::new(group, cfg.root, cfg.mode())
        .verify(cfg.verify)
        .run(&mut io::stdout())?;
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
