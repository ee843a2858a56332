use clap::Parser;
use env_logger::Env;
use picfind::Opts;
use picfind::cli::SubCommandExtend;
use picfind::config::SubCommand;

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let opts = Opts::parse();
    match &opts.subcmd {
        SubCommand::Build(config) => config.run(&opts),
        SubCommand::Prepare(config) => config.run(&opts),
        SubCommand::Query(config) => config.run(&opts),
    }
}
