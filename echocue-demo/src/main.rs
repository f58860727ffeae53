mod cli;
mod scene;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let options = cli::Options::parse(&args[1..])?;
    if options.offline {
        cli::run_offline(&options)
    } else {
        cli::run_device(&options)
    }
}
