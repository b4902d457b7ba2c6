use anyhow::Result;

mod cmd;
mod config;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = cmd::build::make_command().get_matches();
    cmd::build::execute(&matches)
}
