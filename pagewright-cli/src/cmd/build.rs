use anyhow::Result;
use clap::{Arg, ArgMatches, Command};
use log::{error, info};
use pagewright_core::build_pages;

use crate::config::PagewrightConfig;

pub fn add_build_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("output-path")
                .short('o')
                .long("output-path")
                .value_name("DIR")
                .help("Directory where pages will be written [default: pages]"),
        )
        .arg(
            Arg::new("templates")
                .long("templates")
                .value_name("DIR")
                .help("Directory of Tera templates [default: .processor/templates]"),
        )
        .arg(
            Arg::new("template-ext")
                .long("template-ext")
                .value_name("EXT")
                .help("Extension of template files, parsed as Tera syntax [default: hbs]"),
        )
        .arg(
            Arg::new("shared")
                .long("shared")
                .value_name("DIR")
                .help("Directory of data shared with every page [default: shared]"),
        )
        .arg(
            Arg::new("data")
                .long("data")
                .value_name("DIR")
                .help("Directory of page data files [default: data]"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file [default: ./pagewright.toml]"),
        )
}

pub fn make_command() -> Command {
    add_build_args(Command::new("pagewright"))
        .version(env!("CARGO_PKG_VERSION"))
        .about("Render JSON, YAML and TOML data files through Tera templates into pages")
}

pub fn execute(args: &ArgMatches) -> Result<()> {
    let config = PagewrightConfig::load(args)?;
    let build_config = config.build_config();
    info!("Parsed configuration: {:?}", build_config);

    // Setup failures are reported but do not change the exit status
    let report = match build_pages(build_config) {
        Ok(report) => report,
        Err(e) => {
            error!("{}", e);
            return Ok(());
        }
    };

    info!("Pages written to {}: {}", build_config.output, report.summary());

    Ok(())
}
