use anyhow::Result;
use clap::{crate_version, App};
use roundtrip::build::build_site;
use roundtrip::config::Config;
use roundtrip::log;

fn main() {
    App::new("roundtrip")
        .version(crate_version!())
        .about("Builds a static blog whose pages each fit in one TCP round trip")
        .get_matches();

    match run() {
        Ok(()) => {}
        Err(e) => {
            log!("error"; "{:#}", e);
            std::process::exit(1);
        }
    }
}

fn run() -> Result<()> {
    let config = Config::from_directory(&std::env::current_dir()?)?;
    let summary = build_site(&config)?;
    log!(
        "done";
        "Build complete! Generated {} posts in {} manifest chunks",
        summary.posts,
        summary.chunks
    );
    Ok(())
}
