mod app;
mod assets;
mod clock;
mod config;
mod decode;
mod mascot;
mod mode;
mod motion;
mod platform;
mod render;
mod sequence;
mod session;
mod ticker;
mod tray;
mod worker;

#[cfg(test)]
mod testutil;

use clap::Parser;

fn main() {
    env_logger::init();
    let config = config::Config::from(config::Cli::parse());
    log::info!("Desktop mascot starting up");

    if let Err(e) = app::run(config) {
        log::error!("Fatal error: {e}");
        std::process::exit(1);
    }
}
