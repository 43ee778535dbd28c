use log::{error, info, Level, Metadata, Record};
use srcon::client::Client;
use std::env;
use std::error::Error;
use std::process;

struct SimpleLogger;

impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            println!("{} - {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let _ = log::set_logger(&SimpleLogger).map(|()| log::set_max_level(log::LevelFilter::Info));

    let mut args = env::args().skip(1);
    let (host, password, command) = match (args.next(), args.next(), args.next()) {
        (Some(host), Some(password), Some(command)) => (host, password, command),
        _ => {
            error!("usage: srcon <host[:port]> <password> <command>");
            process::exit(2);
        }
    };

    let (host, port) = match host.split_once(':') {
        Some((host, port)) => (host.to_string(), port.parse()?),
        None => (host.to_string(), Client::DEFAULT_PORT),
    };

    let mut client = Client::connect(&host, port, &password).await?;
    let response = client.command(&command).await?;

    info!("{}", response.body());
    Ok(())
}
