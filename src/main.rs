use clap::{Arg, Command};
use env_logger::Env;
use log::info;

use shark_probe::{
    Config,
    server::{Server, ToolBox},
};

fn pcap_arg() -> Arg {
    Arg::new("pcap")
        .value_name("PCAP")
        .help("Path to a capture file")
        .required(true)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = Command::new("shark-probe")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Traffic inspection tools over tshark, served as JSON-RPC tools on stdio")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config/shark-probe.json")
                .global(true)
        )
        .subcommand(
            Command::new("serve")
                .about("Serve the tools over stdio (default)")
        )
        .subcommand(
            Command::new("stats")
                .about("Protocol hierarchy statistics for a capture file")
                .arg(pcap_arg())
        )
        .subcommand(
            Command::new("conversations")
                .about("TCP conversation statistics for a capture file")
                .arg(pcap_arg())
        )
        .subcommand(
            Command::new("credentials")
                .about("Extract credentials from a capture file")
                .arg(pcap_arg())
        )
        .subcommand(
            Command::new("analyze")
                .about("Summarize a capture file")
                .arg(pcap_arg())
        )
        .subcommand(
            Command::new("check-ip")
                .about("Check an IP address against the threat blacklist")
                .arg(
                    Arg::new("ip")
                        .value_name("IP")
                        .help("IP address to check")
                        .required(true)
                )
        )
        .get_matches();
    
    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("config/shark-probe.json");
    let config_found = std::path::Path::new(config_path).exists();
    let config = if config_found {
        Config::from_file(config_path)?
    } else {
        Config::default()
    };
    
    env_logger::Builder::from_env(Env::default().default_filter_or(config.logging.level.as_str()))
        .target(env_logger::Target::Stderr)
        .init();
    
    if config_found {
        info!("Loaded configuration from {}", config_path);
    } else {
        info!("Config file {} not found, using defaults", config_path);
    }
    
    let toolbox = ToolBox::new(config)?;
    
    let outcome = match matches.subcommand() {
        Some(("stats", sub)) => toolbox.pcap_stats(required(sub, "pcap")?).await,
        Some(("conversations", sub)) => toolbox.pcap_conversations(required(sub, "pcap")?).await,
        Some(("credentials", sub)) => toolbox.extract_credentials(required(sub, "pcap")?).await,
        Some(("analyze", sub)) => toolbox.analyze_pcap(required(sub, "pcap")?).await,
        Some(("check-ip", sub)) => toolbox.check_ip(required(sub, "ip")?).await,
        _ => {
            info!("Serving tools on stdio");
            Server::new(toolbox).serve_stdio().await?;
            return Ok(());
        }
    };
    
    match outcome {
        Ok(text) => {
            println!("{}", text);
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn required<'a>(matches: &'a clap::ArgMatches, name: &str) -> anyhow::Result<&'a str> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow::anyhow!("missing argument <{}>", name))
}
