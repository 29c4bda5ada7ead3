use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "dash-cli")]
#[command(about = "Command-line client for the dashboard server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:18881")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the server answers
    Ping,
    /// Show server name and version
    Version,
    /// List channels and their types
    Channels,
    /// Query channel data
    Data {
        /// Comma-separated channel names
        channels: String,
        /// Window length in seconds
        #[arg(long, default_value_t = 3600.0)]
        length: f64,
        /// Window end; 0 = now, negative = relative to now
        #[arg(long, default_value_t = 0.0)]
        to: f64,
        /// Resampling interval in seconds (0 = automatic)
        #[arg(long)]
        resample: Option<f64>,
        /// Bucket reducer: first, last, mean, median, sum, count, std, min, max
        #[arg(long, default_value = "last")]
        reducer: String,
    },
    /// Publish a JSON value to a live channel
    Publish {
        channel: String,
        /// JSON value, e.g. 42 or '{"x": 1}'
        data: String,
    },
    /// Remove a live channel
    Delete { channel: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Ping => client.get(format!("{}/api/ping", base)).send().await?,
        Commands::Version => client.get(format!("{}/api/version", base)).send().await?,
        Commands::Channels => client.get(format!("{}/api/channels", base)).send().await?,
        Commands::Data {
            channels,
            length,
            to,
            resample,
            reducer,
        } => {
            let mut query = vec![
                ("length", length.to_string()),
                ("to", to.to_string()),
                ("reducer", reducer),
            ];
            if let Some(interval) = resample {
                query.push(("resample", interval.to_string()));
            }
            client
                .get(format!("{}/api/data/{}", base, channels))
                .query(&query)
                .send()
                .await?
        }
        Commands::Publish { channel, data } => {
            let value: Value = serde_json::from_str(&data)?;
            client
                .post(format!("{}/api/publish/{}", base, channel))
                .json(&value)
                .send()
                .await?
        }
        Commands::Delete { channel } => {
            client
                .delete(format!("{}/api/publish/{}", base, channel))
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
        if !text.is_empty() {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
