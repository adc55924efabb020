use clap::Parser;
use housing_agent::{Config, HousingAgent, SearchRequest};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Search rental listings across several sources and summarize them
#[derive(Parser, Debug)]
#[command(name = "housing-agent", version)]
struct Args {
    /// What to look for, e.g. "2 bed apartment under $3000"
    query: String,

    /// City to search in
    #[arg(long, default_value = "New York City")]
    city: String,

    /// Print the aggregated listings instead of a summary
    #[arg(long)]
    listings_only: bool,

    /// Print the response as JSON
    #[arg(long)]
    json: bool,

    /// Also save the aggregated listings to this JSON file
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;
    let agent = HousingAgent::from_config(&config)?;

    info!("🏠 Housing Agent");
    info!("Searching \"{}\" in {}", args.query, args.city);

    let (strategy, aggregation) = agent.search(&args.query, &args.city).await;
    info!("✅ Aggregated {} listings from {:?}", aggregation.listings.len(), strategy.platforms);

    if let Some(path) = &args.output {
        let json = serde_json::to_string_pretty(&aggregation.listings)?;
        tokio::fs::write(path, json).await?;
        info!("💾 Saved listings to {}", path.display());
    }

    if args.listings_only {
        if args.json {
            println!("{}", serde_json::to_string_pretty(&aggregation.listings)?);
            return Ok(());
        }
        for (i, listing) in aggregation.listings.iter().enumerate() {
            println!("{}. {} ({})", i + 1, listing.title, listing.price);
            println!("   {}", listing.location);
            if let Some(bedrooms) = &listing.bedrooms {
                println!("   Bedrooms: {}", bedrooms);
            }
            println!("   Platform: {}", listing.platform);
            println!("   URL: {}", listing.link);
            println!();
        }
        return Ok(());
    }

    let request = SearchRequest {
        query: args.query,
        city: args.city,
    };
    match agent.respond(&request, &aggregation).await {
        Ok(response) if args.json => println!("{}", serde_json::to_string_pretty(&response)?),
        Ok(response) => println!("{}", response.result),
        Err(e) => {
            if args.json {
                println!("{}", serde_json::json!({ "result": e.to_string() }));
            } else {
                eprintln!("{}", e);
            }
            std::process::exit(1);
        }
    }

    Ok(())
}
