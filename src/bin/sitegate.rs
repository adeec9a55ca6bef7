//! sitegate: CLI for checking requests against site access configs.

use clap::{Parser, Subcommand};
use sitegate::registry::SiteConfigProvider;
use sitegate::rule::IpRule;
use sitegate::{
    AccessGate, GateConfig, GateOutcome, GateRequest, GeoResolver, LogAuditSink, MaxMindProvider,
    SiteRegistry,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "sitegate")]
#[command(author = "Kaitu.io")]
#[command(version = "0.1.0")]
#[command(about = "Check requests against per-site IP and geofence access policies", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one request and print the decision
    Check {
        /// Sites file (YAML), overrides the config file
        #[arg(short, long)]
        sites: Option<PathBuf>,

        /// Request host, optionally with port
        #[arg(long)]
        host: String,

        /// Client IP address
        #[arg(long)]
        ip: String,

        /// Gate config file (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// MaxMind database, overrides the config file
        #[arg(short, long)]
        geoip: Option<PathBuf>,
    },

    /// Load a sites file and report problems
    Validate {
        /// Sites file (YAML), overrides the config file
        #[arg(short, long)]
        sites: Option<PathBuf>,

        /// Gate config file (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check {
            sites,
            host,
            ip,
            config,
            geoip,
        } => check(sites, &host, &ip, config, geoip).await,
        Commands::Validate { sites, config } => validate(sites, config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<PathBuf>) -> Result<GateConfig, Box<dyn std::error::Error>> {
    Ok(match path {
        Some(path) => GateConfig::load(path)?,
        None => GateConfig::default(),
    })
}

async fn check(
    sites: Option<PathBuf>,
    host: &str,
    ip: &str,
    config: Option<PathBuf>,
    geoip: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config)?;
    let registry = Arc::new(SiteRegistry::load(config.sites_path(sites)?)?);

    let mut resolver = GeoResolver::from_config(&config)?;
    if let Some(path) = geoip.or(config.geoip_database.clone()) {
        resolver = resolver.with_provider(Arc::new(MaxMindProvider::open(path)?));
    }

    let gate = AccessGate::new(registry.clone())
        .with_resolver(Arc::new(resolver))
        .with_audit_sink(Arc::new(LogAuditSink));

    let request = GateRequest::new(Some(host), Some(ip));
    let Some(hostname) = request.hostname() else {
        return Err("empty host".into());
    };

    match registry.site_config(&hostname) {
        Some(site) => {
            let evaluation = gate.evaluate_site(&site, Some(ip)).await;
            println!("site:     {} ({})", site.site_id, hostname);
            println!("mode:     {}", site.filter_mode);
            println!("ip:       {:?}", evaluation.ip);
            println!("geo:      {:?}", evaluation.geo);
            if let Some(country) = &evaluation.country {
                println!("country:  {}", country);
            }
            println!("decision: {}", evaluation.decision);
        }
        None => println!("no site registered for {}", hostname),
    }

    match gate.evaluate(&request).await {
        GateOutcome::PassThrough => println!("outcome:  pass through"),
        GateOutcome::Blocked(page) => println!("outcome:  {} {}", page.status(), page.title()),
    }
    Ok(())
}

fn validate(
    sites: Option<PathBuf>,
    config: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let sites = load_config(config)?.sites_path(sites)?;
    let registry = SiteRegistry::load(&sites)?;

    let mut problems = 0;
    for hostname in registry.hostnames() {
        let Some(site) = registry.site_config(&hostname) else {
            continue;
        };
        for spec in &site.ip_rules {
            if let Err(e) = IpRule::parse(spec) {
                println!("{}: {}", hostname, e);
                problems += 1;
            }
        }
        if site.filter_mode.needs_geo() && site.geo_allowed.is_none() && site.geofence.is_none() {
            println!(
                "{}: mode {} has no geofence; every request will be blocked",
                hostname, site.filter_mode
            );
            problems += 1;
        }
    }

    println!(
        "{} site(s) in {:?}, {} problem(s)",
        registry.len(),
        sites,
        problems
    );
    if problems > 0 {
        return Err("sites file has problems".into());
    }
    Ok(())
}
