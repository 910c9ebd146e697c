#[macro_use]
extern crate tracing;

use clap::Parser;
use eyre::{
    bail,
    OptionExt as _,
    Result,
};
use ingress_dns_registry::{
    config::{
        SyncConfig,
        DEFAULT_MAX_ZONE_PAGES,
    },
    dns::cloudflare::{
        CloudflareApi,
        Zone,
    },
    ingress::IngressSource,
    resolver::HostnameResolver,
    sync::{
        self,
        SyncReport,
    },
};
use kube::config::{
    KubeConfigOptions,
    Kubeconfig,
};
use std::{
    num::NonZeroUsize,
    path::PathBuf,
    time::Duration,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about)]
struct Args {
    #[clap(long, short = 'X', global = true, help = "Enable debug logging")]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Create the external-dns ownership records missing for the cluster's ingress hostnames.
    CreateRegistry(ArgsRegistry),
    /// Print the hostnames and owners that would be registered.
    ListClaims(ArgsCluster),
    /// Print the zones visible to the Cloudflare API token.
    ListZones(ArgsCloudflare),
}

#[derive(clap::Args)]
struct ArgsCluster {
    #[clap(long, help = "Path to the kubeconfig file, instead of the default location")]
    kubeconfig: Option<PathBuf>,

    #[clap(long, help = "Kubernetes context to use")]
    context: Option<String>,

    #[clap(
        long,
        help = "Only register hostnames containing this value. Defaults to the kubernetes context name"
    )]
    domain_filter: Option<String>,
}

#[derive(clap::Args)]
struct ArgsCloudflare {
    #[clap(long, env = "CLOUDFLARE_API_TOKEN", help = "Cloudflare API token")]
    cloudflare_api_token: String,

    #[clap(
        long,
        default_value_t = NonZeroUsize::new(DEFAULT_MAX_ZONE_PAGES).unwrap_or(NonZeroUsize::MIN),
        help = "Give up listing a zone after this many pages"
    )]
    max_zone_pages: NonZeroUsize,
}

#[derive(clap::Args)]
struct ArgsRegistry {
    #[clap(flatten)]
    cluster: ArgsCluster,

    #[clap(flatten)]
    cloudflare: ArgsCloudflare,

    #[clap(long, help = "Cloudflare zone id")]
    zone: Option<String>,

    #[clap(long, conflicts_with = "zone", help = "Cloudflare zone name, looked up to find the zone id")]
    zone_name: Option<String>,

    #[clap(long, help = "Log the changes instead of applying them")]
    dry_run: bool,

    #[clap(
        long,
        short = 's',
        default_value_t = 50,
        help = "Number of records created per batch"
    )]
    change_batch_size: usize,

    #[clap(
        long,
        short = 'i',
        default_value = "1m",
        value_parser = humantime::parse_duration,
        help = "Time to wait between two batches"
    )]
    change_batch_interval: Duration,

    #[clap(long, default_value = "", help = "Prefix of the ownership record names")]
    external_dns_prefix: String,

    #[clap(long, help = "Owner id written into the ownership records")]
    external_dns_owner: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    init_logs(args.debug);

    match args.command {
        Command::CreateRegistry(args) => create_registry(args).await?,
        Command::ListClaims(args) => {
            let domain_filter = domain_filter(&args)?;
            let source = IngressSource::new(kube_client(&args).await?);
            let bindings = sync::resolve_claims(&HostnameResolver::new(domain_filter), &source).await?;
            print!("{}", serde_yaml::to_string(&bindings)?);
        }
        Command::ListZones(args) => {
            let zones = CloudflareApi::new(args.cloudflare_api_token)
                .with_max_pages(args.max_zone_pages)
                .list_zones()
                .await?;
            print!("{}", serde_yaml::to_string(&zones)?);
        }
    }

    Ok(())
}

fn init_logs(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn create_registry(args: ArgsRegistry) -> Result<()> {
    let domain_filter = domain_filter(&args.cluster)?;
    let client = kube_client(&args.cluster).await?;

    let cloudflare_api =
        CloudflareApi::new(args.cloudflare.cloudflare_api_token).with_max_pages(args.cloudflare.max_zone_pages);

    let zone = match (args.zone, args.zone_name) {
        (Some(id), _) => Zone::id(id),
        (None, Some(name)) => Zone::name(name),
        (None, None) => bail!("The zone or zone-name value is required"),
    };
    let zone_id = zone.lookup_id(&cloudflare_api).await?.ok_or_eyre("zone not found")?;

    let config = SyncConfig::new(zone_id, args.external_dns_owner, domain_filter)?
        .with_dry_run(args.dry_run)
        .with_batch_size(args.change_batch_size)?
        .with_batch_interval(args.change_batch_interval)
        .with_record_prefix(args.external_dns_prefix);

    info!(
        "Creating registry in zone {} in batches of {} every {}",
        config.zone_id,
        config.batch_size,
        humantime::format_duration(config.batch_interval)
    );

    let source = IngressSource::new(client);
    match sync::create_registry(&config, &source, &cloudflare_api).await? {
        SyncReport::NoChanges => info!("Registry is up to date, no changes needed"),
        SyncReport::Applied { created, dry_run: true } => {
            info!("Dry run finished, {} record(s) would have been created", created.len())
        }
        SyncReport::Applied { created, dry_run: false } => {
            info!("Created {} record(s): {created:?}", created.len())
        }
    }

    Ok(())
}

fn domain_filter(args: &ArgsCluster) -> Result<String> {
    args.domain_filter
        .clone()
        .or_else(|| args.context.clone())
        .filter(|filter| !filter.is_empty())
        .ok_or_eyre("The domain-filter value is required when no context is given")
}

async fn kube_client(args: &ArgsCluster) -> Result<kube::Client> {
    let options = KubeConfigOptions {
        context: args.context.clone(),
        ..Default::default()
    };

    let config = match &args.kubeconfig {
        Some(path) => kube::Config::from_custom_kubeconfig(Kubeconfig::read_from(path)?, &options).await?,
        None if args.context.is_some() => kube::Config::from_kubeconfig(&options).await?,
        None => kube::Config::infer().await?,
    };

    debug!(cluster_url = %config.cluster_url, "connecting to kubernetes");
    Ok(kube::Client::try_from(config)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_zones(extra: &[&str]) -> Result<Args, clap::Error> {
        let base = ["ingress-dns-registry", "list-zones", "--cloudflare-api-token", "token"];
        Args::try_parse_from(base.iter().chain(extra).copied())
    }

    #[test]
    fn max_zone_pages_must_be_positive() {
        assert!(list_zones(&["--max-zone-pages", "0"]).is_err());

        let Command::ListZones(args) = list_zones(&["--max-zone-pages", "5"]).unwrap().command else {
            panic!("expected list-zones");
        };
        assert_eq!(args.max_zone_pages.get(), 5);

        let Command::ListZones(args) = list_zones(&[]).unwrap().command else {
            panic!("expected list-zones");
        };
        assert_eq!(args.max_zone_pages.get(), DEFAULT_MAX_ZONE_PAGES);
    }
}
