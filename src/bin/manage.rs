#![cfg(feature = "cli")]

use std::{net::IpAddr, process::ExitCode, time::Duration};

use camino::Utf8PathBuf;
use clap::arg;
use hazel_dns::{
    Handler, Resolver, ResolverConfig, SqliteConfiguration, SqliteStore,
    rr::TimeToLive,
    storage::{StorageError, StorageReader},
};
use hickory_proto::rr::RecordType;
use hickory_server::ServerFuture;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match manage() {
        Ok(_) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

fn manage() -> Result<(), ()> {
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let app = clap::Command::new("hazel-dns")
        .about("Manage and serve DNS records stored in a hazel key-value database")
        .subcommand_required(true)
        .args([
            arg!(--db <PATH> "Path to the hazel DB")
                .required(true)
                .value_parser(clap::value_parser!(Utf8PathBuf)),
            arg!(--prefix <PREFIX> "Key prefix of the namespace to use").default_value(""),
        ])
        .subcommand(
            clap::Command::new("set")
                .about("Set the value stored at a key")
                .arg(arg!(<KEY> "Key to set"))
                .arg(arg!(<VALUE> "Value to store")),
        )
        .subcommand(
            clap::Command::new("get")
                .about("Print the values stored at and beneath a key")
                .arg(arg!(<KEY> "Key to read")),
        )
        .subcommand(
            clap::Command::new("rm")
                .about("Remove a key and everything beneath it")
                .arg(arg!(<KEY> "Key to remove")),
        )
        .subcommand(
            clap::Command::new("lookup")
                .about("Resolve a DNS question against the database")
                .arg(arg!(<NAME> "Name to look up"))
                .arg(
                    arg!([TYPE] "Record type to look up")
                        .value_parser(clap::value_parser!(RecordType))
                        .default_value("A"),
                ),
        )
        .subcommand(
            clap::Command::new("serve")
                .about("Run a DNS server")
                .arg(
                    arg!(--port <PORT> "Port to listen on")
                        .value_parser(clap::value_parser!(u16))
                        .default_value("8053"),
                )
                .arg(
                    arg!(--address <ADDRESS> "Address to listen on")
                        .value_parser(clap::value_parser!(IpAddr))
                        .default_value("127.0.0.1"),
                )
                .arg(
                    arg!(--ttl <SECONDS> "TTL of served records")
                        .value_parser(clap::value_parser!(u32))
                        .default_value("300"),
                ),
        );

    let args = app.get_matches();
    let db: &Utf8PathBuf = args.get_one("db").expect("db is required");
    let prefix: &String = args.get_one("prefix").expect("prefix has a default");

    let store = match SqliteStore::new_from_config(&SqliteConfiguration::with_path(db.clone())) {
        Ok(store) => store,
        Err(error) => {
            eprintln!("Error opening database {db}:");
            eprintln!("{error}");
            return Err(());
        }
    };

    let result: Result<(), Box<dyn std::error::Error>> = match args.subcommand() {
        Some(("set", matches)) => {
            let key: &String = matches.get_one("KEY").expect("KEY is required");
            let value: &String = matches.get_one("VALUE").expect("VALUE is required");
            store
                .set(&hazel_dns::key::join_key(prefix, key), value)
                .map_err(Into::into)
        }
        Some(("get", matches)) => {
            let key: &String = matches.get_one("KEY").expect("KEY is required");
            print_values(&store, prefix, key)
        }
        Some(("rm", matches)) => {
            let key: &String = matches.get_one("KEY").expect("KEY is required");
            store
                .remove(&hazel_dns::key::join_key(prefix, key))
                .map(|n| println!("removed {n} keys"))
                .map_err(Into::into)
        }
        Some(("lookup", matches)) => {
            let name: &String = matches.get_one("NAME").expect("NAME is required");
            let record_type: &RecordType = matches.get_one("TYPE").expect("TYPE has a default");
            let config = ResolverConfig::new().with_prefix(prefix.as_str());
            lookup(Resolver::new(store, config), name, *record_type)
        }
        Some(("serve", matches)) => {
            let address: &IpAddr = matches.get_one("address").expect("address is required");
            let port: &u16 = matches.get_one("port").expect("port is required");
            let ttl: &u32 = matches.get_one("ttl").expect("ttl has a default");
            let config = ResolverConfig::new()
                .with_prefix(prefix.as_str())
                .with_ttl(TimeToLive::from_secs(*ttl));
            serve_dns(*address, *port, Resolver::new(store, config))
        }
        _ => unreachable!("clap crimes?"),
    };

    result.map_err(|error| {
        eprintln!("{error}");
    })
}

fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

fn print_values(
    store: &SqliteStore,
    prefix: &str,
    key: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    runtime()?.block_on(async {
        let reader = StorageReader::new(store, prefix);
        match reader.fetch(key).await {
            Ok(tree) => {
                for value in &tree {
                    println!("{value}");
                }
                Ok(())
            }
            Err(StorageError::NotFound(key)) => Err(format!("{key} not found").into()),
            Err(error) => Err(error.into()),
        }
    })
}

fn lookup(
    resolver: Resolver,
    name: &str,
    record_type: RecordType,
) -> Result<(), Box<dyn std::error::Error>> {
    let answer = runtime()?.block_on(resolver.resolve_str(name, record_type))?;

    if answer.is_empty() {
        println!(";; no records");
    }
    if !answer.answers().is_empty() {
        println!(";; ANSWER SECTION:");
        for record in answer.answers() {
            println!("{record}");
        }
    }
    if !answer.authority().is_empty() {
        println!(";; AUTHORITY SECTION:");
        for record in answer.authority() {
            println!("{record}");
        }
    }
    Ok(())
}

fn serve_dns(
    address: IpAddr,
    port: u16,
    resolver: Resolver,
) -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    rt.block_on(serve(address, port, resolver))
}

async fn serve(
    address: IpAddr,
    port: u16,
    resolver: Resolver,
) -> Result<(), Box<dyn std::error::Error>> {
    let udp_socket = tokio::net::UdpSocket::bind((address, port)).await?;
    let tcp_listener = tokio::net::TcpListener::bind((address, port)).await?;

    let mut server = ServerFuture::new(Handler::new(resolver));
    server.register_socket(udp_socket);
    server.register_listener(tcp_listener, Duration::from_secs(30));

    println!("Server started on {address}:{port}");
    server.block_until_done().await?;
    println!("...end");
    Ok(())
}
