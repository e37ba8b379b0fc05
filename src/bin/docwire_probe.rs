use std::{error::Error, time::Duration};

use bson::Document;
use clap::Parser;
use docwire::{IdleSockets, InsertOp, Operation, QueryOp, SocketConfig, collect, protocol::query_flags};

#[derive(Debug, Parser)]
#[command(version, about = "Run a query against a document database server", long_about = None)]
struct Cli {
    /// Server address, e.g. 127.0.0.1:27017
    address: String,
    /// Full collection name, "database.collection"
    collection: String,
    /// Match documents whose field equals a string value (KEY=VALUE), repeatable
    #[arg(short, long = "filter", value_parser = parse_field)]
    filters: Vec<(String, String)>,
    /// Insert a document built from KEY=VALUE fields before querying
    #[arg(short, long = "insert", value_parser = parse_field)]
    inserts: Vec<(String, String)>,
    /// Number of documents to skip
    #[arg(long, default_value_t = 0)]
    skip: i32,
    /// Maximum number of documents to return, 0 for the server default
    #[arg(long, default_value_t = 0)]
    limit: i32,
    /// Allow the query to run on a secondary
    #[arg(long)]
    slave_ok: bool,
    /// Largest reply accepted from the server, in bytes
    #[arg(long, default_value_t = docwire::config::DEFAULT_MAX_MESSAGE_SIZE)]
    max_message_size: usize,
    /// Give up on a blocked write after this many milliseconds
    #[arg(long)]
    write_timeout_ms: Option<u64>,
}

fn parse_field(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))
}

fn document(fields: Vec<(String, String)>) -> Document {
    fields
        .into_iter()
        .map(|(k, v)| (k, bson::Bson::String(v)))
        .collect()
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let cli = Cli::parse();
    let config = SocketConfig {
        max_message_size: cli.max_message_size,
        write_timeout: cli.write_timeout_ms.map(Duration::from_millis),
        ..SocketConfig::default()
    };
    let pool = IdleSockets::new(cli.address, config);
    let socket = pool.acquire()?;

    let mut ops: Vec<Operation> = Vec::new();
    if !cli.inserts.is_empty() {
        ops.push(
            InsertOp::new(cli.collection.as_str())
                .document(document(cli.inserts))
                .into(),
        );
    }

    let flags = if cli.slave_ok {
        query_flags::SLAVE_OK
    } else {
        0
    };
    let (handler, pending) = collect();
    ops.push(
        QueryOp::new(cli.collection.as_str(), document(cli.filters))
            .skip(cli.skip)
            .limit(cli.limit)
            .flags(flags)
            .reply(handler)
            .into(),
    );
    socket.query(ops)?;

    let reply = pending.wait()?;
    if reply.header.query_failure() {
        eprintln!("query failed");
    }
    for doc in reply.decode::<Document>()? {
        println!("{doc}");
    }
    if reply.header.cursor_id != 0 {
        eprintln!("more results on cursor {}", reply.header.cursor_id);
    }

    socket.im_done()?;
    Ok(())
}
