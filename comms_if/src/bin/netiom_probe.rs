//! Netiom probe
//!
//! Commissioning tool: prints the raw status lines served by the Netiom card and optionally sends
//! output commands, e.g. `netiom_probe --send B09` to force the drive off.

use comms_if::netiom::{
    NetiomClient, NetiomParams, OutputCmd, Transport, INPUTS_ENDPOINT, OUTPUTS_ENDPOINT
};
use structopt::StructOpt;

#[derive(StructOpt)]
#[structopt(name = "netiom_probe", about = "Query or command the mount's Netiom card")]
struct Opt {
    /// Base URL of the card
    #[structopt(long, default_value = "http://192.168.0.6/")]
    url: String,

    /// Request timeout in milliseconds
    #[structopt(long, default_value = "2000")]
    timeout_ms: u64,

    /// Status pages to read
    #[structopt(long = "endpoint")]
    endpoints: Vec<String>,

    /// Output commands to send before reading, e.g. A09 B10
    #[structopt(long)]
    send: Vec<OutputCmd>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opt = Opt::from_args();

    let params = NetiomParams {
        base_url: opt.url,
        timeout_ms: opt.timeout_ms,
    };

    let mut client = NetiomClient::new(&params)?;

    if !opt.send.is_empty() {
        client.send(&opt.send)?;
        println!("Sent {} command(s)", opt.send.len());
    }

    let endpoints = if opt.endpoints.is_empty() {
        vec![INPUTS_ENDPOINT.to_string(), OUTPUTS_ENDPOINT.to_string()]
    }
    else {
        opt.endpoints
    };

    for endpoint in &endpoints {
        println!("{}:", endpoint);
        for line in client.read_lines(endpoint)? {
            println!("    {}", line);
        }
    }

    Ok(())
}
