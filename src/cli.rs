use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::{
    auth,
    jolokia::{BrokerIdentity, JolokiaClient},
};

#[derive(Parser, Debug)]
#[command(name = "artemis-console-gateway")]
#[command(about = "Jolokia gateway for the Artemis web console")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the listen port
    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check broker credentials with a one-shot Jolokia probe
    Probe {
        /// Broker host running the Jolokia agent
        #[arg(long)]
        host: String,

        #[arg(long, default_value = "http")]
        scheme: String,

        #[arg(long, default_value = "8161")]
        port: String,

        #[arg(long)]
        user: String,

        #[arg(long)]
        password: String,
    },
}

pub async fn run_probe(
    host: String,
    scheme: String,
    port: String,
    user: String,
    password: String,
) -> Result<()> {
    auth::validate_host(&host)?;
    auth::validate_scheme(&scheme)?;
    let port = auth::validate_port(&port)?;

    let client = Arc::new(JolokiaClient::new(BrokerIdentity {
        host,
        port,
        scheme,
        username: user,
        password,
    }));

    let valid = client
        .validate()
        .await
        .context("probe request failed")?;
    if !valid {
        bail!("credentials rejected or broker not uniquely resolvable");
    }

    let name = client
        .broker_name()
        .unwrap_or_else(|| "<unknown>".to_string());
    println!("broker reachable: {name}");
    Ok(())
}
