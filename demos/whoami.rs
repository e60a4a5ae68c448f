use anyhow::Result;
use tracing_subscriber::EnvFilter;

use vzaar::{CallOptions, Client, Configuration};

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  let conf = Configuration::auto()?;
  let client = Client::new(conf)?;
  println!("{}", client.whoami(&CallOptions::default())?);
  Ok(())
}
