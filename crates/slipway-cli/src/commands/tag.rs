use std::path::PathBuf;

use slipway_core::{BuildTag, git};

/// Print the build tag the pipeline would use for the current checkout.
pub async fn tag() -> anyhow::Result<()> {
    let dir = PathBuf::from(".");
    let short_hash = git::short_head(&dir)?;

    println!("{}", BuildTag::for_today(&short_hash));

    Ok(())
}
