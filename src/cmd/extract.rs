use anyhow::Result;

use vidmaker::{fetch_prompt, HttpClient};

pub async fn cmd_extract(url: &str) -> Result<()> {
    let client = HttpClient::new()?;
    let text = fetch_prompt(&client, url).await?;
    println!("{text}");
    Ok(())
}
