//! Output of the account and location commands

use anyhow::{bail, Result};
use perfops_client::ApiClient;
use serde::Serialize;
use serde_json::json;

/// Location data that `list` can print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Countries,
    Cities,
}

impl ListKind {
    pub fn parse(kind: &str) -> Result<Self> {
        match kind {
            "countries" => Ok(ListKind::Countries),
            "cities" => Ok(ListKind::Cities),
            other => bail!("no data with type '{}'", other),
        }
    }
}

fn format_credits(credits: u64, as_json: bool) -> String {
    if as_json {
        json!({ "remaining_credits": credits }).to_string()
    } else {
        format!("Remaining credits: {}", credits)
    }
}

/// Print the credits left on the account.
pub async fn print_credits(client: &ApiClient, as_json: bool) -> Result<()> {
    let credits = client.remaining_credits().await?;
    println!("{}", format_credits(credits, as_json));
    Ok(())
}

/// `items` as one line of compact JSON.
fn list_document<T: Serialize>(items: &[T]) -> Result<String> {
    Ok(serde_json::to_string(items)?)
}

/// Print the countries or cities hosting nodes as a JSON document.
pub async fn print_list(client: &ApiClient, kind: ListKind) -> Result<()> {
    let doc = match kind {
        ListKind::Countries => list_document(&client.countries().await?)?,
        ListKind::Cities => list_document(&client.cities().await?)?,
    };
    println!("{}", doc);
    Ok(())
}
