// Dump recent probe results for a site, plus the latest audit entries, as JSON.
//
// Usage: cargo run --example dump_results -- [DB_PATH] [SITE_ID] [LIMIT]
//   DB_PATH  default: ./data/siteprobe.db
//   SITE_ID  default: 1
//   LIMIT    default: 20

use siteprobe::store::SqliteStore;
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let path = args
        .get(1)
        .map(String::as_str)
        .unwrap_or("./data/siteprobe.db");
    let site_id: i64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(1);
    let limit: u32 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(20);

    let store = SqliteStore::connect(path, 1, 30).await?;
    let results = store.get_recent_results(site_id, limit).await?;
    let audit = store.get_recent_audit(limit).await?;

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "results": results,
            "audit": audit,
        }))?
    );
    Ok(())
}
