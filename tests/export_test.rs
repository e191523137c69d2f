mod common;

use anyhow::Result;
use common::test_store;
use crowdfund::application::AccountService;
use crowdfund::io::{Exporter, WorldStateSnapshot};

#[tokio::test]
async fn test_export_csv() -> Result<()> {
    let (store, _temp) = test_store().await?;
    let service = AccountService::new();

    service.initialize(&store, "campaign2", "10").await?;
    service.initialize(&store, "campaign1", "1000").await?;
    service.increment(&store, "campaign1", "250").await?;

    let mut buffer = Vec::new();
    let count = Exporter::new(&store).export_csv(&mut buffer).await?;
    assert_eq!(count, 2);

    let csv = String::from_utf8(buffer)?;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "key,amount,version,updated_at");
    assert!(lines[1].starts_with("campaign1,1250,2,"));
    assert!(lines[2].starts_with("campaign2,10,1,"));

    Ok(())
}

#[tokio::test]
async fn test_export_json_snapshot() -> Result<()> {
    let (store, _temp) = test_store().await?;
    let service = AccountService::new();

    service.initialize(&store, "account", "0").await?;
    service.increment(&store, "account", "42").await?;

    let mut buffer = Vec::new();
    let snapshot = Exporter::new(&store).export_json(&mut buffer).await?;
    assert_eq!(snapshot.accounts.len(), 1);

    let parsed: WorldStateSnapshot = serde_json::from_slice(&buffer)?;
    assert_eq!(parsed.accounts[0].key, "account");
    assert_eq!(parsed.accounts[0].amount, "42");
    assert_eq!(parsed.accounts[0].version, 2);
    assert_eq!(parsed.version, env!("CARGO_PKG_VERSION"));

    Ok(())
}

#[tokio::test]
async fn test_export_empty_world_state() -> Result<()> {
    let (store, _temp) = test_store().await?;

    let mut buffer = Vec::new();
    let count = Exporter::new(&store).export_csv(&mut buffer).await?;
    assert_eq!(count, 0);
    assert_eq!(String::from_utf8(buffer)?, "key,amount,version,updated_at\n");

    Ok(())
}
