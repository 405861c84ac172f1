//! `scorecrawl status` – summarize the resume ledger.

use anyhow::Result;
use scorecrawl_core::config::CrawlConfig;
use scorecrawl_core::ledger;

pub fn run_status(cfg: &CrawlConfig) -> Result<()> {
    let records = ledger::load(&cfg.ledger_path)?;
    if records.is_empty() {
        println!("Ledger is empty.");
        return Ok(());
    }

    println!("{} record(s) in {}", records.len(), cfg.ledger_path.display());

    let mut entries: Vec<_> = records.values().collect();
    entries.sort_by(|a, b| {
        a.post_id
            .cmp(&b.post_id)
            .then(a.link_index.cmp(&b.link_index))
    });

    println!("{:<12} {:<5} {:<20} {}", "POST", "LINK", "DOWNLOADED", "LOCATION");
    for record in entries {
        println!(
            "{:<12} {:<5} {:<20} {}",
            record.post_id,
            record.link_index,
            record.downloaded_at.format("%Y-%m-%d %H:%M:%S"),
            record.save_location.display()
        );
    }
    Ok(())
}
