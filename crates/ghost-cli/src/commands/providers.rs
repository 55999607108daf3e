//! List configured backends and whether each one is reachable right now.

use ghost_complete::Config;

pub async fn run(config: &Config) -> anyhow::Result<()> {
    let router = config.build_router();

    println!("{:<10} {:<10} {}", "provider", "priority", "available");
    for adapter in router.adapters() {
        let available = if adapter.is_available().await {
            "yes"
        } else {
            "no"
        };
        println!("{:<10} {:<10} {}", adapter.name(), adapter.priority(), available);
    }

    Ok(())
}
