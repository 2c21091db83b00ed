//! Drives the same CRUD script through all four modes and prints what each
//! one observes. The output is identical apart from the mode banner.

use anyhow::Result;
use duotx::config::DbConfig;
use duotx::model::NewItem;
use duotx::service::{AsyncItemService, ItemService, SyncItemService};
use duotx::{Db, Mode};

fn main() -> Result<()> {
    for mode in Mode::ALL {
        println!("== {mode} ==");
        let db = Db::open(DbConfig::new(mode).workers(2))?;
        match db.service() {
            ItemService::Sync(service) => run_sync(service)?,
            ItemService::Async(service) => {
                let runtime = tokio::runtime::Runtime::new()?;
                runtime.block_on(run_async(service))?;
            }
        }
        println!();
    }
    Ok(())
}

fn run_sync(service: &SyncItemService) -> Result<()> {
    let item = service.create(
        NewItem::new("widget")
            .description("demo stock")
            .quantity(3)
            .price(9.99),
    )?;
    println!("created '{}' ({})", item.name, item.id);

    let mut item = service.get(item.id)?.expect("item just created");
    item.quantity = 5;
    let item = service.update(item)?;
    println!("updated quantity to {}", item.quantity);

    println!("{} item(s) on hand", service.list()?.len());

    service.delete(item.id)?;
    println!("deleted; {} item(s) left", service.list()?.len());
    Ok(())
}

async fn run_async(service: &AsyncItemService) -> Result<()> {
    let item = service
        .create(
            NewItem::new("widget")
                .description("demo stock")
                .quantity(3)
                .price(9.99),
        )
        .await?;
    println!("created '{}' ({})", item.name, item.id);

    let mut item = service.get(item.id).await?.expect("item just created");
    item.quantity = 5;
    let item = service.update(item).await?;
    println!("updated quantity to {}", item.quantity);

    println!("{} item(s) on hand", service.list().await?.len());

    service.delete(item.id).await?;
    println!("deleted; {} item(s) left", service.list().await?.len());
    Ok(())
}
