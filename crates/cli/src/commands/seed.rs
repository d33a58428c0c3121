use std::path::PathBuf;

use serde::Serialize;

use rigquote_core::catalog::NamedPromotion;
use rigquote_core::config::LoadOptions;
use rigquote_db::{CatalogRepository, SqlCatalogRepository};

use crate::catalog_file::{self, CatalogFileError};
use crate::commands::{
    build_runtime, load_config, open_pool, repository_failure, CommandResult, Failure,
    EXIT_CONFIG, EXIT_DOMAIN, EXIT_INPUT,
};

#[derive(Debug, Serialize)]
struct SeedOutput {
    catalog: String,
    components: usize,
    promotions: usize,
    suppliers: usize,
}

/// Loads a catalog file into the database. Entries are upserted by id, so
/// seeding the same file twice leaves one copy of each.
pub fn run(options: LoadOptions, catalog: Option<PathBuf>) -> CommandResult {
    let config = match load_config("seed", options) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let Some(path) = catalog.or_else(|| config.catalog.path.clone()) else {
        return CommandResult::failure(
            "seed",
            "config_validation",
            "no catalog file given: pass --catalog or set catalog.path",
            EXIT_CONFIG,
        );
    };

    let snapshot = match catalog_file::load(&path) {
        Ok(snapshot) => snapshot,
        Err(CatalogFileError::Domain(error)) => {
            return CommandResult::failure("seed", error.class(), error.to_string(), EXIT_DOMAIN)
        }
        Err(error) => {
            return CommandResult::failure("seed", "catalog_file", error.to_string(), EXIT_INPUT)
        }
    };

    let runtime = match build_runtime("seed") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;
        let repository = SqlCatalogRepository::new(pool.clone());

        for supplier in snapshot.suppliers() {
            repository.save_supplier(supplier).await.map_err(repository_failure)?;
        }
        for (id, promotion) in snapshot.promotions() {
            let named = NamedPromotion { id: id.to_string(), promotion: promotion.clone() };
            repository.save_promotion(&named).await.map_err(repository_failure)?;
        }
        for component in snapshot.components() {
            repository.save_component(component).await.map_err(repository_failure)?;
        }

        pool.close().await;
        Ok::<_, Failure>(SeedOutput {
            catalog: path.display().to_string(),
            components: snapshot.components().count(),
            promotions: snapshot.promotions().count(),
            suppliers: snapshot.suppliers().count(),
        })
    });

    match result {
        Ok(output) => {
            tracing::info!(
                event_name = "cli.seed.completed",
                components = output.components,
                promotions = output.promotions,
                suppliers = output.suppliers,
                "catalog seeded"
            );
            let message = format!(
                "seeded {} components, {} promotions, {} suppliers from {}",
                output.components, output.promotions, output.suppliers, output.catalog
            );
            CommandResult::success_with("seed", message, output)
        }
        Err(failure) => CommandResult::from_failure("seed", failure),
    }
}
