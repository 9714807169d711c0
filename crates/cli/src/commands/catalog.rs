use std::num::NonZeroU32;

use clap::Args;
use storefront_core::catalog::{CatalogQueryEngine, Page, SearchParams, SearchScope};
use storefront_core::domain::product::Product;
use storefront_db::{ProductRepository, SqlProductRepository};

use crate::commands::{load_config, open_pool, runtime, CommandResult, Failure};

#[derive(Debug, Clone, Default, Args)]
pub struct CatalogArgs {
    #[arg(long, help = "Free-text query")]
    pub q: Option<String>,
    #[arg(long, help = "Exact category name")]
    pub category: Option<String>,
    #[arg(long, help = "Inclusive lower bound on effective price")]
    pub min_price: Option<String>,
    #[arg(long, help = "Inclusive upper bound on effective price")]
    pub max_price: Option<String>,
    #[arg(long, help = "Comma separated brand names")]
    pub brands: Option<String>,
    #[arg(long, help = "Minimum rating")]
    pub rating: Option<String>,
    #[arg(long, help = "relevance | price_asc | price_desc | newest | rating | popularity")]
    pub sort: Option<String>,
    #[arg(long, help = "1-based page number")]
    pub page: Option<String>,
    #[arg(long, help = "Match the query against brand instead of category")]
    pub search: bool,
}

impl CatalogArgs {
    fn params(&self) -> SearchParams {
        SearchParams {
            q: self.q.clone(),
            category: self.category.clone(),
            min_price: self.min_price.clone(),
            max_price: self.max_price.clone(),
            brands: self.brands.clone(),
            rating: self.rating.clone(),
            sort: self.sort.clone(),
            page: self.page.clone(),
        }
    }

    fn scope(&self) -> SearchScope {
        if self.search {
            SearchScope::Search
        } else {
            SearchScope::Listing
        }
    }
}

pub fn run(args: &CatalogArgs) -> CommandResult {
    let config = match load_config("catalog") {
        Ok(config) => config,
        Err(result) => return result,
    };

    let params = args.params();
    let query = params
        .to_filter_spec(args.scope())
        .and_then(|spec| params.page().map(|page| (spec, page)));
    let (spec, page) = match query {
        Ok(query) => query,
        Err(error) => {
            return CommandResult::failure("catalog", "invalid_query", error.to_string(), 2);
        }
    };
    let Some(page_size) = NonZeroU32::new(config.catalog.page_size) else {
        return CommandResult::failure(
            "catalog",
            "config_validation",
            "catalog.page_size must be greater than zero",
            2,
        );
    };

    let runtime = match runtime("catalog") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;
        let products = SqlProductRepository::new(pool.clone())
            .list_all()
            .await
            .map_err(|error| ("catalog_query", error.to_string(), 4u8));
        pool.close().await;
        Ok::<Vec<Product>, Failure>(products?)
    });

    match result {
        Ok(products) => {
            let page = CatalogQueryEngine::new(page_size).query_page(&products, &spec, page);
            CommandResult::success("catalog", render_page(&page))
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("catalog", error_class, message, exit_code)
        }
    }
}

fn render_page(page: &Page<Product>) -> String {
    let mut lines = vec![format!(
        "page {}/{} ({} matching products)",
        page.page, page.total_pages, page.total_items
    )];
    lines.extend(page.items.iter().map(|product| {
        format!(
            "  - [{}] {} | {} | {} | {}",
            product.id.0,
            product.name,
            product.brand,
            product.category,
            product.effective_price()
        )
    }));
    lines.join("\n")
}
