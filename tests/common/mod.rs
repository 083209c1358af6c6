#![allow(dead_code)]

use std::path::Path;

use citybuilder::{Catalog, CatalogLoader, Template};

pub fn fixtures() -> &'static Path {
    Path::new(env!("CARGO_MANIFEST_DIR"))
}

pub fn catalog() -> Catalog {
    CatalogLoader::new(fixtures())
        .load("catalog/placeables.yaml")
        .expect("fixture catalog loads")
}

pub fn template<'a>(catalog: &'a Catalog, name: &str) -> &'a Template {
    catalog
        .get(name)
        .unwrap_or_else(|| panic!("fixture catalog has no '{name}'"))
}
