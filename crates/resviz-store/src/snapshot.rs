use std::collections::BTreeSet;
use std::sync::Arc;

use indexmap::IndexMap;
use resviz_core::ResourceTable;

#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    generation: u64,
    preferred_culture: String,
    tables: IndexMap<String, Arc<ResourceTable>>,
    search_terms: Vec<String>,
}

impl StoreSnapshot {
    pub(crate) fn new(
        generation: u64,
        preferred_culture: String,
        tables: IndexMap<String, Arc<ResourceTable>>,
    ) -> Self {
        let search_terms = derive_search_terms(&tables);
        Self {
            generation,
            preferred_culture,
            tables,
            search_terms,
        }
    }

    pub(crate) fn with_table(&self, table: Arc<ResourceTable>, generation: u64) -> Self {
        let mut tables = self.tables.clone();
        tables.insert(table.path.clone(), table);
        Self::new(generation, self.preferred_culture.clone(), tables)
    }

    pub(crate) fn without_table(&self, path: &str, generation: u64) -> Self {
        let mut tables = self.tables.clone();
        tables.shift_remove(path);
        Self::new(generation, self.preferred_culture.clone(), tables)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn preferred_culture(&self) -> &str {
        &self.preferred_culture
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn table(&self, path: &str) -> Option<&Arc<ResourceTable>> {
        self.tables.get(path)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Arc<ResourceTable>> {
        self.tables.values()
    }

    pub fn search_terms(&self) -> &[String] {
        &self.search_terms
    }

    pub fn query(&self, base_names: &[&str], preferred_culture: &str) -> Vec<Arc<ResourceTable>> {
        order_by_culture(
            self.tables
                .values()
                .filter(|table| base_names.contains(&table.base_name.as_str())),
            preferred_culture,
        )
    }

    pub fn tables_with_key(&self, key: &str, preferred_culture: &str) -> Vec<Arc<ResourceTable>> {
        order_by_culture(
            self.tables
                .values()
                .filter(|table| table.entries.contains_key(key)),
            preferred_culture,
        )
    }
}

fn order_by_culture<'a>(
    tables: impl Iterator<Item = &'a Arc<ResourceTable>>,
    preferred_culture: &str,
) -> Vec<Arc<ResourceTable>> {
    let mut ordered = tables.cloned().collect::<Vec<_>>();
    ordered.sort_by_key(|table| {
        if table.has_culture(preferred_culture) {
            0
        } else if table.is_neutral() {
            1
        } else {
            2
        }
    });
    ordered
}

fn derive_search_terms(tables: &IndexMap<String, Arc<ResourceTable>>) -> Vec<String> {
    tables
        .values()
        .filter(|table| !table.base_name.is_empty())
        .map(|table| table.search_term())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
