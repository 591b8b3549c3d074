//! Reflectance terms backed by tabulated measurements.
//!
//! Tables are loaded once per path and shared between every node that names the same
//! file. The terms themselves only borrow the table.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::debug_span;

pub mod merl;
pub mod fourier;

pub use merl::{MerlTable, MerlBxdf};
pub use fourier::{FourierTable, FourierBxdf};

type TableCache<T> = Lazy<Mutex<HashMap<PathBuf, Arc<T>>>>;

fn get_or_load<T>(
    cache: &TableCache<T>,
    path: &Path,
    load: impl FnOnce(&Path) -> anyhow::Result<T>,
) -> anyhow::Result<Arc<T>> {
    let mut cache = cache.lock();
    match cache.entry(path.to_path_buf()) {
        Entry::Occupied(e) => {
            Ok(e.get().clone())
        },
        Entry::Vacant(e) => {
            let _span = debug_span!("load_measured", path = %path.display()).entered();
            let table = load(path)?;
            Ok(e.insert(Arc::new(table)).clone())
        },
    }
}

pub fn get_merl_table(path: impl AsRef<Path>) -> anyhow::Result<Arc<MerlTable>> {
    // Global cache of MERL tables that have been loaded.
    static MERL_TABLES: TableCache<MerlTable> = Lazy::new(|| Mutex::new(HashMap::new()));
    get_or_load(&MERL_TABLES, path.as_ref(), MerlTable::read)
}

pub fn get_fourier_table(path: impl AsRef<Path>) -> anyhow::Result<Arc<FourierTable>> {
    static FOURIER_TABLES: TableCache<FourierTable> = Lazy::new(|| Mutex::new(HashMap::new()));
    get_or_load(&FOURIER_TABLES, path.as_ref(), FourierTable::read)
}
