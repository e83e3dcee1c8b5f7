//! # Config Module
//!
//! `Config` is a view into a shared configuration tree: the tree, a base
//! pointer, and the data directory plus file lister that kernel templates
//! are expanded against.
//!
//! Views are cheap to clone and share the tree. Indexing a view (`at`)
//! composes pointers; writing through a view (`set`) copies the tree first,
//! so other views never observe the change.
//!
//! ## Evaluation
//!
//! `evaluate` works on a copy of the whole tree. It first applies the `deps`
//! markers of every ancestor of the pointer, then resolves the markers inside
//! the subtree, then replaces every `kernels` leaf with the path groups its
//! templates match. The search root for a leaf is the data directory,
//! narrowed to `<data>/<mission>` and then `<data>/<mission>/kernels/<type>`
//! when those exist.

use crate::bridge::FileLister;
use crate::cache::ExpiringCache;
use crate::latest::{FilenameVersionRanker, LatestSelector, get_latest_kernels};
use crate::listing::{CachedLister, FsLister};
use crate::locations::Locations;
use crate::pointer::{Pointer, find_pointers_by_key};
use crate::primitives::KERNELS_KEY;
use crate::query::paths_from_regex;
use crate::resolve::{resolve_ancestors, resolve_dependencies, root_dependency};
use crate::shape::groups_to_value;
use crate::KernqlError;
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

static NULL: Value = Value::Null;

/// A view of a configuration tree rooted at `base`.
#[derive(Clone)]
pub struct Config {
    tree: Arc<Value>,
    base: Pointer,
    data_dir: PathBuf,
    lister: Arc<dyn FileLister>,
    selector: Arc<dyn LatestSelector>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("base", &self.base.to_string())
            .field("data_dir", &self.data_dir)
            .finish_non_exhaustive()
    }
}

impl Config {
    // =========================================================================
    // CONSTRUCTION
    // =========================================================================

    /// A root view over an in-memory tree.
    pub fn from_value(tree: Value, data_dir: impl Into<PathBuf>, lister: Arc<dyn FileLister>) -> Self {
        Self {
            tree: Arc::new(tree),
            base: Pointer::root(),
            data_dir: data_dir.into(),
            lister,
            selector: Arc::new(FilenameVersionRanker),
        }
    }

    /// Load a single JSON document.
    pub fn load_file(
        path: &Path,
        data_dir: impl Into<PathBuf>,
        lister: Arc<dyn FileLister>,
    ) -> Result<Self, KernqlError> {
        Ok(Self::from_value(read_document(path)?, data_dir, lister))
    }

    /// Load every `*.json` document in `dir`, in path order.
    ///
    /// Top-level keys of later documents replace those of earlier ones.
    pub fn load_dir(
        dir: &Path,
        data_dir: impl Into<PathBuf>,
        lister: Arc<dyn FileLister>,
    ) -> Result<Self, KernqlError> {
        let entries = fs::read_dir(dir).map_err(|e| {
            KernqlError::NotFound(format!(
                "Configuration directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| KernqlError::IoError(e.to_string()))?
                .path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();
        if paths.is_empty() {
            return Err(KernqlError::NotFound(format!(
                "No configuration documents in {}",
                dir.display()
            )));
        }

        let mut tree = Map::new();
        for path in &paths {
            let Value::Object(doc) = read_document(path)? else {
                return Err(KernqlError::SerializationError(format!(
                    "{} is not a JSON object",
                    path.display()
                )));
            };
            debug!(path = %path.display(), keys = doc.len(), "loaded configuration document");
            tree.extend(doc);
        }
        info!(dir = %dir.display(), documents = paths.len(), missions = tree.len(), "configuration loaded");
        Ok(Self::from_value(Value::Object(tree), data_dir, lister))
    }

    /// Load from resolved locations, listing through a `CachedLister`.
    pub fn from_locations(locations: &Locations) -> Result<Self, KernqlError> {
        let cache = ExpiringCache::new(&locations.cache_dir)?;
        let lister: Arc<dyn FileLister> = Arc::new(CachedLister::new(cache, FsLister));
        Self::load_dir(&locations.config_dir, &locations.data_dir, lister)
    }

    /// Replace the latest-selection strategy.
    #[must_use]
    pub fn with_selector(mut self, selector: Arc<dyn LatestSelector>) -> Self {
        self.selector = selector;
        self
    }

    // =========================================================================
    // VIEW ACCESS
    // =========================================================================

    #[must_use]
    pub fn base(&self) -> &Pointer {
        &self.base
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    #[must_use]
    pub fn selector(&self) -> &dyn LatestSelector {
        self.selector.as_ref()
    }

    /// The whole underlying tree.
    #[must_use]
    pub fn tree(&self) -> &Value {
        &self.tree
    }

    /// The subtree at this view's base; null when the base is absent.
    #[must_use]
    pub fn global_conf(&self) -> &Value {
        self.base.get(&self.tree).unwrap_or(&NULL)
    }

    /// A view rooted at `pointer` below this one.
    pub fn at(&self, pointer: &str) -> Result<Self, KernqlError> {
        let mut view = self.clone();
        view.base = self.base.join(&Pointer::parse(pointer)?);
        Ok(view)
    }

    /// Number of members (objects, arrays), 0 for null, 1 for scalars.
    #[must_use]
    pub fn size(&self) -> usize {
        match self.global_conf() {
            Value::Object(map) => map.len(),
            Value::Array(items) => items.len(),
            Value::Null => 0,
            _ => 1,
        }
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.global_conf().get(key).is_some()
    }

    /// Top-level keys of the view, in document order.
    #[must_use]
    pub fn mission_keys(&self) -> Vec<String> {
        match self.global_conf() {
            Value::Object(map) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Pointers (relative to the view) to every member named `key`.
    #[must_use]
    pub fn find_key(&self, key: &str, recursive: bool) -> Vec<Pointer> {
        find_pointers_by_key(self.global_conf(), key, recursive)
    }

    /// Write `value` at `pointer` below the view's base.
    pub fn set(&mut self, pointer: &str, value: Value) -> Result<(), KernqlError> {
        let target = self.base.join(&Pointer::parse(pointer)?);
        target.set(Arc::make_mut(&mut self.tree), value)
    }

    // =========================================================================
    // EVALUATION
    // =========================================================================

    /// The first `depth` segments of `pointer`, or the root dependency of that
    /// prefix when one exists in the data directory.
    pub fn parent_pointer(&self, pointer: &Pointer, depth: usize) -> Result<Pointer, KernqlError> {
        let prefix = pointer.prefix(depth).ok_or_else(|| {
            KernqlError::InvalidArgument(format!(
                "{} has fewer than {} segments",
                pointer, depth
            ))
        })?;
        let dependency = root_dependency(&self.tree, &prefix, |p| self.data_path(p).exists())?;
        Ok(dependency.unwrap_or(prefix))
    }

    /// Resolve and expand the subtree at the absolute `pointer`.
    ///
    /// Returns the whole tree with the ancestors of `pointer` resolved and the
    /// subtree replaced.
    pub fn evaluate(&self, pointer: &Pointer) -> Result<Value, KernqlError> {
        let mut document = (*self.tree).clone();
        resolve_ancestors(&mut document, &self.tree, pointer)?;

        let mut subtree = pointer
            .get(&document)
            .cloned()
            .ok_or_else(|| KernqlError::NotFound(format!("{} is not in the config", pointer)))?;

        resolve_dependencies(&mut subtree, &self.tree)?;

        for leaf in find_pointers_by_key(&subtree, KERNELS_KEY, true) {
            let Some(templates) = leaf.get(&subtree).cloned() else {
                continue;
            };
            let root = self.search_root(&pointer.join(&leaf))?;
            let groups = paths_from_regex(self.lister.as_ref(), &root, &templates)?;
            debug!(at = %leaf, root = %root.display(), groups = groups.len(), "kernels expanded");
            leaf.set(&mut subtree, groups_to_value(groups))?;
        }

        pointer.set(&mut document, subtree)?;
        Ok(document)
    }

    /// Evaluate `pointer` (relative to the view) and return the view's base.
    pub fn get(&self, pointer: &str) -> Result<Value, KernqlError> {
        let absolute = self.base.join(&Pointer::parse(pointer)?);
        let evaluated = self.evaluate(&absolute)?;
        Ok(self.base.get(&evaluated).cloned().unwrap_or(Value::Null))
    }

    /// Evaluate each pointer on its own and key the results by pointer text.
    pub fn get_many(&self, pointers: &[&str]) -> Result<Value, KernqlError> {
        let mut out = Map::new();
        for text in pointers {
            let pointer = Pointer::parse(text)?;
            let view = self.get(text)?;
            let piece = pointer.get(&view).cloned().ok_or_else(|| {
                KernqlError::NotFound(format!("{} is not in the config", pointer))
            })?;
            out.insert((*text).to_string(), piece);
        }
        Ok(Value::Object(out))
    }

    /// Evaluate `pointer` and keep only the latest kernels of each group.
    ///
    /// The result holds just the evaluated subtree, at its position below the
    /// view's base.
    pub fn get_latest(&self, pointer: &str) -> Result<Value, KernqlError> {
        let doc = self.evaluated_only(&Pointer::parse(pointer)?)?;
        get_latest_kernels(&doc, self.selector())
    }

    /// Evaluate every member named `key`, anywhere in the view.
    pub fn get_recursive(&self, key: &str) -> Result<Value, KernqlError> {
        let mut out = Value::Object(Map::new());
        for pointer in self.find_key(key, true) {
            let piece = self.evaluated_only(&pointer)?;
            if let Some(value) = pointer.get(&piece) {
                pointer.set(&mut out, value.clone())?;
            }
        }
        Ok(out)
    }

    /// `get_recursive` followed by latest selection.
    pub fn get_latest_recursive(&self, key: &str) -> Result<Value, KernqlError> {
        get_latest_kernels(&self.get_recursive(key)?, self.selector())
    }

    fn evaluated_only(&self, pointer: &Pointer) -> Result<Value, KernqlError> {
        let view = self.get(&pointer.to_string())?;
        let piece = pointer
            .get(&view)
            .cloned()
            .ok_or_else(|| KernqlError::NotFound(format!("{} is not in the config", pointer)))?;
        let mut doc = Value::Object(Map::new());
        pointer.set(&mut doc, piece)?;
        Ok(doc)
    }

    fn data_path(&self, pointer: &Pointer) -> PathBuf {
        pointer
            .segments()
            .iter()
            .fold(self.data_dir.clone(), |path, seg| path.join(seg))
    }

    fn search_root(&self, leaf: &Pointer) -> Result<PathBuf, KernqlError> {
        if leaf.len() < 2 {
            return Ok(self.data_dir.clone());
        }
        let mission_dir = self.data_path(&self.parent_pointer(leaf, 1)?);
        if !mission_dir.is_dir() {
            return Ok(self.data_dir.clone());
        }
        if leaf.len() >= 3 {
            let entry = self.parent_pointer(leaf, 2)?;
            if let Some(kernel_type) = entry.back() {
                let typed = mission_dir.join(KERNELS_KEY).join(kernel_type);
                if typed.is_dir() {
                    return Ok(typed);
                }
            }
        }
        Ok(mission_dir)
    }
}

fn read_document(path: &Path) -> Result<Value, KernqlError> {
    let text = fs::read_to_string(path).map_err(|e| {
        KernqlError::NotFound(format!("Configuration document {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&text).map_err(|e| {
        KernqlError::SerializationError(format!("{}: {}", path.display(), e))
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FixedLister(Vec<String>);

    impl FileLister for FixedLister {
        fn list_files(&self, root: &Path, _recursive: bool) -> Result<Vec<String>, KernqlError> {
            let root = root.to_string_lossy();
            Ok(self
                .0
                .iter()
                .filter(|f| f.starts_with(root.as_ref()))
                .cloned()
                .collect())
        }
    }

    fn config(tree: Value, files: &[&str]) -> Config {
        let lister = FixedLister(files.iter().map(|s| s.to_string()).collect());
        Config::from_value(tree, "/nonexistent-data", Arc::new(lister))
    }

    #[test]
    fn views_compose_pointers() {
        let conf = config(json!({"mro": {"ck": {"kernels": []}}, "lro": {}}), &[]);
        assert_eq!(conf.size(), 2);
        assert_eq!(conf.mission_keys(), vec!["mro", "lro"]);
        assert!(conf.contains("mro"));

        let mro = conf.at("mro").expect("view");
        assert_eq!(mro.base().to_string(), "/mro");
        assert!(mro.contains("ck"));
        let ck = mro.at("ck").expect("view");
        assert_eq!(ck.base().to_string(), "/mro/ck");

        let missing = conf.at("/nope").expect("view");
        assert_eq!(missing.size(), 0);
        assert!(missing.global_conf().is_null());
    }

    #[test]
    fn writes_do_not_leak_into_other_views() {
        let original = config(json!({"a": {"x": 1}}), &[]);
        let mut edited = original.at("a").expect("view");
        edited.set("y", json!(2)).expect("set");

        assert_eq!(edited.global_conf(), &json!({"x": 1, "y": 2}));
        assert_eq!(original.tree(), &json!({"a": {"x": 1}}));
    }

    #[test]
    fn evaluate_resolves_and_expands() {
        let tree = json!({
            "mission": {"fk": {"kernels": ["\\.tf$"]}},
            "instrument": {
                "ik": {"kernels": "inst_.*\\.ti$"},
                "deps": ["/mission"]
            }
        });
        let files = [
            "/nonexistent-data/inst_1.ti",
            "/nonexistent-data/frames.tf",
            "/nonexistent-data/other.bsp",
        ];
        let conf = config(tree.clone(), &files);

        let instrument = Pointer::parse("/instrument").expect("parse");
        let evaluated = conf.evaluate(&instrument).expect("evaluate");
        assert_eq!(
            evaluated["instrument"],
            json!({
                "ik": {"kernels": [["/nonexistent-data/inst_1.ti"]]},
                "fk": {"kernels": [["/nonexistent-data/frames.tf"]]}
            })
        );
        // Siblings untouched, source tree untouched.
        assert_eq!(evaluated["mission"], tree["mission"]);
        assert_eq!(conf.tree(), &tree);
    }

    fn inherited_tree() -> Value {
        json!({
            "base": {"lsk": {"kernels": ["naif.*\\.tls$"]}},
            "mro": {"deps": ["/base"], "ck": {"kernels": ["mro_.*\\.bc$"]}}
        })
    }

    const INHERITED_FILES: [&str; 4] = [
        "/nonexistent-data/naif0011.tls",
        "/nonexistent-data/naif0012.tls",
        "/nonexistent-data/mro_1.bc",
        "/nonexistent-data/other.bsp",
    ];

    #[test]
    fn members_inherited_from_ancestor_deps_are_addressable() {
        let conf = config(inherited_tree(), &INHERITED_FILES);
        let lsk_kernels = json!([[
            "/nonexistent-data/naif0011.tls",
            "/nonexistent-data/naif0012.tls"
        ]]);

        let whole = conf.get("/mro").expect("get mission");
        let direct = conf.get("/mro/lsk").expect("get inherited member");
        assert_eq!(direct["mro"]["lsk"]["kernels"], lsk_kernels);
        assert_eq!(direct["mro"]["lsk"], whole["mro"]["lsk"]);

        let latest = conf.get_latest("/mro/lsk").expect("latest");
        assert_eq!(
            latest,
            json!({"mro": {"lsk": {"kernels": [["/nonexistent-data/naif0012.tls"]]}}})
        );

        let view = conf.at("mro").expect("view");
        let relative = view.get("lsk").expect("get through view");
        assert_eq!(relative["lsk"]["kernels"], lsk_kernels);
    }

    #[test]
    fn get_many_keys_results_by_pointer() {
        let conf = config(inherited_tree(), &INHERITED_FILES);
        let many = conf.get_many(&["/mro/ck", "/mro/lsk"]).expect("get many");
        assert_eq!(
            many,
            json!({
                "/mro/ck": {"kernels": [["/nonexistent-data/mro_1.bc"]]},
                "/mro/lsk": {"kernels": [[
                    "/nonexistent-data/naif0011.tls",
                    "/nonexistent-data/naif0012.tls"
                ]]}
            })
        );

        assert!(matches!(
            conf.get_many(&["/mro/ck", "/mro/spk"]),
            Err(KernqlError::NotFound(_))
        ));
    }

    #[test]
    fn evaluate_missing_pointer_is_not_found() {
        let conf = config(json!({}), &[]);
        let missing = Pointer::parse("/ghost").expect("parse");
        assert!(matches!(conf.evaluate(&missing), Err(KernqlError::NotFound(_))));
    }

    #[test]
    fn parent_pointer_depth_checked() {
        let conf = config(json!({"a": {"b": {}}}), &[]);
        let p = Pointer::parse("/a/b").expect("parse");
        assert_eq!(conf.parent_pointer(&p, 1).expect("parent").to_string(), "/a");
        assert!(matches!(
            conf.parent_pointer(&p, 3),
            Err(KernqlError::InvalidArgument(_))
        ));
    }

    #[test]
    fn get_latest_wraps_only_the_subtree() {
        let tree = json!({
            "m": {
                "ck": {"kernels": ["c_.*\\.bc$"]},
                "fk": {"kernels": ["\\.tf$"]}
            }
        });
        let files = [
            "/nonexistent-data/c_1.bc",
            "/nonexistent-data/c_2.bc",
            "/nonexistent-data/f.tf",
        ];
        let conf = config(tree, &files);

        let latest = conf.get_latest("/m/ck").expect("latest");
        assert_eq!(
            latest,
            json!({"m": {"ck": {"kernels": [["/nonexistent-data/c_2.bc"]]}}})
        );

        let recursive = conf.get_latest_recursive("fk").expect("recursive");
        assert_eq!(
            recursive,
            json!({"m": {"fk": {"kernels": [["/nonexistent-data/f.tf"]]}}})
        );
    }

    #[test]
    fn load_dir_merges_documents_in_path_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("a.json"), r#"{"mro": {"v": 1}, "base": {}}"#).expect("write");
        fs::write(dir.path().join("b.json"), r#"{"mro": {"v": 2}}"#).expect("write");
        fs::write(dir.path().join("notes.txt"), "ignored").expect("write");

        let conf = Config::load_dir(dir.path(), dir.path(), Arc::new(FsLister)).expect("load");
        assert_eq!(conf.global_conf(), &json!({"mro": {"v": 2}, "base": {}}));

        fs::write(dir.path().join("c.json"), "{not json").expect("write");
        assert!(matches!(
            Config::load_dir(dir.path(), dir.path(), Arc::new(FsLister)),
            Err(KernqlError::SerializationError(_))
        ));
    }
}
