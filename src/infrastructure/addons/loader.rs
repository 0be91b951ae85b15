//! Addon loader - Builds an isolated execution context per package and resolves its entry point

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use libloading::{Library, Symbol};
use tempfile::TempDir;
use crate::addons::trait_def::Addon;
use crate::application::errors::AddonError;
use crate::domain::entities::AddonDescriptor;
use super::archive::PackageArchive;

/// Version of the contract between the host and natively loaded addons
pub const ADDON_API_VERSION: u32 = 1;

/// Symbol every native addon library exports, see [`declare_addon!`](crate::declare_addon)
pub const DECLARATION_SYMBOL: &str = "addon_declaration";

/// Constructs a fresh addon instance with no arguments
pub type AddonConstructor = fn() -> Box<dyn Addon>;

/// Registers a package's exports into its table
pub type RegisterFn = fn(&mut ExportTable);

/// Something a package or the host makes resolvable by name
#[derive(Clone)]
pub enum Export {
    /// A type implementing the addon lifecycle contract
    Addon(AddonConstructor),
    /// A shared value other code may look up, not an addon
    Shared(Arc<dyn Any + Send + Sync>),
}

impl fmt::Debug for Export {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Export::Addon(_) => f.write_str("Export::Addon"),
            Export::Shared(_) => f.write_str("Export::Shared"),
        }
    }
}

/// Name → export table of one execution context
#[derive(Default, Clone)]
pub struct ExportTable {
    exports: HashMap<String, Export>,
}

impl ExportTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_addon(&mut self, name: impl Into<String>, constructor: AddonConstructor) -> &mut Self {
        self.exports.insert(name.into(), Export::Addon(constructor));
        self
    }

    pub fn register_shared<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: Arc<T>) -> &mut Self {
        self.exports.insert(name.into(), Export::Shared(value));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Export> {
        self.exports.get(name)
    }

    /// Typed lookup of a shared export
    pub fn shared<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        match self.exports.get(name)? {
            Export::Shared(value) => value.clone().downcast::<T>().ok(),
            Export::Addon(_) => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.exports.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.exports.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.exports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exports.is_empty()
    }
}

impl fmt::Debug for ExportTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportTable")
            .field("exports", &self.names())
            .finish()
    }
}

/// Declaration a native addon library exports under [`DECLARATION_SYMBOL`].
///
/// `#[repr(C)]`, fields must not be reordered.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct AddonDeclaration {
    pub api_version: u32,
    pub register: RegisterFn,
}

/// Export the declaration of a native addon library.
///
/// ```rust,ignore
/// fn register(exports: &mut ExportTable) {
///     exports.register_addon("economy.EconomyMain", || Box::new(EconomyMain::default()));
/// }
///
/// addon_host::declare_addon!(register);
/// ```
#[macro_export]
macro_rules! declare_addon {
    ($register:path) => {
        #[no_mangle]
        #[allow(non_upper_case_globals)]
        pub static addon_declaration: $crate::infrastructure::addons::AddonDeclaration =
            $crate::infrastructure::addons::AddonDeclaration {
                api_version: $crate::infrastructure::addons::ADDON_API_VERSION,
                register: $register,
            };
    };
}

/// An addon package's execution context.
///
/// Owns the package's exports, the loaded library and its staging
/// directory. Names resolve in the package first and fall back to the host
/// table, so colliding names in two packages never see each other.
pub struct ExecutionContext {
    package: PathBuf,
    // drop order matters: exports may point into the library
    exports: ExportTable,
    parent: Arc<ExportTable>,
    library: Option<Library>,
    staging: Option<TempDir>,
}

impl ExecutionContext {
    /// A context whose exports are already known, with no native library behind it
    pub fn new(package: impl Into<PathBuf>, exports: ExportTable, parent: Arc<ExportTable>) -> Self {
        Self {
            package: package.into(),
            exports,
            parent,
            library: None,
            staging: None,
        }
    }

    pub fn package(&self) -> &Path {
        &self.package
    }

    pub fn exports(&self) -> &ExportTable {
        &self.exports
    }

    /// Host export table, consulted for names the package does not export
    pub fn host_exports(&self) -> &ExportTable {
        &self.parent
    }

    pub fn is_native(&self) -> bool {
        self.library.is_some()
    }

    /// Resolve an entry point, package first then host
    pub fn resolve(&self, entry_point: &str) -> Result<AddonConstructor, AddonError> {
        let export = self
            .exports
            .get(entry_point)
            .or_else(|| self.parent.get(entry_point))
            .ok_or_else(|| {
                AddonError::EntryPointNotFound(format!(
                    "'{}' is not exported by {} or the host",
                    entry_point,
                    self.package.display()
                ))
            })?;

        match export {
            Export::Addon(constructor) => Ok(*constructor),
            Export::Shared(_) => Err(AddonError::EntryPointIncompatible(format!(
                "'{}' is not an addon type",
                entry_point
            ))),
        }
    }

    /// Construct exactly one instance of the entry point
    pub fn instantiate(&self, entry_point: &str) -> Result<Box<dyn Addon>, AddonError> {
        let constructor = self.resolve(entry_point)?;
        Ok(constructor())
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("package", &self.package)
            .field("exports", &self.exports)
            .field("native", &self.library.is_some())
            .finish()
    }
}

/// The host's code-loading facility
pub trait CodeLoader: Send + Sync {
    /// Build the execution context for a package
    fn build(
        &self,
        archive: &PackageArchive,
        descriptor: &AddonDescriptor,
        parent: Arc<ExportTable>,
    ) -> Result<ExecutionContext, AddonError>;
}

/// Loads addon code from shared libraries bundled in packages
#[derive(Debug, Default)]
pub struct NativeLoader;

impl NativeLoader {
    pub fn new() -> Self {
        Self
    }

    /// Library entry named by the descriptor, or the first shared library at the package root
    fn library_entry(archive: &PackageArchive, descriptor: &AddonDescriptor) -> Result<Option<String>, AddonError> {
        if let Some(library) = &descriptor.library {
            return Ok(Some(library.clone()));
        }
        let suffix = format!(".{}", std::env::consts::DLL_EXTENSION);
        Ok(archive
            .entry_names()?
            .into_iter()
            .find(|name| !name.contains('/') && name.ends_with(&suffix)))
    }
}

impl CodeLoader for NativeLoader {
    fn build(
        &self,
        archive: &PackageArchive,
        descriptor: &AddonDescriptor,
        parent: Arc<ExportTable>,
    ) -> Result<ExecutionContext, AddonError> {
        let Some(entry) = Self::library_entry(archive, descriptor)? else {
            // nothing native in the package, the entry point must come from the host
            return Ok(ExecutionContext::new(archive.path(), ExportTable::new(), parent));
        };

        let file_name = Path::new(&entry)
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| AddonError::MetadataInvalid(format!("invalid library entry '{}'", entry)))?;

        let staging = tempfile::Builder::new()
            .prefix(&format!("addon-{}-", descriptor.id))
            .tempdir()?;
        let library_path = staging.path().join(file_name);
        if !archive.extract(&entry, &library_path)? {
            return Err(AddonError::EntryPointNotFound(format!(
                "library '{}' not found in {}",
                entry,
                archive.path().display()
            )));
        }

        // SAFETY: addons are trusted once their metadata validates; loading runs library initializers.
        let library = unsafe { Library::new(&library_path) }.map_err(|e| {
            AddonError::EntryPointNotFound(format!("failed to load library {}: {}", entry, e))
        })?;

        // SAFETY: the symbol type matches the layout `declare_addon!` exports.
        let declaration = unsafe {
            let symbol: Symbol<*const AddonDeclaration> = library
                .get(DECLARATION_SYMBOL.as_bytes())
                .map_err(|e| {
                    AddonError::EntryPointNotFound(format!(
                        "missing `{}` in {}: {}",
                        DECLARATION_SYMBOL, entry, e
                    ))
                })?;
            (*symbol).read()
        };

        if declaration.api_version != ADDON_API_VERSION {
            return Err(AddonError::EntryPointIncompatible(format!(
                "{} was built for addon API {}, host speaks {}",
                entry, declaration.api_version, ADDON_API_VERSION
            )));
        }

        let mut exports = ExportTable::new();
        (declaration.register)(&mut exports);
        tracing::debug!(
            "Registered {} exports from {} ({})",
            exports.len(),
            entry,
            descriptor.name
        );

        Ok(ExecutionContext {
            package: archive.path().to_path_buf(),
            exports,
            parent,
            library: Some(library),
            staging: Some(staging),
        })
    }
}

/// Resolves addons linked into the host binary, by addon id
#[derive(Default)]
pub struct StaticLoader {
    packages: HashMap<String, RegisterFn>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the exports of the package whose descriptor has this `id`
    pub fn with_package(mut self, id: impl Into<String>, register: RegisterFn) -> Self {
        self.packages.insert(id.into(), register);
        self
    }
}

impl CodeLoader for StaticLoader {
    fn build(
        &self,
        archive: &PackageArchive,
        descriptor: &AddonDescriptor,
        parent: Arc<ExportTable>,
    ) -> Result<ExecutionContext, AddonError> {
        let mut exports = ExportTable::new();
        if let Some(register) = self.packages.get(&descriptor.id) {
            register(&mut exports);
        }
        Ok(ExecutionContext::new(archive.path(), exports, parent))
    }
}
