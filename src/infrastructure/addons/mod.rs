//! Addon infrastructure
//!
//! Addons are zip packages holding an `addon.yml` descriptor and, usually, a
//! shared library exporting the addon's entry point.

pub mod archive;
pub mod loader;
pub mod manifest;
pub mod registry;

pub use archive::{PackageArchive, PackageWriter};
pub use loader::{
    AddonConstructor, AddonDeclaration, CodeLoader, ExecutionContext, Export, ExportTable,
    NativeLoader, RegisterFn, StaticLoader, ADDON_API_VERSION, DECLARATION_SYMBOL,
};
pub use manifest::{parse_descriptor, read_descriptor, METADATA_ENTRY};
pub use registry::AddonRegistry;
