use serde::Serialize;

/// Validated metadata describing a packaged addon.
///
/// Created once per load attempt and owned by the resulting addon instance
/// for its whole lifetime. `name`, `id`, `version` and `entry_point` are
/// never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct AddonDescriptor {
    /// Display name, unique within the registry
    pub name: String,

    /// Stable identifier, names the addon's data directory
    pub id: String,

    /// Free-form version string
    pub version: String,

    pub description: Option<String>,

    /// Identifier of the addon's main type
    pub entry_point: String,

    /// Also register the package as a first-class host plugin
    pub register_as_host_plugin: bool,

    /// Shared library entry inside the package
    pub library: Option<String>,

    pub author: Option<String>,
}

impl AddonDescriptor {
    pub fn new(
        name: impl Into<String>,
        id: impl Into<String>,
        version: impl Into<String>,
        entry_point: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            version: version.into(),
            description: None,
            entry_point: entry_point.into(),
            register_as_host_plugin: false,
            library: None,
            author: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_library(mut self, library: impl Into<String>) -> Self {
        self.library = Some(library.into());
        self
    }

    pub fn as_host_plugin(mut self) -> Self {
        self.register_as_host_plugin = true;
        self
    }

    /// Description shown to users, with a generic fallback
    pub fn display_description(&self) -> &str {
        self.description.as_deref().unwrap_or("Addon")
    }

    /// First required field that is empty, if any
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("name", &self.name),
            ("id", &self.id),
            ("version", &self.version),
            ("entry-point", &self.entry_point),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
    }
}
