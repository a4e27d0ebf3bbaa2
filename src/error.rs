use thiserror::Error;

#[derive(Debug, Error)]
pub enum SkuSplitError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Source PDF unreadable: {0}")]
    SourceUnreadable(String),

    #[error("Content stream error: {0}")]
    ContentStreamError(String),

    #[error("Font error: {0}")]
    FontError(String),

    #[error("Assembly error: {0}")]
    AssemblyError(String),

    #[error("Package error: {0}")]
    PackageError(String),

    #[error("Manifest error: {0}")]
    ManifestError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Generates factory methods for [`SkuSplitError`] variants that wrap a `String`.
macro_rules! error_constructors {
    ($(
        $(#[doc = $doc:expr])*
        $method:ident => $variant:ident
    ),* $(,)?) => {
        impl SkuSplitError {
            $(
                $(#[doc = $doc])*
                pub fn $method(msg: impl Into<String>) -> Self {
                    Self::$variant(msg.into())
                }
            )*
        }
    };
}

error_constructors! {
    /// Create a configuration error.
    config => ConfigError,
    /// Create a source-unreadable error.
    source_unreadable => SourceUnreadable,
    /// Create a content stream error.
    content_stream => ContentStreamError,
    /// Create a font error.
    font => FontError,
    /// Create an assembly error.
    assembly => AssemblyError,
    /// Create a package error.
    package => PackageError,
    /// Create a manifest error.
    manifest => ManifestError,
}

impl From<lopdf::Error> for SkuSplitError {
    fn from(e: lopdf::Error) -> Self {
        Self::SourceUnreadable(e.to_string())
    }
}

impl From<serde_json::Error> for SkuSplitError {
    fn from(e: serde_json::Error) -> Self {
        Self::ManifestError(e.to_string())
    }
}

impl From<serde_yml::Error> for SkuSplitError {
    fn from(e: serde_yml::Error) -> Self {
        Self::ConfigError(e.to_string())
    }
}

impl From<zip::result::ZipError> for SkuSplitError {
    fn from(e: zip::result::ZipError) -> Self {
        Self::PackageError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SkuSplitError>;
