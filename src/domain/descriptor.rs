//! Project classification results.
//!
//! A `ProjectDescriptor` is produced once by the analyzer and consumed by the
//! build executor to select a recipe. It is immutable after classification.

use serde::{Deserialize, Serialize};

/// The kind of project found in an acquired source tree.
///
/// Every kind maps to exactly one build recipe; `Unrecognized` is a terminal
/// state with no recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectKind {
    /// Next.js application (static export)
    Next,

    /// React application (CRA-style build)
    React,

    /// Vue application
    Vue,

    /// Plain static site (HTML files, no manifest)
    StaticAssets,

    /// No recipe exists for this tree
    Unrecognized,
}

impl ProjectKind {
    /// Conventional subdirectory the framework's build writes its export to.
    ///
    /// `None` for kinds that have no build step.
    pub fn export_subdir(&self) -> Option<&'static str> {
        match self {
            ProjectKind::Next => Some("out"),
            ProjectKind::React => Some("build"),
            ProjectKind::Vue => Some("dist"),
            ProjectKind::StaticAssets | ProjectKind::Unrecognized => None,
        }
    }

    /// Whether this kind runs an install/build step.
    pub fn has_build_step(&self) -> bool {
        matches!(self, ProjectKind::Next | ProjectKind::React | ProjectKind::Vue)
    }
}

impl std::fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectKind::Next => write!(f, "next"),
            ProjectKind::React => write!(f, "react"),
            ProjectKind::Vue => write!(f, "vue"),
            ProjectKind::StaticAssets => write!(f, "static"),
            ProjectKind::Unrecognized => write!(f, "unrecognized"),
        }
    }
}

/// Classification of a source tree into a build recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDescriptor {
    /// Detected project kind
    pub kind: ProjectKind,

    /// Whether a dependency manifest (`package.json`) exists at the root
    pub has_manifest: bool,

    /// Inferred build command (the manifest's `build` script when declared,
    /// otherwise the framework default)
    pub build_command: Option<String>,

    /// Version declared in the manifest, if any
    pub framework_version: Option<String>,
}

impl ProjectDescriptor {
    /// Descriptor for a tree no recipe applies to.
    pub fn unrecognized(has_manifest: bool) -> Self {
        Self {
            kind: ProjectKind::Unrecognized,
            has_manifest,
            build_command: None,
            framework_version: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_subdirs() {
        assert_eq!(ProjectKind::Next.export_subdir(), Some("out"));
        assert_eq!(ProjectKind::React.export_subdir(), Some("build"));
        assert_eq!(ProjectKind::Vue.export_subdir(), Some("dist"));
        assert_eq!(ProjectKind::StaticAssets.export_subdir(), None);
        assert_eq!(ProjectKind::Unrecognized.export_subdir(), None);
    }

    #[test]
    fn test_descriptor_serialization_round_trip() {
        let descriptor = ProjectDescriptor {
            kind: ProjectKind::Next,
            has_manifest: true,
            build_command: Some("npm run build".to_string()),
            framework_version: Some("1.0.0".to_string()),
        };

        let json = serde_json::to_string(&descriptor).unwrap();
        let parsed: ProjectDescriptor = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, descriptor);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ProjectKind::Next.to_string(), "next");
        assert_eq!(ProjectKind::StaticAssets.to_string(), "static");
    }
}
