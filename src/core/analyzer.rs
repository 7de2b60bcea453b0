//! Source tree classification.
//!
//! A pure decision procedure: given the acquired tree, produce the
//! `ProjectDescriptor` that selects a build recipe. Deterministic for a
//! given tree, with no side effects.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::domain::{ProjectDescriptor, ProjectKind};

/// Dependency manifest file expected at the tree root.
const MANIFEST_FILE: &str = "package.json";

/// Extensions that mark a manifest-less tree as a plain static site.
const MARKUP_EXTENSIONS: &[&str] = &["html", "htm"];

/// The slice of `package.json` the classifier inspects.
#[derive(Debug, Deserialize)]
struct PackageManifest {
    version: Option<String>,

    #[serde(default)]
    dependencies: HashMap<String, String>,

    #[serde(default, rename = "devDependencies")]
    dev_dependencies: HashMap<String, String>,

    #[serde(default)]
    scripts: HashMap<String, String>,
}

impl PackageManifest {
    /// Union of runtime and development dependencies.
    fn declares(&self, name: &str) -> bool {
        self.dependencies.contains_key(name) || self.dev_dependencies.contains_key(name)
    }
}

/// Classify the tree rooted at `source_root`.
///
/// Decision order: manifest markers first (`next` takes precedence over
/// `react` — Next.js apps always also depend on React), then a markup-file
/// scan of the root listing, then `Unrecognized`. A malformed manifest also
/// classifies as `Unrecognized`: a manifest exists but declares no usable
/// recipe.
pub fn analyze(source_root: &Path) -> ProjectDescriptor {
    let manifest_path = source_root.join(MANIFEST_FILE);

    if manifest_path.exists() {
        let manifest: PackageManifest = match std::fs::read_to_string(&manifest_path)
            .map_err(anyhow::Error::from)
            .and_then(|raw| serde_json::from_str(&raw).map_err(anyhow::Error::from))
        {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!(path = %manifest_path.display(), error = %e, "unreadable manifest");
                return ProjectDescriptor::unrecognized(true);
            }
        };

        let kind = if manifest.declares("next") {
            ProjectKind::Next
        } else if manifest.declares("react") {
            ProjectKind::React
        } else if manifest.declares("vue") {
            ProjectKind::Vue
        } else {
            return ProjectDescriptor::unrecognized(true);
        };

        // The manifest's declared build script wins; every supported
        // framework falls back to the same npm invocation.
        let build_command = if manifest.scripts.contains_key("build") {
            "npm run build".to_string()
        } else {
            default_build_command(kind).to_string()
        };

        return ProjectDescriptor {
            kind,
            has_manifest: true,
            build_command: Some(build_command),
            framework_version: manifest.version,
        };
    }

    if has_markup_file(source_root) {
        return ProjectDescriptor {
            kind: ProjectKind::StaticAssets,
            has_manifest: false,
            build_command: None,
            framework_version: None,
        };
    }

    ProjectDescriptor::unrecognized(false)
}

fn default_build_command(_kind: ProjectKind) -> &'static str {
    "npm run build"
}

/// Scan the root's immediate listing for a markup document.
fn has_markup_file(source_root: &Path) -> bool {
    let entries = match std::fs::read_dir(source_root) {
        Ok(entries) => entries,
        Err(_) => return false,
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            if MARKUP_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
                return true;
            }
        }
    }

    false
}
