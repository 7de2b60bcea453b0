//! Kind-specific build recipes.
//!
//! Each recipe turns an acquired source tree into a self-contained output
//! directory of publishable static artifacts. Builds are never retried:
//! a half-finished install or corrupted cache makes a blind rerun unsafe.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, instrument};
use walkdir::WalkDir;

use crate::adapters::{render_command, run_command};
use crate::domain::{ProjectDescriptor, ProjectKind};

use super::error::DeployError;

/// Path fragments excluded from every copy step.
///
/// Substring match on the relative path: ".git" also covers ".github" and
/// ".gitignore".
const EXCLUDED_PATH_FRAGMENTS: &[&str] = &["node_modules", ".git", ".circleci"];

/// Minimal Next.js config declaring a static export.
const SYNTHESIZED_NEXT_CONFIG: &str = "/** @type {import('next').NextConfig} */\n\
const nextConfig = {\n  output: 'export',\n};\n\nmodule.exports = nextConfig;\n";

/// Executes the build recipe selected by a `ProjectDescriptor`.
pub struct BuildExecutor {
    /// Path to the npm binary (default: "npm")
    npm_binary: String,

    install_timeout: Duration,
    build_timeout: Duration,
}

impl BuildExecutor {
    pub fn new(install_timeout: Duration, build_timeout: Duration) -> Self {
        Self {
            npm_binary: "npm".to_string(),
            install_timeout,
            build_timeout,
        }
    }

    /// Use a custom npm binary (tests).
    pub fn with_npm_binary(mut self, npm_binary: impl Into<String>) -> Self {
        self.npm_binary = npm_binary.into();
        self
    }

    /// Apply the recipe for `descriptor` to `source_root`, producing
    /// `output_dir` (a fresh directory, distinct from the source tree).
    #[instrument(skip(self, source_root, output_dir), fields(kind = %descriptor.kind))]
    pub async fn build(
        &self,
        source_root: &Path,
        descriptor: &ProjectDescriptor,
        output_dir: &Path,
    ) -> Result<(), DeployError> {
        match descriptor.kind {
            ProjectKind::Unrecognized => Err(DeployError::UnsupportedProjectKind),

            ProjectKind::StaticAssets => {
                info!("copying static site files");
                copy_tree(source_root, output_dir)
            }

            ProjectKind::Next | ProjectKind::React | ProjectKind::Vue => {
                self.build_framework(source_root, descriptor, output_dir).await
            }
        }
    }

    async fn build_framework(
        &self,
        source_root: &Path,
        descriptor: &ProjectDescriptor,
        output_dir: &Path,
    ) -> Result<(), DeployError> {
        if descriptor.has_manifest {
            // Pre-build staging copy; same exclusions as every other copy.
            copy_tree(source_root, output_dir)?;

            info!("installing dependencies");
            self.run_build_step(source_root, &["install"], self.install_timeout)
                .await?;
        }

        if descriptor.kind == ProjectKind::Next {
            ensure_static_export_config(source_root)?;
        }

        info!(command = descriptor.build_command.as_deref().unwrap_or_default(), "building project");
        let build_args = build_command_args(descriptor);
        self.run_build_step(source_root, &build_args, self.build_timeout)
            .await?;

        // The framework materializes its export under a conventional
        // subdirectory of the source tree.
        let subdir = descriptor
            .kind
            .export_subdir()
            .expect("framework kinds have an export subdirectory");
        let export_dir = source_root.join(subdir);

        if !export_dir.is_dir() {
            return Err(DeployError::BuildOutputMissing {
                expected: subdir.to_string(),
            });
        }

        copy_tree(&export_dir, output_dir)
    }

    /// Run one npm step, mapping every failure mode to `BuildCommandFailed`.
    async fn run_build_step(
        &self,
        cwd: &Path,
        args: &[&str],
        time_limit: Duration,
    ) -> Result<(), DeployError> {
        let command = render_command(&self.npm_binary, args);

        let output = run_command(&self.npm_binary, args, cwd, time_limit)
            .await
            .map_err(|e| DeployError::BuildCommandFailed {
                command: command.clone(),
                status: -1,
                stdout: String::new(),
                stderr: e.to_string(),
            })?;

        if !output.success() {
            return Err(DeployError::BuildCommandFailed {
                command,
                status: output.exit_code,
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }

        Ok(())
    }
}

/// Argv for the build step (past the npm binary itself).
fn build_command_args(descriptor: &ProjectDescriptor) -> Vec<&str> {
    match descriptor.build_command.as_deref() {
        // "npm run build" and friends; drop the leading binary name.
        Some(cmd) => cmd.split_whitespace().skip(1).collect(),
        None => vec!["run", "build"],
    }
}

/// Ensure `next.config.js` declares `output: 'export'`.
///
/// An existing config is augmented in place, never replaced; a missing one
/// is synthesized. Textual patching covers the two config shapes Next.js
/// scaffolds emit, with an appended property override as the fallback.
fn ensure_static_export_config(source_root: &Path) -> Result<(), DeployError> {
    let config_path = source_root.join("next.config.js");

    if !config_path.exists() {
        info!("synthesizing next.config.js with static export");
        return write_config(&config_path, SYNTHESIZED_NEXT_CONFIG.to_string());
    }

    let content =
        std::fs::read_to_string(&config_path).map_err(|source| DeployError::Workspace { source })?;

    if content.contains("output:") && content.contains("export") {
        return Ok(());
    }

    info!("injecting static export into next.config.js");
    let patched = if let Some(idx) = content.find("module.exports = {") {
        splice(&content, idx + "module.exports = {".len(), "\n  output: 'export',")
    } else if let Some(idx) = content.find("const nextConfig = {") {
        splice(&content, idx + "const nextConfig = {".len(), "\n  output: 'export',")
    } else {
        // Unknown shape: append a property override rather than rewrite.
        format!("{}\nmodule.exports.output = 'export';\n", content.trim_end())
    };

    write_config(&config_path, patched)
}

fn write_config(path: &Path, content: String) -> Result<(), DeployError> {
    std::fs::write(path, content).map_err(|source| DeployError::Workspace { source })
}

fn splice(content: &str, at: usize, insert: &str) -> String {
    let mut patched = String::with_capacity(content.len() + insert.len());
    patched.push_str(&content[..at]);
    patched.push_str(insert);
    patched.push_str(&content[at..]);
    patched
}

/// Whether a relative path is excluded from publication copies.
pub fn is_excluded_path(relative: &str) -> bool {
    EXCLUDED_PATH_FRAGMENTS
        .iter()
        .any(|fragment| relative.contains(fragment))
}

/// Recursively copy `src` into `dest`, skipping excluded path fragments.
pub fn copy_tree(src: &Path, dest: &Path) -> Result<(), DeployError> {
    let io = |source| DeployError::Workspace { source };

    std::fs::create_dir_all(dest).map_err(io)?;

    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry.map_err(|e| DeployError::Workspace {
            source: e.into_io_error().unwrap_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::Other, "walk error")
            }),
        })?;

        let relative = entry
            .path()
            .strip_prefix(src)
            .expect("walked entries live under the walk root");
        if is_excluded_path(&relative.to_string_lossy()) {
            continue;
        }

        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).map_err(io)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(io)?;
            }
            std::fs::copy(entry.path(), &target).map_err(io)?;
        }
        // Symlinks are dropped: published bundles are self-contained.
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProjectDescriptor;
    use tempfile::TempDir;

    fn executor() -> BuildExecutor {
        BuildExecutor::new(Duration::from_secs(30), Duration::from_secs(30))
    }

    #[tokio::test]
    async fn test_unrecognized_fails_without_spawning_anything() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();

        // A nonexistent npm binary proves no process is spawned.
        let exec = executor().with_npm_binary("no-such-npm");
        let descriptor = ProjectDescriptor::unrecognized(true);

        let result = exec.build(src.path(), &descriptor, out.path()).await;
        assert!(matches!(result, Err(DeployError::UnsupportedProjectKind)));
    }

    #[tokio::test]
    async fn test_static_copy_excludes_metadata() {
        let src = TempDir::new().unwrap();
        std::fs::write(src.path().join("index.html"), "<html></html>").unwrap();
        std::fs::create_dir(src.path().join(".git")).unwrap();
        std::fs::write(src.path().join(".git").join("HEAD"), "ref").unwrap();
        std::fs::write(src.path().join(".gitignore"), "node_modules").unwrap();
        std::fs::create_dir(src.path().join("node_modules")).unwrap();
        std::fs::write(src.path().join("node_modules").join("x.js"), "x").unwrap();
        std::fs::create_dir(src.path().join("assets")).unwrap();
        std::fs::write(src.path().join("assets").join("app.css"), "body{}").unwrap();

        let out = TempDir::new().unwrap();
        let descriptor = ProjectDescriptor {
            kind: ProjectKind::StaticAssets,
            has_manifest: false,
            build_command: None,
            framework_version: None,
        };

        executor()
            .build(src.path(), &descriptor, out.path())
            .await
            .unwrap();

        assert!(out.path().join("index.html").exists());
        assert!(out.path().join("assets").join("app.css").exists());
        assert!(!out.path().join(".git").exists());
        assert!(!out.path().join(".gitignore").exists());
        assert!(!out.path().join("node_modules").exists());
    }

    #[tokio::test]
    async fn test_failing_build_command_captures_diagnostics() {
        let src = TempDir::new().unwrap();
        std::fs::write(src.path().join("package.json"), "{}").unwrap();
        let out = TempDir::new().unwrap();

        // "false" accepts any argv and exits 1, standing in for npm.
        let exec = executor().with_npm_binary("false");
        let descriptor = ProjectDescriptor {
            kind: ProjectKind::React,
            has_manifest: true,
            build_command: Some("npm run build".to_string()),
            framework_version: None,
        };

        let result = exec.build(src.path(), &descriptor, out.path()).await;
        match result {
            Err(DeployError::BuildCommandFailed { command, status, .. }) => {
                assert_eq!(command, "false install");
                assert_eq!(status, 1);
            }
            other => panic!("expected BuildCommandFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_export_dir_after_successful_build() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();

        // "true" exits 0 without producing any export directory.
        let exec = executor().with_npm_binary("true");
        let descriptor = ProjectDescriptor {
            kind: ProjectKind::Vue,
            has_manifest: false,
            build_command: Some("npm run build".to_string()),
            framework_version: None,
        };

        let result = exec.build(src.path(), &descriptor, out.path()).await;
        match result {
            Err(DeployError::BuildOutputMissing { expected }) => {
                assert_eq!(expected, "dist");
            }
            other => panic!("expected BuildOutputMissing, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_framework_build_copies_export_dir() {
        let src = TempDir::new().unwrap();
        let export = src.path().join("build");
        std::fs::create_dir(&export).unwrap();
        std::fs::write(export.join("index.html"), "<html>built</html>").unwrap();

        let out = TempDir::new().unwrap();
        let exec = executor().with_npm_binary("true");
        let descriptor = ProjectDescriptor {
            kind: ProjectKind::React,
            has_manifest: false,
            build_command: Some("npm run build".to_string()),
            framework_version: None,
        };

        exec.build(src.path(), &descriptor, out.path()).await.unwrap();

        let copied = std::fs::read_to_string(out.path().join("index.html")).unwrap();
        assert_eq!(copied, "<html>built</html>");
    }

    #[test]
    fn test_synthesizes_next_config_when_absent() {
        let src = TempDir::new().unwrap();

        ensure_static_export_config(src.path()).unwrap();

        let written = std::fs::read_to_string(src.path().join("next.config.js")).unwrap();
        assert!(written.contains("output: 'export'"));
        assert!(written.contains("module.exports"));
    }

    #[test]
    fn test_injects_export_into_module_exports_config() {
        let src = TempDir::new().unwrap();
        std::fs::write(
            src.path().join("next.config.js"),
            "module.exports = {\n  reactStrictMode: true,\n};\n",
        )
        .unwrap();

        ensure_static_export_config(src.path()).unwrap();

        let patched = std::fs::read_to_string(src.path().join("next.config.js")).unwrap();
        assert!(patched.contains("output: 'export',"));
        // The original setting survives.
        assert!(patched.contains("reactStrictMode: true"));
    }

    #[test]
    fn test_existing_export_config_is_left_alone() {
        let src = TempDir::new().unwrap();
        let original = "module.exports = { output: 'export' };\n";
        std::fs::write(src.path().join("next.config.js"), original).unwrap();

        ensure_static_export_config(src.path()).unwrap();

        let after = std::fs::read_to_string(src.path().join("next.config.js")).unwrap();
        assert_eq!(after, original);
    }

    #[test]
    fn test_unknown_config_shape_gets_appended_override() {
        let src = TempDir::new().unwrap();
        std::fs::write(
            src.path().join("next.config.js"),
            "module.exports = buildConfig();\n",
        )
        .unwrap();

        ensure_static_export_config(src.path()).unwrap();

        let patched = std::fs::read_to_string(src.path().join("next.config.js")).unwrap();
        assert!(patched.contains("module.exports.output = 'export';"));
        assert!(patched.contains("buildConfig()"));
    }

    #[test]
    fn test_exclusion_is_substring_match() {
        assert!(is_excluded_path(".git/HEAD"));
        assert!(is_excluded_path("app/.github/workflows/ci.yml"));
        assert!(is_excluded_path("packages/web/node_modules/react/index.js"));
        assert!(is_excluded_path(".circleci/config.yml"));

        assert!(!is_excluded_path("index.html"));
        assert!(!is_excluded_path("assets/logo.png"));
    }
}
