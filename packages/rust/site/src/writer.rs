//! Atomic file writes and the site manifest.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use coursebuilder_shared::{
    ArtifactMeta, CourseBuilderError, Result, SiteManifest, CURRENT_SCHEMA_VERSION,
};

use crate::layout::{MANIFEST, SiteLayout};

/// Write `content` to `rel` under the layout root.
///
/// Parent directories are created as needed. The file is written to a
/// hidden temp sibling first and then renamed over the target, so readers
/// never observe a half-written file.
pub fn write_artifact(layout: &SiteLayout, rel: &str, content: &str) -> Result<ArtifactMeta> {
    let target = layout.resolve(rel);
    let parent = target
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| layout.root().to_path_buf());
    std::fs::create_dir_all(&parent).map_err(|e| CourseBuilderError::io(&parent, e))?;

    let file_name = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CourseBuilderError::validation(format!("invalid artifact path: {rel}")))?;
    let temp = parent.join(format!(".{file_name}.tmp"));

    std::fs::write(&temp, content).map_err(|e| CourseBuilderError::io(&temp, e))?;
    std::fs::rename(&temp, &target).map_err(|e| CourseBuilderError::io(&target, e))?;

    let meta = ArtifactMeta {
        path: rel.to_string(),
        sha256: sha256_hex(content.as_bytes()),
        size_bytes: content.len(),
    };

    debug!(path = %rel, size = meta.size_bytes, "wrote artifact");
    Ok(meta)
}

/// Hex-encoded SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Write `manifest.json` (pretty-printed) at the layout root.
#[instrument(skip_all, fields(root = %layout.root().display(), artifacts = manifest.artifacts.len()))]
pub fn write_manifest(layout: &SiteLayout, manifest: &SiteManifest) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(manifest).map_err(|e| {
        CourseBuilderError::validation(format!("JSON serialization failed: {e}"))
    })?;
    write_artifact(layout, MANIFEST, &json)?;
    Ok(layout.resolve(MANIFEST))
}

/// Load and check `manifest.json` from a previously generated site.
pub fn read_manifest(layout: &SiteLayout) -> Result<SiteManifest> {
    let path = layout.resolve(MANIFEST);
    let content =
        std::fs::read_to_string(&path).map_err(|e| CourseBuilderError::io(&path, e))?;

    let manifest: SiteManifest = serde_json::from_str(&content).map_err(|e| {
        CourseBuilderError::validation(format!("invalid manifest.json: {e}"))
    })?;

    if manifest.schema_version != CURRENT_SCHEMA_VERSION {
        return Err(CourseBuilderError::validation(format!(
            "unsupported schema_version: {} (expected {})",
            manifest.schema_version, CURRENT_SCHEMA_VERSION
        )));
    }

    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use coursebuilder_shared::{RunId, TokenUsage};

    fn temp_layout() -> SiteLayout {
        SiteLayout::new(
            std::env::temp_dir().join(format!("cb-site-{}", uuid::Uuid::now_v7())),
        )
    }

    fn sample_manifest(artifacts: Vec<ArtifactMeta>) -> SiteManifest {
        SiteManifest {
            schema_version: CURRENT_SCHEMA_VERSION,
            id: RunId::new(),
            topic: "Widgets".into(),
            model: "claude-test".into(),
            tool_version: "0.1.0".into(),
            created_at: Utc::now(),
            chapters: 2,
            concepts: 4,
            artifacts,
            stages: vec![],
            usage: TokenUsage::default(),
        }
    }

    #[test]
    fn artifact_write_is_atomic_and_hashed() {
        let layout = temp_layout();
        let meta = write_artifact(&layout, "docs/chapters/01-intro/index.md", "# Intro\n").unwrap();

        assert_eq!(meta.path, "docs/chapters/01-intro/index.md");
        assert_eq!(meta.size_bytes, 8);
        assert_eq!(meta.sha256.len(), 64);
        assert_eq!(meta.sha256, sha256_hex(b"# Intro\n"));

        let dir = layout.resolve("docs/chapters/01-intro");
        let names: Vec<String> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["index.md".to_string()]);

        let _ = std::fs::remove_dir_all(layout.root());
    }

    #[test]
    fn artifact_overwrite_replaces_content() {
        let layout = temp_layout();
        write_artifact(&layout, "docs/faq.md", "old").unwrap();
        let meta = write_artifact(&layout, "docs/faq.md", "new content").unwrap();

        let on_disk = std::fs::read_to_string(layout.resolve("docs/faq.md")).unwrap();
        assert_eq!(on_disk, "new content");
        assert_eq!(meta.size_bytes, 11);

        let _ = std::fs::remove_dir_all(layout.root());
    }

    #[test]
    fn manifest_roundtrip_through_disk() {
        let layout = temp_layout();
        let artifact = write_artifact(&layout, "docs/index.md", "home").unwrap();
        let manifest = sample_manifest(vec![artifact.clone()]);

        let path = write_manifest(&layout, &manifest).unwrap();
        assert!(path.ends_with("manifest.json"));

        let loaded = read_manifest(&layout).unwrap();
        assert_eq!(loaded.topic, "Widgets");
        assert_eq!(loaded.artifacts, vec![artifact]);

        let _ = std::fs::remove_dir_all(layout.root());
    }

    #[test]
    fn read_manifest_rejects_future_schema() {
        let layout = temp_layout();
        let mut manifest = sample_manifest(vec![]);
        manifest.schema_version = CURRENT_SCHEMA_VERSION + 1;
        write_manifest(&layout, &manifest).unwrap();

        let err = read_manifest(&layout).unwrap_err();
        assert!(err.to_string().contains("unsupported schema_version"));

        let _ = std::fs::remove_dir_all(layout.root());
    }
}
