use std::path::{Path, PathBuf};

use graphviz_rust::cmd::{CommandArg, Format};
use graphviz_rust::exec;
use graphviz_rust::printer::PrinterContext;
use tracing::info;

use crate::error::{DotError, Result};
use crate::parse::ParsedGraph;

/// Renders `graph` to a PNG at `path` through the Graphviz `dot` executable,
/// then checks the file is really there.
pub fn render_png(graph: &ParsedGraph, path: &Path) -> Result<PathBuf> {
    exec(
        graph.graph().clone(),
        &mut PrinterContext::default(),
        vec![
            Format::Png.into(),
            CommandArg::Output(path.display().to_string()),
        ],
    )?;

    let rendered = verify_output(path)?;
    info!(path = %rendered.display(), "rendered graph");
    Ok(rendered)
}

/// Fails with [`DotError::Missing`] unless the renderer left a file at `path`.
pub fn verify_output(path: &Path) -> Result<PathBuf> {
    if path.is_file() {
        Ok(path.to_path_buf())
    } else {
        Err(DotError::Missing(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_output_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never_written.png");
        match verify_output(&path) {
            Err(DotError::Missing(missing)) => assert_eq!(missing, path),
            other => panic!("expected a missing file error, got {:?}", other),
        }
        let err = verify_output(&path).unwrap_err();
        assert!(err.to_string().contains("never_written.png"));
    }

    #[test]
    fn test_verify_output_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.png");
        std::fs::write(&path, b"\x89PNG").unwrap();
        assert_eq!(verify_output(&path).unwrap(), path);
    }

    #[test]
    fn test_directory_is_not_an_image() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(verify_output(dir.path()), Err(DotError::Missing(_))));
    }
}
