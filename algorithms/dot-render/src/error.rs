use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DotError>;

#[derive(Error, Debug)]
pub enum DotError {
    #[error("failed to parse DOT description: {0}")]
    Parse(String),
    #[error("DOT description contains no graph")]
    Empty,
    #[error("graphviz failed to render: {0}")]
    Render(#[from] std::io::Error),
    #[error("renderer reported success but {} was not created", .0.display())]
    Missing(PathBuf),
}
