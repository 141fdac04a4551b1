//! Host-provided window geometry
//!
//! The core never looks at window content; its only input is where the host
//! says the window is.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::Shape;

/// Supplies the local window's current position and size
pub trait ShapeSource {
    fn current_shape(&mut self) -> Shape;
}

/// A window that never moves
impl ShapeSource for Shape {
    fn current_shape(&mut self) -> Shape {
        *self
    }
}

impl<F: FnMut() -> Shape> ShapeSource for F {
    fn current_shape(&mut self) -> Shape {
        self()
    }
}

/// Re-reads a JSON shape file (`{"x":0,"y":0,"w":800,"h":600}`) on every call
///
/// Keeps the last good shape while the file is missing or being rewritten.
#[derive(Debug, Clone)]
pub struct FileShapeSource {
    path: PathBuf,
    last: Shape,
}

impl FileShapeSource {
    pub fn new(path: impl AsRef<Path>, initial: Shape) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            last: initial,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ShapeSource for FileShapeSource {
    fn current_shape(&mut self) -> Shape {
        let parsed = fs::read_to_string(&self.path)
            .map_err(|e| e.to_string())
            .and_then(|content| serde_json::from_str::<Shape>(&content).map_err(|e| e.to_string()));

        match parsed {
            Ok(shape) => self.last = shape,
            Err(e) => debug!(path = ?self.path, error = %e, "Shape file unreadable, keeping last shape"),
        }
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fixed_and_closure_sources() {
        let mut fixed = Shape::new(1, 2, 3, 4);
        assert_eq!(fixed.current_shape(), Shape::new(1, 2, 3, 4));

        let mut x = 0;
        let mut moving = move || {
            x += 10;
            Shape::new(x, 0, 100, 100)
        };
        assert_eq!(moving.current_shape().x, 10);
        assert_eq!(moving.current_shape().x, 20);
    }

    #[test]
    fn test_file_source_follows_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("shape.json");
        let mut source = FileShapeSource::new(&path, Shape::new(0, 0, 800, 600));

        // missing file keeps the initial shape
        assert_eq!(source.current_shape(), Shape::new(0, 0, 800, 600));

        fs::write(&path, r#"{"x":900,"y":0,"w":600,"h":400}"#).unwrap();
        assert_eq!(source.current_shape(), Shape::new(900, 0, 600, 400));

        fs::write(&path, "{half-writ").unwrap();
        assert_eq!(source.current_shape(), Shape::new(900, 0, 600, 400));
    }
}
