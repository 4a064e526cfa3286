//! Locations and limits for one processing run.
use std::path::Path;
use std::path::PathBuf;

/// Default upper bound for an input file, 10 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Directories, template and limits used by [`crate::process_customs_declaration`].
/// Relative paths resolve against the working directory.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Folder holding the packing lists, invoices and declaration files
    pub input_dir: PathBuf,
    /// Folder receiving the generated workbook, created when missing
    pub output_dir: PathBuf,
    /// Template workbook with the four target sheets
    pub template_path: PathBuf,
    /// Folder holding the optional header pictures
    pub images_dir: PathBuf,
    /// Input files larger than this many bytes are rejected
    pub max_file_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            input_dir: PathBuf::from("uploads"),
            output_dir: PathBuf::from("outputs"),
            template_path: PathBuf::from("templates").join("001.xlsx"),
            images_dir: PathBuf::from("images"),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl Config {
    /// Default configuration reading its inputs from `input_dir`.
    pub fn new<P: AsRef<Path>>(input_dir: P) -> Self {
        Config {
            input_dir: input_dir.as_ref().to_path_buf(),
            ..Config::default()
        }
    }

    pub fn with_output_dir<P: AsRef<Path>>(mut self, output_dir: P) -> Self {
        self.output_dir = output_dir.as_ref().to_path_buf();
        self
    }

    pub fn with_template_path<P: AsRef<Path>>(mut self, template_path: P) -> Self {
        self.template_path = template_path.as_ref().to_path_buf();
        self
    }

    pub fn with_images_dir<P: AsRef<Path>>(mut self, images_dir: P) -> Self {
        self.images_dir = images_dir.as_ref().to_path_buf();
        self
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_working_directory_layout() {
        let config = Config::default();
        assert_eq!(config.input_dir, PathBuf::from("uploads"));
        assert_eq!(config.output_dir, PathBuf::from("outputs"));
        assert_eq!(config.template_path, Path::new("templates").join("001.xlsx"));
        assert_eq!(config.images_dir, PathBuf::from("images"));
        assert_eq!(config.max_file_size, 10_485_760);
    }

    #[test]
    fn builder_overrides() {
        let config = Config::new("in")
            .with_output_dir("out")
            .with_template_path("t.xlsx")
            .with_images_dir("pics")
            .with_max_file_size(1);
        assert_eq!(config.input_dir, PathBuf::from("in"));
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.template_path, PathBuf::from("t.xlsx"));
        assert_eq!(config.images_dir, PathBuf::from("pics"));
        assert_eq!(config.max_file_size, 1);
    }
}
