//! Pre-parser: dependency discovery.
//!
//! Two passes run over every header before any full parsing happens:
//!
//! 1. [`conditional::flatten`] blanks the conditional regions this tool never
//!    compiles, keeping the line count intact.
//! 2. [`scan::scan`] walks the flattened text for `#include` directives and
//!    annotated class headers, producing skeleton classes and the file's
//!    dependency list.

pub mod conditional;
pub mod scan;

use std::path::Path;

use log::debug;

use crate::config::RunConfig;
use crate::error::Result;
use crate::module::unit::Dependency;

/// A class discovered by the shallow scan: name and raw base names only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkeletonClass {
    pub name: String,
    /// `*_API` export macro written before the name.
    pub api: Option<String>,
    /// First base, the super class.
    pub raw_super: Option<String>,
    /// All bases as written, super class first.
    pub bases: Vec<String>,
    pub line: u32,
    pub is_interface: bool,
}

/// Output of the pre-parser for one file.
#[derive(Debug)]
pub struct PreParsedFile {
    /// Flattened text with the input's line count.
    pub text: String,
    pub skeletons: Vec<SkeletonClass>,
    /// De-duplicated, in first-seen order.
    pub dependencies: Vec<Dependency>,
}

/// Run both pre-parser passes over one file.
pub fn preparse(path: &Path, text: &str, config: &RunConfig) -> Result<PreParsedFile> {
    let flattened =
        conditional::flatten(text, &config.preprocessor).map_err(|e| e.in_file(path))?;
    let scanned = scan::scan(&flattened, &config.naming).map_err(|e| e.in_file(path))?;

    debug!(
        "pre-parsed {}: {} skeleton class(es), {} dependencies",
        path.display(),
        scanned.skeletons.len(),
        scanned.dependencies.len()
    );

    Ok(PreParsedFile {
        text: flattened,
        skeletons: scanned.skeletons,
        dependencies: scanned.dependencies,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::path::PathBuf;

    #[test]
    fn test_errors_carry_the_file() {
        let err = preparse(
            Path::new("Broken.h"),
            "#if SOMETHING\nUCLASS()\n#endif",
            &RunConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Semantic);
        assert_eq!(err.file, PathBuf::from("Broken.h"));
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_scan_sees_flattened_text() {
        let text = "#if CPP\n#include \"Hidden.h\"\n#endif\n#include \"Visible.h\"\n";
        let file = preparse(Path::new("A.h"), text, &RunConfig::default()).unwrap();
        assert_eq!(file.dependencies.len(), 1);
        assert_eq!(file.dependencies[0].kind.name(), "Visible.h");
        assert_eq!(file.text.lines().count(), text.lines().count());
    }
}
