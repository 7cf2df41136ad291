use std::path::{Path, PathBuf};

/// Directory a package is installed into, `node_modules/<name>`
///
/// Scoped names (`@scope/name`) map onto nested directories.
pub fn package_dir(project_dir: &Path, package_name: &str) -> PathBuf {
    package_name
        .split('/')
        .fold(project_dir.join("node_modules"), |dir, part| dir.join(part))
}

/// Whether the package has been installed into the project
pub fn package_dir_exists(project_dir: &Path, package_name: &str) -> bool {
    package_dir(project_dir, package_name).is_dir()
}
