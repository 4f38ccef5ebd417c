/// Noise filter for raw watcher events.
///
/// High-churn locations (caches, logs, the trash, VCS internals, build
/// output) would drown out the changes a user cares about.
use std::path::Path;

const NOISY_PATTERNS: [&str; 8] = [
    "/Library/Caches/",
    "/Library/Logs/",
    "/.Trash/",
    "/.cache/",
    "/node_modules/",
    "/__pycache__/",
    "/.git/",
    "/target/",
];

#[derive(Debug, Clone)]
pub struct NoiseFilter {
    patterns: Vec<String>,
}

impl NoiseFilter {
    /// Built-in patterns plus the recovery holding area and `extra`.
    pub fn new(recovery_dir: Option<&Path>, extra: &[String]) -> Self {
        let mut patterns: Vec<String> = NOISY_PATTERNS.iter().map(|p| p.to_string()).collect();
        if let Some(dir) = recovery_dir {
            let mut pattern = dir.to_string_lossy().into_owned();
            if !pattern.ends_with('/') {
                pattern.push('/');
            }
            patterns.push(pattern);
        }
        patterns.extend(extra.iter().filter(|p| !p.is_empty()).cloned());
        Self { patterns }
    }

    pub fn is_noise(&self, path: &Path) -> bool {
        let path = path.to_string_lossy();
        self.patterns.iter().any(|p| path.contains(p.as_str()))
    }
}

impl Default for NoiseFilter {
    fn default() -> Self {
        Self::new(None, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_high_churn_paths() {
        let filter = NoiseFilter::default();
        assert!(filter.is_noise(Path::new("/Users/u/Library/Caches/com.app/blob")));
        assert!(filter.is_noise(Path::new("/home/u/project/.git/index.lock")));
        assert!(filter.is_noise(Path::new("/home/u/web/node_modules/x/y.js")));
        assert!(filter.is_noise(Path::new("/home/u/crate/target/debug/app")));
    }

    #[test]
    fn keeps_ordinary_paths() {
        let filter = NoiseFilter::default();
        assert!(!filter.is_noise(Path::new("/home/u/Documents/report.pdf")));
        assert!(!filter.is_noise(Path::new("/home/u/Library/Preferences/x.plist")));
        assert!(!filter.is_noise(Path::new("/home/u/targets.txt")));
    }

    #[test]
    fn recovery_dir_and_extras_are_noise() {
        let filter = NoiseFilter::new(
            Some(Path::new("/home/u/.local/share/Trash/files")),
            &["/VirtualBox VMs/".to_string()],
        );
        assert!(filter.is_noise(Path::new("/home/u/.local/share/Trash/files/old.txt")));
        assert!(filter.is_noise(Path::new("/home/u/VirtualBox VMs/win/disk.vdi")));
        assert!(!filter.is_noise(Path::new("/home/u/.local/share/Trash/info")));
    }
}
