//! Repository discovery, setup and handles.
//!
//! A repository is the pair of a git directory and an optional worktree:
//! the worktree is present exactly when the git directory's final path
//! component is `.git`. Environment overrides (`GIT_DIR`,
//! `GIT_OBJECT_DIRECTORY`) are read per call, never cached.

use std::env;
use std::ffi::OsStr;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use log::debug;
use sha1::{Digest, Sha1};

use crate::errors::{Error, Result};
use crate::index::Index;
use crate::store::ObjectStore;
use crate::utils::compression;

pub const GIT_DIR_ENV: &str = "GIT_DIR";
pub const OBJECT_DIR_ENV: &str = "GIT_OBJECT_DIRECTORY";

/// Options for [`Repository::setup`].
#[derive(Debug, Clone)]
pub struct SetupOptions {
    /// Directory to create and initialise; the current directory if unset.
    pub name: Option<PathBuf>,
    pub initial_branch: String,
    pub bare: bool,
}

impl Default for SetupOptions {
    fn default() -> Self {
        Self {
            name: None,
            initial_branch: "main".to_string(),
            bare: false,
        }
    }
}

/// An opened repository. Generic over the hash algorithm as a
/// future-compatibility seam; every on-disk format here is SHA-1.
pub struct Repository<D: Digest = Sha1> {
    git_dir: PathBuf,
    worktree: Option<PathBuf>,
    store: ObjectStore,
    _hash: PhantomData<D>,
}

impl Repository<Sha1> {
    /// Open an existing repository.
    ///
    /// `GIT_DIR` short-circuits discovery; otherwise the search walks
    /// upward from `start_dir` (or the current directory) looking for a
    /// `.git` entry, and gives up with `GitDirNotFound` at the filesystem
    /// root or the user's home directory.
    pub fn open(start_dir: Option<&Path>) -> Result<Self> {
        let git_dir = match env_path(GIT_DIR_ENV)? {
            Some(dir) => {
                debug!("using git directory from {GIT_DIR_ENV}: {}", dir.display());
                dir
            }
            None => discover(start_dir)?,
        };

        // The located directory must at least be openable.
        fs::read_dir(&git_dir)?;

        Self::from_git_dir(git_dir)
    }

    /// Create (or re-open) a repository, never overwriting existing data.
    pub fn setup(options: &SetupOptions) -> Result<Self> {
        if let Some(name) = &options.name {
            fs::create_dir_all(name)?;
        }
        let base = match &options.name {
            Some(name) => name.clone(),
            None => env::current_dir()?,
        };
        let git_dir = if options.bare {
            base
        } else {
            match env_path(GIT_DIR_ENV)? {
                Some(dir) => dir,
                None => base.join(".git"),
            }
        };

        fs::create_dir_all(&git_dir)?;
        fs::create_dir_all(git_dir.join("refs").join("heads"))?;
        fs::create_dir_all(git_dir.join("refs").join("tags"))?;

        let repo = Self::from_git_dir(git_dir)?;
        repo.store.setup()?;

        // HEAD is created exclusively; an existing one is left untouched.
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(repo.git_dir.join("HEAD"))
        {
            Ok(mut head) => {
                head.write_all(format!("ref: refs/heads/{}\n", options.initial_branch).as_bytes())?;
                debug!("initialised HEAD at refs/heads/{}", options.initial_branch);
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                debug!("HEAD already exists, leaving it untouched");
            }
            Err(err) => return Err(err.into()),
        }

        Ok(repo)
    }

    fn from_git_dir(git_dir: PathBuf) -> Result<Self> {
        let worktree = if git_dir.file_name() == Some(OsStr::new(".git")) {
            git_dir.parent().map(Path::to_path_buf)
        } else {
            None
        };
        let objects_dir = match env_path(OBJECT_DIR_ENV)? {
            Some(dir) => dir,
            None => git_dir.join("objects"),
        };
        Ok(Self {
            git_dir,
            worktree,
            store: ObjectStore::new(objects_dir),
            _hash: PhantomData,
        })
    }
}

impl<D: Digest> Repository<D> {
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// The working-copy directory; `None` for a bare repository.
    pub fn worktree(&self) -> Option<&Path> {
        self.worktree.as_deref()
    }

    pub fn is_bare(&self) -> bool {
        self.worktree.is_none()
    }

    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    pub fn into_store(self) -> ObjectStore {
        self.store
    }

    /// Canonical absolute path of the git directory.
    pub fn name(&self) -> Result<PathBuf> {
        Ok(fs::canonicalize(&self.git_dir)?)
    }

    /// Read and parse `<git_dir>/index`.
    pub fn load_index(&self) -> Result<Index<D>> {
        let file = File::open(self.git_dir.join("index"))?;
        let data = compression::read_capped(file)?;
        Index::parse(&data)
    }
}

/// Walk upward looking for a `.git` entry. The start directory itself is
/// examined first; reaching the filesystem root or the user's home
/// directory without a hit terminates the search.
fn discover(start_dir: Option<&Path>) -> Result<PathBuf> {
    let mut dir = match start_dir {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => env::current_dir()?.join(path),
        None => env::current_dir()?,
    };
    let home = home_dir()?;

    loop {
        let candidate = dir.join(".git");
        if fs::symlink_metadata(&candidate).is_ok() {
            debug!("found git directory at {}", candidate.display());
            return Ok(candidate);
        }
        if home.as_deref() == Some(dir.as_path()) {
            debug!("reached home directory without finding .git");
            return Err(Error::GitDirNotFound);
        }
        if !dir.pop() {
            debug!("reached filesystem root without finding .git");
            return Err(Error::GitDirNotFound);
        }
    }
}

/// Halting point for the upward search: `HOME`, or `USERPROFILE` on
/// Windows.
fn home_dir() -> Result<Option<PathBuf>> {
    if let Some(home) = env_path("HOME")? {
        return Ok(Some(home));
    }
    env_path("USERPROFILE")
}

/// Read an environment variable as a path. A variable set to the empty
/// string is an error rather than a silent fallback.
fn env_path(key: &str) -> Result<Option<PathBuf>> {
    match env::var_os(key) {
        Some(value) if value.is_empty() => Err(Error::EmptyValue(key.to_string())),
        Some(value) => Ok(Some(PathBuf::from(value))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_setup_creates_layout() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("project");
        let repo = Repository::setup(&SetupOptions {
            name: Some(target.clone()),
            ..Default::default()
        })
        .unwrap();

        let git_dir = target.join(".git");
        assert_eq!(repo.git_dir(), git_dir.as_path());
        assert_eq!(repo.worktree(), Some(target.as_path()));
        assert!(git_dir.join("refs/heads").is_dir());
        assert!(git_dir.join("refs/tags").is_dir());
        assert!(git_dir.join("objects/info").is_dir());
        assert!(git_dir.join("objects/pack").is_dir());
        assert_eq!(
            fs::read_to_string(git_dir.join("HEAD")).unwrap(),
            "ref: refs/heads/main\n"
        );
    }

    #[test]
    fn test_setup_bare() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("project.git");
        let repo = Repository::setup(&SetupOptions {
            name: Some(target.clone()),
            bare: true,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(repo.git_dir(), target.as_path());
        assert!(repo.is_bare());
        assert!(target.join("HEAD").is_file());
    }

    #[test]
    fn test_setup_is_idempotent_and_preserves_head() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("project");
        let options = SetupOptions {
            name: Some(target.clone()),
            initial_branch: "trunk".to_string(),
            ..Default::default()
        };
        Repository::setup(&options).unwrap();

        let head_path = target.join(".git/HEAD");
        assert_eq!(
            fs::read_to_string(&head_path).unwrap(),
            "ref: refs/heads/trunk\n"
        );

        // A second setup with a different branch must not rewrite HEAD.
        let mut second = options.clone();
        second.initial_branch = "other".to_string();
        Repository::setup(&second).unwrap();
        assert_eq!(
            fs::read_to_string(&head_path).unwrap(),
            "ref: refs/heads/trunk\n"
        );
    }

    #[test]
    fn test_open_discovers_from_subdirectory() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("project");
        Repository::setup(&SetupOptions {
            name: Some(target.clone()),
            ..Default::default()
        })
        .unwrap();

        let nested = target.join("src").join("deep");
        fs::create_dir_all(&nested).unwrap();
        let repo = Repository::open(Some(&nested)).unwrap();
        assert_eq!(repo.name().unwrap(), fs::canonicalize(target.join(".git")).unwrap());
        assert!(!repo.is_bare());
    }

    #[test]
    fn test_search_halts_at_home() {
        let dir = tempdir().unwrap();
        let start = dir.path().join("a").join("b");
        fs::create_dir_all(&start).unwrap();

        // With HOME at the temp root and no .git anywhere below it, the
        // search must terminate without escaping into the real tree.
        let old_home = env::var_os("HOME");
        env::set_var("HOME", dir.path());
        let result = discover(Some(&start));
        match old_home {
            Some(home) => env::set_var("HOME", home),
            None => env::remove_var("HOME"),
        }

        assert!(matches!(result, Err(Error::GitDirNotFound)));
    }

    #[test]
    fn test_missing_index_surfaces_not_found() {
        let dir = tempdir().unwrap();
        let repo = Repository::setup(&SetupOptions {
            name: Some(dir.path().join("p")),
            ..Default::default()
        })
        .unwrap();
        assert!(repo.load_index().unwrap_err().is_not_found());
    }
}
