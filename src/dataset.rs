//! On-disk dataset splits: generation and indexed access.
//!
//! Records live at `<data_dir>/{train,val,test}/N=<n>/<index>.txt`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::geometry::PointSet;
use crate::record::DataRecord;
use crate::solver::{solve, Hungarian, Matching, Objective, Solver};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Val,
    Test,
}

impl Split {
    pub const ALL: [Split; 3] = [Split::Train, Split::Val, Split::Test];

    pub fn name(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Val => "val",
            Split::Test => "test",
        }
    }
}

/// Which splits a generation run writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Only {
    Train,
    Val,
    Test,
    #[default]
    All,
    /// Write nothing; only resolve the split directories.
    None,
}

impl Only {
    pub fn includes(self, split: Split) -> bool {
        match self {
            Only::All => true,
            Only::None => false,
            Only::Train => split == Split::Train,
            Only::Val => split == Split::Val,
            Only::Test => split == Split::Test,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitDirs {
    pub train: PathBuf,
    pub val: PathBuf,
    pub test: PathBuf,
}

impl SplitDirs {
    pub fn new(data_dir: &Path, n: usize) -> Self {
        let dir = |split: Split| data_dir.join(split.name()).join(format!("N={n}"));
        Self {
            train: dir(Split::Train),
            val: dir(Split::Val),
            test: dir(Split::Test),
        }
    }

    pub fn get(&self, split: Split) -> &Path {
        match split {
            Split::Train => &self.train,
            Split::Val => &self.val,
            Split::Test => &self.test,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub train_size: usize,
    pub val_size: usize,
    pub test_size: usize,
    pub data_dir: PathBuf,
    /// Points per side of every instance.
    pub n: usize,
    pub seed: Option<u64>,
    /// Label every record, including the training split.
    pub supervised: bool,
    pub only: Only,
}

impl GeneratorConfig {
    pub fn new(data_dir: impl Into<PathBuf>, n: usize) -> Self {
        Self {
            train_size: 0,
            val_size: 0,
            test_size: 0,
            data_dir: data_dir.into(),
            n,
            seed: None,
            supervised: false,
            only: Only::All,
        }
    }

    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    pub fn dirs(&self) -> SplitDirs {
        SplitDirs::new(&self.data_dir, self.n)
    }

    pub fn total(&self) -> usize {
        self.train_size + self.val_size + self.test_size
    }

    /// The split owning global record `idx` and its index within that split.
    fn locate(&self, idx: usize) -> (Split, usize) {
        if idx < self.train_size {
            (Split::Train, idx)
        } else if idx < self.train_size + self.val_size {
            (Split::Val, idx - self.train_size)
        } else {
            (Split::Test, idx - self.train_size - self.val_size)
        }
    }
}

/// Generates and writes the configured splits, solving labels with [`Hungarian`].
pub fn create_dataset<R>(config: &GeneratorConfig, rng: &mut R) -> Result<SplitDirs>
where
    R: Rng + ?Sized,
{
    create_dataset_with(config, &Hungarian, rng)
}

/// Generates and writes the configured splits.
///
/// Every record draws its points from `rng` whether or not its split is
/// written, so a given seed yields the same instances under any [`Only`].
/// Training records are unlabelled unless `config.supervised` is set;
/// validation and test records always carry their maximum-weight matching.
pub fn create_dataset_with<S, R>(
    config: &GeneratorConfig,
    solver: &S,
    rng: &mut R,
) -> Result<SplitDirs>
where
    S: Solver + ?Sized,
    R: Rng + ?Sized,
{
    let dirs = config.dirs();
    if config.only == Only::None {
        return Ok(dirs);
    }
    for split in Split::ALL {
        fs::create_dir_all(dirs.get(split))?;
        log::debug!("{:<32}{}", "using split directory", dirs.get(split).display());
    }

    let total = config.total();
    let step = (total / 10).max(1);
    let mut written = 0;
    for idx in 0..total {
        let points = PointSet::random(config.n, rng);
        let (split, local) = config.locate(idx);
        if config.only.includes(split) {
            let labels = if config.supervised || idx >= config.train_size {
                Some(solve(solver, &points.cost_matrix(), Objective::Maximize)?)
            } else {
                None
            };
            let path = dirs.get(split).join(format!("{local}.txt"));
            fs::write(path, DataRecord::new(points, labels).encode())?;
            written += 1;
        }
        if (idx + 1) % step == 0 {
            log::info!("{:<32}{}/{}", "generated records", idx + 1, total);
        }
    }
    log::info!(
        "{:<32}{} (N={}, {}/{}/{})",
        "wrote records",
        written,
        config.n,
        config.train_size,
        config.val_size,
        config.test_size
    );
    Ok(dirs)
}

/// One decoded record, shaped for a model.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Sources stacked over targets, 2N×2.
    pub graph: DMatrix<f64>,
    pub labels: Option<Matching>,
}

/// A fixed-size view over one split directory, read on demand.
#[derive(Debug, Clone)]
pub struct Dataset {
    dir: PathBuf,
    size: usize,
    has_labels: bool,
}

impl Dataset {
    /// `size` is trusted: the directory is never scanned.
    pub fn new(dir: impl Into<PathBuf>, size: usize, has_labels: bool) -> Self {
        Self {
            dir: dir.into(),
            size,
            has_labels,
        }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn has_labels(&self) -> bool {
        self.has_labels
    }

    pub fn path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{index}.txt"))
    }

    pub fn get(&self, index: usize) -> Result<Sample> {
        let path = self.path(index);
        if index >= self.size {
            return Err(Error::NotFound { index, path });
        }
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::NotFound { index, path })
            }
            Err(e) => return Err(e.into()),
        };
        log::trace!("{:<32}{}", "read record", path.display());
        let record = DataRecord::decode(&text, self.has_labels)?;
        Ok(Sample {
            graph: record.points.to_graph(),
            labels: record.labels,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Result<Sample>> + '_ {
        (0..self.size).map(move |index| self.get(index))
    }
}
