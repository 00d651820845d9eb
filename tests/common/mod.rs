#![allow(dead_code)]

use misreg::toolkit::{band_file_paths, mosaic_stem};
use misreg::{
    BandFiles, MisregError, MisregResult, RegistrationConfig, ShiftSample, ShiftSampleSet, Toolkit,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Canned behavior of one mosaic, keyed by its stem.
#[derive(Clone, Debug)]
pub struct FakeMosaic {
    pub bands: Vec<String>,
    pub size: (usize, usize),
    pub explode: Result<(), String>,
    pub register: Result<ShiftSampleSet, MisregError>,
}

impl FakeMosaic {
    pub fn new(bands: &[&str], samples: ShiftSampleSet) -> Self {
        Self {
            bands: bands.iter().map(|b| b.to_string()).collect(),
            size: (64, 48),
            explode: Ok(()),
            register: Ok(samples),
        }
    }
}

/// In-memory toolkit that records the scratch directories it hands out.
#[derive(Default)]
pub struct FakeToolkit {
    mosaics: HashMap<String, FakeMosaic>,
    workdirs: Mutex<Vec<PathBuf>>,
    registrations: Mutex<Vec<(PathBuf, PathBuf)>>,
}

impl FakeToolkit {
    pub fn with(mut self, stem: &str, mosaic: FakeMosaic) -> Self {
        self.mosaics.insert(stem.to_string(), mosaic);
        self
    }

    pub fn workdirs(&self) -> Vec<PathBuf> {
        self.workdirs.lock().unwrap().clone()
    }

    pub fn registrations(&self) -> Vec<(PathBuf, PathBuf)> {
        self.registrations.lock().unwrap().clone()
    }

    fn mosaic(&self, path: &Path) -> MisregResult<&FakeMosaic> {
        self.mosaics
            .get(&mosaic_stem(path))
            .ok_or_else(|| MisregError::Toolkit {
                program: "catlab".to_string(),
                reason: format!("{} is not a cube", path.display()),
            })
    }
}

impl Toolkit for FakeToolkit {
    fn list_bands(&self, mosaic: &Path) -> MisregResult<Vec<String>> {
        Ok(self.mosaic(mosaic)?.bands.clone())
    }

    fn raster_size(&self, mosaic: &Path) -> MisregResult<(usize, usize)> {
        Ok(self.mosaic(mosaic)?.size)
    }

    fn explode_bands(&self, mosaic: &Path) -> MisregResult<BandFiles> {
        let fake = self.mosaic(mosaic)?;
        if let Err(reason) = &fake.explode {
            return Err(MisregError::Explode {
                mosaic: mosaic.to_path_buf(),
                reason: reason.clone(),
            });
        }
        let dir = tempfile::tempdir().unwrap();
        let files = band_file_paths(&dir.path().join(mosaic_stem(mosaic)), &fake.bands);
        for file in &files {
            std::fs::write(&file.path, b"band").unwrap();
        }
        self.workdirs.lock().unwrap().push(dir.path().to_path_buf());
        Ok(BandFiles::new(files, Some(dir)))
    }

    fn register(
        &self,
        source: &Path,
        target: &Path,
        _config: &RegistrationConfig,
    ) -> MisregResult<ShiftSampleSet> {
        assert!(
            source.exists() && target.exists(),
            "band files must exist while registering"
        );
        self.registrations
            .lock()
            .unwrap()
            .push((source.to_path_buf(), target.to_path_buf()));
        self.mosaic(source)?.register.clone()
    }
}

/// Five tiles on a regular layout with the given shifts.
pub fn samples_with_shifts(x_shifts: &[f64], y_shifts: &[f64]) -> ShiftSampleSet {
    x_shifts
        .iter()
        .zip(y_shifts)
        .enumerate()
        .map(|(i, (&dx, &dy))| ShiftSample {
            x: 5.0 + 10.0 * i as f64,
            y: 5.0 + 7.0 * (i % 3) as f64,
            dx,
            dy,
        })
        .collect()
}

pub fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, b"cube").unwrap();
}
