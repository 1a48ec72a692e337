use crate::{
    config::VersionMap,
    keys::{self, KeyMode},
};
use anyhow::{Result, bail};
use clap::Args;
use gicut_cri::{
    Cancellation, KeySet, LogDiagnostics, Sink, demux_and_decrypt, usm::VideoSinkFactory,
};
use log::{debug, error, info, warn};
use rayon::prelude::*;
use std::{
    collections::HashMap,
    fs::{self, File},
    io::{self, BufReader, BufWriter},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

/// Extract video and decrypted audio streams from USM files.
#[derive(Debug, Clone, Args)]
pub struct Demux {
    /// Path of a USM file, or of a directory which is searched recursively for USM files.
    #[arg(required = true)]
    pub input: PathBuf,

    /// Directory for output files.
    /// Sub-directories of an input directory are mirrored inside it.
    #[arg(short, long, default_value = ".")]
    pub directory: PathBuf,

    /// Process every file instead of only files with the .usm extension.
    #[arg(long)]
    pub all_files: bool,

    /// Maximum number of files processed in parallel.
    /// By default one file per logical CPU is processed.
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Key added to the key of every file, in decimal or 0x prefixed hexadecimal.
    #[arg(short, long, help_heading = "Key Options", default_value = "0", value_parser = keys::parse_key)]
    pub key: u64,

    /// Comma separated sources for the key of every file.
    /// possible values: [from-external, from-provided, from-name, prefer-external-fallback-provided, default, none]
    #[arg(long, help_heading = "Key Options", default_value_t = KeyMode::DEFAULT)]
    pub key_mode: KeyMode,

    /// Path of the versions.json file which lists the version key of every video.
    #[arg(long, help_heading = "Key Options", default_value = "versions.json")]
    pub version_json: PathBuf,

    /// Skip writing audio streams (.hca).
    #[arg(long, help_heading = "Output Options")]
    pub no_audio: bool,

    /// Skip writing video streams (.ivf).
    /// The container is still validated when both outputs are skipped.
    #[arg(long, help_heading = "Output Options")]
    pub no_video: bool,
}

/// Derived cipher contexts shared by files with the same key.
#[derive(Default)]
struct KeyCache(Mutex<HashMap<u64, Arc<KeySet>>>);

impl KeyCache {
    fn get(&self, key: u64) -> Arc<KeySet> {
        let mut keys = self.0.lock().unwrap_or_else(|e| e.into_inner());
        keys.entry(key)
            .or_insert_with(|| Arc::new(KeySet::new(key)))
            .clone()
    }
}

impl Demux {
    pub fn execute(self, cancellation: &Cancellation) -> Result<()> {
        let versions = VersionMap::load(&self.version_json)?;
        let files = self.files()?;
        let total = files.len();

        let mut pool = rayon::ThreadPoolBuilder::new();

        if let Some(jobs) = self.jobs {
            pool = pool.num_threads(jobs);
        }

        let pool = pool.build()?;
        let keys = KeyCache::default();

        let processed = pool.install(|| {
            files
                .par_iter()
                .filter(|(file, directory)| {
                    self.process(file, directory, &versions, &keys, cancellation)
                })
                .count()
        });

        if cancellation.is_cancelled() {
            warn!("Stopped before every file was processed.");
        }

        info!("Processed {}/{} files.", processed, total);
        Ok(())
    }

    /// Input files paired with their output directory.
    fn files(&self) -> Result<Vec<(PathBuf, PathBuf)>> {
        if self.input.is_file() {
            return Ok(vec![(self.input.clone(), self.directory.clone())]);
        }

        if !self.input.is_dir() {
            bail!("File not found: {}", self.input.display());
        }

        let pattern = PathBuf::from(glob::Pattern::escape(&self.input.to_string_lossy()))
            .join("**")
            .join("*");
        let mut files = vec![];

        for entry in glob::glob(&pattern.to_string_lossy())? {
            let file = match entry {
                Ok(file) => file,
                Err(e) => {
                    warn!("{}", e);
                    continue;
                }
            };

            if !file.is_file() || !(self.all_files || is_usm(&file)) {
                continue;
            }

            let relative = file
                .parent()
                .and_then(|x| x.strip_prefix(&self.input).ok())
                .unwrap_or(Path::new(""));
            let directory = self.directory.join(relative);
            files.push((file, directory));
        }

        Ok(files)
    }

    fn process(
        &self,
        file: &Path,
        directory: &Path,
        versions: &VersionMap,
        keys: &KeyCache,
        cancellation: &Cancellation,
    ) -> bool {
        if cancellation.is_cancelled() {
            return false;
        }

        info!("Process file: {}", file.display());

        if !self.all_files && !is_usm(file) {
            warn!("Not a USM file, skipping.");
            return false;
        }

        let Some(name) = file.file_stem().map(|x| x.to_string_lossy().into_owned()) else {
            return false;
        };

        let external = versions.get(&name);

        if let Some(entry) = external {
            debug!(
                "{} has version key {:#x}, encrypted audio: {}",
                name, entry.key, entry.enc_audio
            );
        }

        let Some(key) = self
            .key_mode
            .key(&name, self.key, external.map(|x| x.key))
        else {
            return false;
        };

        match self.demux(file, directory, &name, &keys.get(key), cancellation) {
            Ok(true) => {
                info!("Done: {}", file.display());
                true
            }
            Ok(false) => {
                error!("USM demux failed: {}", file.display());
                false
            }
            Err(e) => {
                error!("USM demux failed: {}: {}", file.display(), e);
                false
            }
        }
    }

    fn demux(
        &self,
        file: &Path,
        directory: &Path,
        name: &str,
        keys: &KeySet,
        cancellation: &Cancellation,
    ) -> Result<bool> {
        let mut input = BufReader::new(File::open(file)?);
        let video_path = directory.join(format!("{}.ivf", name));

        let mut video_factory =
            || -> io::Result<Sink<'static>> { Ok(Box::new(create(&video_path)?)) };
        let audio_factory = |channel: u8| create(&directory.join(format!("{}.{}.hca", name, channel)));

        let video: Option<VideoSinkFactory<'_, '_>> = if self.no_video {
            None
        } else {
            Some(&mut video_factory)
        };

        Ok(demux_and_decrypt(
            keys,
            &mut input,
            video,
            (!self.no_audio).then_some(&audio_factory),
            Some(&LogDiagnostics),
            cancellation,
        )?)
    }
}

fn is_usm(path: &Path) -> bool {
    path.extension()
        .is_some_and(|x| x.eq_ignore_ascii_case("usm"))
}

fn create(path: &Path) -> io::Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    info!("Create file: {}", path.display());
    Ok(BufWriter::new(File::create(path)?))
}
