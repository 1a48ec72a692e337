use crate::keys;
use anyhow::{Context, Result};
use clap::{ArgGroup, Args};
use gicut_cri::{Cancellation, Hca, LogDiagnostics};
use log::info;
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::PathBuf,
};

/// Decrypt a standalone HCA audio stream.
#[derive(Debug, Clone, Args)]
#[command(group(ArgGroup::new("source").required(true).args(["key", "name"])))]
pub struct Decrypt {
    /// Path of the encrypted .hca file.
    #[arg(required = true)]
    pub input: PathBuf,

    /// Path of the decrypted output file.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Key of the stream, in decimal or 0x prefixed hexadecimal.
    #[arg(short, long, value_parser = keys::parse_key)]
    pub key: Option<u64>,

    /// Name of the cutscene the stream belongs to, used to derive the key.
    #[arg(long)]
    pub name: Option<String>,
}

impl Decrypt {
    fn key(&self) -> u64 {
        match (&self.name, self.key) {
            (Some(name), _) => keys::key_from_name(name),
            (None, Some(key)) => key,
            (None, None) => 0,
        }
    }

    pub fn execute(self, cancellation: &Cancellation) -> Result<()> {
        let key = self.key();
        let mut input = BufReader::new(
            File::open(&self.input)
                .with_context(|| format!("could not open {}", self.input.display()))?,
        );

        if let Some(parent) = self.output.parent() {
            fs::create_dir_all(parent)?;
        }

        info!("Create file: {}", self.output.display());
        let mut output = BufWriter::new(File::create(&self.output)?);

        Hca::new(key).decrypt(&mut input, &mut output, Some(&LogDiagnostics), cancellation)?;
        output.flush()?;

        info!("Decrypted {} with key {:#x}", self.input.display(), key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        decrypt: Decrypt,
    }

    fn parse(args: &[&str]) -> Result<Decrypt, clap::Error> {
        Cli::try_parse_from(std::iter::once("gicut").chain(args.iter().copied())).map(|x| x.decrypt)
    }

    #[test]
    fn key_sources_are_exclusive() {
        assert!(parse(&["a.hca", "-o", "b.hca"]).is_err());
        assert!(parse(&["a.hca", "-o", "b.hca", "-k", "1", "--name", "abc"]).is_err());
        assert_eq!(parse(&["a.hca", "-o", "b.hca", "-k", "0x10"]).unwrap().key(), 0x10);
        assert_eq!(parse(&["a.hca", "-o", "b.hca", "--name", "abc"]).unwrap().key(), 1266);
    }

    #[test]
    fn decrypts_clear_stream() {
        let dir = tempfile::tempdir().unwrap();
        let mut data = b"HCA\0\x02\x00\x00\x2E".to_vec();
        data.extend_from_slice(b"fmt\0");
        data.extend_from_slice(&[0; 12]);
        data.extend_from_slice(b"comp\x00\x10");
        data.extend_from_slice(&[0; 10]);
        data.extend_from_slice(b"pad\0\0\0");
        data.extend_from_slice(&[7; 0x20]);
        fs::write(dir.path().join("in.hca"), &data).unwrap();

        let input = dir.path().join("in.hca").to_string_lossy().into_owned();
        let output = dir.path().join("out/out.hca").to_string_lossy().into_owned();
        parse(&[&input, "-o", &output, "-k", "1"])
            .unwrap()
            .execute(&Cancellation::new())
            .unwrap();

        let decrypted = fs::read(dir.path().join("out/out.hca")).unwrap();
        assert_eq!(decrypted.len(), data.len());
        assert_eq!(&decrypted[..0x2C], &data[..0x2C]);
        assert_eq!(&decrypted[0x2E..], &data[0x2E..]);
    }

    #[test]
    fn invalid_stream_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("in.hca"), b"RIFF\0\0\0\0").unwrap();

        let input = dir.path().join("in.hca").to_string_lossy().into_owned();
        let output = dir.path().join("out.hca").to_string_lossy().into_owned();
        let result = parse(&[&input, "-o", &output, "--name", "abc"])
            .unwrap()
            .execute(&Cancellation::new());
        assert!(result.is_err());
    }
}
