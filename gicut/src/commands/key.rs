use crate::keys;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use gicut_cri::MaskSet;

/// Print the key derived from a cutscene name together with its video masks.
#[derive(Debug, Clone, Args)]
pub struct Key {
    /// Name of the cutscene, the USM file name without extension.
    #[arg(required = true)]
    pub name: String,

    /// Version specific key added to the name key, in decimal or 0x prefixed hexadecimal.
    #[arg(long, value_parser = keys::parse_key)]
    pub key2: Option<u64>,
}

impl Key {
    pub fn key(&self) -> u64 {
        match self.key2 {
            Some(key2) => keys::key_from_name_with(&self.name, key2),
            None => keys::key_from_name(&self.name),
        }
    }

    pub fn execute(self) -> Result<()> {
        let key = self.key();
        let masks = MaskSet::new(key);

        println!("{:>7} {}", "Name".cyan(), self.name);
        println!("{:>7} {} ({:#018x})", "Key".cyan(), key, key);
        println!("{:>7} {}", "Video1".cyan(), hex::encode(masks.video1));
        println!("{:>7} {}", "Video2".cyan(), hex::encode(masks.video2));
        Ok(())
    }
}
