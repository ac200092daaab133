use std::error::Error;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use clap::{Parser, ValueEnum};
use log::{debug, info, LevelFilter};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rsa_vault::{Config, KeySet, RsaEngine, Vault, VaultStorage, CONFIG_DEF};

const SAMPLE_TEXT: &str = "The quick brown fox jumps over the lazy dog.\nÀ bientôt, 再见 🦀\n";

#[derive(Debug, Clone, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    Generate,
    Create,
    Read,
    Write,
    Test,
}

#[derive(Debug, Parser)]
#[clap(version, about = "Textbook RSA keys and character-block text vaults")]
pub struct Cli {
    #[clap(short, long, value_enum, default_value_t = RunMode::Generate, help = "Run mode")]
    pub mode: RunMode,
    #[clap(short, long, value_parser, help = "Key string `e-d-N'")]
    pub key: Option<String>,
    #[clap(long, value_parser, help = "Key file, read when --key is absent, written by generate")]
    pub key_file: Option<PathBuf>,
    #[clap(short, long, value_parser, help = "Input filename, stdin when absent")]
    pub input: Option<PathBuf>,
    #[clap(short, long, value_parser, help = "Output filename, stdout when absent")]
    pub output: Option<PathBuf>,
    #[clap(long, value_parser, default_value = CONFIG_DEF.storage.as_str(), help = "Vault storage directory")]
    pub storage: PathBuf,
    #[clap(long, value_parser, help = "Seed for reproducible key generation")]
    pub seed: Option<u64>,
    #[clap(long, value_parser, default_value_t = CONFIG_DEF.time_max, help = "Max time in mill seconds that trying to generate a prime")]
    pub time_max: i64,
    #[clap(short, long, value_parser, default_value_t = false, help = "Disable log output")]
    pub silent: bool,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            time_max: self.time_max,
            storage: self.storage.to_string_lossy().into_owned(),
            ..Config::default()
        }
    }

    fn reader(&self) -> io::Result<Box<dyn Read>> {
        Ok(match &self.input {
            None => Box::new(io::stdin()),
            Some(f) => Box::new(File::open(f)?),
        })
    }

    fn writer(&self) -> io::Result<Box<dyn Write>> {
        Ok(match &self.output {
            None => Box::new(io::stdout()),
            Some(f) => Box::new(File::create(f)?),
        })
    }

    fn key_set(&self) -> Result<KeySet, Box<dyn Error>> {
        match (&self.key, &self.key_file) {
            (Some(key), _) => Ok(key.parse()?),
            (None, Some(path)) => Ok(KeySet::load(path)?),
            (None, None) => Err("A key is required: pass --key `e-d-N' or --key-file".into()),
        }
    }

    fn vault(&self) -> Result<Vault, Box<dyn Error>> {
        let engine = RsaEngine::new(self.key_set()?);
        let mut vault = Vault::new(engine, VaultStorage::from(&self.config()));
        vault.set_progress(!self.silent);
        Ok(vault)
    }

    fn required<'a>(path: &'a Option<PathBuf>, flag: &str) -> Result<&'a Path, Box<dyn Error>> {
        path.as_deref().ok_or_else(|| format!("--{} is required in this mode", flag).into())
    }

    fn read_text(&self) -> Result<String, Box<dyn Error>> {
        let mut text = String::new();
        self.reader()?.read_to_string(&mut text)?;
        Ok(text)
    }

    pub fn run(&self) -> Result<(), Box<dyn Error>> {
        match self.mode {
            RunMode::Generate => {
                let config = self.config();
                let engine = match self.seed {
                    Some(seed) => RsaEngine::generate_with(&config, &mut StdRng::seed_from_u64(seed))?,
                    None => RsaEngine::generate(&config)?,
                };
                let keys = engine.keys();
                if let Some(path) = &self.key_file {
                    keys.save(path)?;
                }
                writeln!(self.writer()?, "{}", keys)?;
            }
            RunMode::Create => {
                let source = Cli::required(&self.input, "input")?;
                let mut vault = self.vault()?;
                let path = vault.create_from_file(source)?;
                info!("Created vault {}", path.display());
                writeln!(self.writer()?, "{}", path.display())?;
            }
            RunMode::Read => {
                let path = Cli::required(&self.input, "input")?;
                let mut vault = self.vault()?;
                vault.set_progress(!self.silent && self.output.is_some());
                let text = vault.read(path)?;
                let mut writer = self.writer()?;
                writer.write_all(text.as_bytes())?;
                writer.flush()?;
            }
            RunMode::Write => {
                let path = Cli::required(&self.output, "output")?;
                let vault = self.vault()?;
                let text = self.read_text()?;
                vault.overwrite(&text, path)?;
            }
            RunMode::Test => {
                let vault = self.vault()?;
                let text = match &self.input {
                    Some(_) => self.read_text()?,
                    None => SAMPLE_TEXT.to_string(),
                };
                let bytes = vault.encode(&text)?;
                let decoded = vault.decode(&bytes)?;
                if decoded != text {
                    return Err(format!("Round trip failed for key {}", vault.engine().keys()).into());
                }
                info!("Test pass: {} characters in {} bytes", text.chars().count(), bytes.len());
            }
        }
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let mut logger = env_logger::Builder::new();
    if cli.silent {
        logger.filter_level(LevelFilter::Off);
    } else {
        logger.filter_level(LevelFilter::Info).parse_default_env();
    }
    logger.init();
    debug!("Run args: {:?}", cli);
    cli.run()
}
