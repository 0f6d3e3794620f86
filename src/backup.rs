use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use age::secrecy::Secret;
use age::{Decryptor, Encryptor};
use tracing::info;

use crate::errors::NeedsbookError;
use crate::store::snapshot;
use crate::store::FinanceState;

const AGE_HEADER: &[u8] = b"age-encryption.org/";

/// Writes `state` to `path`, wrapped in an age passphrase envelope when a
/// passphrase is given.
pub fn export(path: &Path, state: &FinanceState, passphrase: Option<String>) -> Result<(), NeedsbookError> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let mut writer = match passphrase {
        Some(passphrase) => {
            let encryptor = Encryptor::with_user_passphrase(Secret::new(passphrase));
            let encrypt_writer = encryptor.wrap_output(writer)?;
            snapshot::write_to(encrypt_writer, state)?.finish()?
        }
        None => snapshot::write_to(writer, state)?,
    };
    writer.flush()?;
    info!(path = %path.display(), "backup exported");
    Ok(())
}

/// Reads a backup written by [`export`]. `passphrase` is only asked for when
/// the file turns out to be encrypted.
pub fn import(
    path: &Path,
    passphrase: impl FnOnce() -> Result<String, NeedsbookError>,
) -> Result<FinanceState, NeedsbookError> {
    let mut reader = BufReader::new(File::open(path)?);
    let encrypted = reader.fill_buf()?.starts_with(AGE_HEADER);
    let state = if encrypted {
        let decryptor = match Decryptor::new(reader)? {
            Decryptor::Passphrase(decryptor) => decryptor,
            _ => {
                return Err(NeedsbookError::InvalidArgument(
                    "backup is encrypted for recipients, not with a passphrase".into(),
                ))
            }
        };
        let decrypt_reader = decryptor.decrypt(&Secret::new(passphrase()?), None)?;
        snapshot::read_from(decrypt_reader)?
    } else {
        snapshot::read_from(reader)?
    };
    info!(path = %path.display(), encrypted, "backup imported");
    Ok(state)
}
